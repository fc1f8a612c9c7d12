//! Plain data types shared across the crate

use serde::{Deserialize, Serialize};
use std::fmt;

/// Frame dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Pixel count, widened so large sizes cannot overflow
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Display rotation at the moment a recording starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn from_degrees(degrees: u16) -> Option<Self> {
        match degrees {
            0 => Some(Rotation::Deg0),
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    /// Orientation hint handed to the encoder for a sensor mounted at 90°
    pub fn orientation_hint(&self) -> u16 {
        match self {
            Rotation::Deg0 => 90,
            Rotation::Deg90 => 0,
            Rotation::Deg180 => 270,
            Rotation::Deg270 => 180,
        }
    }
}

/// What a capture session is being created for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPurpose {
    /// Preview surface only
    Preview,
    /// Preview surface plus encoder surface
    Recording,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation_hints() {
        assert_eq!(Rotation::Deg0.orientation_hint(), 90);
        assert_eq!(Rotation::Deg90.orientation_hint(), 0);
        assert_eq!(Rotation::Deg180.orientation_hint(), 270);
        assert_eq!(Rotation::Deg270.orientation_hint(), 180);
    }

    #[test]
    fn test_rotation_from_degrees() {
        assert_eq!(Rotation::from_degrees(180), Some(Rotation::Deg180));
        assert_eq!(Rotation::from_degrees(45), None);
    }

    #[test]
    fn test_size_area_and_display() {
        let size = Size::new(1440, 1080);
        assert_eq!(size.area(), 1_555_200);
        assert_eq!(size.to_string(), "1440x1080");
    }
}
