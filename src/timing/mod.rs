//! Clock rendering and the recording countdown

use serde::{Deserialize, Serialize};

/// Render whole seconds as `M:SS`, minutes unpadded.
///
/// `125` renders as `"2:05"`.
pub fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Countdown driven by a once-per-tick timer.
///
/// A countdown for `d` seconds runs `d + 1` ticks: the display starts at `d`
/// and reaches `0` one tick before the countdown finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    total_ticks: u32,
    elapsed_ticks: u32,
}

impl Countdown {
    pub fn new(duration_secs: u32) -> Self {
        Self {
            total_ticks: duration_secs.saturating_add(1),
            elapsed_ticks: 0,
        }
    }

    /// Seconds left on the display, never below zero
    pub fn remaining_secs(&self) -> u32 {
        (self.total_ticks - 1).saturating_sub(self.elapsed_ticks)
    }

    /// Advance one tick. Returns true once the countdown has finished.
    pub fn tick(&mut self) -> bool {
        self.elapsed_ticks = self.elapsed_ticks.saturating_add(1);
        self.is_finished()
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed_ticks >= self.total_ticks
    }

    pub fn label(&self) -> String {
        format_clock(self.remaining_secs())
    }
}
