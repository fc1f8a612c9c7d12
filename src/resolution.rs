//! Resolution negotiation between the encoder and the preview surface
//!
//! Both selectors are pure: the same list in the same order always yields the
//! same size. Aspect ratios are compared by exact cross-multiplication in
//! `u64`, so near-miss sizes never round into a match.

use crate::errors::RecorderError;
use crate::types::Size;
use serde::{Deserialize, Serialize};

/// Widest video the recorder will pick
pub const MAX_VIDEO_WIDTH: u32 = 1080;

/// Sizes chosen for one camera open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionPair {
    pub video: Size,
    pub preview: Size,
}

/// Pick the recording size: the first 4:3 size no wider than
/// [`MAX_VIDEO_WIDTH`], otherwise the last supported size.
pub fn choose_video_size(choices: &[Size]) -> Result<Size, RecorderError> {
    let last = choices
        .last()
        .ok_or_else(|| RecorderError::NoSupportedSizes("media recorder".to_string()))?;

    Ok(choices
        .iter()
        .find(|s| is_ratio(s, Size::new(4, 3)) && s.width <= MAX_VIDEO_WIDTH)
        .copied()
        .unwrap_or(*last))
}

/// Pick the smallest size with the same aspect ratio as `aspect` that is at
/// least `min_width` x `min_height`. Falls back to the first choice.
pub fn choose_optimal_size(
    choices: &[Size],
    min_width: u32,
    min_height: u32,
    aspect: Size,
) -> Result<Size, RecorderError> {
    let first = choices
        .first()
        .ok_or_else(|| RecorderError::NoSupportedSizes("preview".to_string()))?;

    if aspect.width == 0 {
        return Ok(*first);
    }

    let big_enough = choices.iter().filter(|option| {
        is_ratio(option, aspect)
            && option.width >= min_width
            && option.height >= min_height
    });

    // min_by_key keeps the first of equal keys
    Ok(big_enough
        .min_by_key(|option| option.area())
        .copied()
        .unwrap_or(*first))
}

/// `size` has exactly the `aspect` ratio
fn is_ratio(size: &Size, aspect: Size) -> bool {
    size.width as u64 * aspect.height as u64 == size.height as u64 * aspect.width as u64
}

/// Choose the video size from the recorder sizes, then the preview size that
/// matches it from the preview sizes.
pub fn select_resolutions(
    recorder_sizes: &[Size],
    preview_sizes: &[Size],
    viewport: Size,
) -> Result<ResolutionPair, RecorderError> {
    let video = choose_video_size(recorder_sizes)?;
    let preview = choose_optimal_size(preview_sizes, viewport.width, viewport.height, video)?;
    log::debug!("Selected video {} and preview {} for viewport {}", video, preview, viewport);
    Ok(ResolutionPair { video, preview })
}
