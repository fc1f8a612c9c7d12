//! Software recording backend
//!
//! Built on:
//! - openh264 for H.264 encoding
//! - muxide for MP4 muxing
//!
//! [`SyntheticEncoderFactory`] plugs into a [`CaptureBackend`] in place of a
//! hardware encoder and writes real, playable files from generated frames.
//!
//! ```rust,ignore
//! use clipcam::recording::SyntheticEncoderFactory;
//!
//! let backend = CaptureBackend {
//!     camera,
//!     encoders: Arc::new(SyntheticEncoderFactory),
//!     preview,
//! };
//! ```
//!
//! [`CaptureBackend`]: crate::platform::CaptureBackend

mod encoder;
mod synthetic;
mod writer;

pub use encoder::{EncodedFrame, H264Encoder};
pub use synthetic::{synthetic_frame, SyntheticEncoder, SyntheticEncoderFactory};
pub use writer::{ClipStats, Mp4Writer};
