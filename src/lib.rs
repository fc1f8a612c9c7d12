//! clipcam: short clip recording with camera lifecycle management
//!
//! This crate records fixed-length video clips from a camera and keeps a
//! catalog of the clips already saved in a recordings directory.
//!
//! # Features
//! - Resolution negotiation between encoder and preview
//! - Asynchronous camera open with a timed open/close gate
//! - Preview and recording capture sessions with safe teardown
//! - Timed recording lifecycle with arm delay, countdown and external stop
//! - Recordings catalog rebuilt from MP4 files on disk
//! - Simulated camera stack for offline use and testing
//! - Software H.264/MP4 encoder backend (`recording` feature)
//!
//! # Usage
//! ```rust,ignore
//! use clipcam::{Catalog, ClipcamConfig, RecordingLifecycle, RecordingRequest};
//!
//! let config = ClipcamConfig::load_or_default();
//! let mut catalog = Catalog::load(config.recordings_directory())?;
//! let outcome = RecordingLifecycle::new(&mut catalog, backend, config)
//!     .run(&permissions, RecordingRequest::new("walk", 5));
//! ```
pub mod capture;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod lifecycle;
pub mod permissions;
pub mod platform;
pub mod resolution;
pub mod timing;
pub mod types;

#[cfg(feature = "recording")]
pub mod recording;

// Simulated hardware and fixtures - available for external tests
pub mod testing;

// Re-exports for convenience
pub use capture::{CaptureController, CaptureSettings, ControllerEvent};
pub use catalog::{Catalog, Recording};
pub use config::ClipcamConfig;
pub use errors::RecorderError;
pub use lifecycle::{LifecycleNotice, LifecycleState, Outcome, RecordingLifecycle, RecordingRequest};
pub use types::{Rotation, Size};

/// Initialize logging for the recorder
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "clipcam=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
        software_encoder: cfg!(feature = "recording"),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    /// Built with the `recording` feature
    pub software_encoder: bool,
}
