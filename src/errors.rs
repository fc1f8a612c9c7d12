use std::path::PathBuf;
use std::time::Duration;

/// Every failure the recorder can surface.
///
/// Payloads are plain strings so errors can be cloned and sent between the
/// background context and the UI-owning thread.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecorderError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Timed out after {0:?} waiting to lock camera opening")]
    DeviceBusy(Duration),
    #[error("Camera device error (code {0})")]
    DeviceError(i32),
    #[error("Camera access error: {0}")]
    Hardware(String),
    #[error("Configuration failed: {0}")]
    Configuration(String),
    #[error("No supported sizes: {0}")]
    NoSupportedSizes(String),
    #[error("Recorded file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("Encoder never started, nothing to save")]
    EncoderNeverStarted,
    #[error("Failed to probe {}: {reason}", path.display())]
    Probe { path: PathBuf, reason: String },
    #[error("Encoding error: {0}")]
    Encoding(String),
    #[error("Invalid recording name: {0:?}")]
    InvalidName(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Teardown interrupted: {0}")]
    Teardown(String),
}

impl RecorderError {
    /// True for errors raised while saving a finished recording, as opposed
    /// to errors that ended the recording attempt itself.
    pub fn is_save_failure(&self) -> bool {
        matches!(
            self,
            RecorderError::FileNotFound(_)
                | RecorderError::EncoderNeverStarted
                | RecorderError::Probe { .. }
        )
    }
}

impl From<std::io::Error> for RecorderError {
    fn from(e: std::io::Error) -> Self {
        RecorderError::Io(e.to_string())
    }
}
