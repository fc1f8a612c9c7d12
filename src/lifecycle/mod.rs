//! Recording lifecycle: permission check, preview, arm delay, timed
//! recording, finalize and catalog update.
//!
//! ```text
//! Idle -> AwaitingDeviceReady -> PreviewStarting -> PreviewActive
//!      -> ArmingRecorder -> Recording -> Finalizing -> Done
//! ```
//!
//! Any controller failure ends the attempt in `Failed`.

mod manager;
mod state;

pub use manager::{RecordingLifecycle, StopHandle};
pub use state::{LifecycleNotice, LifecycleState, Outcome, RecordingRequest};
