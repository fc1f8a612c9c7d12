use crate::catalog::Recording;
use crate::errors::RecorderError;
use crate::types::Rotation;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    Idle,
    AwaitingDeviceReady,
    PreviewStarting,
    PreviewActive,
    ArmingRecorder,
    Recording,
    Finalizing,
    Done,
    Failed,
}

impl LifecycleState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Done | LifecycleState::Failed)
    }

    /// True while the encoder may not have started yet. A stop request in
    /// one of these states discards the attempt.
    pub fn is_before_recording(&self) -> bool {
        matches!(
            self,
            LifecycleState::Idle
                | LifecycleState::AwaitingDeviceReady
                | LifecycleState::PreviewStarting
                | LifecycleState::PreviewActive
                | LifecycleState::ArmingRecorder
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Idle => "idle",
            LifecycleState::AwaitingDeviceReady => "awaiting_device_ready",
            LifecycleState::PreviewStarting => "preview_starting",
            LifecycleState::PreviewActive => "preview_active",
            LifecycleState::ArmingRecorder => "arming_recorder",
            LifecycleState::Recording => "recording",
            LifecycleState::Finalizing => "finalizing",
            LifecycleState::Done => "done",
            LifecycleState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What the UI is told while a recording attempt runs
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleNotice {
    State(LifecycleState),
    /// Countdown display update
    Progress { remaining_secs: u32, label: String },
    Saved(Recording),
    /// The attempt recorded but the file could not be kept
    SaveFailed(RecorderError),
    /// Stopped before anything was recorded
    Discarded,
    Failed(RecorderError),
}

/// How a recording attempt ended
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Saved(Recording),
    SaveFailed(RecorderError),
    Discarded,
    Failed(RecorderError),
}

impl Outcome {
    pub fn recording(&self) -> Option<&Recording> {
        match self {
            Outcome::Saved(recording) => Some(recording),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&RecorderError> {
        match self {
            Outcome::SaveFailed(e) | Outcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// One user-initiated recording attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingRequest {
    /// Display name; blank falls back to the configured default
    pub name: String,
    pub duration_secs: u32,
    /// Display rotation when the attempt starts
    #[serde(default)]
    pub rotation: Rotation,
}

impl RecordingRequest {
    pub fn new(name: impl Into<String>, duration_secs: u32) -> Self {
        Self {
            name: name.into(),
            duration_secs,
            rotation: Rotation::default(),
        }
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }
}
