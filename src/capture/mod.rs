//! Camera device and capture session control
//!
//! The controller owns the open/close gate and one background thread on which
//! all hardware callbacks run. Anything the UI must react to is forwarded as a
//! [`ControllerEvent`] over a channel.

mod controller;
mod gate;

pub use controller::{
    configure_encoder, CaptureController, CaptureSettings, ControllerEvent, ControllerPhase,
    EncoderSettings,
};
pub use gate::Gate;
