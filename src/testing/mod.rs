//! Testing utilities for clipcam
//!
//! A simulated camera stack for driving the controller and lifecycle without
//! hardware, plus MP4 fixtures for the catalog.

pub mod fixtures;
mod simulated;

pub use simulated::{
    Journal, OpenBehavior, SimulatedCamera, SimulatedConfig, SimulatedEncoder, SimulatedPreview,
};
