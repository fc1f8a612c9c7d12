//! Boundary to the host camera framework, hardware encoder and preview UI
//!
//! Everything asynchronous reports back through listeners that post onto the
//! controller's background thread. Implementations must never invoke a
//! listener's sink inline; they call `notify`, which queues it.

mod background;

pub use background::{BackgroundThread, Handler};

use crate::errors::RecorderError;
use crate::types::Size;
use std::path::Path;
use std::sync::Arc;

/// Which consumer an output size list is queried for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputUseCase {
    /// Texture backed preview
    Preview,
    /// Hardware media recorder
    MediaRecorder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    Preview,
    Encoder,
}

/// Opaque destination for camera frames
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    pub kind: SurfaceKind,
    pub size: Size,
}

impl Surface {
    pub fn preview(size: Size) -> Self {
        Self {
            kind: SurfaceKind::Preview,
            size,
        }
    }

    pub fn encoder(size: Size) -> Self {
        Self {
            kind: SurfaceKind::Encoder,
            size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestTemplate {
    Preview,
    Record,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    Off,
    Auto,
}

/// Repeating capture request issued against an active session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub template: RequestTemplate,
    pub targets: Vec<Surface>,
    pub control_mode: ControlMode,
}

/// Device state changes reported after an open request
pub enum DeviceState {
    Opened(Box<dyn CameraDevice>),
    Disconnected,
    Error(i32),
}

impl std::fmt::Debug for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceState::Opened(device) => write!(f, "Opened({})", device.id()),
            DeviceState::Disconnected => write!(f, "Disconnected"),
            DeviceState::Error(code) => write!(f, "Error({})", code),
        }
    }
}

/// Receives every state change of one opened device
#[derive(Clone)]
pub struct DeviceListener {
    handler: Handler,
    sink: Arc<dyn Fn(DeviceState) + Send + Sync>,
}

impl DeviceListener {
    pub fn new(handler: Handler, sink: Arc<dyn Fn(DeviceState) + Send + Sync>) -> Self {
        Self { handler, sink }
    }

    /// Deliver `state` on the background thread. Returns false if it could
    /// not be queued; the state (and any device inside it) is then dropped.
    pub fn notify(&self, state: DeviceState) -> bool {
        let sink = self.sink.clone();
        self.handler.post(move || sink(state))
    }
}

/// Outcome of one session configure request
pub enum SessionState {
    Configured(Box<dyn CaptureSession>),
    ConfigureFailed,
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Configured(_) => write!(f, "Configured"),
            SessionState::ConfigureFailed => write!(f, "ConfigureFailed"),
        }
    }
}

/// One-shot listener for a session configure request
pub struct SessionListener {
    handler: Handler,
    sink: Box<dyn FnOnce(SessionState) + Send>,
}

impl SessionListener {
    pub fn new(handler: Handler, sink: Box<dyn FnOnce(SessionState) + Send>) -> Self {
        Self { handler, sink }
    }

    /// Consumes the listener, so a request reports exactly once
    pub fn notify(self, state: SessionState) -> bool {
        let sink = self.sink;
        self.handler.post(move || sink(state))
    }
}

/// Camera enumeration and asynchronous open
pub trait CameraHardware: Send + Sync {
    fn camera_ids(&self) -> Result<Vec<String>, RecorderError>;

    fn output_sizes(&self, camera_id: &str, use_case: OutputUseCase)
        -> Result<Vec<Size>, RecorderError>;

    /// Request the device. The result arrives later through `listener`.
    fn open(&self, camera_id: &str, listener: DeviceListener) -> Result<(), RecorderError>;
}

/// An opened camera device. Dropping it must release the hardware.
pub trait CameraDevice: Send {
    fn id(&self) -> &str;

    /// Request a session bound to `outputs`. The result arrives later through
    /// `listener`.
    fn create_capture_session(
        &mut self,
        outputs: Vec<Surface>,
        listener: SessionListener,
    ) -> Result<(), RecorderError>;

    fn close(&mut self);
}

/// A configured capture session
pub trait CaptureSession: Send {
    fn set_repeating_request(&mut self, request: CaptureRequest) -> Result<(), RecorderError>;

    fn stop_repeating(&mut self) -> Result<(), RecorderError>;

    fn abort_captures(&mut self) -> Result<(), RecorderError>;

    fn close(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioSource {
    Microphone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoSource {
    Surface,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Mpeg4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    H264,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodec {
    Aac,
}

/// Hardware recording pipeline.
///
/// Configuration calls must arrive in declaration order, from
/// `set_audio_source` through `prepare`.
pub trait MediaEncoder: Send {
    fn set_audio_source(&mut self, source: AudioSource) -> Result<(), RecorderError>;
    fn set_video_source(&mut self, source: VideoSource) -> Result<(), RecorderError>;
    fn set_output_format(&mut self, format: OutputFormat) -> Result<(), RecorderError>;
    fn set_output_file(&mut self, path: &Path) -> Result<(), RecorderError>;
    fn set_video_encoding_bit_rate(&mut self, bits_per_second: u32) -> Result<(), RecorderError>;
    fn set_video_frame_rate(&mut self, fps: u32) -> Result<(), RecorderError>;
    fn set_video_size(&mut self, size: Size) -> Result<(), RecorderError>;
    fn set_video_encoder(&mut self, codec: VideoCodec) -> Result<(), RecorderError>;
    fn set_audio_encoder(&mut self, codec: AudioCodec) -> Result<(), RecorderError>;
    fn set_orientation_hint(&mut self, degrees: u16) -> Result<(), RecorderError>;
    fn prepare(&mut self) -> Result<(), RecorderError>;

    /// Input surface, valid after `prepare`
    fn surface(&self) -> Result<Surface, RecorderError>;

    fn start(&mut self) -> Result<(), RecorderError>;

    /// Stop and flush; the output file is complete afterwards
    fn stop(&mut self) -> Result<(), RecorderError>;

    /// Back to the unconfigured state
    fn reset(&mut self);

    fn release(&mut self);
}

/// Creates one encoder per camera open
pub trait EncoderFactory: Send + Sync {
    fn create_encoder(&self) -> Result<Box<dyn MediaEncoder>, RecorderError>;
}

/// The on-screen view the preview is drawn into
pub trait PreviewTarget: Send + Sync {
    /// Current viewport size; the preview must be at least this large
    fn viewport(&self) -> Size;

    fn is_available(&self) -> bool {
        true
    }

    /// Called once the preview size is known
    fn set_aspect_ratio(&self, width: u32, height: u32);

    /// Surface backed by the view, with its buffer sized to `buffer`
    fn surface(&self, buffer: Size) -> Surface {
        Surface::preview(buffer)
    }
}

/// Everything a capture controller talks to
#[derive(Clone)]
pub struct CaptureBackend {
    pub camera: Arc<dyn CameraHardware>,
    pub encoders: Arc<dyn EncoderFactory>,
    pub preview: Arc<dyn PreviewTarget>,
}
