//! In-memory camera hardware, encoder and preview view
//!
//! Behaves like a real camera stack from the controller's point of view:
//! every completion is delivered through the listener it was given, and the
//! encoder enforces the configuration call order. Each interaction is written
//! to a shared [`Journal`] so tests can assert on what happened.

use crate::errors::RecorderError;
use crate::platform::{
    AudioCodec, AudioSource, CameraDevice, CameraHardware, CaptureBackend, CaptureRequest,
    CaptureSession, DeviceListener, DeviceState, EncoderFactory, MediaEncoder, OutputFormat,
    OutputUseCase, PreviewTarget, SessionListener, SessionState, Surface, SurfaceKind, VideoCodec,
    VideoSource,
};
use crate::testing::fixtures::write_mp4_stub;
use crate::types::Size;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// How the simulated camera answers an open request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenBehavior {
    Open,
    Error(i32),
    Disconnect,
    /// Never answer
    Hang,
}

#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    pub camera_ids: Vec<String>,
    pub preview_sizes: Vec<Size>,
    pub recorder_sizes: Vec<Size>,
    pub open_behavior: OpenBehavior,
    pub fail_preview_session: bool,
    pub fail_recording_session: bool,
    pub fail_encoder_prepare: bool,
    /// Delay before each asynchronous completion is delivered
    pub callback_delay: Duration,
    /// Media seconds recorded per wall clock second
    pub media_time_scale: f64,
    /// Write an MP4 stub when the encoder stops
    pub write_output: bool,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        let sizes = vec![
            Size::new(1920, 1080),
            Size::new(1280, 720),
            Size::new(640, 480),
            Size::new(320, 240),
        ];
        Self {
            camera_ids: vec!["0".to_string(), "1".to_string()],
            preview_sizes: sizes.clone(),
            recorder_sizes: sizes,
            open_behavior: OpenBehavior::Open,
            fail_preview_session: false,
            fail_recording_session: false,
            fail_encoder_prepare: false,
            callback_delay: Duration::ZERO,
            media_time_scale: 1.0,
            write_output: true,
        }
    }
}

/// Ordered log of hardware interactions
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// True if any entry contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|e| e.contains(needle))
    }

    pub fn count(&self, needle: &str) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.contains(needle))
            .count()
    }
}

/// Run `f` now, or on a helper thread after `delay`
fn deliver<F>(delay: Duration, f: F)
where
    F: FnOnce() + Send + 'static,
{
    if delay.is_zero() {
        f();
        return;
    }
    let spawned = std::thread::Builder::new()
        .name("simulated-hal".to_string())
        .spawn(move || {
            std::thread::sleep(delay);
            f();
        });
    if let Err(e) = spawned {
        log::error!("Failed to spawn simulated HAL thread: {}", e);
    }
}

struct Probes {
    open_devices: AtomicUsize,
    repeating_thread: Mutex<Option<String>>,
}

/// Camera hardware and encoder factory backed by memory
pub struct SimulatedCamera {
    config: SimulatedConfig,
    journal: Journal,
    probes: Arc<Probes>,
    listener: Mutex<Option<DeviceListener>>,
}

impl SimulatedCamera {
    pub fn new(config: SimulatedConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            journal: Journal::default(),
            probes: Arc::new(Probes {
                open_devices: AtomicUsize::new(0),
                repeating_thread: Mutex::new(None),
            }),
            listener: Mutex::new(None),
        })
    }

    /// Backend using this camera for hardware and encoders, with a fresh
    /// preview view of `viewport`
    pub fn backend(self: &Arc<Self>, viewport: Size) -> CaptureBackend {
        self.backend_with(Arc::new(SimulatedPreview::new(viewport)))
    }

    pub fn backend_with(self: &Arc<Self>, preview: Arc<SimulatedPreview>) -> CaptureBackend {
        CaptureBackend {
            camera: self.clone(),
            encoders: self.clone(),
            preview,
        }
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    /// Devices opened and not yet closed
    pub fn open_devices(&self) -> usize {
        self.probes.open_devices.load(Ordering::SeqCst)
    }

    /// Name of the thread the last repeating request was issued from
    pub fn repeating_request_thread(&self) -> Option<String> {
        self.probes
            .repeating_thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Report a disconnect to the most recent open request. Returns false if
    /// nothing was opened or the listener is gone.
    pub fn disconnect(&self) -> bool {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match listener {
            Some(listener) => {
                self.journal.push("disconnect");
                listener.notify(DeviceState::Disconnected)
            }
            None => false,
        }
    }
}

impl CameraHardware for SimulatedCamera {
    fn camera_ids(&self) -> Result<Vec<String>, RecorderError> {
        Ok(self.config.camera_ids.clone())
    }

    fn output_sizes(
        &self,
        camera_id: &str,
        use_case: OutputUseCase,
    ) -> Result<Vec<Size>, RecorderError> {
        if !self.config.camera_ids.iter().any(|id| id == camera_id) {
            return Err(RecorderError::Hardware(format!("unknown camera {}", camera_id)));
        }
        Ok(match use_case {
            OutputUseCase::Preview => self.config.preview_sizes.clone(),
            OutputUseCase::MediaRecorder => self.config.recorder_sizes.clone(),
        })
    }

    fn open(&self, camera_id: &str, listener: DeviceListener) -> Result<(), RecorderError> {
        if !self.config.camera_ids.iter().any(|id| id == camera_id) {
            return Err(RecorderError::Hardware(format!("unknown camera {}", camera_id)));
        }
        self.journal.push(format!("open {}", camera_id));
        *self.listener.lock().unwrap_or_else(PoisonError::into_inner) = Some(listener.clone());

        let state = match self.config.open_behavior {
            OpenBehavior::Hang => return Ok(()),
            OpenBehavior::Error(code) => DeviceState::Error(code),
            OpenBehavior::Disconnect => DeviceState::Disconnected,
            OpenBehavior::Open => {
                self.probes.open_devices.fetch_add(1, Ordering::SeqCst);
                DeviceState::Opened(Box::new(SimulatedDevice {
                    id: camera_id.to_string(),
                    closed: false,
                    config: self.config.clone(),
                    journal: self.journal.clone(),
                    probes: self.probes.clone(),
                }))
            }
        };

        deliver(self.config.callback_delay, move || {
            // an undelivered device is dropped, which closes it
            listener.notify(state);
        });
        Ok(())
    }
}

impl EncoderFactory for SimulatedCamera {
    fn create_encoder(&self) -> Result<Box<dyn MediaEncoder>, RecorderError> {
        self.journal.push("create_encoder");
        Ok(Box::new(SimulatedEncoder::new(
            self.journal.clone(),
            self.config.fail_encoder_prepare,
            self.config.media_time_scale,
            self.config.write_output,
        )))
    }
}

struct SimulatedDevice {
    id: String,
    closed: bool,
    config: SimulatedConfig,
    journal: Journal,
    probes: Arc<Probes>,
}

impl CameraDevice for SimulatedDevice {
    fn id(&self) -> &str {
        &self.id
    }

    fn create_capture_session(
        &mut self,
        outputs: Vec<Surface>,
        listener: SessionListener,
    ) -> Result<(), RecorderError> {
        if self.closed {
            return Err(RecorderError::Hardware(format!("device {} is closed", self.id)));
        }
        let kinds: Vec<&str> = outputs
            .iter()
            .map(|s| match s.kind {
                SurfaceKind::Preview => "preview",
                SurfaceKind::Encoder => "encoder",
            })
            .collect();
        self.journal.push(format!("session {}", kinds.join("+")));

        let recording = outputs.iter().any(|s| s.kind == SurfaceKind::Encoder);
        let fail = if recording {
            self.config.fail_recording_session
        } else {
            self.config.fail_preview_session
        };
        let state = if fail {
            SessionState::ConfigureFailed
        } else {
            SessionState::Configured(Box::new(SimulatedSession {
                closed: false,
                journal: self.journal.clone(),
                probes: self.probes.clone(),
            }))
        };

        deliver(self.config.callback_delay, move || {
            listener.notify(state);
        });
        Ok(())
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.probes.open_devices.fetch_sub(1, Ordering::SeqCst);
        self.journal.push(format!("device {} closed", self.id));
    }
}

impl Drop for SimulatedDevice {
    fn drop(&mut self) {
        self.close();
    }
}

struct SimulatedSession {
    closed: bool,
    journal: Journal,
    probes: Arc<Probes>,
}

impl CaptureSession for SimulatedSession {
    fn set_repeating_request(&mut self, request: CaptureRequest) -> Result<(), RecorderError> {
        if self.closed {
            return Err(RecorderError::Hardware("session is closed".to_string()));
        }
        let thread = std::thread::current().name().map(str::to_string);
        *self
            .probes
            .repeating_thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = thread;
        self.journal.push(format!(
            "repeating {:?} {:?}",
            request.template, request.control_mode
        ));
        Ok(())
    }

    fn stop_repeating(&mut self) -> Result<(), RecorderError> {
        self.journal.push("stop_repeating");
        Ok(())
    }

    fn abort_captures(&mut self) -> Result<(), RecorderError> {
        self.journal.push("abort_captures");
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.journal.push("session closed");
        }
    }
}

impl Drop for SimulatedSession {
    fn drop(&mut self) {
        self.close();
    }
}

const CONFIGURE_ORDER: [&str; 11] = [
    "set_audio_source",
    "set_video_source",
    "set_output_format",
    "set_output_file",
    "set_video_encoding_bit_rate",
    "set_video_frame_rate",
    "set_video_size",
    "set_video_encoder",
    "set_audio_encoder",
    "set_orientation_hint",
    "prepare",
];

/// Encoder that writes an MP4 stub whose duration matches how long it ran
pub struct SimulatedEncoder {
    journal: Journal,
    fail_prepare: bool,
    media_time_scale: f64,
    write_output: bool,
    next_step: usize,
    output_path: Option<PathBuf>,
    video_size: Option<Size>,
    started_at: Option<Instant>,
    released: bool,
}

impl SimulatedEncoder {
    pub fn new(journal: Journal, fail_prepare: bool, media_time_scale: f64, write_output: bool) -> Self {
        Self {
            journal,
            fail_prepare,
            media_time_scale,
            write_output,
            next_step: 0,
            output_path: None,
            video_size: None,
            started_at: None,
            released: false,
        }
    }

    fn step(&mut self, call: &str, detail: Option<String>) -> Result<(), RecorderError> {
        if self.released {
            return Err(RecorderError::Hardware("encoder released".to_string()));
        }
        match CONFIGURE_ORDER.get(self.next_step) {
            Some(expected) if *expected == call => {}
            expected => {
                return Err(RecorderError::Configuration(format!(
                    "{} called out of order, expected {:?}",
                    call, expected
                )))
            }
        }
        self.next_step += 1;
        match detail {
            Some(detail) => self.journal.push(format!("encoder {} {}", call, detail)),
            None => self.journal.push(format!("encoder {}", call)),
        }
        Ok(())
    }

    fn is_prepared(&self) -> bool {
        self.next_step == CONFIGURE_ORDER.len()
    }
}

impl MediaEncoder for SimulatedEncoder {
    fn set_audio_source(&mut self, _source: AudioSource) -> Result<(), RecorderError> {
        self.step("set_audio_source", None)
    }

    fn set_video_source(&mut self, _source: VideoSource) -> Result<(), RecorderError> {
        self.step("set_video_source", None)
    }

    fn set_output_format(&mut self, _format: OutputFormat) -> Result<(), RecorderError> {
        self.step("set_output_format", None)
    }

    fn set_output_file(&mut self, path: &Path) -> Result<(), RecorderError> {
        self.step("set_output_file", None)?;
        self.output_path = Some(path.to_path_buf());
        Ok(())
    }

    fn set_video_encoding_bit_rate(&mut self, bits_per_second: u32) -> Result<(), RecorderError> {
        self.step("set_video_encoding_bit_rate", Some(bits_per_second.to_string()))
    }

    fn set_video_frame_rate(&mut self, fps: u32) -> Result<(), RecorderError> {
        self.step("set_video_frame_rate", Some(fps.to_string()))
    }

    fn set_video_size(&mut self, size: Size) -> Result<(), RecorderError> {
        self.step("set_video_size", Some(size.to_string()))?;
        self.video_size = Some(size);
        Ok(())
    }

    fn set_video_encoder(&mut self, _codec: VideoCodec) -> Result<(), RecorderError> {
        self.step("set_video_encoder", None)
    }

    fn set_audio_encoder(&mut self, _codec: AudioCodec) -> Result<(), RecorderError> {
        self.step("set_audio_encoder", None)
    }

    fn set_orientation_hint(&mut self, degrees: u16) -> Result<(), RecorderError> {
        self.step("set_orientation_hint", Some(degrees.to_string()))
    }

    fn prepare(&mut self) -> Result<(), RecorderError> {
        if self.fail_prepare {
            self.journal.push("encoder prepare failed");
            return Err(RecorderError::Configuration("prepare failed".to_string()));
        }
        self.step("prepare", None)
    }

    fn surface(&self) -> Result<Surface, RecorderError> {
        match (self.is_prepared(), self.video_size) {
            (true, Some(size)) => Ok(Surface::encoder(size)),
            _ => Err(RecorderError::Configuration(
                "encoder surface requested before prepare".to_string(),
            )),
        }
    }

    fn start(&mut self) -> Result<(), RecorderError> {
        if !self.is_prepared() || self.started_at.is_some() {
            return Err(RecorderError::Hardware("encoder not ready to start".to_string()));
        }
        self.started_at = Some(Instant::now());
        self.journal.push("encoder start");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RecorderError> {
        let started_at = self
            .started_at
            .take()
            .ok_or_else(|| RecorderError::Hardware("encoder stopped before start".to_string()))?;
        self.journal.push("encoder stop");

        if self.write_output {
            let path = self
                .output_path
                .clone()
                .ok_or_else(|| RecorderError::Configuration("no output file".to_string()))?;
            let media = started_at.elapsed().mul_f64(self.media_time_scale);
            write_mp4_stub(&path, media.as_millis() as u64)?;
            log::debug!("Simulated encoder wrote {:?} ({} ms)", path, media.as_millis());
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.journal.push("encoder reset");
        self.next_step = 0;
        self.output_path = None;
        self.video_size = None;
        self.started_at = None;
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.journal.push("encoder release");
        }
    }
}

/// Preview view with a fixed viewport
#[derive(Debug)]
pub struct SimulatedPreview {
    viewport: Size,
    available: AtomicBool,
    aspect_ratio: Mutex<Option<(u32, u32)>>,
}

impl SimulatedPreview {
    pub fn new(viewport: Size) -> Self {
        Self {
            viewport,
            available: AtomicBool::new(true),
            aspect_ratio: Mutex::new(None),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Last aspect ratio handed to the view, as `(width, height)`
    pub fn aspect_ratio(&self) -> Option<(u32, u32)> {
        *self.aspect_ratio.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PreviewTarget for SimulatedPreview {
    fn viewport(&self) -> Size {
        self.viewport
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn set_aspect_ratio(&self, width: u32, height: u32) {
        *self.aspect_ratio.lock().unwrap_or_else(PoisonError::into_inner) = Some((width, height));
    }
}
