use crate::capture::gate::Gate;
use crate::errors::RecorderError;
use crate::platform::{
    AudioCodec, AudioSource, BackgroundThread, CaptureBackend, CaptureRequest, CaptureSession,
    CameraDevice, ControlMode, DeviceListener, DeviceState, Handler, MediaEncoder, OutputFormat,
    OutputUseCase, RequestTemplate, SessionListener, SessionState, Surface, VideoCodec,
    VideoSource,
};
use crate::resolution::{select_resolutions, ResolutionPair};
use crate::types::{SessionPurpose, Size};
use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerPhase {
    Closed,
    Opening,
    Open,
    SessionConfiguring,
    SessionActive,
}

/// Notifications for the UI-owning thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// The device is open and sessions may be created
    Ready,
    /// A session is configured and its repeating request is running
    SessionConfigured(SessionPurpose),
    /// The attempt cannot continue
    Failed(RecorderError),
}

/// Per-attempt controller settings
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    /// Camera to open; the first enumerated one when unset
    pub camera_id: Option<String>,
    pub output_path: PathBuf,
    pub orientation_hint: u16,
    pub bitrate: u32,
    pub frame_rate: u32,
    /// Gate acquisition timeout
    pub open_timeout: Duration,
}

impl CaptureSettings {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            camera_id: None,
            output_path: output_path.into(),
            orientation_hint: 90,
            bitrate: 10_000_000,
            frame_rate: 30,
            open_timeout: Duration::from_millis(2500),
        }
    }
}

/// Values applied to the encoder before a recording session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderSettings {
    pub output_path: PathBuf,
    pub bitrate: u32,
    pub frame_rate: u32,
    pub video_size: Size,
    pub orientation_hint: u16,
}

/// Apply `settings` to `encoder` in the order the pipeline requires, then
/// prepare it.
pub fn configure_encoder(
    encoder: &mut dyn MediaEncoder,
    settings: &EncoderSettings,
) -> Result<(), RecorderError> {
    apply_encoder_settings(encoder, settings).map_err(|e| match e {
        RecorderError::Configuration(_) => e,
        other => RecorderError::Configuration(format!("encoder setup: {}", other)),
    })
}

fn apply_encoder_settings(
    encoder: &mut dyn MediaEncoder,
    settings: &EncoderSettings,
) -> Result<(), RecorderError> {
    encoder.set_audio_source(AudioSource::Microphone)?;
    encoder.set_video_source(VideoSource::Surface)?;
    encoder.set_output_format(OutputFormat::Mpeg4)?;
    encoder.set_output_file(&settings.output_path)?;
    encoder.set_video_encoding_bit_rate(settings.bitrate)?;
    encoder.set_video_frame_rate(settings.frame_rate)?;
    encoder.set_video_size(settings.video_size)?;
    encoder.set_video_encoder(VideoCodec::H264)?;
    encoder.set_audio_encoder(AudioCodec::Aac)?;
    encoder.set_orientation_hint(settings.orientation_hint)?;
    encoder.prepare()
}

struct Inner {
    phase: ControllerPhase,
    device: Option<Box<dyn CameraDevice>>,
    session: Option<Box<dyn CaptureSession>>,
    encoder: Option<Box<dyn MediaEncoder>>,
    resolutions: Option<ResolutionPair>,
    request: Option<CaptureRequest>,
    session_generation: u64,
    is_recording: bool,
    has_started_recording: bool,
    shut_down: bool,
}

impl Inner {
    fn close_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.stop_repeating() {
                log::warn!("stop_repeating failed: {}", e);
            }
            if let Err(e) = session.abort_captures() {
                log::warn!("abort_captures failed: {}", e);
            }
            session.close();
            if self.device.is_some() {
                self.phase = ControllerPhase::Open;
            }
        }
    }

    fn close_device(&mut self) {
        self.close_session();
        if let Some(mut device) = self.device.take() {
            device.close();
        }
        self.phase = ControllerPhase::Closed;
    }

    fn stop_encoding(&mut self) {
        if !self.is_recording {
            return;
        }
        if let Some(encoder) = self.encoder.as_mut() {
            if let Err(e) = encoder.stop() {
                log::warn!("Stopping encoder failed: {}", e);
            }
            encoder.reset();
        }
        self.is_recording = false;
        log::info!("Recording stopped");
    }

    /// Start the repeating request with automatic 3A on the current session
    fn update_preview(&mut self) -> Result<(), RecorderError> {
        if self.device.is_none() {
            return Ok(());
        }
        let mut request = self
            .request
            .clone()
            .ok_or_else(|| RecorderError::Hardware("no capture request built".to_string()))?;
        request.control_mode = ControlMode::Auto;
        match self.session.as_mut() {
            Some(session) => session.set_repeating_request(request),
            None => Err(RecorderError::Hardware("no active session".to_string())),
        }
    }
}

struct Shared {
    inner: Mutex<Inner>,
    gate: Gate,
    events: Sender<ControllerEvent>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ControllerEvent) {
        // the receiving side may already be gone during teardown
        let _ = self.events.send(event);
    }

    fn fail(&self, error: RecorderError) {
        log::error!("Capture failed: {}", error);
        self.emit(ControllerEvent::Failed(error));
    }

    fn on_device_state(&self, state: DeviceState) {
        log::debug!("Device state: {:?}", state);
        match state {
            DeviceState::Opened(mut device) => {
                let mut inner = self.lock();
                if inner.shut_down {
                    log::debug!("Device {} opened after shutdown, closing", device.id());
                    device.close();
                    drop(inner);
                    self.gate.release();
                    return;
                }
                inner.device = Some(device);
                inner.phase = ControllerPhase::Open;
                drop(inner);
                self.gate.release();
                self.emit(ControllerEvent::Ready);
            }
            DeviceState::Disconnected => {
                self.gate.release();
                self.lock().close_device();
                // No failure event on disconnect; only device errors fail the attempt.
                log::warn!("Camera device disconnected");
            }
            DeviceState::Error(code) => {
                self.gate.release();
                self.lock().close_device();
                self.fail(RecorderError::DeviceError(code));
            }
        }
    }

    fn on_session_state(&self, generation: u64, purpose: SessionPurpose, state: SessionState) {
        let mut inner = self.lock();
        let stale =
            inner.shut_down || generation != inner.session_generation || inner.device.is_none();

        match state {
            SessionState::Configured(mut session) => {
                if stale {
                    log::debug!("Discarding stale {:?} session", purpose);
                    drop(inner);
                    session.close();
                    return;
                }
                inner.session = Some(session);
                match inner.update_preview() {
                    Ok(()) => {
                        inner.phase = ControllerPhase::SessionActive;
                        drop(inner);
                        log::debug!("{:?} session configured", purpose);
                        self.emit(ControllerEvent::SessionConfigured(purpose));
                    }
                    Err(e) => {
                        drop(inner);
                        self.fail(e);
                    }
                }
            }
            SessionState::ConfigureFailed => {
                if stale {
                    log::debug!("Ignoring configure failure of stale {:?} session", purpose);
                    return;
                }
                inner.phase = ControllerPhase::Open;
                drop(inner);
                self.fail(RecorderError::Configuration(format!(
                    "{:?} session failed to configure",
                    purpose
                )));
            }
        }
    }
}

/// Drives one camera device through open, preview, recording and teardown.
///
/// Hardware callbacks run on the controller's own background thread. Every
/// method is meant to be called from the single UI-owning thread.
pub struct CaptureController {
    shared: Arc<Shared>,
    backend: CaptureBackend,
    settings: CaptureSettings,
    handler: Handler,
    background: Mutex<Option<BackgroundThread>>,
}

impl CaptureController {
    pub fn new(
        backend: CaptureBackend,
        settings: CaptureSettings,
        events: Sender<ControllerEvent>,
    ) -> Result<Self, RecorderError> {
        let background = BackgroundThread::start("clipcam-camera-background")?;
        let handler = background.handler();

        Ok(Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    phase: ControllerPhase::Closed,
                    device: None,
                    session: None,
                    encoder: None,
                    resolutions: None,
                    request: None,
                    session_generation: 0,
                    is_recording: false,
                    has_started_recording: false,
                    shut_down: false,
                }),
                gate: Gate::new(),
                events,
            }),
            backend,
            settings,
            handler,
            background: Mutex::new(Some(background)),
        })
    }

    /// Request the camera. `Ready` or `Failed` follows on the event channel.
    pub fn open(&self) {
        if let Err(e) = self.try_open() {
            self.shared.fail(e);
        }
    }

    fn try_open(&self) -> Result<(), RecorderError> {
        if self.shared.lock().shut_down {
            return Err(RecorderError::Hardware("controller is shut down".to_string()));
        }
        if !self.shared.gate.try_acquire(self.settings.open_timeout) {
            return Err(RecorderError::DeviceBusy(self.settings.open_timeout));
        }

        let result = self.request_open();
        if result.is_err() {
            let mut inner = self.shared.lock();
            if inner.phase == ControllerPhase::Opening {
                inner.phase = ControllerPhase::Closed;
            }
            drop(inner);
            self.shared.gate.release();
        }
        result
    }

    fn request_open(&self) -> Result<(), RecorderError> {
        let camera = &self.backend.camera;
        let camera_id = match &self.settings.camera_id {
            Some(id) => id.clone(),
            None => camera
                .camera_ids()?
                .into_iter()
                .next()
                .ok_or_else(|| RecorderError::Hardware("no cameras available".to_string()))?,
        };

        let recorder_sizes = camera.output_sizes(&camera_id, OutputUseCase::MediaRecorder)?;
        let preview_sizes = camera.output_sizes(&camera_id, OutputUseCase::Preview)?;
        let pair = select_resolutions(&recorder_sizes, &preview_sizes, self.backend.preview.viewport())?;
        // portrait view: height first
        self.backend
            .preview
            .set_aspect_ratio(pair.preview.height, pair.preview.width);

        let encoder = self.backend.encoders.create_encoder()?;
        {
            let mut inner = self.shared.lock();
            inner.resolutions = Some(pair);
            inner.encoder = Some(encoder);
            inner.phase = ControllerPhase::Opening;
        }

        log::info!(
            "Opening camera {} (video {}, preview {})",
            camera_id,
            pair.video,
            pair.preview
        );
        let weak = Arc::downgrade(&self.shared);
        let listener = DeviceListener::new(
            self.handler.clone(),
            Arc::new(move |state| {
                if let Some(shared) = weak.upgrade() {
                    shared.on_device_state(state);
                }
            }),
        );
        camera.open(&camera_id, listener)
    }

    /// Bind a preview-only session
    pub fn start_preview(&self) {
        if let Err(e) = self.try_start_preview() {
            self.shared.fail(e);
        }
    }

    fn try_start_preview(&self) -> Result<(), RecorderError> {
        let mut inner = self.shared.lock();
        let pair = self.ready_for_session(&inner)?;

        inner.close_session();
        let surface = self.backend.preview.surface(pair.preview);
        inner.request = Some(CaptureRequest {
            template: RequestTemplate::Preview,
            targets: vec![surface.clone()],
            control_mode: ControlMode::Off,
        });
        self.create_session(&mut inner, vec![surface], SessionPurpose::Preview)
    }

    /// Configure the encoder and bind a preview + encoder session. Encoding
    /// itself begins with [`start_encoding`](Self::start_encoding) once the
    /// session reports configured.
    pub fn start_recording(&self) {
        if let Err(e) = self.try_start_recording() {
            self.shared.fail(e);
        }
    }

    fn try_start_recording(&self) -> Result<(), RecorderError> {
        let mut inner = self.shared.lock();
        let pair = self.ready_for_session(&inner)?;

        inner.close_session();
        let encoder_settings = EncoderSettings {
            output_path: self.settings.output_path.clone(),
            bitrate: self.settings.bitrate,
            frame_rate: self.settings.frame_rate,
            video_size: pair.video,
            orientation_hint: self.settings.orientation_hint,
        };
        let encoder = inner
            .encoder
            .as_mut()
            .ok_or_else(|| RecorderError::Configuration("encoder not created".to_string()))?;
        configure_encoder(&mut **encoder, &encoder_settings)?;
        let encoder_surface = encoder.surface()?;

        let outputs = vec![self.backend.preview.surface(pair.preview), encoder_surface];
        inner.request = Some(CaptureRequest {
            template: RequestTemplate::Record,
            targets: outputs.clone(),
            control_mode: ControlMode::Off,
        });
        self.create_session(&mut inner, outputs, SessionPurpose::Recording)
    }

    fn ready_for_session(&self, inner: &Inner) -> Result<ResolutionPair, RecorderError> {
        if inner.shut_down {
            return Err(RecorderError::Hardware("controller is shut down".to_string()));
        }
        if inner.device.is_none() {
            return Err(RecorderError::Hardware("camera device is not open".to_string()));
        }
        if !self.backend.preview.is_available() {
            return Err(RecorderError::Hardware("preview surface unavailable".to_string()));
        }
        inner
            .resolutions
            .ok_or_else(|| RecorderError::Hardware("resolutions not negotiated".to_string()))
    }

    fn create_session(
        &self,
        inner: &mut Inner,
        outputs: Vec<Surface>,
        purpose: SessionPurpose,
    ) -> Result<(), RecorderError> {
        inner.session_generation += 1;
        let generation = inner.session_generation;

        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let listener = SessionListener::new(
            self.handler.clone(),
            Box::new(move |state| {
                if let Some(shared) = weak.upgrade() {
                    shared.on_session_state(generation, purpose, state);
                }
            }),
        );

        let device = inner
            .device
            .as_mut()
            .ok_or_else(|| RecorderError::Hardware("camera device is not open".to_string()))?;
        log::debug!("Creating {:?} session with {} outputs", purpose, outputs.len());
        device.create_capture_session(outputs, listener)?;
        inner.phase = ControllerPhase::SessionConfiguring;
        Ok(())
    }

    /// Start the encoder. Runs at most once per controller; later calls are
    /// no-ops.
    pub fn start_encoding(&self) -> Result<(), RecorderError> {
        let mut inner = self.shared.lock();
        if inner.shut_down {
            return Err(RecorderError::Hardware("controller is shut down".to_string()));
        }
        if inner.has_started_recording {
            log::debug!("Encoder already started");
            return Ok(());
        }
        let encoder = inner
            .encoder
            .as_mut()
            .ok_or_else(|| RecorderError::Configuration("encoder not created".to_string()))?;
        encoder.start()?;
        inner.is_recording = true;
        inner.has_started_recording = true;
        log::info!("Recording started -> {:?}", self.settings.output_path);
        Ok(())
    }

    /// Stop and reset the encoder if it is running. Errors are logged only.
    pub fn stop_encoding(&self) {
        self.shared.lock().stop_encoding();
    }

    /// Stop the repeating request, abort captures and drop the session.
    /// No-op without an active session.
    pub fn close_session(&self) {
        self.shared.lock().close_session();
    }

    /// Release everything and stop the background thread. Safe to call more
    /// than once and before setup completed.
    pub fn shutdown(&self) {
        let mut background = self
            .background
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(mut thread) = background.take() else {
            return;
        };

        self.shared.lock().stop_encoding();

        if !self.shared.gate.try_acquire(self.settings.open_timeout) {
            log::warn!(
                "{}",
                RecorderError::Teardown(format!(
                    "gate not acquired within {:?}, continuing",
                    self.settings.open_timeout
                ))
            );
        }
        {
            let mut inner = self.shared.lock();
            inner.shut_down = true;
            inner.close_device();
            if let Some(mut encoder) = inner.encoder.take() {
                encoder.release();
            }
        }
        self.shared.gate.release();

        thread.quit_safely();
        log::info!("Capture controller shut down");
    }

    pub fn phase(&self) -> ControllerPhase {
        self.shared.lock().phase
    }

    pub fn is_recording(&self) -> bool {
        self.shared.lock().is_recording
    }

    pub fn has_started_recording(&self) -> bool {
        self.shared.lock().has_started_recording
    }

    pub fn resolutions(&self) -> Option<ResolutionPair> {
        self.shared.lock().resolutions
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{OpenBehavior, SimulatedCamera, SimulatedConfig};
    use crossbeam_channel::{unbounded, Receiver};
    use std::path::Path;

    const WAIT: Duration = Duration::from_secs(2);

    fn controller_for(
        camera: &Arc<SimulatedCamera>,
        output: &Path,
    ) -> (CaptureController, Receiver<ControllerEvent>) {
        let (tx, rx) = unbounded();
        let controller = CaptureController::new(
            camera.backend(Size::new(640, 480)),
            CaptureSettings::new(output),
            tx,
        )
        .unwrap();
        (controller, rx)
    }

    #[test]
    fn test_open_then_preview() {
        let dir = tempfile::tempdir().unwrap();
        let camera = SimulatedCamera::new(SimulatedConfig::default());
        let (controller, events) = controller_for(&camera, &dir.path().join("a.mp4"));

        controller.open();
        assert_eq!(events.recv_timeout(WAIT).unwrap(), ControllerEvent::Ready);
        assert_eq!(controller.phase(), ControllerPhase::Open);

        controller.start_preview();
        assert_eq!(
            events.recv_timeout(WAIT).unwrap(),
            ControllerEvent::SessionConfigured(SessionPurpose::Preview)
        );
        assert_eq!(controller.phase(), ControllerPhase::SessionActive);
        assert!(camera.journal().contains("repeating Preview Auto"));

        controller.shutdown();
        assert_eq!(controller.phase(), ControllerPhase::Closed);
        assert_eq!(camera.open_devices(), 0);
    }

    #[test]
    fn test_callbacks_run_on_background_thread() {
        let dir = tempfile::tempdir().unwrap();
        let camera = SimulatedCamera::new(SimulatedConfig::default());
        let (controller, events) = controller_for(&camera, &dir.path().join("a.mp4"));

        controller.open();
        events.recv_timeout(WAIT).unwrap();
        controller.start_preview();
        events.recv_timeout(WAIT).unwrap();
        // the repeating request is issued from the session callback
        assert_eq!(
            camera.repeating_request_thread().as_deref(),
            Some("clipcam-camera-background")
        );
    }

    #[test]
    fn test_device_error_fails_and_releases_gate() {
        let dir = tempfile::tempdir().unwrap();
        let camera = SimulatedCamera::new(SimulatedConfig {
            open_behavior: OpenBehavior::Error(3),
            ..SimulatedConfig::default()
        });
        let (controller, events) = controller_for(&camera, &dir.path().join("a.mp4"));

        controller.open();
        assert_eq!(
            events.recv_timeout(WAIT).unwrap(),
            ControllerEvent::Failed(RecorderError::DeviceError(3))
        );
        assert!(controller.shared.gate.is_available());
    }

    #[test]
    fn test_disconnect_releases_gate_without_failure() {
        let dir = tempfile::tempdir().unwrap();
        let camera = SimulatedCamera::new(SimulatedConfig {
            open_behavior: OpenBehavior::Disconnect,
            ..SimulatedConfig::default()
        });
        let (controller, events) = controller_for(&camera, &dir.path().join("a.mp4"));

        controller.open();
        // Disconnect during open is silent: no Ready, no Failed
        assert!(events.recv_timeout(Duration::from_millis(200)).is_err());
        assert!(controller.shared.gate.is_available());
        assert_eq!(controller.phase(), ControllerPhase::Closed);
    }

    #[test]
    fn test_gate_timeout_is_device_busy() {
        let dir = tempfile::tempdir().unwrap();
        let camera = SimulatedCamera::new(SimulatedConfig {
            open_behavior: OpenBehavior::Hang,
            ..SimulatedConfig::default()
        });
        let (tx, events) = unbounded();
        let mut settings = CaptureSettings::new(dir.path().join("a.mp4"));
        settings.open_timeout = Duration::from_millis(50);
        let controller =
            CaptureController::new(camera.backend(Size::new(640, 480)), settings, tx).unwrap();

        // First open holds the gate forever because the device never answers
        controller.open();
        controller.open();
        assert_eq!(
            events.recv_timeout(WAIT).unwrap(),
            ControllerEvent::Failed(RecorderError::DeviceBusy(Duration::from_millis(50)))
        );
    }

    #[test]
    fn test_recording_session_and_encoder_order() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("clip.mp4");
        let camera = SimulatedCamera::new(SimulatedConfig::default());
        let (controller, events) = controller_for(&camera, &output);

        controller.open();
        events.recv_timeout(WAIT).unwrap();
        controller.start_preview();
        events.recv_timeout(WAIT).unwrap();
        controller.start_recording();
        assert_eq!(
            events.recv_timeout(WAIT).unwrap(),
            ControllerEvent::SessionConfigured(SessionPurpose::Recording)
        );

        controller.start_encoding().unwrap();
        controller.start_encoding().unwrap();
        assert!(controller.is_recording());
        controller.stop_encoding();
        assert!(!controller.is_recording());
        assert!(controller.has_started_recording());
        assert!(output.exists());

        let encoder_calls: Vec<String> = camera
            .journal()
            .entries()
            .into_iter()
            .filter(|e| e.starts_with("encoder "))
            .collect();
        assert_eq!(
            encoder_calls,
            vec![
                "encoder set_audio_source",
                "encoder set_video_source",
                "encoder set_output_format",
                "encoder set_output_file",
                "encoder set_video_encoding_bit_rate 10000000",
                "encoder set_video_frame_rate 30",
                "encoder set_video_size 640x480",
                "encoder set_video_encoder",
                "encoder set_audio_encoder",
                "encoder set_orientation_hint 90",
                "encoder prepare",
                "encoder start",
                "encoder stop",
                "encoder reset",
            ]
        );
        // preview session was closed before the recording session was created
        assert!(camera.journal().contains("session closed"));
        assert!(camera.journal().contains("session preview+encoder"));
    }

    #[test]
    fn test_configure_failure_reports_failed() {
        let dir = tempfile::tempdir().unwrap();
        let camera = SimulatedCamera::new(SimulatedConfig {
            fail_preview_session: true,
            ..SimulatedConfig::default()
        });
        let (controller, events) = controller_for(&camera, &dir.path().join("a.mp4"));

        controller.open();
        events.recv_timeout(WAIT).unwrap();
        controller.start_preview();
        assert!(matches!(
            events.recv_timeout(WAIT).unwrap(),
            ControllerEvent::Failed(RecorderError::Configuration(_))
        ));
        assert_eq!(controller.phase(), ControllerPhase::Open);
    }

    #[test]
    fn test_close_session_without_session_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let camera = SimulatedCamera::new(SimulatedConfig::default());
        let (controller, _events) = controller_for(&camera, &dir.path().join("a.mp4"));

        controller.close_session();
        assert_eq!(controller.phase(), ControllerPhase::Closed);
        assert!(!camera.journal().contains("session closed"));
    }

    #[test]
    fn test_shutdown_is_idempotent_before_open() {
        let dir = tempfile::tempdir().unwrap();
        let camera = SimulatedCamera::new(SimulatedConfig::default());
        let (controller, _events) = controller_for(&camera, &dir.path().join("a.mp4"));

        controller.shutdown();
        controller.shutdown();
        controller.open();
        assert_eq!(controller.phase(), ControllerPhase::Closed);
    }

    #[test]
    fn test_shutdown_while_recording_stops_encoder() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("clip.mp4");
        let camera = SimulatedCamera::new(SimulatedConfig::default());
        let (controller, events) = controller_for(&camera, &output);

        controller.open();
        events.recv_timeout(WAIT).unwrap();
        controller.start_recording();
        events.recv_timeout(WAIT).unwrap();
        controller.start_encoding().unwrap();

        drop(controller);
        let journal = camera.journal();
        assert!(journal.contains("encoder stop"));
        assert!(journal.contains("encoder release"));
        assert_eq!(camera.open_devices(), 0);
        assert!(output.exists());
    }

    #[test]
    fn test_missing_sizes_fail_open() {
        let dir = tempfile::tempdir().unwrap();
        let camera = SimulatedCamera::new(SimulatedConfig {
            recorder_sizes: Vec::new(),
            ..SimulatedConfig::default()
        });
        let (controller, events) = controller_for(&camera, &dir.path().join("a.mp4"));

        controller.open();
        assert!(matches!(
            events.recv_timeout(WAIT).unwrap(),
            ControllerEvent::Failed(RecorderError::NoSupportedSizes(_))
        ));
        assert!(controller.shared.gate.is_available());
    }
}
