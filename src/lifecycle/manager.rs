use crate::capture::{CaptureController, CaptureSettings, ControllerEvent};
use crate::catalog::Catalog;
use crate::config::ClipcamConfig;
use crate::errors::RecorderError;
use crate::lifecycle::state::{LifecycleNotice, LifecycleState, Outcome, RecordingRequest};
use crate::permissions::{ensure_granted, PermissionProvider};
use crate::platform::CaptureBackend;
use crate::timing::Countdown;
use crate::types::SessionPurpose;
use crossbeam_channel::{after, never, select, tick, unbounded, Receiver, Sender};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Requests an external stop of a running attempt. Cloneable and usable from
/// any thread, including a Ctrl-C handler.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Sender<()>,
}

impl StopHandle {
    pub fn stop(&self) {
        let _ = self.tx.send(());
    }
}

/// What woke the driving loop
enum Wake {
    Event(Option<ControllerEvent>),
    Stop,
    Armed,
    Tick,
}

/// Next step after handling one wake-up
enum Step {
    Continue,
    Finish(Outcome),
}

/// Sequences one recording attempt from permission check to catalog update.
///
/// `run` blocks the calling thread, which acts as the UI-owning thread: it
/// owns the catalog borrow, reacts to controller events and drives timers.
pub struct RecordingLifecycle<'a> {
    catalog: &'a mut Catalog,
    backend: CaptureBackend,
    config: ClipcamConfig,
    notices: Option<Sender<LifecycleNotice>>,
    // held so the stop channel never disconnects
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
    state: LifecycleState,
    history: Vec<LifecycleState>,
}

impl<'a> RecordingLifecycle<'a> {
    pub fn new(catalog: &'a mut Catalog, backend: CaptureBackend, config: ClipcamConfig) -> Self {
        let (stop_tx, stop_rx) = unbounded();
        Self {
            catalog,
            backend,
            config,
            notices: None,
            stop_tx,
            stop_rx,
            state: LifecycleState::Idle,
            history: Vec::new(),
        }
    }

    /// Send progress and state notices to `notices`
    pub fn with_notices(mut self, notices: Sender<LifecycleNotice>) -> Self {
        self.notices = Some(notices);
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: self.stop_tx.clone(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Every state entered so far, in order, excluding the initial `Idle`
    pub fn history(&self) -> &[LifecycleState] {
        &self.history
    }

    /// Run one attempt to completion
    pub fn run(&mut self, permissions: &dyn PermissionProvider, request: RecordingRequest) -> Outcome {
        if self.state != LifecycleState::Idle {
            return Outcome::Failed(RecorderError::Hardware(format!(
                "lifecycle already used (state {})",
                self.state
            )));
        }

        let (output_path, duration_secs) = match self.prepare(permissions, &request) {
            Ok(prepared) => prepared,
            Err(e) => return self.fail(e),
        };

        self.transition(LifecycleState::AwaitingDeviceReady);
        let (events_tx, events_rx) = unbounded();
        let settings = CaptureSettings {
            camera_id: self.config.camera.camera_id.clone(),
            output_path: output_path.clone(),
            orientation_hint: request.rotation.orientation_hint(),
            bitrate: self.config.encoder.bitrate,
            frame_rate: self.config.encoder.frame_rate,
            open_timeout: self.config.open_timeout(),
        };
        let controller = match CaptureController::new(self.backend.clone(), settings, events_tx) {
            Ok(controller) => controller,
            Err(e) => return self.fail(e),
        };

        controller.open();
        let outcome = self.drive(&controller, events_rx, &output_path, duration_secs);
        controller.shutdown();

        log::info!("Recording attempt ended in state {}", self.state);
        outcome
    }

    /// Validate the request and pick the output path. Returns the path and the
    /// clamped duration.
    fn prepare(
        &mut self,
        permissions: &dyn PermissionProvider,
        request: &RecordingRequest,
    ) -> Result<(PathBuf, u32), RecorderError> {
        ensure_granted(permissions)?;

        let name = match request.name.trim() {
            "" => self.config.storage.default_name.clone(),
            trimmed => trimmed.to_string(),
        };
        let duration_secs = self.config.clamp_duration(request.duration_secs);
        if duration_secs != request.duration_secs {
            log::info!(
                "Requested duration {}s clamped to {}s",
                request.duration_secs,
                duration_secs
            );
        }

        std::fs::create_dir_all(self.catalog.directory())?;
        let output_path = self.catalog.reserve_path(&name)?;
        log::info!(
            "Recording {:?} for {}s into {:?}",
            name,
            duration_secs,
            output_path
        );
        Ok((output_path, duration_secs))
    }

    fn drive(
        &mut self,
        controller: &CaptureController,
        events: Receiver<ControllerEvent>,
        output_path: &Path,
        duration_secs: u32,
    ) -> Outcome {
        let stop_rx = self.stop_rx.clone();
        let mut arm_timer: Receiver<Instant> = never();
        let mut ticker: Receiver<Instant> = never();
        let mut countdown = Countdown::new(duration_secs);

        loop {
            let wake = select! {
                recv(events) -> event => Wake::Event(event.ok()),
                recv(stop_rx) -> _ => Wake::Stop,
                recv(arm_timer) -> _ => Wake::Armed,
                recv(ticker) -> _ => Wake::Tick,
            };

            let step = match wake {
                Wake::Event(Some(event)) => self.on_controller_event(
                    controller,
                    event,
                    &mut arm_timer,
                    &mut ticker,
                    &countdown,
                ),
                Wake::Event(None) => Step::Finish(self.fail(RecorderError::Hardware(
                    "controller event channel closed".to_string(),
                ))),
                Wake::Stop => {
                    log::info!("Stop requested in state {}", self.state);
                    if self.state.is_before_recording() {
                        Step::Finish(self.discard())
                    } else {
                        Step::Finish(self.finalize(controller, output_path))
                    }
                }
                Wake::Armed => {
                    arm_timer = never();
                    log::debug!("Arm delay elapsed, requesting recording session");
                    controller.start_recording();
                    Step::Continue
                }
                Wake::Tick => {
                    let finished = countdown.tick();
                    self.notify(LifecycleNotice::Progress {
                        remaining_secs: countdown.remaining_secs(),
                        label: countdown.label(),
                    });
                    if finished {
                        Step::Finish(self.finalize(controller, output_path))
                    } else {
                        Step::Continue
                    }
                }
            };

            // dropping the timers with the loop cancels them
            if let Step::Finish(outcome) = step {
                return outcome;
            }
        }
    }

    fn on_controller_event(
        &mut self,
        controller: &CaptureController,
        event: ControllerEvent,
        arm_timer: &mut Receiver<Instant>,
        ticker: &mut Receiver<Instant>,
        countdown: &Countdown,
    ) -> Step {
        log::debug!("Controller event {:?} in state {}", event, self.state);
        match (self.state, event) {
            (_, ControllerEvent::Failed(e)) => Step::Finish(self.fail(e)),
            (LifecycleState::AwaitingDeviceReady, ControllerEvent::Ready) => {
                self.transition(LifecycleState::PreviewStarting);
                controller.start_preview();
                Step::Continue
            }
            (
                LifecycleState::PreviewStarting,
                ControllerEvent::SessionConfigured(SessionPurpose::Preview),
            ) => {
                self.transition(LifecycleState::PreviewActive);
                self.transition(LifecycleState::ArmingRecorder);
                *arm_timer = after(self.config.arm_delay());
                Step::Continue
            }
            (
                LifecycleState::ArmingRecorder,
                ControllerEvent::SessionConfigured(SessionPurpose::Recording),
            ) => {
                if let Err(e) = controller.start_encoding() {
                    return Step::Finish(self.fail(e));
                }
                self.transition(LifecycleState::Recording);
                self.notify(LifecycleNotice::Progress {
                    remaining_secs: countdown.remaining_secs(),
                    label: countdown.label(),
                });
                *ticker = tick(self.config.tick_interval());
                Step::Continue
            }
            (state, event) => {
                log::debug!("Ignoring {:?} in state {}", event, state);
                Step::Continue
            }
        }
    }

    /// Stop the encoder and keep the file if there is one
    fn finalize(&mut self, controller: &CaptureController, output_path: &Path) -> Outcome {
        self.transition(LifecycleState::Finalizing);
        controller.stop_encoding();

        let result = if !controller.has_started_recording() {
            Err(RecorderError::EncoderNeverStarted)
        } else if !output_path.is_file() {
            Err(RecorderError::FileNotFound(output_path.to_path_buf()))
        } else {
            self.catalog.inspect(output_path)
        };

        let outcome = match result {
            Ok(recording) => {
                log::info!("Saved {:?}", recording.path);
                self.catalog.append(recording.clone());
                self.notify(LifecycleNotice::Saved(recording.clone()));
                Outcome::Saved(recording)
            }
            Err(e) => {
                log::error!("Failed to save recording: {}", e);
                self.notify(LifecycleNotice::SaveFailed(e.clone()));
                Outcome::SaveFailed(e)
            }
        };
        self.transition(LifecycleState::Done);
        outcome
    }

    fn discard(&mut self) -> Outcome {
        self.transition(LifecycleState::Finalizing);
        log::info!("Nothing recorded, discarding attempt");
        self.notify(LifecycleNotice::Discarded);
        self.transition(LifecycleState::Done);
        Outcome::Discarded
    }

    fn fail(&mut self, error: RecorderError) -> Outcome {
        log::error!("Recording failed in state {}: {}", self.state, error);
        self.transition(LifecycleState::Failed);
        self.notify(LifecycleNotice::Failed(error.clone()));
        Outcome::Failed(error)
    }

    fn transition(&mut self, next: LifecycleState) {
        log::info!("Lifecycle {} -> {}", self.state, next);
        self.state = next;
        self.history.push(next);
        self.notify(LifecycleNotice::State(next));
    }

    fn notify(&self, notice: LifecycleNotice) {
        if let Some(notices) = &self.notices {
            let _ = notices.send(notice);
        }
    }
}
