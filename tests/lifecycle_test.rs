//! End-to-end recording lifecycle tests on simulated hardware
//!
//! Run with: cargo test --test lifecycle_test

use clipcam::errors::RecorderError;
use clipcam::lifecycle::{
    LifecycleNotice, LifecycleState, Outcome, RecordingLifecycle, RecordingRequest,
};
use clipcam::permissions::{Permission, PermissionProvider, PermissionStatus, UniformPermissions};
use clipcam::testing::{OpenBehavior, SimulatedCamera, SimulatedConfig};
use clipcam::{Catalog, ClipcamConfig, Rotation, Size};
use crossbeam_channel::{unbounded, Receiver};
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;

use LifecycleState::*;

const GRANTED: UniformPermissions = UniformPermissions(PermissionStatus::Granted);
const VIEWPORT: Size = Size::new(640, 480);

/// Tick every 100 ms; the simulated encoder records 9 media seconds per
/// wall clock second, so one tick is roughly 0.9 s of video
fn config_for(dir: &Path) -> ClipcamConfig {
    let mut config = ClipcamConfig::default();
    config.storage.recordings_directory = dir.to_string_lossy().to_string();
    config.recording.arm_delay_ms = 50;
    config.recording.tick_interval_ms = 100;
    config
}

fn scaled_camera(config: SimulatedConfig) -> std::sync::Arc<SimulatedCamera> {
    SimulatedCamera::new(SimulatedConfig {
        media_time_scale: 9.0,
        ..config
    })
}

fn failures(notices: &Receiver<LifecycleNotice>) -> Vec<RecorderError> {
    notices
        .try_iter()
        .filter_map(|n| match n {
            LifecycleNotice::Failed(e) => Some(e),
            _ => None,
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════
// HAPPY PATH
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_five_second_recording_is_cataloged() {
    let dir = tempdir().unwrap();
    let camera = scaled_camera(SimulatedConfig::default());
    let mut catalog = Catalog::new(dir.path());
    let (tx, notices) = unbounded();

    let mut lifecycle =
        RecordingLifecycle::new(&mut catalog, camera.backend(VIEWPORT), config_for(dir.path()))
            .with_notices(tx);
    let outcome = lifecycle.run(&GRANTED, RecordingRequest::new("walk", 5));

    assert_eq!(
        lifecycle.history(),
        &[
            AwaitingDeviceReady,
            PreviewStarting,
            PreviewActive,
            ArmingRecorder,
            Recording,
            Finalizing,
            Done
        ]
    );
    let saved = outcome.recording().cloned().expect("recording should be saved");
    drop(lifecycle);

    assert_eq!(catalog.len(), 1);
    let recording = &catalog.recordings()[0];
    assert_eq!(recording, &saved);
    assert_eq!(recording.display_name, "walk");
    assert_eq!(recording.path, dir.path().join("walk.mp4"));
    assert!(
        (5..=6).contains(&recording.duration_secs),
        "duration {} outside [5, 6]",
        recording.duration_secs
    );

    let labels: Vec<String> = notices
        .try_iter()
        .filter_map(|n| match n {
            LifecycleNotice::Progress { label, .. } => Some(label),
            _ => None,
        })
        .collect();
    assert_eq!(labels.first().map(String::as_str), Some("0:05"));
    assert_eq!(labels.last().map(String::as_str), Some("0:00"));
    assert_eq!(camera.open_devices(), 0);
}

#[test]
fn test_second_recording_gets_suffixed_name() {
    let dir = tempdir().unwrap();
    let camera = scaled_camera(SimulatedConfig::default());
    let mut catalog = Catalog::new(dir.path());

    for _ in 0..2 {
        let outcome = RecordingLifecycle::new(
            &mut catalog,
            camera.backend(VIEWPORT),
            config_for(dir.path()),
        )
        .run(&GRANTED, RecordingRequest::new("dog", 1));
        assert!(matches!(outcome, Outcome::Saved(_)));
    }

    let names: Vec<&str> = catalog
        .recordings()
        .iter()
        .map(|r| r.display_name.as_str())
        .collect();
    assert_eq!(names, vec!["dog", "dog0"]);
}

#[test]
fn test_rotation_sets_orientation_hint() {
    let dir = tempdir().unwrap();
    let camera = scaled_camera(SimulatedConfig::default());
    let mut catalog = Catalog::new(dir.path());

    RecordingLifecycle::new(&mut catalog, camera.backend(VIEWPORT), config_for(dir.path())).run(
        &GRANTED,
        RecordingRequest::new("side", 1).with_rotation(Rotation::Deg90),
    );
    assert!(camera.journal().contains("encoder set_orientation_hint 0"));
}

#[test]
fn test_duration_is_clamped_to_configured_range() {
    let dir = tempdir().unwrap();
    let camera = scaled_camera(SimulatedConfig::default());
    let mut catalog = Catalog::new(dir.path());
    let mut config = config_for(dir.path());
    config.recording.min_duration_secs = 2;
    let (tx, notices) = unbounded();

    RecordingLifecycle::new(&mut catalog, camera.backend(VIEWPORT), config)
        .with_notices(tx)
        .run(&GRANTED, RecordingRequest::new("short", 0));

    let first_progress = notices.try_iter().find_map(|n| match n {
        LifecycleNotice::Progress { remaining_secs, .. } => Some(remaining_secs),
        _ => None,
    });
    assert_eq!(first_progress, Some(2));
}

// ═══════════════════════════════════════════════════════════════════════════
// EXTERNAL STOP
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_stop_during_preview_saves_nothing() {
    let dir = tempdir().unwrap();
    let camera = scaled_camera(SimulatedConfig::default());
    let mut catalog = Catalog::new(dir.path());
    let mut config = config_for(dir.path());
    // keep the recorder from arming before the stop arrives
    config.recording.arm_delay_ms = 5_000;
    let (tx, notices) = unbounded();

    let mut lifecycle = RecordingLifecycle::new(&mut catalog, camera.backend(VIEWPORT), config)
        .with_notices(tx);
    let stop = lifecycle.stop_handle();

    let watcher = std::thread::spawn(move || {
        for notice in notices.iter() {
            if notice == LifecycleNotice::State(PreviewActive) {
                stop.stop();
            }
            if notice == LifecycleNotice::Discarded {
                return true;
            }
        }
        false
    });

    let outcome = lifecycle.run(&GRANTED, RecordingRequest::new("never", 5));
    assert_eq!(outcome, Outcome::Discarded);

    let history = lifecycle.history().to_vec();
    drop(lifecycle);
    assert!(watcher.join().unwrap(), "expected a Discarded notice");

    assert!(history.contains(&PreviewActive));
    assert!(!history.contains(&Recording));
    assert_eq!(&history[history.len() - 2..], &[Finalizing, Done]);
    assert!(catalog.is_empty());
    assert!(!dir.path().join("never.mp4").exists());
    assert!(!camera.journal().contains("encoder start"));
}

#[test]
fn test_stop_while_recording_saves_partial_clip() {
    let dir = tempdir().unwrap();
    let camera = scaled_camera(SimulatedConfig::default());
    let mut catalog = Catalog::new(dir.path());
    let (tx, notices) = unbounded();

    let mut lifecycle =
        RecordingLifecycle::new(&mut catalog, camera.backend(VIEWPORT), config_for(dir.path()))
            .with_notices(tx);
    let stop = lifecycle.stop_handle();

    let watcher = std::thread::spawn(move || {
        for notice in notices.iter() {
            if notice == LifecycleNotice::State(Recording) {
                stop.stop();
            }
        }
    });

    let outcome = lifecycle.run(&GRANTED, RecordingRequest::new("cut", 60));
    drop(lifecycle);
    watcher.join().unwrap();

    let recording = outcome.recording().expect("partial clip should be saved");
    assert!(recording.duration_secs < 60);
    assert_eq!(catalog.len(), 1);
}

#[test]
fn test_stop_before_run_discards() {
    let dir = tempdir().unwrap();
    let camera = scaled_camera(SimulatedConfig::default());
    let mut catalog = Catalog::new(dir.path());

    let mut lifecycle =
        RecordingLifecycle::new(&mut catalog, camera.backend(VIEWPORT), config_for(dir.path()));
    lifecycle.stop_handle().stop();
    assert_eq!(
        lifecycle.run(&GRANTED, RecordingRequest::new("early", 5)),
        Outcome::Discarded
    );
    let history = lifecycle.history();
    assert_eq!(history[0], AwaitingDeviceReady);
    assert_eq!(&history[history.len() - 2..], &[Finalizing, Done]);
    assert!(!history.contains(&Recording));
}

// ═══════════════════════════════════════════════════════════════════════════
// FAILURES
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_recording_session_failure_fails_once() {
    let dir = tempdir().unwrap();
    let camera = scaled_camera(SimulatedConfig {
        fail_recording_session: true,
        ..SimulatedConfig::default()
    });
    let mut catalog = Catalog::new(dir.path());
    let (tx, notices) = unbounded();

    let mut lifecycle =
        RecordingLifecycle::new(&mut catalog, camera.backend(VIEWPORT), config_for(dir.path()))
            .with_notices(tx);
    let outcome = lifecycle.run(&GRANTED, RecordingRequest::new("broken", 5));

    assert!(matches!(outcome, Outcome::Failed(RecorderError::Configuration(_))));
    assert_eq!(
        lifecycle.history(),
        &[
            AwaitingDeviceReady,
            PreviewStarting,
            PreviewActive,
            ArmingRecorder,
            Failed
        ]
    );
    drop(lifecycle);

    assert_eq!(failures(&notices).len(), 1);
    assert!(catalog.is_empty());
    assert_eq!(camera.open_devices(), 0);
}

#[test]
fn test_device_error_fails_attempt() {
    let dir = tempdir().unwrap();
    let camera = scaled_camera(SimulatedConfig {
        open_behavior: OpenBehavior::Error(2),
        ..SimulatedConfig::default()
    });
    let mut catalog = Catalog::new(dir.path());

    let mut lifecycle =
        RecordingLifecycle::new(&mut catalog, camera.backend(VIEWPORT), config_for(dir.path()));
    let outcome = lifecycle.run(&GRANTED, RecordingRequest::new("x", 5));

    assert_eq!(outcome, Outcome::Failed(RecorderError::DeviceError(2)));
    assert_eq!(lifecycle.history(), &[AwaitingDeviceReady, Failed]);
}

#[test]
fn test_hung_open_can_be_stopped() {
    let dir = tempdir().unwrap();
    let camera = scaled_camera(SimulatedConfig {
        open_behavior: OpenBehavior::Hang,
        ..SimulatedConfig::default()
    });
    let mut catalog = Catalog::new(dir.path());
    let mut config = config_for(dir.path());
    config.camera.open_timeout_ms = 50;

    let mut lifecycle = RecordingLifecycle::new(&mut catalog, camera.backend(VIEWPORT), config);
    let stop = lifecycle.stop_handle();
    // the hung open never answers; stop the attempt instead of waiting forever
    let stopper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(200));
        stop.stop();
    });
    let outcome = lifecycle.run(&GRANTED, RecordingRequest::new("hang", 5));
    stopper.join().unwrap();

    assert_eq!(outcome, Outcome::Discarded);
}

/// Grants everything except the microphone
struct NoMicrophone;

impl PermissionProvider for NoMicrophone {
    fn status(&self, permission: Permission) -> PermissionStatus {
        match permission {
            Permission::Microphone => PermissionStatus::Denied,
            _ => PermissionStatus::Granted,
        }
    }
}

#[test]
fn test_missing_permission_never_opens_camera() {
    let dir = tempdir().unwrap();
    let camera = scaled_camera(SimulatedConfig::default());
    let mut catalog = Catalog::new(dir.path());
    let (tx, notices) = unbounded();

    let mut lifecycle =
        RecordingLifecycle::new(&mut catalog, camera.backend(VIEWPORT), config_for(dir.path()))
            .with_notices(tx);
    let outcome = lifecycle.run(&NoMicrophone, RecordingRequest::new("quiet", 5));

    match outcome {
        Outcome::Failed(RecorderError::PermissionDenied(detail)) => {
            assert!(detail.contains("microphone"));
            assert!(!detail.contains("camera"));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(lifecycle.history(), &[Failed]);
    drop(lifecycle);
    assert_eq!(failures(&notices).len(), 1);
    assert!(camera.journal().entries().is_empty());
}

#[test]
fn test_missing_output_file_is_save_failure() {
    let dir = tempdir().unwrap();
    let camera = scaled_camera(SimulatedConfig {
        write_output: false,
        ..SimulatedConfig::default()
    });
    let mut catalog = Catalog::new(dir.path());
    let (tx, notices) = unbounded();

    let mut lifecycle =
        RecordingLifecycle::new(&mut catalog, camera.backend(VIEWPORT), config_for(dir.path()))
            .with_notices(tx);
    let outcome = lifecycle.run(&GRANTED, RecordingRequest::new("lost", 1));

    let error = outcome.error().cloned().expect("save should fail");
    assert!(error.is_save_failure());
    assert_eq!(error, RecorderError::FileNotFound(dir.path().join("lost.mp4")));
    assert_eq!(lifecycle.state(), Done);
    drop(lifecycle);

    assert!(catalog.is_empty());
    assert!(failures(&notices).is_empty());
}

#[test]
fn test_invalid_name_fails_before_opening() {
    let dir = tempdir().unwrap();
    let camera = scaled_camera(SimulatedConfig::default());
    let mut catalog = Catalog::new(dir.path());

    let outcome =
        RecordingLifecycle::new(&mut catalog, camera.backend(VIEWPORT), config_for(dir.path()))
            .run(&GRANTED, RecordingRequest::new("a/b", 5));
    assert!(matches!(outcome, Outcome::Failed(RecorderError::InvalidName(_))));
    assert!(!camera.journal().contains("open"));
}
