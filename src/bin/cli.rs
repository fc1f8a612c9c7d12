use anyhow::{bail, Context, Result};
use clipcam::lifecycle::{LifecycleNotice, Outcome, RecordingLifecycle, RecordingRequest};
use clipcam::permissions::{PermissionStatus, UniformPermissions};
use clipcam::testing::{SimulatedCamera, SimulatedConfig};
use clipcam::{Catalog, ClipcamConfig, Rotation, Size};
use std::env;
use std::path::PathBuf;

const USAGE: &str = "Usage: clipcam-cli <command> [args]

Commands:
  list [--dir <path>] [--json]
  record <name> <seconds> [--dir <path>] [--rotation <0|90|180|270>]
  config [--path <file>]
  info";

/// Preview viewport used by the headless recorder
const HEADLESS_VIEWPORT: Size = Size::new(640, 480);

fn main() -> Result<()> {
    clipcam::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    }

    let command = &args[1];
    match command.as_str() {
        "list" => cmd_list(&args),
        "record" => cmd_record(&args),
        "config" => cmd_config(&args),
        "info" => cmd_info(),
        "help" | "--help" | "-h" => {
            println!("{}", USAGE);
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {}\n\n{}", command, USAGE);
            std::process::exit(1);
        }
    }
}

/// Value following `flag`, if present
fn flag_value<'a>(args: &'a [String], flag: &str) -> Result<Option<&'a str>> {
    match args.iter().position(|a| a == flag) {
        Some(i) => match args.get(i + 1) {
            Some(value) => Ok(Some(value.as_str())),
            None => bail!("{} requires a value", flag),
        },
        None => Ok(None),
    }
}

fn load_config(args: &[String]) -> Result<ClipcamConfig> {
    let mut config = match flag_value(args, "--config")? {
        Some(path) => ClipcamConfig::load_from_file(path)
            .with_context(|| format!("loading config from {}", path))?,
        None => ClipcamConfig::load_or_default(),
    };
    if let Some(dir) = flag_value(args, "--dir")? {
        config.storage.recordings_directory = dir.to_string();
    }
    Ok(config)
}

fn cmd_list(args: &[String]) -> Result<()> {
    let config = load_config(args)?;
    let catalog = Catalog::load(config.recordings_directory())
        .with_context(|| format!("scanning {:?}", config.recordings_directory()))?;

    if args.contains(&"--json".to_string()) {
        println!("{}", serde_json::to_string_pretty(catalog.recordings())?);
    } else if catalog.is_empty() {
        println!("No recordings in {}", catalog.directory().display());
    } else {
        for recording in catalog.recordings() {
            println!("{}  {}", recording.timestamp_label(), recording.label());
        }
    }
    Ok(())
}

fn cmd_record(args: &[String]) -> Result<()> {
    // Parse args: record <name> <seconds> [--dir <path>] [--rotation <deg>] [--config <file>]
    let mut positional: Vec<&str> = Vec::new();
    let mut rotation = Rotation::Deg0;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--dir" | "--config" => i += 1,
            "--rotation" => {
                i += 1;
                let degrees: u16 = args
                    .get(i)
                    .context("--rotation requires a value")?
                    .parse()
                    .context("rotation must be a number")?;
                rotation = Rotation::from_degrees(degrees)
                    .with_context(|| format!("unsupported rotation {}", degrees))?;
            }
            other => positional.push(other),
        }
        i += 1;
    }

    let [name, seconds] = positional[..] else {
        bail!("Usage: clipcam-cli record <name> <seconds> [--dir <path>] [--rotation <deg>]");
    };
    let seconds: u32 = seconds.parse().context("seconds must be a whole number")?;
    let config = load_config(args)?;

    let mut catalog = Catalog::load(config.recordings_directory())?;
    let backend = headless_backend();

    let (notice_tx, notice_rx) = crossbeam_channel::unbounded();
    let printer = std::thread::Builder::new()
        .name("clipcam-cli-notices".to_string())
        .spawn(move || {
            for notice in notice_rx {
                match notice {
                    LifecycleNotice::State(state) => log::debug!("state: {}", state),
                    LifecycleNotice::Progress { label, .. } => println!("  {}", label),
                    _ => {}
                }
            }
        })?;

    let mut lifecycle = RecordingLifecycle::new(&mut catalog, backend, config).with_notices(notice_tx);
    let stop = lifecycle.stop_handle();
    ctrlc::set_handler(move || {
        eprintln!("Stopping...");
        stop.stop();
    })
    .context("installing Ctrl-C handler")?;

    let outcome = lifecycle.run(
        &UniformPermissions(PermissionStatus::Granted),
        RecordingRequest::new(name, seconds).with_rotation(rotation),
    );
    // closes the notice channel
    drop(lifecycle);
    let _ = printer.join();

    match outcome {
        Outcome::Saved(recording) => {
            println!("Saved {} -> {}", recording.label(), recording.path.display());
            Ok(())
        }
        Outcome::Discarded => {
            println!("Stopped before recording, nothing saved");
            Ok(())
        }
        Outcome::SaveFailed(e) => bail!("recording could not be saved: {}", e),
        Outcome::Failed(e) => bail!("recording failed: {}", e),
    }
}

#[cfg(feature = "recording")]
fn headless_backend() -> clipcam::platform::CaptureBackend {
    let camera = SimulatedCamera::new(SimulatedConfig::default());
    let mut backend = camera.backend(HEADLESS_VIEWPORT);
    backend.encoders = std::sync::Arc::new(clipcam::recording::SyntheticEncoderFactory);
    backend
}

#[cfg(not(feature = "recording"))]
fn headless_backend() -> clipcam::platform::CaptureBackend {
    log::warn!("Built without the `recording` feature; writing placeholder files");
    SimulatedCamera::new(SimulatedConfig::default()).backend(HEADLESS_VIEWPORT)
}

fn cmd_config(args: &[String]) -> Result<()> {
    let config = match flag_value(args, "--path")? {
        Some(path) => ClipcamConfig::load_from_file(PathBuf::from(path))?,
        None => ClipcamConfig::load_or_default(),
    };
    print!("{}", config.to_toml()?);
    Ok(())
}

fn cmd_info() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&clipcam::get_info())?);
    Ok(())
}
