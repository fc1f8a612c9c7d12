//! Configuration management for clipcam
//!
//! Provides loading, saving and validation of the storage, camera, recording
//! and encoder settings.

use crate::errors::RecorderError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipcamConfig {
    pub storage: StorageConfig,
    pub camera: CameraConfig,
    pub recording: RecordingConfig,
    pub encoder: EncoderConfig,
}

/// Where recordings live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory scanned for recordings and written to
    pub recordings_directory: String,
    /// Name used when the user leaves the name empty
    pub default_name: String,
}

/// Camera device selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Camera to open; the first enumerated camera when unset
    pub camera_id: Option<String>,
    /// How long to wait for the open/close gate in milliseconds
    pub open_timeout_ms: u64,
}

/// Recording timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Delay between preview start and recording start in milliseconds
    pub arm_delay_ms: u64,
    /// Countdown tick interval in milliseconds
    pub tick_interval_ms: u64,
    pub min_duration_secs: u32,
    pub max_duration_secs: u32,
}

/// Encoder parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Video bitrate in bits per second
    pub bitrate: u32,
    pub frame_rate: u32,
}

impl Default for ClipcamConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                recordings_directory: "./recordings".to_string(),
                default_name: "Untitled".to_string(),
            },
            camera: CameraConfig {
                camera_id: None,
                open_timeout_ms: 2500,
            },
            recording: RecordingConfig {
                arm_delay_ms: 200,
                tick_interval_ms: 1000,
                min_duration_secs: 1,
                max_duration_secs: 600,
            },
            encoder: EncoderConfig {
                bitrate: 10_000_000,
                frame_rate: 30,
            },
        }
    }
}

impl ClipcamConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, RecorderError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| RecorderError::Config(format!("Failed to read config file: {}", e)))?;

        let config: ClipcamConfig = toml::from_str(&contents)
            .map_err(|e| RecorderError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate().map_err(RecorderError::Config)?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), RecorderError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                RecorderError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = self.to_toml()?;

        fs::write(path, toml_string)
            .map_err(|e| RecorderError::Config(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, RecorderError> {
        toml::to_string_pretty(self)
            .map_err(|e| RecorderError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("clipcam.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.storage.recordings_directory.trim().is_empty() {
            return Err("Recordings directory must not be empty".to_string());
        }
        if self.storage.default_name.trim().is_empty() {
            return Err("Default recording name must not be empty".to_string());
        }
        if self.camera.open_timeout_ms == 0 {
            return Err("Open timeout must be positive".to_string());
        }
        if self.recording.tick_interval_ms == 0 {
            return Err("Tick interval must be positive".to_string());
        }
        if self.recording.min_duration_secs > self.recording.max_duration_secs {
            return Err("Minimum duration exceeds maximum duration".to_string());
        }
        if self.encoder.bitrate == 0 {
            return Err("Bitrate must be positive".to_string());
        }
        if self.encoder.frame_rate == 0 || self.encoder.frame_rate > 240 {
            return Err("Invalid frame rate (must be 1-240)".to_string());
        }
        Ok(())
    }

    pub fn recordings_directory(&self) -> PathBuf {
        PathBuf::from(&self.storage.recordings_directory)
    }

    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.camera.open_timeout_ms)
    }

    pub fn arm_delay(&self) -> Duration {
        Duration::from_millis(self.recording.arm_delay_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.recording.tick_interval_ms)
    }

    /// Clamp a requested duration into the configured range
    pub fn clamp_duration(&self, secs: u32) -> u32 {
        secs.clamp(
            self.recording.min_duration_secs,
            self.recording.max_duration_secs,
        )
    }
}
