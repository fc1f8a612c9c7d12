use crate::catalog::probe::DurationProbe;
use crate::errors::RecorderError;
use crate::timing::format_clock;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One saved video.
///
/// A snapshot taken when the file was inspected; it is never re-validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub path: PathBuf,
    pub display_name: String,
    pub duration_secs: u32,
    pub created_at: DateTime<Local>,
}

impl Recording {
    /// Inspect a video file. Fails if the file is missing or cannot be probed.
    pub fn from_file(path: &Path, probe: &dyn DurationProbe) -> Result<Self, RecorderError> {
        let metadata = std::fs::metadata(path).map_err(|e| RecorderError::Probe {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if !metadata.is_file() {
            return Err(RecorderError::Probe {
                path: path.to_path_buf(),
                reason: "not a regular file".to_string(),
            });
        }

        let display_name = display_name_for(path).ok_or_else(|| RecorderError::Probe {
            path: path.to_path_buf(),
            reason: "file name has no extension".to_string(),
        })?;
        let duration_secs = probe.duration_secs(path)?;
        let created_at = metadata
            .modified()
            .map(DateTime::<Local>::from)
            .map_err(|e| RecorderError::Probe {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            display_name,
            duration_secs,
            created_at,
        })
    }

    /// `"<name> (M:SS)"`
    pub fn label(&self) -> String {
        format!("{} ({})", self.display_name, format_clock(self.duration_secs))
    }

    /// Creation time as `dd/MM/yyyy HH:mm`
    pub fn timestamp_label(&self) -> String {
        self.created_at.format("%d/%m/%Y %H:%M").to_string()
    }
}

/// File name up to its last `.`
fn display_name_for(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let dot = file_name.rfind('.')?;
    Some(file_name[..dot].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::probe::Mp4DurationProbe;
    use crate::testing::fixtures::write_mp4_stub;
    use chrono::TimeZone;

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beach.day.mp4");
        write_mp4_stub(&path, 125_400).unwrap();

        let recording = Recording::from_file(&path, &Mp4DurationProbe).unwrap();
        assert_eq!(recording.display_name, "beach.day");
        assert_eq!(recording.duration_secs, 125);
        assert_eq!(recording.label(), "beach.day (2:05)");
        assert_eq!(recording.path, path);
    }

    #[test]
    fn test_from_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("nested.mp4");
        std::fs::create_dir(&sub).unwrap();
        assert!(Recording::from_file(&sub, &Mp4DurationProbe).is_err());
    }

    #[test]
    fn test_timestamp_label() {
        let recording = Recording {
            path: PathBuf::from("/tmp/a.mp4"),
            display_name: "a".to_string(),
            duration_secs: 0,
            created_at: Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 0).unwrap(),
        };
        assert_eq!(recording.timestamp_label(), "07/03/2024 09:05");
    }
}
