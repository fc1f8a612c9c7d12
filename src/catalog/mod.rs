//! Catalog of saved recordings
//!
//! The catalog is rebuilt from the recordings directory on every start; the
//! filesystem is the only persistent index. One catalog instance is owned by
//! the application session and lent to whatever needs to mutate it.

mod naming;
mod probe;
mod recording;

pub use naming::{unique_recording_path, RECORDING_EXTENSION};
pub use probe::{DurationProbe, Mp4DurationProbe};
pub use recording::Recording;

use crate::errors::RecorderError;
use std::path::{Path, PathBuf};

pub struct Catalog {
    directory: PathBuf,
    recordings: Vec<Recording>,
    probe: Box<dyn DurationProbe + Send>,
}

impl Catalog {
    /// Empty catalog for `directory` using the MP4 probe
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self::with_probe(directory, Box::new(Mp4DurationProbe))
    }

    pub fn with_probe(directory: impl Into<PathBuf>, probe: Box<dyn DurationProbe + Send>) -> Self {
        Self {
            directory: directory.into(),
            recordings: Vec::new(),
            probe,
        }
    }

    /// Build a catalog from the files currently in `directory`
    pub fn load(directory: impl Into<PathBuf>) -> Result<Self, RecorderError> {
        let mut catalog = Self::new(directory);
        let found = catalog.scan()?;
        catalog.recordings = found;
        Ok(catalog)
    }

    /// Inspect every entry of the directory, non-recursively, in file name
    /// order. Entries that cannot be probed are skipped.
    pub fn scan(&self) -> Result<Vec<Recording>, RecorderError> {
        if !self.directory.exists() {
            log::info!("Recordings directory {:?} does not exist yet", self.directory);
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.directory)?
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.path()),
                Err(e) => {
                    log::warn!("Skipping unreadable entry in {:?}: {}", self.directory, e);
                    None
                }
            })
            .collect();
        paths.sort();

        let recordings: Vec<Recording> = paths
            .iter()
            .filter_map(|path| match self.inspect(path) {
                Ok(recording) => Some(recording),
                Err(e) => {
                    log::warn!("Invalid file skipped: {}", e);
                    None
                }
            })
            .collect();

        log::info!(
            "Scanned {:?}: {} recordings, {} skipped",
            self.directory,
            recordings.len(),
            paths.len() - recordings.len()
        );
        Ok(recordings)
    }

    /// Build a recording for one file using this catalog's probe
    pub fn inspect(&self, path: &Path) -> Result<Recording, RecorderError> {
        Recording::from_file(path, self.probe.as_ref())
    }

    pub fn append(&mut self, recording: Recording) {
        log::info!("Catalog += {}", recording.label());
        self.recordings.push(recording);
    }

    pub fn clear(&mut self) {
        self.recordings.clear();
    }

    pub fn recordings(&self) -> &[Recording] {
        &self.recordings
    }

    pub fn len(&self) -> usize {
        self.recordings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recordings.is_empty()
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Pre-flight path for a new recording called `name`
    pub fn reserve_path(&self, name: &str) -> Result<PathBuf, RecorderError> {
        unique_recording_path(&self.directory, name)
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("directory", &self.directory)
            .field("recordings", &self.recordings)
            .finish()
    }
}
