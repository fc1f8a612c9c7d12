use crate::errors::RecorderError;
use std::path::{Path, PathBuf};

/// Container extension for every recording
pub const RECORDING_EXTENSION: &str = "mp4";

/// First unused path among `name.mp4`, `name0.mp4`, `name1.mp4`, ...
///
/// Only checks existence at call time; nothing is reserved. Callers must be
/// the only writer to `directory`.
pub fn unique_recording_path(directory: &Path, name: &str) -> Result<PathBuf, RecorderError> {
    validate_name(name)?;

    let candidate = |stem: &str| directory.join(format!("{}.{}", stem, RECORDING_EXTENSION));

    let mut path = candidate(name);
    let mut suffix: u64 = 0;
    while path.exists() {
        path = candidate(&format!("{}{}", name, suffix));
        suffix += 1;
    }
    Ok(path)
}

fn validate_name(name: &str) -> Result<(), RecorderError> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains(&['/', '\\', '\0'][..]);
    if invalid {
        return Err(RecorderError::InvalidName(name.to_string()));
    }
    Ok(())
}
