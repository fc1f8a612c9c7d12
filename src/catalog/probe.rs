//! Duration probing for encoded recordings
//!
//! Walks the ISO base media box tree down to `moov/mvhd` and reads the movie
//! duration. Only headers are read; sample data is skipped with seeks.

use crate::errors::RecorderError;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Reads the playback duration of a video file
pub trait DurationProbe {
    /// Duration in whole seconds, sub-second precision discarded
    fn duration_secs(&self, path: &Path) -> Result<u32, RecorderError>;
}

/// Probe for MP4 containers
#[derive(Debug, Clone, Copy, Default)]
pub struct Mp4DurationProbe;

impl DurationProbe for Mp4DurationProbe {
    fn duration_secs(&self, path: &Path) -> Result<u32, RecorderError> {
        let probe_err = |reason: String| RecorderError::Probe {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|e| probe_err(e.to_string()))?;
        let len = file.metadata().map_err(|e| probe_err(e.to_string()))?.len();
        let mut reader = BufReader::new(file);

        let moov = find_box(&mut reader, 0, len, b"moov")
            .map_err(|e| probe_err(e.to_string()))?
            .ok_or_else(|| probe_err("no moov box".to_string()))?;
        let mvhd = find_box(&mut reader, moov.payload_start, moov.end, b"mvhd")
            .map_err(|e| probe_err(e.to_string()))?
            .ok_or_else(|| probe_err("no mvhd box".to_string()))?;

        let (timescale, duration) =
            read_mvhd(&mut reader, &mvhd).map_err(|e| probe_err(e.to_string()))?;
        if timescale == 0 {
            return Err(probe_err("mvhd timescale is zero".to_string()));
        }

        u32::try_from(duration / timescale as u64)
            .map_err(|_| probe_err(format!("duration {} out of range", duration)))
    }
}

#[derive(Debug, Clone, Copy)]
struct BoxHeader {
    kind: [u8; 4],
    payload_start: u64,
    end: u64,
}

/// Scan sibling boxes in `[start, end)` for the first box of type `kind`
fn find_box<R: Read + Seek>(
    reader: &mut R,
    start: u64,
    end: u64,
    kind: &[u8; 4],
) -> std::io::Result<Option<BoxHeader>> {
    let mut offset = start;
    while offset.checked_add(8).is_some_and(|head_end| head_end <= end) {
        let header = read_box_header(reader, offset, end)?;
        if &header.kind == kind {
            return Ok(Some(header));
        }
        // sizes below the header length are rejected, so the walk always advances
        offset = header.end;
    }
    Ok(None)
}

fn invalid_data(message: String) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, message)
}

fn read_box_header<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
    parent_end: u64,
) -> std::io::Result<BoxHeader> {
    reader.seek(SeekFrom::Start(offset))?;
    let mut head = [0u8; 8];
    reader.read_exact(&mut head)?;

    let size32 = u32::from_be_bytes([head[0], head[1], head[2], head[3]]) as u64;
    let kind = [head[4], head[5], head[6], head[7]];

    let (size, header_len) = match size32 {
        // box runs to the end of its parent
        0 => (parent_end - offset, 8),
        1 => {
            if offset.checked_add(16).map_or(true, |head_end| head_end > parent_end) {
                return Err(invalid_data(format!(
                    "box {:?} at {} truncated before its 64-bit size",
                    String::from_utf8_lossy(&kind),
                    offset
                )));
            }
            let mut large = [0u8; 8];
            reader.read_exact(&mut large)?;
            (u64::from_be_bytes(large), 16)
        }
        n => (n, 8),
    };

    let end = offset
        .checked_add(size)
        .filter(|&end| size >= header_len && end > offset && end <= parent_end)
        .ok_or_else(|| {
            invalid_data(format!(
                "box {:?} at {} has invalid size {}",
                String::from_utf8_lossy(&kind),
                offset,
                size
            ))
        })?;

    Ok(BoxHeader {
        kind,
        payload_start: offset + header_len,
        end,
    })
}

/// Returns `(timescale, duration)`
fn read_mvhd<R: Read + Seek>(reader: &mut R, mvhd: &BoxHeader) -> std::io::Result<(u32, u64)> {
    require_payload(mvhd, 4)?;
    reader.seek(SeekFrom::Start(mvhd.payload_start))?;
    let mut version_flags = [0u8; 4];
    reader.read_exact(&mut version_flags)?;

    match version_flags[0] {
        0 => {
            require_payload(mvhd, 4 + 16)?;
            let mut fields = [0u8; 16];
            reader.read_exact(&mut fields)?;
            let timescale = u32::from_be_bytes([fields[8], fields[9], fields[10], fields[11]]);
            let duration = u32::from_be_bytes([fields[12], fields[13], fields[14], fields[15]]);
            Ok((timescale, duration as u64))
        }
        1 => {
            require_payload(mvhd, 4 + 28)?;
            let mut fields = [0u8; 28];
            reader.read_exact(&mut fields)?;
            let mut ts = [0u8; 4];
            ts.copy_from_slice(&fields[16..20]);
            let mut dur = [0u8; 8];
            dur.copy_from_slice(&fields[20..28]);
            Ok((u32::from_be_bytes(ts), u64::from_be_bytes(dur)))
        }
        v => Err(invalid_data(format!("unsupported mvhd version {}", v))),
    }
}

/// Fails unless `len` payload bytes fit inside the box
fn require_payload(header: &BoxHeader, len: u64) -> std::io::Result<()> {
    match header.payload_start.checked_add(len) {
        Some(needed) if needed <= header.end => Ok(()),
        _ => Err(invalid_data(format!(
            "{:?} box too short: {} payload bytes, need {}",
            String::from_utf8_lossy(&header.kind),
            header.end.saturating_sub(header.payload_start),
            len
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{mvhd_v1_box, write_mp4_stub, wrap_box};
    use std::fs;

    #[test]
    fn test_probe_v0_stub() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        write_mp4_stub(&path, 5_750).unwrap();

        assert_eq!(Mp4DurationProbe.duration_secs(&path).unwrap(), 5);
    }

    #[test]
    fn test_probe_v1_with_leading_mdat() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");

        let mut bytes = wrap_box(b"ftyp", b"isom\0\0\x02\0isomiso2mp41");
        bytes.extend(wrap_box(b"mdat", &[0u8; 64]));
        bytes.extend(wrap_box(b"moov", &mvhd_v1_box(90_000, 90_000 * 125)));
        fs::write(&path, bytes).unwrap();

        assert_eq!(Mp4DurationProbe.duration_secs(&path).unwrap(), 125);
    }

    #[test]
    fn test_probe_rejects_non_video() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "definitely not a movie").unwrap();

        let err = Mp4DurationProbe.duration_secs(&path).unwrap_err();
        assert!(matches!(err, RecorderError::Probe { .. }));
    }

    #[test]
    fn test_oversized_largesize_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.mp4");

        let mut bytes = wrap_box(b"free", &[]);
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.extend_from_slice(b"mdat");
        bytes.extend_from_slice(&u64::MAX.to_be_bytes());
        bytes.extend_from_slice(&[0u8; 32]);
        fs::write(&path, bytes).unwrap();

        let err = Mp4DurationProbe.duration_secs(&path).unwrap_err();
        assert!(matches!(err, RecorderError::Probe { .. }));
    }

    #[test]
    fn test_truncated_mvhd_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.mp4");

        // mvhd claims version 0 but holds only the timescale; the duration
        // would otherwise be read from the following box
        let mut mvhd_payload = vec![0u8; 4];
        mvhd_payload.extend_from_slice(&[0u8; 8]);
        mvhd_payload.extend_from_slice(&1000u32.to_be_bytes());
        let mut moov_payload = wrap_box(b"mvhd", &mvhd_payload);
        moov_payload.extend(wrap_box(b"trak", &[0xff; 16]));

        let mut bytes = wrap_box(b"ftyp", b"isom\0\0\x02\0isomiso2mp41");
        bytes.extend(wrap_box(b"moov", &moov_payload));
        fs::write(&path, bytes).unwrap();

        let err = Mp4DurationProbe.duration_secs(&path).unwrap_err();
        match err {
            RecorderError::Probe { reason, .. } => assert!(reason.contains("too short")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_box_overrunning_parent_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overrun.mp4");

        let mut bytes = wrap_box(b"ftyp", b"isom");
        bytes.extend_from_slice(&4096u32.to_be_bytes());
        bytes.extend_from_slice(b"moov");
        bytes.extend(mvhd_v1_box(1000, 5_000));
        fs::write(&path, bytes).unwrap();

        assert!(Mp4DurationProbe.duration_secs(&path).is_err());
    }

    #[test]
    fn test_probe_missing_file() {
        let err = Mp4DurationProbe
            .duration_secs(Path::new("/nonexistent/clip.mp4"))
            .unwrap_err();
        assert!(matches!(err, RecorderError::Probe { .. }));
    }
}
