//! Minimal MP4 files for offline probing
//!
//! Produces just enough of the ISO base media layout (`ftyp`, `moov/mvhd`,
//! `mdat`) for the duration probe to read a movie header.

use std::io::Write;
use std::path::Path;

/// Bytes after the timing fields of an mvhd box: rate, volume, reserved,
/// matrix, pre-defined and next track id.
const MVHD_TRAILER_LEN: usize = 80;

/// Wrap `payload` in a box header of type `kind`
pub fn wrap_box(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let size = (payload.len() + 8) as u32;
    let mut out = Vec::with_capacity(size as usize);
    out.extend_from_slice(&size.to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(payload);
    out
}

/// Version 0 movie header with 32-bit duration
pub fn mvhd_v0_box(timescale: u32, duration: u32) -> Vec<u8> {
    let mut payload = vec![0u8; 4]; // version 0, no flags
    payload.extend_from_slice(&0u32.to_be_bytes()); // creation
    payload.extend_from_slice(&0u32.to_be_bytes()); // modification
    payload.extend_from_slice(&timescale.to_be_bytes());
    payload.extend_from_slice(&duration.to_be_bytes());
    payload.extend_from_slice(&mvhd_trailer());
    wrap_box(b"mvhd", &payload)
}

/// Version 1 movie header with 64-bit times and duration
pub fn mvhd_v1_box(timescale: u32, duration: u64) -> Vec<u8> {
    let mut payload = vec![1u8, 0, 0, 0];
    payload.extend_from_slice(&0u64.to_be_bytes());
    payload.extend_from_slice(&0u64.to_be_bytes());
    payload.extend_from_slice(&timescale.to_be_bytes());
    payload.extend_from_slice(&duration.to_be_bytes());
    payload.extend_from_slice(&mvhd_trailer());
    wrap_box(b"mvhd", &payload)
}

fn mvhd_trailer() -> Vec<u8> {
    let mut trailer = vec![0u8; MVHD_TRAILER_LEN];
    trailer[0..4].copy_from_slice(&0x0001_0000u32.to_be_bytes()); // rate 1.0
    trailer[4..6].copy_from_slice(&0x0100u16.to_be_bytes()); // volume 1.0
    let last = MVHD_TRAILER_LEN - 4;
    trailer[last..].copy_from_slice(&2u32.to_be_bytes()); // next track id
    trailer
}

/// Complete stub file: `ftyp`, `moov` with a millisecond mvhd, empty `mdat`
pub fn mp4_stub_bytes(duration_ms: u64) -> Vec<u8> {
    let mut bytes = wrap_box(b"ftyp", b"isom\0\0\x02\0isomiso2mp41");
    let mvhd = match u32::try_from(duration_ms) {
        Ok(ms) => mvhd_v0_box(1000, ms),
        Err(_) => mvhd_v1_box(1000, duration_ms),
    };
    bytes.extend(wrap_box(b"moov", &mvhd));
    bytes.extend(wrap_box(b"mdat", &[]));
    bytes
}

pub fn write_mp4_stub(path: &Path, duration_ms: u64) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(&mp4_stub_bytes(duration_ms))?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_sizes() {
        assert_eq!(wrap_box(b"free", &[1, 2, 3]).len(), 11);
        assert_eq!(mvhd_v0_box(1000, 1).len(), 8 + 4 + 16 + MVHD_TRAILER_LEN);
        assert_eq!(mvhd_v1_box(1000, 1).len(), 8 + 4 + 28 + MVHD_TRAILER_LEN);
    }

    #[test]
    fn test_stub_starts_with_ftyp() {
        let bytes = mp4_stub_bytes(1234);
        assert_eq!(&bytes[4..8], b"ftyp");
    }
}
