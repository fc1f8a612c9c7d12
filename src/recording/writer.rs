//! H.264 encoder plus MP4 muxer writing one file

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use muxide::api::{Metadata, Muxer, MuxerBuilder, VideoCodec};
use serde::{Deserialize, Serialize};

use super::encoder::H264Encoder;
use crate::errors::RecorderError;
use crate::types::Size;

/// Summary of a finished file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipStats {
    pub video_frames: u64,
    pub duration_secs: f64,
    pub bytes_written: u64,
    pub skipped_frames: u64,
    pub output_path: PathBuf,
}

/// Encodes RGB frames and muxes them into an MP4 with fast start, so the
/// movie header precedes the media data.
pub struct Mp4Writer {
    encoder: H264Encoder,
    muxer: Muxer<BufWriter<File>>,
    output_path: PathBuf,
    frame_duration_secs: f64,
    frame_count: u64,
    skipped_frames: u64,
}

impl Mp4Writer {
    pub fn create(path: &Path, size: Size, fps: u32) -> Result<Self, RecorderError> {
        if fps == 0 {
            return Err(RecorderError::Encoding("frame rate must be positive".to_string()));
        }
        let file = File::create(path)
            .map_err(|e| RecorderError::Io(format!("Failed to create {:?}: {}", path, e)))?;
        let encoder = H264Encoder::new(size)?;

        let title = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();
        let muxer = MuxerBuilder::new(BufWriter::new(file))
            .video(VideoCodec::H264, size.width, size.height, fps as f64)
            .with_fast_start(true)
            .with_metadata(Metadata::new().with_title(&title).with_current_time())
            .build()
            .map_err(|e| RecorderError::Encoding(format!("Failed to create muxer: {}", e)))?;

        Ok(Self {
            encoder,
            muxer,
            output_path: path.to_path_buf(),
            frame_duration_secs: 1.0 / fps as f64,
            frame_count: 0,
            skipped_frames: 0,
        })
    }

    /// Encode and mux one frame. Presentation times advance one frame
    /// duration per written frame.
    pub fn write_rgb_frame(&mut self, rgb: &[u8]) -> Result<(), RecorderError> {
        let encoded = self.encoder.encode_rgb(rgb)?;
        // the encoder may hold a frame back
        if encoded.data.is_empty() {
            self.skipped_frames += 1;
            return Ok(());
        }

        let pts = self.frame_count as f64 * self.frame_duration_secs;
        self.muxer
            .write_video(pts, &encoded.data, encoded.is_keyframe)
            .map_err(|e| RecorderError::Encoding(format!("Failed to write frame: {}", e)))?;
        self.frame_count += 1;
        Ok(())
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn finish(self) -> Result<ClipStats, RecorderError> {
        let stats = self
            .muxer
            .finish_with_stats()
            .map_err(|e| RecorderError::Encoding(format!("Failed to finalize recording: {}", e)))?;

        Ok(ClipStats {
            video_frames: stats.video_frames,
            duration_secs: stats.duration_secs,
            bytes_written: stats.bytes_written,
            skipped_frames: self.skipped_frames,
            output_path: self.output_path,
        })
    }
}
