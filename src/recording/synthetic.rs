//! `MediaEncoder` backed by the software writer and generated frames
//!
//! Stands in for a hardware encoder fed by the camera: after `start` a pump
//! thread renders test frames at the configured frame rate and writes them
//! until `stop`.

use crate::errors::RecorderError;
use crate::platform::{
    AudioCodec, AudioSource, EncoderFactory, MediaEncoder, OutputFormat, Surface, VideoCodec,
    VideoSource,
};
use crate::recording::writer::{ClipStats, Mp4Writer};
use crate::types::Size;
use crossbeam_channel::{bounded, select, tick, Sender};
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::Duration;

/// Moving RGB24 gradient, different on every frame
pub fn synthetic_frame(frame_number: u64, size: Size) -> Vec<u8> {
    let (width, height) = (size.width as usize, size.height as usize);
    let mut data = vec![0u8; width * height * 3];
    let base = (frame_number % 256) as u8;

    for y in 0..height {
        for x in 0..width {
            let i = (y * width + x) * 3;
            data[i] = base.wrapping_add((x % 256) as u8);
            data[i + 1] = base.wrapping_add((y % 256) as u8);
            data[i + 2] = base.wrapping_add(((x + y) % 256) as u8);
        }
    }
    data
}

#[derive(Debug, Default, Clone)]
struct Settings {
    output_path: Option<PathBuf>,
    frame_rate: Option<u32>,
    video_size: Option<Size>,
    orientation_hint: u16,
}

struct Pump {
    stop_tx: Sender<()>,
    join: JoinHandle<Result<ClipStats, RecorderError>>,
}

pub struct SyntheticEncoder {
    settings: Settings,
    prepared: bool,
    pump: Option<Pump>,
    last_stats: Option<ClipStats>,
}

impl SyntheticEncoder {
    pub fn new() -> Self {
        Self {
            settings: Settings::default(),
            prepared: false,
            pump: None,
            last_stats: None,
        }
    }

    /// Stats of the most recently finished file
    pub fn last_stats(&self) -> Option<&ClipStats> {
        self.last_stats.as_ref()
    }

    fn configured(&self) -> Result<(PathBuf, Size, u32), RecorderError> {
        let missing = |what: &str| RecorderError::Configuration(format!("{} not set", what));
        Ok((
            self.settings
                .output_path
                .clone()
                .ok_or_else(|| missing("output file"))?,
            self.settings.video_size.ok_or_else(|| missing("video size"))?,
            self.settings.frame_rate.ok_or_else(|| missing("frame rate"))?,
        ))
    }

    fn finish_pump(&mut self) -> Result<(), RecorderError> {
        let Some(pump) = self.pump.take() else {
            return Err(RecorderError::Hardware("encoder stopped before start".to_string()));
        };
        let _ = pump.stop_tx.send(());
        let stats = pump
            .join
            .join()
            .map_err(|_| RecorderError::Encoding("frame pump panicked".to_string()))??;
        log::info!(
            "Wrote {:?}: {} frames, {:.2}s, {} bytes",
            stats.output_path,
            stats.video_frames,
            stats.duration_secs,
            stats.bytes_written
        );
        self.last_stats = Some(stats);
        Ok(())
    }
}

impl Default for SyntheticEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaEncoder for SyntheticEncoder {
    fn set_audio_source(&mut self, source: AudioSource) -> Result<(), RecorderError> {
        log::debug!("Audio source {:?} requested; output is video only", source);
        Ok(())
    }

    fn set_video_source(&mut self, _source: VideoSource) -> Result<(), RecorderError> {
        Ok(())
    }

    fn set_output_format(&mut self, _format: OutputFormat) -> Result<(), RecorderError> {
        Ok(())
    }

    fn set_output_file(&mut self, path: &Path) -> Result<(), RecorderError> {
        self.settings.output_path = Some(path.to_path_buf());
        Ok(())
    }

    fn set_video_encoding_bit_rate(&mut self, bits_per_second: u32) -> Result<(), RecorderError> {
        // openh264 picks its own rate control
        log::debug!("Requested bitrate {} bps", bits_per_second);
        Ok(())
    }

    fn set_video_frame_rate(&mut self, fps: u32) -> Result<(), RecorderError> {
        if fps == 0 {
            return Err(RecorderError::Configuration("frame rate must be positive".to_string()));
        }
        self.settings.frame_rate = Some(fps);
        Ok(())
    }

    fn set_video_size(&mut self, size: Size) -> Result<(), RecorderError> {
        self.settings.video_size = Some(size);
        Ok(())
    }

    fn set_video_encoder(&mut self, _codec: VideoCodec) -> Result<(), RecorderError> {
        Ok(())
    }

    fn set_audio_encoder(&mut self, _codec: AudioCodec) -> Result<(), RecorderError> {
        Ok(())
    }

    fn set_orientation_hint(&mut self, degrees: u16) -> Result<(), RecorderError> {
        self.settings.orientation_hint = degrees;
        Ok(())
    }

    fn prepare(&mut self) -> Result<(), RecorderError> {
        self.configured()?;
        self.prepared = true;
        Ok(())
    }

    fn surface(&self) -> Result<Surface, RecorderError> {
        match (self.prepared, self.settings.video_size) {
            (true, Some(size)) => Ok(Surface::encoder(size)),
            _ => Err(RecorderError::Configuration(
                "encoder surface requested before prepare".to_string(),
            )),
        }
    }

    fn start(&mut self) -> Result<(), RecorderError> {
        if !self.prepared {
            return Err(RecorderError::Configuration("encoder not prepared".to_string()));
        }
        if self.pump.is_some() {
            return Err(RecorderError::Hardware("encoder already started".to_string()));
        }
        let (path, size, fps) = self.configured()?;
        log::debug!(
            "Starting frame pump {} @ {} fps, orientation {}",
            size,
            fps,
            self.settings.orientation_hint
        );

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let (ready_tx, ready_rx) = bounded::<Result<(), RecorderError>>(1);
        let join = std::thread::Builder::new()
            .name("clipcam-frame-pump".to_string())
            .spawn(move || {
                let mut writer = match Mp4Writer::create(&path, size, fps) {
                    Ok(writer) => {
                        let _ = ready_tx.send(Ok(()));
                        writer
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.clone()));
                        return Err(e);
                    }
                };

                let frames = tick(Duration::from_secs(1) / fps);
                let mut frame_number = 0u64;
                // the first frame is written immediately so even a short
                // recording contains a keyframe
                writer.write_rgb_frame(&synthetic_frame(frame_number, size))?;
                loop {
                    select! {
                        recv(stop_rx) -> _ => break,
                        recv(frames) -> _ => {
                            frame_number += 1;
                            writer.write_rgb_frame(&synthetic_frame(frame_number, size))?;
                        }
                    }
                }
                writer.finish()
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.pump = Some(Pump { stop_tx, join });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = join.join();
                Err(e)
            }
            Err(_) => {
                let _ = join.join();
                Err(RecorderError::Encoding("frame pump exited during start".to_string()))
            }
        }
    }

    fn stop(&mut self) -> Result<(), RecorderError> {
        self.finish_pump()
    }

    fn reset(&mut self) {
        if self.pump.is_some() {
            if let Err(e) = self.finish_pump() {
                log::warn!("Frame pump ended with error during reset: {}", e);
            }
        }
        self.settings = Settings::default();
        self.prepared = false;
    }

    fn release(&mut self) {
        self.reset();
    }
}

impl Drop for SyntheticEncoder {
    fn drop(&mut self) {
        if self.pump.is_some() {
            self.reset();
        }
    }
}

/// Hands out a fresh [`SyntheticEncoder`] per camera open
#[derive(Debug, Default, Clone, Copy)]
pub struct SyntheticEncoderFactory;

impl EncoderFactory for SyntheticEncoderFactory {
    fn create_encoder(&self) -> Result<Box<dyn MediaEncoder>, RecorderError> {
        Ok(Box::new(SyntheticEncoder::new()))
    }
}
