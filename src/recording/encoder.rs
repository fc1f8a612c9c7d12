//! H.264 encoding with openh264

use crate::errors::RecorderError;
use crate::types::Size;
use openh264::encoder::{Encoder, FrameType};
use openh264::formats::YUVBuffer;

/// Annex B H.264 encoder for RGB24 frames of one fixed size
pub struct H264Encoder {
    encoder: Encoder,
    size: Size,
    frame_count: u64,
}

impl H264Encoder {
    /// Dimensions are taken from each YUV source at encode time; `size` is
    /// only used to validate input.
    pub fn new(size: Size) -> Result<Self, RecorderError> {
        if size.width % 2 != 0 || size.height % 2 != 0 {
            return Err(RecorderError::Encoding(format!(
                "frame size {} must have even dimensions",
                size
            )));
        }
        let encoder = Encoder::new()
            .map_err(|e| RecorderError::Encoding(format!("Failed to create encoder: {}", e)))?;

        Ok(Self {
            encoder,
            size,
            frame_count: 0,
        })
    }

    pub fn encode_rgb(&mut self, rgb: &[u8]) -> Result<EncodedFrame, RecorderError> {
        let expected = self.size.area() as usize * 3;
        if rgb.len() != expected {
            return Err(RecorderError::Encoding(format!(
                "Invalid frame size: expected {} bytes, got {}",
                expected,
                rgb.len()
            )));
        }

        let yuv = rgb_to_yuv420(rgb, self.size);
        let buffer = YUVBuffer::from_vec(yuv, self.size.width as usize, self.size.height as usize);
        let bitstream = self
            .encoder
            .encode(&buffer)
            .map_err(|e| RecorderError::Encoding(format!("Encoding failed: {}", e)))?;

        self.frame_count += 1;
        Ok(EncodedFrame {
            is_keyframe: matches!(bitstream.frame_type(), FrameType::IDR | FrameType::I),
            data: bitstream.to_vec(),
        })
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn size(&self) -> Size {
        self.size
    }
}

#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// NAL units with start codes
    pub data: Vec<u8>,
    pub is_keyframe: bool,
}

/// RGB24 to planar YUV420, BT.601, chroma taken from the top-left pixel of
/// each 2x2 block
fn rgb_to_yuv420(rgb: &[u8], size: Size) -> Vec<u8> {
    let w = size.width as usize;
    let h = size.height as usize;
    let y_size = w * h;
    let uv_size = (w / 2) * (h / 2);
    let mut yuv = vec![0u8; y_size + uv_size * 2];

    let (y_plane, uv_planes) = yuv.split_at_mut(y_size);
    let (u_plane, v_plane) = uv_planes.split_at_mut(uv_size);

    for y in 0..h {
        for x in 0..w {
            let i = (y * w + x) * 3;
            let (r, g, b) = (rgb[i] as i32, rgb[i + 1] as i32, rgb[i + 2] as i32);

            let luma = ((66 * r + 129 * g + 25 * b + 128) >> 8) + 16;
            y_plane[y * w + x] = luma.clamp(0, 255) as u8;

            if y % 2 == 0 && x % 2 == 0 {
                let uv = (y / 2) * (w / 2) + x / 2;
                let u = ((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128;
                let v = ((112 * r - 94 * g - 18 * b + 128) >> 8) + 128;
                u_plane[uv] = u.clamp(0, 255) as u8;
                v_plane[uv] = v.clamp(0, 255) as u8;
            }
        }
    }

    yuv
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuv420_size() {
        let size = Size::new(64, 48);
        let rgb = vec![128u8; size.area() as usize * 3];
        assert_eq!(rgb_to_yuv420(&rgb, size).len(), 64 * 48 * 3 / 2);
    }

    #[test]
    fn test_gray_maps_to_neutral_chroma() {
        let size = Size::new(2, 2);
        let yuv = rgb_to_yuv420(&[128u8; 12], size);
        assert_eq!(&yuv[4..], &[128, 128]);
    }

    #[test]
    fn test_rejects_odd_size() {
        assert!(matches!(
            H264Encoder::new(Size::new(641, 480)),
            Err(RecorderError::Encoding(_))
        ));
    }

    #[test]
    fn test_first_frame_is_keyframe() {
        let mut encoder = H264Encoder::new(Size::new(320, 240)).unwrap();
        let frame = encoder.encode_rgb(&vec![100u8; 320 * 240 * 3]).unwrap();

        assert!(frame.is_keyframe);
        assert!(
            frame.data.starts_with(&[0, 0, 0, 1]) || frame.data.starts_with(&[0, 0, 1]),
            "expected an Annex B start code"
        );
        assert_eq!(encoder.frame_count(), 1);
    }

    #[test]
    fn test_rejects_wrong_buffer_length() {
        let mut encoder = H264Encoder::new(Size::new(320, 240)).unwrap();
        assert!(encoder.encode_rgb(&[0u8; 10]).is_err());
    }
}
