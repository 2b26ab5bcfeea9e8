//! JPEG snapshot encoder.
//!
//! Gray frames are written as single-channel JPEGs, RGB frames as
//! three-channel ones. Quality is clamped into `1..=100`.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use crate::error::RenderError;

use super::FrameBuffer;

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

// =============================================================================
// Encoding
// =============================================================================

/// Encode `frame` as a baseline JPEG.
pub fn encode_jpeg(frame: &FrameBuffer, quality: u8) -> Result<Bytes, RenderError> {
    let size = frame.size();
    if size.is_empty() {
        return Err(RenderError::EmptyFrame);
    }

    let color = match frame.channels() {
        1 => ExtendedColorType::L8,
        3 => ExtendedColorType::Rgb8,
        other => return Err(RenderError::UnsupportedChannels(other)),
    };

    let expected = size.area() as usize * frame.channels();
    if frame.data().len() != expected {
        return Err(RenderError::SizeMismatch {
            expected,
            actual: frame.data().len(),
        });
    }

    let mut output = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut output, clamp_quality(quality));
    encoder
        .encode(frame.data(), size.width, size.height, color)
        .map_err(|e| RenderError::Encode {
            message: e.to_string(),
        })?;

    Ok(Bytes::from(output))
}

/// Clamp quality to valid range.
#[inline]
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY)
}

// =============================================================================
// Tests
// =============================================================================
