//! Image encoding operations.

use bytes::Bytes;
use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;

use crate::error::{CamError, Result};
use crate::frame::Frame;

/// JPEG quality of `GET /camera/snapshot` responses.
pub const SNAPSHOT_QUALITY: u8 = 85;

/// JPEG quality of each MJPEG part.
pub const STREAM_QUALITY: u8 = 75;

/// Encode an RGB frame as baseline JPEG.
///
/// # Errors
///
/// Returns [`CamError::ImageEncoding`] if the encoder rejects the frame,
/// e.g. a side longer than 65535 pixels.
pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Bytes> {
    let mut out = Vec::with_capacity(frame.data().len() / 8);
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .encode(
            frame.data(),
            frame.width(),
            frame.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| CamError::ImageEncoding(e.to_string()))?;
    Ok(Bytes::from(out))
}
