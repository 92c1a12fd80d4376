//! In-memory RGB frames.

use chrono::{DateTime, Utc};

/// One full-sensor RGB24 raster, immutable once captured.
///
/// Frames are shared as `Arc<Frame>`: the producer swaps in a new `Arc`
/// and readers holding the old one keep a complete image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
    captured_at: DateTime<Utc>,
}

impl Frame {
    /// Wrap a raw RGB24 buffer. Returns `None` if the buffer length does
    /// not match `width * height * 3`.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        (data.len() == Self::byte_len(width, height)).then(|| Self {
            width,
            height,
            data,
            captured_at: Utc::now(),
        })
    }

    /// Byte length of an RGB24 frame with the given dimensions.
    pub const fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 3
    }

    pub const fn width(&self) -> u32 {
        self.width
    }

    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Interleaved RGB bytes, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub const fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}
