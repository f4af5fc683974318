//! RGBA8 raster frames.

use std::fmt;

use maskframe_common::error::{MaskframeError, MaskframeResult};

/// Bytes per pixel.
pub const CHANNELS: usize = 4;

/// An opaque colour.
pub const BLACK: [u8; 4] = [0, 0, 0, 255];

/// Interleaved RGBA8 pixels at a frame's native resolution, row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl FrameBuffer {
    /// A transparent black frame.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height * CHANNELS],
        }
    }

    /// A frame with every pixel set to `rgba`.
    pub fn filled(width: usize, height: usize, rgba: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity(width * height * CHANNELS);
        for _ in 0..width * height {
            data.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap raw RGBA bytes, validating the length against the dimensions.
    pub fn from_rgba(width: usize, height: usize, data: Vec<u8>) -> MaskframeResult<Self> {
        let expected = width * height * CHANNELS;
        if data.len() != expected {
            return Err(MaskframeError::media(format!(
                "Frame data is {} bytes, expected {expected} for {width}x{height} RGBA",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Byte offset of pixel `(x, y)`.
    #[inline]
    pub fn offset(&self, x: usize, y: usize) -> usize {
        (y * self.width + x) * CHANNELS
    }

    /// Pixel at `(x, y)`. Panics when out of bounds.
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let o = self.offset(x, y);
        [
            self.data[o],
            self.data[o + 1],
            self.data[o + 2],
            self.data[o + 3],
        ]
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, rgba: [u8; 4]) {
        let o = self.offset(x, y);
        self.data[o..o + CHANNELS].copy_from_slice(&rgba);
    }

    /// Overwrite this frame with `other`, reusing the allocation.
    pub fn copy_from(&mut self, other: &FrameBuffer) {
        self.width = other.width;
        self.height = other.height;
        self.data.clear();
        self.data.extend_from_slice(&other.data);
    }
}

impl fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgba_validates_length() {
        assert!(FrameBuffer::from_rgba(2, 2, vec![0; 16]).is_ok());
        assert!(FrameBuffer::from_rgba(2, 2, vec![0; 15]).is_err());
    }

    #[test]
    fn test_pixel_access() {
        let mut frame = FrameBuffer::filled(3, 2, [1, 2, 3, 4]);
        frame.set_pixel(2, 1, [9, 8, 7, 6]);
        assert_eq!(frame.pixel(0, 0), [1, 2, 3, 4]);
        assert_eq!(frame.pixel(2, 1), [9, 8, 7, 6]);
        assert_eq!(&frame.as_bytes()[20..24], &[9, 8, 7, 6]);
    }

    #[test]
    fn test_copy_from_resizes() {
        let mut dst = FrameBuffer::new(1, 1);
        let src = FrameBuffer::filled(4, 3, BLACK);
        dst.copy_from(&src);
        assert_eq!(dst, src);
    }

    #[test]
    fn test_debug_omits_pixels() {
        let text = format!("{:?}", FrameBuffer::new(10, 10));
        assert!(text.contains("bytes: 400"));
    }
}
