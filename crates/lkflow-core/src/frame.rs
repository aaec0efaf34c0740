//! Frame buffer types for video frames in CPU memory.

use crate::error::{FlowError, Result};
use serde::{Deserialize, Serialize};

/// Pixel format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit RGB (24 bits per pixel)
    #[default]
    Rgb8,
    /// 8-bit RGBA (32 bits per pixel)
    Rgba8,
    /// 8-bit grayscale
    Gray8,
}

impl PixelFormat {
    /// Bytes per pixel.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb8 => 3,
            Self::Rgba8 => 4,
            Self::Gray8 => 1,
        }
    }

    /// Calculate total bytes needed for a frame of this format.
    pub fn frame_size(self, width: u32, height: u32) -> usize {
        width as usize * height as usize * self.bytes_per_pixel()
    }
}

/// A video frame in CPU memory.
///
/// Pixels are tightly packed, row-major, with no row padding. The frame is
/// treated as immutable by the flow estimator: every stage borrows it and
/// produces new buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Pixel format
    pub format: PixelFormat,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    data: Vec<u8>,
}

impl Frame {
    /// Create a zeroed frame with the given dimensions and format.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            format,
            width,
            height,
            data: vec![0u8; format.frame_size(width, height)],
        }
    }

    /// Wrap an existing pixel buffer, checking its length against the format.
    pub fn from_raw(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        let expected = format.frame_size(width, height);
        if data.len() != expected {
            return Err(FlowError::InvalidFrame(format!(
                "{width}x{height} {format:?} needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            format,
            width,
            height,
            data,
        })
    }

    /// Build an RGB frame by evaluating `f` at every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> [u8; 3]) -> Self {
        let mut frame = Self::new(width, height, PixelFormat::Rgb8);
        for y in 0..height {
            for x in 0..width {
                frame.pixel_mut(x, y).copy_from_slice(&f(x, y));
            }
        }
        frame
    }

    /// Frame dimensions as `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// A frame with no pixels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Raw pixel bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Samples of the pixel at `(x, y)`.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let bpp = self.format.bytes_per_pixel();
        let start = (y as usize * self.width as usize + x as usize) * bpp;
        &self.data[start..start + bpp]
    }

    /// Mutable samples of the pixel at `(x, y)`.
    #[inline]
    pub fn pixel_mut(&mut self, x: u32, y: u32) -> &mut [u8] {
        let bpp = self.format.bytes_per_pixel();
        let start = (y as usize * self.width as usize + x as usize) * bpp;
        &mut self.data[start..start + bpp]
    }

    /// BT.601 luma of the pixel at `(x, y)` on the 0-255 scale.
    #[inline]
    pub fn luma(&self, x: u32, y: u32) -> f32 {
        let p = self.pixel(x, y);
        match self.format {
            PixelFormat::Gray8 => p[0] as f32,
            PixelFormat::Rgb8 | PixelFormat::Rgba8 => {
                0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32
            }
        }
    }
}
