//! Single-channel floating point images.

use lkflow_core::{FlowError, Frame, Result};
use rayon::prelude::*;

/// A grayscale image stored as f32 values on the 0-255 scale of the
/// source samples.
#[derive(Debug, Clone, PartialEq)]
pub struct GrayImage {
    pub data: Vec<f32>,
    pub width: u32,
    pub height: u32,
}

impl GrayImage {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0.0; width as usize * height as usize],
            width,
            height,
        }
    }

    /// Build an image by evaluating `f` at every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> f32) -> Self {
        let mut img = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                img.data[y as usize * width as usize + x as usize] = f(x, y);
            }
        }
        img
    }

    /// Luma of every pixel of `frame`, rounded to whole 8-bit levels.
    pub fn from_frame(frame: &Frame) -> Self {
        let mut gray = Self::new(frame.width, frame.height);
        if frame.is_empty() {
            return gray;
        }
        let w = frame.width as usize;
        gray.data
            .par_chunks_mut(w)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, out) in row.iter_mut().enumerate() {
                    *out = frame.luma(x as u32, y as u32).round();
                }
            });
        gray
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, val: f32) {
        if x < self.width && y < self.height {
            self.data[y as usize * self.width as usize + x as usize] = val;
        }
    }

    /// Pixelwise `self - other`.
    pub fn difference(&self, other: &GrayImage) -> Result<GrayImage> {
        if self.dimensions() != other.dimensions() {
            return Err(FlowError::dimension_mismatch(
                self.dimensions(),
                other.dimensions(),
            ));
        }
        Ok(GrayImage {
            data: self
                .data
                .par_iter()
                .zip(other.data.par_iter())
                .map(|(a, b)| a - b)
                .collect(),
            width: self.width,
            height: self.height,
        })
    }
}
