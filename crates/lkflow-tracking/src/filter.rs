//! Separable convolution, Gaussian and Sobel kernels.
//!
//! Borders are handled by reflect-101 (`dcb|abcd|cba`), so the output has the
//! same size as the input and no pixel is left unfiltered.

use crate::gray::GrayImage;
use rayon::prelude::*;

/// Sobel derivative taps, scaled by 1/8 so that together with
/// [`SOBEL_SMOOTH`] a unit intensity ramp yields a unit gradient.
pub const SOBEL_DERIV: [f32; 3] = [-0.125, 0.0, 0.125];
/// Sobel smoothing taps.
pub const SOBEL_SMOOTH: [f32; 3] = [1.0, 2.0, 1.0];
/// Unnormalized 3-tap box.
pub const BOX3: [f32; 3] = [1.0, 1.0, 1.0];

/// Mirror an out-of-range index back into `0..len` without repeating the
/// edge sample.
#[inline]
pub fn reflect_101(mut i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    while i < 0 || i > last {
        if i < 0 {
            i = -i;
        }
        if i > last {
            i = 2 * last - i;
        }
    }
    i as usize
}

/// Create a 1D Gaussian kernel.
///
/// With `sigma <= 0` the sizes 1, 3, 5 and 7 use fixed binomial taps and
/// other sizes derive sigma as `0.3 * ((size - 1) * 0.5 - 1) + 0.8`.
pub fn gaussian_kernel_1d(size: usize, sigma: f32) -> Vec<f32> {
    if sigma <= 0.0 {
        match size {
            1 => return vec![1.0],
            3 => return vec![0.25, 0.5, 0.25],
            5 => return vec![0.0625, 0.25, 0.375, 0.25, 0.0625],
            7 => {
                return vec![
                    0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125,
                ]
            }
            _ => {}
        }
    }
    let sigma = if sigma > 0.0 {
        sigma
    } else {
        0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8
    };

    let mean = (size as f32 - 1.0) / 2.0;
    let mut kernel: Vec<f32> = (0..size)
        .map(|i| {
            let x = i as f32 - mean;
            (-(x * x) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let norm: f32 = kernel.iter().sum();
    kernel.iter_mut().for_each(|k| *k /= norm);
    kernel
}

/// Convolve with `kernel_x` along rows, then `kernel_y` along columns.
///
/// Kernels are applied as correlation, centered on their middle tap.
pub fn convolve_separable(src: &GrayImage, kernel_x: &[f32], kernel_y: &[f32]) -> GrayImage {
    if src.data.is_empty() {
        return src.clone();
    }
    let w = src.width as usize;
    let h = src.height as usize;

    let rx = (kernel_x.len() / 2) as isize;
    let mut tmp = GrayImage::new(src.width, src.height);
    tmp.data
        .par_chunks_mut(w)
        .zip(src.data.par_chunks(w))
        .for_each(|(out_row, src_row)| {
            for (x, out) in out_row.iter_mut().enumerate() {
                *out = kernel_x
                    .iter()
                    .enumerate()
                    .map(|(i, k)| k * src_row[reflect_101(x as isize + i as isize - rx, w)])
                    .sum();
            }
        });

    let ry = (kernel_y.len() / 2) as isize;
    let mut dst = GrayImage::new(src.width, src.height);
    dst.data
        .par_chunks_mut(w)
        .enumerate()
        .for_each(|(y, out_row)| {
            for (x, out) in out_row.iter_mut().enumerate() {
                *out = kernel_y
                    .iter()
                    .enumerate()
                    .map(|(i, k)| {
                        let sy = reflect_101(y as isize + i as isize - ry, h);
                        k * tmp.data[sy * w + x]
                    })
                    .sum();
            }
        });
    dst
}

/// Gaussian smoothing with a square `size`x`size` kernel.
pub fn gaussian_blur(src: &GrayImage, size: usize, sigma: f32) -> GrayImage {
    let kernel = gaussian_kernel_1d(size, sigma);
    convolve_separable(src, &kernel, &kernel)
}

/// First-order Sobel derivative along x.
pub fn sobel_x(src: &GrayImage) -> GrayImage {
    convolve_separable(src, &SOBEL_DERIV, &SOBEL_SMOOTH)
}

/// First-order Sobel derivative along y.
pub fn sobel_y(src: &GrayImage) -> GrayImage {
    convolve_separable(src, &SOBEL_SMOOTH, &SOBEL_DERIV)
}
