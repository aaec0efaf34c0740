//! Spatial and temporal derivatives of a frame pair.

use crate::filter::{gaussian_blur, sobel_x, sobel_y};
use crate::gray::GrayImage;
use lkflow_core::{FlowError, Frame, GradientParams, Result};

/// Derivative images of a frame pair.
///
/// Built once per pair and only read afterwards, so it can be shared by
/// reference across worker threads.
#[derive(Debug, Clone)]
pub struct Gradients {
    /// Derivative of the smoothed first frame along x.
    pub ix: GrayImage,
    /// Derivative of the smoothed first frame along y.
    pub iy: GrayImage,
    /// Raw grayscale difference `I2 - I1`.
    pub it: GrayImage,
    /// Gaussian-smoothed first frame.
    pub i1_smooth: GrayImage,
    /// Gaussian-smoothed second frame.
    pub i2_smooth: GrayImage,
}

impl Gradients {
    #[inline]
    pub fn width(&self) -> u32 {
        self.it.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.it.height
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        self.it.dimensions()
    }
}

/// Compute the gradients of `i1` (frame t) and `i2` (frame t+1).
///
/// Spatial derivatives come from the smoothed first frame only, while the
/// temporal derivative is taken between the unsmoothed grayscale frames.
pub fn compute_gradients(i1: &Frame, i2: &Frame, params: &GradientParams) -> Result<Gradients> {
    if i1.is_empty() || i2.is_empty() {
        return Err(FlowError::EmptyFrame);
    }
    if i1.dimensions() != i2.dimensions() {
        return Err(FlowError::dimension_mismatch(
            i1.dimensions(),
            i2.dimensions(),
        ));
    }
    if params.blur_size % 2 == 0 {
        return Err(FlowError::InvalidParameter(format!(
            "blur_size must be odd, got {}",
            params.blur_size
        )));
    }

    let i1_gray = GrayImage::from_frame(i1);
    let i2_gray = GrayImage::from_frame(i2);

    let i1_smooth = gaussian_blur(&i1_gray, params.blur_size, params.blur_sigma);
    let i2_smooth = gaussian_blur(&i2_gray, params.blur_size, params.blur_sigma);

    let ix = sobel_x(&i1_smooth);
    let iy = sobel_y(&i1_smooth);
    let it = i2_gray.difference(&i1_gray)?;

    Ok(Gradients {
        ix,
        iy,
        it,
        i1_smooth,
        i2_smooth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lkflow_core::PixelFormat;
    use proptest::prelude::*;

    fn checker(w: u32, h: u32) -> Frame {
        Frame::from_fn(w, h, |x, y| {
            let v = if ((x / 4) + (y / 4)) % 2 == 0 { 200 } else { 30 };
            [v, v, v]
        })
    }

    #[test]
    fn test_identical_frames_have_zero_it() {
        let frame = checker(32, 24);
        let g = compute_gradients(&frame, &frame, &GradientParams::default()).unwrap();
        assert!(g.it.data.iter().all(|&v| v == 0.0));
        assert!(g.ix.data.iter().any(|&v| v != 0.0));
        assert_eq!(g.i1_smooth, g.i2_smooth);
    }

    #[test]
    fn test_it_uses_unsmoothed_frames() {
        // A single bright pixel: the blur would spread it, the raw
        // difference must not
        let i1 = Frame::new(9, 9, PixelFormat::Rgb8);
        let i2 = Frame::from_fn(9, 9, |x, y| if (x, y) == (4, 4) { [255, 255, 255] } else { [0, 0, 0] });
        let g = compute_gradients(&i1, &i2, &GradientParams::default()).unwrap();
        assert!((g.it.get(4, 4) - 255.0).abs() < 0.01);
        assert_eq!(g.it.get(3, 4), 0.0);
        assert!(g.i2_smooth.get(3, 4) > 0.0);
    }

    #[test]
    fn test_spatial_derivatives_come_from_first_frame() {
        let flat = Frame::new(16, 16, PixelFormat::Rgb8);
        let g = compute_gradients(&flat, &checker(16, 16), &GradientParams::default()).unwrap();
        assert!(g.ix.data.iter().all(|&v| v == 0.0));
        assert!(g.iy.data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = compute_gradients(&checker(8, 8), &checker(8, 9), &GradientParams::default())
            .unwrap_err();
        assert!(matches!(err, FlowError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_empty_frame() {
        let empty = Frame::new(0, 0, PixelFormat::Rgb8);
        let err = compute_gradients(&empty, &empty, &GradientParams::default()).unwrap_err();
        assert!(matches!(err, FlowError::EmptyFrame));
    }

    #[test]
    fn test_even_blur_size() {
        let params = GradientParams {
            blur_size: 4,
            blur_sigma: 0.0,
        };
        assert!(compute_gradients(&checker(8, 8), &checker(8, 8), &params).is_err());
    }

    proptest! {
        #[test]
        fn gradients_match_input_dimensions(w in 1u32..40, h in 1u32..40, seed in any::<u8>()) {
            let i1 = Frame::from_fn(w, h, |x, y| {
                let v = (x * 7 + y * 13) as u8 ^ seed;
                [v, v / 2, 255 - v]
            });
            let i2 = Frame::from_fn(w, h, |x, y| {
                let v = (x * 11 + y * 3) as u8 ^ seed;
                [v / 3, v, v]
            });
            let g = compute_gradients(&i1, &i2, &GradientParams::default()).unwrap();
            for img in [&g.ix, &g.iy, &g.it, &g.i1_smooth, &g.i2_smooth] {
                prop_assert_eq!(img.dimensions(), (w, h));
                prop_assert_eq!(img.data.len(), (w * h) as usize);
            }
        }
    }
}
