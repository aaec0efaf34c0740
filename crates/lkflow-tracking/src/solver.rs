//! Local Lucas-Kanade solve at a single point.
//!
//! Brightness constancy gives one equation per window sample,
//! `Ix * u + Iy * v = -It`. Stacking the samples yields the overdetermined
//! system `A x = b` with `A = [IX | IY]` and `b = -IT`, solved through the
//! normal equations `(AᵀA) x = Aᵀb`.
//!
//! With the 1/8-scaled Sobel derivatives and the minus sign on `It`, the
//! solution is the displacement of the pattern in pixels per frame, positive
//! along +x (right) and +y (down).

use crate::gradients::Gradients;
use glam::{DMat2, DVec2, Vec2};
use lkflow_core::CandidatePoint;

/// Singular values below `SINGULAR_TOLERANCE * sigma_max` are dropped.
/// The derivative samples are f32, so anything finer is rounding noise.
const SINGULAR_TOLERANCE: f64 = 2.0 * f32::EPSILON as f64;

/// Derivative samples of the `(2k+1)x(2k+1)` neighbourhood of one point.
///
/// Samples are ordered with the x offset in the outer loop and the y offset
/// in the inner loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub ix: Vec<f32>,
    pub iy: Vec<f32>,
    pub it: Vec<f32>,
}

impl Window {
    /// Gather the window around `center`, or `None` if it does not fit
    /// inside the gradient images.
    pub fn sample(g: &Gradients, center: CandidatePoint, k: i32) -> Option<Self> {
        if !center.window_fits(k, g.width(), g.height()) {
            return None;
        }
        let side = (2 * k + 1).max(0) as usize;
        let mut window = Self {
            ix: Vec::with_capacity(side * side),
            iy: Vec::with_capacity(side * side),
            it: Vec::with_capacity(side * side),
        };
        let w = g.width() as usize;
        for w1 in -k..=k {
            for w2 in -k..=k {
                let idx = (center.y + w2) as usize * w + (center.x + w1) as usize;
                window.ix.push(g.ix.data[idx]);
                window.iy.push(g.iy.data[idx]);
                window.it.push(g.it.data[idx]);
            }
        }
        Some(window)
    }

    /// Number of samples `N`.
    #[inline]
    pub fn len(&self) -> usize {
        self.it.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.it.is_empty()
    }

    /// `(AᵀA, Aᵀb)`, accumulated in f64.
    pub fn normal_equations(&self) -> (DMat2, DVec2) {
        let mut sxx = 0.0f64;
        let mut sxy = 0.0f64;
        let mut syy = 0.0f64;
        let mut bx = 0.0f64;
        let mut by = 0.0f64;
        for ((&gx, &gy), &gt) in self.ix.iter().zip(&self.iy).zip(&self.it) {
            let (gx, gy, gt) = (gx as f64, gy as f64, gt as f64);
            sxx += gx * gx;
            sxy += gx * gy;
            syy += gy * gy;
            bx -= gx * gt;
            by -= gy * gt;
        }
        (
            DMat2::from_cols(DVec2::new(sxx, sxy), DVec2::new(sxy, syy)),
            DVec2::new(bx, by),
        )
    }

    /// Least-squares velocity for this window.
    pub fn solve(&self) -> Vec2 {
        let (ata, atb) = self.normal_equations();
        let x = pseudo_inverse_sym(ata) * atb;
        Vec2::new(x.x as f32, x.y as f32)
    }
}

/// Moore-Penrose pseudo-inverse of a symmetric 2x2 matrix.
///
/// For a symmetric positive semi-definite matrix the SVD coincides with the
/// eigendecomposition, which has a closed form in 2D. Directions whose
/// singular value is negligible relative to the largest one contribute
/// nothing, so a rank-deficient matrix yields the least-norm solution and the
/// zero matrix maps to zero.
pub fn pseudo_inverse_sym(m: DMat2) -> DMat2 {
    let a = m.x_axis.x;
    let b = m.y_axis.x;
    let c = m.y_axis.y;

    let mean = 0.5 * (a + c);
    let spread = (0.5 * (a - c)).hypot(b);
    let l1 = mean + spread;
    let l2 = mean - spread;

    let sigma_max = l1.abs().max(l2.abs());
    if sigma_max == 0.0 || !sigma_max.is_finite() {
        return DMat2::ZERO;
    }

    // eigenvector of l1, built from the better conditioned row
    let v = if a >= c {
        DVec2::new(l1 - c, b)
    } else {
        DVec2::new(b, l1 - a)
    };
    let v1 = v.try_normalize().unwrap_or(DVec2::X);
    let v2 = v1.perp();

    let tolerance = SINGULAR_TOLERANCE * sigma_max;
    let mut pinv = DMat2::ZERO;
    for (lambda, e) in [(l1, v1), (l2, v2)] {
        if lambda.abs() > tolerance {
            pinv += DMat2::from_cols(e * e.x, e * e.y) * (1.0 / lambda);
        }
    }
    pinv
}

/// Solve for the velocity `(dx, dy)` at `(x, y)` with window radius `k`.
///
/// Returns `None` when the window does not fit inside the frame. A
/// degenerate window is not an error: it yields the least-norm solution.
pub fn solve_point(g: &Gradients, x: i32, y: i32, k: i32) -> Option<Vec2> {
    Window::sample(g, CandidatePoint::new(x, y), k).map(|w| w.solve())
}
