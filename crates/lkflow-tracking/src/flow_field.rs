//! Dense velocity field assembled from per-point solves.

use crate::gradients::Gradients;
use crate::solver::solve_point;
use glam::Vec2;
use lkflow_core::CandidatePoint;
use rayon::prelude::*;
use tracing::debug;

/// Per-pixel velocity components.
///
/// Cells start at zero and only candidate points whose window fits inside
/// the frame are written, so a zero cell means either "no estimate" or
/// "measured as stationary".
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityField {
    pub width: u32,
    pub height: u32,
    /// Horizontal velocity, row-major.
    pub u: Vec<f32>,
    /// Vertical velocity, row-major.
    pub v: Vec<f32>,
}

impl VelocityField {
    /// Create a zero velocity field.
    pub fn zeros(width: u32, height: u32) -> Self {
        let size = width as usize * height as usize;
        Self {
            width,
            height,
            u: vec![0.0; size],
            v: vec![0.0; size],
        }
    }

    /// Velocity at a pixel.
    #[inline]
    pub fn at(&self, x: u32, y: u32) -> Vec2 {
        let idx = y as usize * self.width as usize + x as usize;
        Vec2::new(self.u[idx], self.v[idx])
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, velocity: Vec2) {
        let idx = y as usize * self.width as usize + x as usize;
        self.u[idx] = velocity.x;
        self.v[idx] = velocity.y;
    }

    /// Get the flow magnitude at a pixel.
    pub fn magnitude_at(&self, x: u32, y: u32) -> f32 {
        self.at(x, y).length()
    }
}

/// Solve every candidate in parallel and write the results into a fresh
/// field sized like the gradient images.
///
/// Candidates whose window does not fit are skipped without invoking the
/// solver. Results are written back in candidate order, so duplicate points
/// resolve to the same value and repeated calls are bit-identical.
pub fn assemble(g: &Gradients, candidates: &[CandidatePoint], k: i32) -> VelocityField {
    let (width, height) = g.dimensions();
    let mut field = VelocityField::zeros(width, height);

    let solved: Vec<(usize, Vec2)> = candidates
        .par_iter()
        .filter(|p| p.window_fits(k, width, height))
        .filter_map(|p| solve_point(g, p.x, p.y, k).map(|d| (p.index(width), d)))
        .collect();

    for &(idx, d) in &solved {
        field.u[idx] = d.x;
        field.v[idx] = d.y;
    }

    debug!(
        candidates = candidates.len(),
        solved = solved.len(),
        window_radius = k,
        "Velocity field assembled"
    );
    field
}
