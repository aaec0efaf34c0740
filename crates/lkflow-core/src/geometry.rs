//! Pixel coordinates for tracked points.

use serde::{Deserialize, Serialize};

/// An integer pixel location selected by a feature detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CandidatePoint {
    pub x: i32,
    pub y: i32,
}

impl CandidatePoint {
    /// Create a new candidate point.
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Whether the `(2k+1)x(2k+1)` window centered here lies inside a
    /// `width`x`height` grid.
    #[inline]
    pub fn window_fits(self, k: i32, width: u32, height: u32) -> bool {
        let (w, h) = (width as i64, height as i64);
        let (x, y, k) = (self.x as i64, self.y as i64, k as i64);
        x - k >= 0 && x + k < w && y - k >= 0 && y + k < h
    }

    /// Row-major index into a `width`-wide grid. Only meaningful for points
    /// inside the grid.
    #[inline]
    pub fn index(self, width: u32) -> usize {
        self.y as usize * width as usize + self.x as usize
    }
}
