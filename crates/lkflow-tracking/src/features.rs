//! Candidate point detection.
//!
//! The flow estimator only needs a list of pixels with trackable texture.
//! [`ShiTomasiDetector`] ranks pixels by the smaller eigenvalue of the local
//! structure tensor
//!
//! ```text
//! M = Σ [ Ix²    Ix·Iy ]
//!       [ Ix·Iy  Iy²   ]
//! ```
//!
//! summed over a 3x3 block, which is large only where the image varies in
//! two directions.

use crate::filter::{convolve_separable, sobel_x, sobel_y, BOX3};
use crate::gray::GrayImage;
use lkflow_core::{CandidatePoint, DetectorParams};
use rayon::prelude::*;
use std::cmp::Ordering;
use tracing::debug;

/// Source of candidate points for the flow estimator.
pub trait CandidateDetector: Send + Sync {
    /// Detect candidate points in a grayscale image.
    fn detect(&self, image: &GrayImage) -> Vec<CandidatePoint>;
}

/// Shi-Tomasi "good features to track" corner detector.
#[derive(Debug, Clone, Default)]
pub struct ShiTomasiDetector {
    pub params: DetectorParams,
}

impl ShiTomasiDetector {
    pub fn new(params: DetectorParams) -> Self {
        Self { params }
    }

    /// Minimum eigenvalue of the block-summed structure tensor at every pixel.
    pub fn min_eigen_response(&self, image: &GrayImage) -> GrayImage {
        let ix = sobel_x(image);
        let iy = sobel_y(image);

        let (w, h) = image.dimensions();
        let products = |f: fn(f32, f32) -> f32| GrayImage {
            data: ix
                .data
                .par_iter()
                .zip(iy.data.par_iter())
                .map(|(&gx, &gy)| f(gx, gy))
                .collect(),
            width: w,
            height: h,
        };
        let sxx = convolve_separable(&products(|gx, _| gx * gx), &BOX3, &BOX3);
        let sxy = convolve_separable(&products(|gx, gy| gx * gy), &BOX3, &BOX3);
        let syy = convolve_separable(&products(|_, gy| gy * gy), &BOX3, &BOX3);

        GrayImage {
            data: sxx
                .data
                .par_iter()
                .zip(sxy.data.par_iter())
                .zip(syy.data.par_iter())
                .map(|((&a, &b), &c)| {
                    let mean = 0.5 * (a + c);
                    let spread = (0.5 * (a - c)).hypot(b);
                    (mean - spread).max(0.0)
                })
                .collect(),
            width: w,
            height: h,
        }
    }
}

impl CandidateDetector for ShiTomasiDetector {
    /// Corners are strongest first. Each one is a 3x3 local maximum whose
    /// response exceeds `quality_level` times the strongest response, and
    /// lies at least `min_distance` from every stronger corner.
    fn detect(&self, image: &GrayImage) -> Vec<CandidatePoint> {
        let (w, h) = image.dimensions();
        if w < 3 || h < 3 {
            return Vec::new();
        }
        let response = self.min_eigen_response(image);
        let max_response = response.data.iter().copied().fold(0.0f32, f32::max);
        if max_response <= 0.0 {
            return Vec::new();
        }
        let threshold = max_response * self.params.quality_level;

        let mut peaks: Vec<(f32, CandidatePoint)> = (1..h - 1)
            .into_par_iter()
            .flat_map_iter(|y| {
                let response = &response;
                (1..w - 1).filter_map(move |x| {
                    let r = response.get(x, y);
                    if r <= threshold {
                        return None;
                    }
                    let is_peak = (y - 1..=y + 1)
                        .all(|ny| (x - 1..=x + 1).all(|nx| response.get(nx, ny) <= r));
                    is_peak.then(|| (r, CandidatePoint::new(x as i32, y as i32)))
                })
            })
            .collect();

        peaks.sort_by(|(ra, pa), (rb, pb)| {
            rb.partial_cmp(ra)
                .unwrap_or(Ordering::Equal)
                .then(pa.y.cmp(&pb.y))
                .then(pa.x.cmp(&pb.x))
        });

        let corners = self.enforce_spacing(peaks.into_iter().map(|(_, p)| p), w, h);
        debug!(corners = corners.len(), "Shi-Tomasi detection complete");
        corners
    }
}

impl ShiTomasiDetector {
    /// Greedily keep points at least `min_distance` apart, bucketing accepted
    /// points into a grid of `min_distance`-sized cells so each check only
    /// visits the 3x3 neighbouring cells.
    fn enforce_spacing(
        &self,
        sorted: impl Iterator<Item = CandidatePoint>,
        width: u32,
        height: u32,
    ) -> Vec<CandidatePoint> {
        let limit = match self.params.max_corners {
            0 => usize::MAX,
            n => n,
        };
        let min_dist = self.params.min_distance;
        if min_dist.is_nan() || min_dist < 1.0 {
            return sorted.take(limit).collect();
        }

        // A distance beyond the frame collapses the grid to one cell.
        let cell = min_dist.min(width.max(height).max(1) as f32);
        let grid_w = (width as f32 / cell).ceil() as usize;
        let grid_h = (height as f32 / cell).ceil() as usize;
        let mut grid: Vec<Vec<CandidatePoint>> = vec![Vec::new(); grid_w * grid_h];
        let min_dist_sq = min_dist * min_dist;

        let mut kept = Vec::new();
        for p in sorted {
            let cx = (p.x as f32 / cell) as usize;
            let cy = (p.y as f32 / cell) as usize;
            let crowded = (cy.saturating_sub(1)..=(cy + 1).min(grid_h - 1)).any(|gy| {
                (cx.saturating_sub(1)..=(cx + 1).min(grid_w - 1)).any(|gx| {
                    grid[gy * grid_w + gx].iter().any(|q| {
                        let dx = (p.x - q.x) as f32;
                        let dy = (p.y - q.y) as f32;
                        dx * dx + dy * dy < min_dist_sq
                    })
                })
            });
            if crowded {
                continue;
            }
            grid[cy * grid_w + cx].push(p);
            kept.push(p);
            if kept.len() >= limit {
                break;
            }
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::gaussian_blur;

    fn square(w: u32, h: u32, lo: u32, hi: u32) -> GrayImage {
        let img = GrayImage::from_fn(w, h, |x, y| {
            if (lo..hi).contains(&x) && (lo..hi).contains(&y) {
                255.0
            } else {
                0.0
            }
        });
        gaussian_blur(&img, 3, 0.0)
    }

    fn checkerboard(w: u32, h: u32, cell: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            if ((x / cell) + (y / cell)) % 2 == 0 {
                255.0
            } else {
                0.0
            }
        })
    }

    #[test]
    fn test_square_has_four_corners() {
        let detector = ShiTomasiDetector::default();
        let corners = detector.detect(&square(64, 64, 20, 40));
        assert_eq!(corners.len(), 4, "{corners:?}");
        for expected in [(20, 20), (39, 20), (20, 39), (39, 39)] {
            assert!(
                corners
                    .iter()
                    .any(|c| (c.x - expected.0).abs() <= 2 && (c.y - expected.1).abs() <= 2),
                "no corner near {expected:?} in {corners:?}"
            );
        }
    }

    #[test]
    fn test_flat_image_has_no_corners() {
        let detector = ShiTomasiDetector::default();
        assert!(detector.detect(&GrayImage::from_fn(32, 32, |_, _| 90.0)).is_empty());
        assert!(detector.detect(&GrayImage::new(2, 2)).is_empty());
    }

    #[test]
    fn test_straight_edge_is_not_a_corner() {
        let img = gaussian_blur(
            &GrayImage::from_fn(32, 32, |x, _| if x >= 16 { 255.0 } else { 0.0 }),
            3,
            0.0,
        );
        assert!(ShiTomasiDetector::default().detect(&img).is_empty());
    }

    #[test]
    fn test_min_distance_is_respected() {
        let detector = ShiTomasiDetector::new(DetectorParams {
            min_distance: 7.0,
            ..DetectorParams::default()
        });
        let corners = detector.detect(&checkerboard(64, 64, 4));
        assert!(corners.len() > 4);
        for (i, a) in corners.iter().enumerate() {
            for b in &corners[i + 1..] {
                let d2 = ((a.x - b.x).pow(2) + (a.y - b.y).pow(2)) as f32;
                assert!(d2 >= 49.0, "{a:?} and {b:?} are too close");
            }
        }
    }

    #[test]
    fn test_max_corners_truncates() {
        let detector = ShiTomasiDetector::new(DetectorParams {
            max_corners: 3,
            ..DetectorParams::default()
        });
        assert_eq!(detector.detect(&checkerboard(64, 64, 8)).len(), 3);
    }

    #[test]
    fn test_detection_is_deterministic() {
        let detector = ShiTomasiDetector::default();
        let img = checkerboard(48, 40, 6);
        assert_eq!(detector.detect(&img), detector.detect(&img));
    }

    #[test]
    fn test_unbounded_min_distance_keeps_strongest_only() {
        let img = checkerboard(64, 64, 8);
        let strongest = ShiTomasiDetector::default().detect(&img)[0];
        let detector = ShiTomasiDetector::new(DetectorParams {
            min_distance: f32::INFINITY,
            ..DetectorParams::default()
        });
        assert_eq!(detector.detect(&img), vec![strongest]);

        let detector = ShiTomasiDetector::new(DetectorParams {
            min_distance: f32::NAN,
            max_corners: 5,
            ..DetectorParams::default()
        });
        assert_eq!(detector.detect(&img).len(), 5);
    }
}
