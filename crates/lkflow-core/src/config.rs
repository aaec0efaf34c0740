//! Pipeline configuration.
//!
//! Every tunable of the estimator lives here and is passed explicitly into the
//! pipeline. All structs deserialize with per-field defaults, so a JSON file
//! only needs to name the values it overrides.

use crate::error::{FlowError, Result};
use serde::{Deserialize, Serialize};

/// Smoothing applied before differentiation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientParams {
    /// Gaussian kernel size (odd).
    pub blur_size: usize,
    /// Gaussian standard deviation. Values <= 0 derive it from `blur_size`.
    pub blur_sigma: f32,
}

impl Default for GradientParams {
    fn default() -> Self {
        Self {
            blur_size: 3,
            blur_sigma: 0.0,
        }
    }
}

/// Shi-Tomasi corner detection limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Maximum number of corners returned (0 = unlimited).
    pub max_corners: usize,
    /// Minimum accepted response as a fraction of the strongest response.
    pub quality_level: f32,
    /// Minimum Euclidean distance between returned corners.
    pub min_distance: f32,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            max_corners: 10_000,
            quality_level: 0.001,
            min_distance: 10.0,
        }
    }
}

/// How velocities are drawn over the source frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrowStyle {
    /// Multiplier from velocity to arrow length in pixels.
    pub scale: f32,
    /// Arrow color, RGB.
    pub color: [u8; 3],
    /// Stroke thickness in pixels.
    pub thickness: u32,
    /// Tip length as a fraction of the shaft length.
    pub tip_length: f32,
    /// Velocities shorter than this are not drawn.
    pub min_magnitude: f32,
    /// Velocities longer than this are not drawn.
    pub max_magnitude: f32,
}

impl Default for ArrowStyle {
    fn default() -> Self {
        Self {
            scale: 5.0,
            color: [0, 255, 0],
            thickness: 1,
            tip_length: 0.2,
            min_magnitude: 1.0,
            max_magnitude: 10.0,
        }
    }
}

/// Full configuration for one flow pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Side length of the local Lucas-Kanade window.
    pub window_size: u32,
    pub gradients: GradientParams,
    pub detector: DetectorParams,
    pub arrows: ArrowStyle,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            gradients: GradientParams::default(),
            detector: DetectorParams::default(),
            arrows: ArrowStyle::default(),
        }
    }
}

impl FlowConfig {
    /// Configuration with the given window size and defaults elsewhere.
    pub fn with_window_size(window_size: u32) -> Self {
        Self {
            window_size,
            ..Self::default()
        }
    }

    /// Window radius `K`.
    #[inline]
    pub fn window_radius(&self) -> i32 {
        (self.window_size / 2) as i32
    }

    /// Parse a JSON configuration document.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| FlowError::Config(e.to_string()))
    }

    /// Reject settings the estimator cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.window_size < 3 || self.window_size % 2 == 0 {
            return Err(FlowError::InvalidParameter(format!(
                "window_size must be odd and >= 3, got {}",
                self.window_size
            )));
        }
        if self.gradients.blur_size == 0 || self.gradients.blur_size % 2 == 0 {
            return Err(FlowError::InvalidParameter(format!(
                "blur_size must be odd, got {}",
                self.gradients.blur_size
            )));
        }
        if !(self.detector.quality_level > 0.0 && self.detector.quality_level < 1.0) {
            return Err(FlowError::InvalidParameter(format!(
                "quality_level must be in (0, 1), got {}",
                self.detector.quality_level
            )));
        }
        if !(self.detector.min_distance.is_finite() && self.detector.min_distance >= 0.0) {
            return Err(FlowError::InvalidParameter(format!(
                "min_distance must be finite and not negative, got {}",
                self.detector.min_distance
            )));
        }
        let (min, max) = (self.arrows.min_magnitude, self.arrows.max_magnitude);
        if !(min.is_finite() && max.is_finite()) {
            return Err(FlowError::InvalidParameter(format!(
                "arrow magnitude bounds must be finite, got {min} and {max}"
            )));
        }
        if min > max {
            return Err(FlowError::InvalidParameter(format!(
                "arrow magnitude range is empty: {min} > {max}"
            )));
        }
        Ok(())
    }
}
