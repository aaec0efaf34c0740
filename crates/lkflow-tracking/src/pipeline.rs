//! Per frame pair flow estimation entry point.

use crate::features::{CandidateDetector, ShiTomasiDetector};
use crate::flow_field::{assemble, VelocityField};
use crate::gradients::{compute_gradients, Gradients};
use crate::visualize::render_flow;
use lkflow_core::{CandidatePoint, FlowConfig, Frame, Result};
use std::time::Instant;
use tracing::debug;

/// Everything computed for one frame pair.
#[derive(Debug, Clone)]
pub struct FlowEstimate {
    pub gradients: Gradients,
    pub candidates: Vec<CandidatePoint>,
    pub field: VelocityField,
}

/// Lucas-Kanade flow estimator with an explicit configuration.
///
/// The pipeline holds no per-frame state: every call to [`estimate`] or
/// [`process`] recomputes gradients, candidates and velocities from scratch.
///
/// [`estimate`]: FlowPipeline::estimate
/// [`process`]: FlowPipeline::process
pub struct FlowPipeline {
    config: FlowConfig,
    detector: Box<dyn CandidateDetector>,
}

impl FlowPipeline {
    /// Create a pipeline with a Shi-Tomasi detector configured from `config`.
    pub fn new(config: FlowConfig) -> Result<Self> {
        config.validate()?;
        let detector = Box::new(ShiTomasiDetector::new(config.detector.clone()));
        Ok(Self { config, detector })
    }

    /// Replace the candidate detector.
    pub fn with_detector(mut self, detector: impl CandidateDetector + 'static) -> Self {
        self.detector = Box::new(detector);
        self
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Gradients, candidates and velocities for `i1` (frame t) and `i2`
    /// (frame t+1).
    pub fn estimate(&self, i1: &Frame, i2: &Frame) -> Result<FlowEstimate> {
        let started = Instant::now();
        let gradients = compute_gradients(i1, i2, &self.config.gradients)?;
        let candidates = self.detector.detect(&gradients.i1_smooth);
        let field = assemble(&gradients, &candidates, self.config.window_radius());
        debug!(
            width = i1.width,
            height = i1.height,
            candidates = candidates.len(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Flow estimated"
        );
        Ok(FlowEstimate {
            gradients,
            candidates,
            field,
        })
    }

    /// Estimate the flow and draw it over a copy of `i1`.
    pub fn process(&self, i1: &Frame, i2: &Frame) -> Result<Frame> {
        let estimate = self.estimate(i1, i2)?;
        Ok(self.render(i1, &estimate))
    }

    /// Draw a previously computed estimate over a copy of `i1`.
    pub fn render(&self, i1: &Frame, estimate: &FlowEstimate) -> Frame {
        render_flow(
            i1,
            &estimate.field,
            &estimate.candidates,
            self.config.window_radius(),
            &self.config.arrows,
        )
    }
}
