//! LKFlow Tracking - Lucas-Kanade optical flow at detected corners.
//!
//! Per frame pair the pipeline is:
//! 1. [`compute_gradients`] builds the spatial and temporal derivatives
//! 2. a [`CandidateDetector`] picks trackable points on the smoothed first frame
//! 3. [`assemble`] solves the local least-squares system at every point
//! 4. [`render_flow`] draws the resulting velocities as arrows

pub mod draw;
pub mod features;
pub mod filter;
pub mod flow_field;
pub mod gradients;
pub mod gray;
pub mod pipeline;
pub mod solver;
pub mod visualize;

pub use features::{CandidateDetector, ShiTomasiDetector};
pub use flow_field::{assemble, VelocityField};
pub use gradients::{compute_gradients, Gradients};
pub use gray::GrayImage;
pub use pipeline::{FlowEstimate, FlowPipeline};
pub use solver::{pseudo_inverse_sym, solve_point, Window};
pub use visualize::{arrow_for, render_flow, Arrow};
