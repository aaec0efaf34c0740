//! LKFlow Core - Foundation types for sparse optical flow
//!
//! This crate provides the fundamental types used throughout LKFlow:
//! - Frame buffers and pixel formats
//! - Candidate point coordinates
//! - Pipeline configuration
//! - Error types

pub mod config;
pub mod error;
pub mod frame;
pub mod geometry;

pub use config::{ArrowStyle, DetectorParams, FlowConfig, GradientParams};
pub use error::{FlowError, Result};
pub use frame::{Frame, PixelFormat};
pub use geometry::CandidatePoint;
