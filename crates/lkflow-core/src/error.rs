//! Error types for LKFlow.

use thiserror::Error;

/// Main error type for LKFlow operations.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame dimensions differ: {left_width}x{left_height} vs {right_width}x{right_height}")]
    DimensionMismatch {
        left_width: u32,
        left_height: u32,
        right_width: u32,
        right_height: u32,
    },

    #[error("Frame is empty")]
    EmptyFrame,

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Media error: {0}")]
    Media(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl FlowError {
    /// Build a [`FlowError::DimensionMismatch`] from two `(width, height)` pairs.
    pub fn dimension_mismatch(left: (u32, u32), right: (u32, u32)) -> Self {
        Self::DimensionMismatch {
            left_width: left.0,
            left_height: left.1,
            right_width: right.0,
            right_height: right.1,
        }
    }
}

/// Result type alias for LKFlow operations.
pub type Result<T> = std::result::Result<T, FlowError>;
