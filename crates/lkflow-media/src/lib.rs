//! LKFlow Media - frame input and output
//!
//! This crate handles:
//! - Decoding video files and cameras to RGB frames with FFmpeg
//! - Encoding annotated frames back to video
//! - Procedural test sequences with known motion

pub mod decoder;
pub mod encoder;
pub mod source;

pub use decoder::{default_camera, VideoDecoder};
pub use encoder::{FrameSink, MemorySink, VideoEncoder};
pub use source::{FrameSource, SyntheticSource};
