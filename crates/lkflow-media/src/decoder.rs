//! Video decoder using FFmpeg via ffmpeg-sidecar.
//!
//! FFmpeg runs as a subprocess and streams `rgb24` rawvideo on stdout, so no
//! FFmpeg development headers are needed at build time.

use crate::source::FrameSource;
use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use ffmpeg_sidecar::iter::FfmpegIterator;
use lkflow_core::{FlowError, Frame, PixelFormat, Result};
use std::path::Path;
use tracing::{debug, info, warn};

/// Decodes a video file or capture device into RGB frames.
pub struct VideoDecoder {
    name: String,
    width: u32,
    height: u32,
    child: FfmpegChild,
    events: FfmpegIterator,
    pending: Option<Frame>,
    frames_read: u64,
}

impl VideoDecoder {
    /// Open a video file for decoding.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path.to_string_lossy().into_owned();
        if !path.exists() {
            return Err(FlowError::Media(format!("file not found: {name}")));
        }

        info!("Opening video file: {}", name);
        let mut command = FfmpegCommand::new();
        command.hide_banner().input(name.as_str()).rawvideo();
        Self::spawn(command, name)
    }

    /// Open a capture device, e.g. `/dev/video0` on Linux.
    pub fn open_camera(device: &str) -> Result<Self> {
        info!("Opening camera: {}", device);
        let mut command = FfmpegCommand::new();
        command
            .hide_banner()
            .format(camera_format())
            .input(device)
            .rawvideo();
        Self::spawn(command, device.to_string())
    }

    fn spawn(mut command: FfmpegCommand, name: String) -> Result<Self> {
        let mut child = command
            .spawn()
            .map_err(|e| FlowError::Media(format!("failed to spawn ffmpeg for {name}: {e}")))?;
        let events = child
            .iter()
            .map_err(|e| FlowError::Media(format!("failed to read ffmpeg output: {e}")))?;

        let mut decoder = Self {
            name,
            width: 0,
            height: 0,
            child,
            events,
            pending: None,
            frames_read: 0,
        };

        // Dimensions come from the first decoded frame.
        let first = decoder
            .pull()?
            .ok_or_else(|| FlowError::Media(format!("no video frames in {}", decoder.name)))?;
        decoder.width = first.width;
        decoder.height = first.height;
        decoder.pending = Some(first);
        info!(
            "Opened {}: {}x{}",
            decoder.name, decoder.width, decoder.height
        );
        Ok(decoder)
    }

    /// Next raw frame from FFmpeg, skipping log and progress events.
    fn pull(&mut self) -> Result<Option<Frame>> {
        for event in self.events.by_ref() {
            match event {
                FfmpegEvent::OutputFrame(frame) => {
                    return frame_from_rgb24(frame.width, frame.height, frame.data).map(Some);
                }
                FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, msg) | FfmpegEvent::Error(msg) => {
                    warn!("ffmpeg: {}", msg);
                }
                FfmpegEvent::Done => break,
                _ => {}
            }
        }
        debug!(source = %self.name, frames = self.frames_read, "End of stream");
        Ok(None)
    }
}

impl FrameSource for VideoDecoder {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let frame = match self.pending.take() {
            Some(frame) => Some(frame),
            None => self.pull()?,
        };
        if let Some(frame) = &frame {
            if frame.dimensions() != (self.width, self.height) {
                return Err(FlowError::dimension_mismatch(
                    (self.width, self.height),
                    frame.dimensions(),
                ));
            }
            self.frames_read += 1;
        }
        Ok(frame)
    }
}

impl Drop for VideoDecoder {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Wrap an `rgb24` buffer from FFmpeg as a frame.
pub fn frame_from_rgb24(width: u32, height: u32, data: Vec<u8>) -> Result<Frame> {
    Frame::from_raw(width, height, PixelFormat::Rgb8, data)
        .map_err(|e| FlowError::Media(format!("malformed ffmpeg frame: {e}")))
}

/// First capture device on this platform, if FFmpeg can name it without
/// enumerating devices.
pub fn default_camera() -> Option<&'static str> {
    if cfg!(target_os = "macos") {
        Some("0")
    } else if cfg!(target_os = "windows") {
        None
    } else {
        Some("/dev/video0")
    }
}

/// FFmpeg input format for capture devices on this platform.
fn camera_format() -> &'static str {
    if cfg!(target_os = "macos") {
        "avfoundation"
    } else if cfg!(target_os = "windows") {
        "dshow"
    } else {
        "v4l2"
    }
}
