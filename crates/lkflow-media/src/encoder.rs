//! Frame sinks, including an H.264 encoder that pipes raw frames into FFmpeg.

use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use lkflow_core::{FlowError, Frame, PixelFormat, Result};
use std::borrow::Cow;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ChildStdin;
use tracing::{debug, info};

/// A sequential consumer of frames.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Flush and close the sink.
    fn finish(self: Box<Self>) -> Result<()>;
}

/// Keeps every written frame in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub frames: Vec<Frame>,
}

impl FrameSink for MemorySink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// Encodes frames to an H.264 file.
pub struct VideoEncoder {
    path: PathBuf,
    width: u32,
    height: u32,
    child: FfmpegChild,
    stdin: ChildStdin,
    frames_written: u64,
}

impl VideoEncoder {
    /// Start an FFmpeg encoder writing `width`x`height` frames at `fps` to `path`.
    pub fn create<P: AsRef<Path>>(path: P, width: u32, height: u32, fps: f64) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(FlowError::EmptyFrame);
        }
        if !(fps.is_finite() && fps > 0.0) {
            return Err(FlowError::InvalidParameter(format!(
                "frame rate must be positive, got {fps}"
            )));
        }
        let path = path.as_ref().to_path_buf();
        info!("Encoding {}x{} @ {} fps to {}", width, height, fps, path.display());

        let mut child = FfmpegCommand::new()
            .args(encoder_args(&path, width, height, fps))
            .spawn()
            .map_err(|e| FlowError::Media(format!("failed to spawn ffmpeg: {e}")))?;
        let stdin = child
            .take_stdin()
            .ok_or_else(|| FlowError::Media("failed to open ffmpeg stdin".into()))?;

        Ok(Self {
            path,
            width,
            height,
            child,
            stdin,
            frames_written: 0,
        })
    }
}

impl FrameSink for VideoEncoder {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(FlowError::dimension_mismatch(
                (self.width, self.height),
                frame.dimensions(),
            ));
        }
        self.stdin.write_all(&rgb24_bytes(frame))?;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        let Self {
            path,
            mut child,
            stdin,
            frames_written,
            ..
        } = *self;
        // Closing stdin signals end of stream.
        drop(stdin);

        let status = child
            .wait()
            .map_err(|e| FlowError::Media(format!("failed to wait for ffmpeg: {e}")))?;
        if !status.success() {
            return Err(FlowError::Media(format!(
                "ffmpeg exited with status: {status}"
            )));
        }
        debug!(frames = frames_written, path = %path.display(), "Encoding finished");
        Ok(())
    }
}

/// FFmpeg arguments reading rgb24 rawvideo on stdin and writing H.264.
pub fn encoder_args(path: &Path, width: u32, height: u32, fps: f64) -> Vec<String> {
    vec![
        "-loglevel".into(),
        "error".into(),
        "-y".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgb24".into(),
        "-s".into(),
        format!("{width}x{height}"),
        "-r".into(),
        fps.to_string(),
        "-i".into(),
        "-".into(),
        "-c:v".into(),
        "libx264".into(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        path.to_string_lossy().into_owned(),
    ]
}

/// Packed RGB samples of `frame`, converting if necessary.
fn rgb24_bytes(frame: &Frame) -> Cow<'_, [u8]> {
    match frame.format {
        PixelFormat::Rgb8 => Cow::Borrowed(frame.as_bytes()),
        PixelFormat::Rgba8 => Cow::Owned(
            frame
                .as_bytes()
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect(),
        ),
        PixelFormat::Gray8 => Cow::Owned(frame.as_bytes().iter().flat_map(|&v| [v, v, v]).collect()),
    }
}
