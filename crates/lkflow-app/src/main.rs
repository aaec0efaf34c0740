//! LKFlow - sparse optical flow on video streams
//!
//! Reads consecutive frames from a video file or camera, estimates
//! Lucas-Kanade flow between each pair and optionally encodes the arrow
//! overlay to a video file.

use anyhow::{bail, Context, Result};
use argh::FromArgs;
use lkflow_core::FlowConfig;
use lkflow_media::{
    default_camera, FrameSink, FrameSource, SyntheticSource, VideoDecoder, VideoEncoder,
};
use lkflow_tracking::FlowPipeline;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(FromArgs)]
/// Estimate and draw sparse optical flow between consecutive video frames
struct Args {
    /// path to an input video file
    #[argh(positional)]
    input: Option<PathBuf>,

    /// capture device to read from instead of a file (default when no input
    /// is given: /dev/video0 on Linux, device 0 on macOS)
    #[argh(option)]
    camera: Option<String>,

    /// generate a synthetic sequence moving by DX,DY pixels per frame
    #[argh(option)]
    synthetic: Option<String>,

    /// write the annotated frames to this video file
    #[argh(option, short = 'o')]
    output: Option<PathBuf>,

    /// JSON configuration file
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// window size override (odd, at least 3)
    #[argh(option, short = 'w')]
    window_size: Option<u32>,

    /// stop after this many frame pairs
    #[argh(option)]
    max_frames: Option<usize>,

    /// output frame rate (default: 30)
    #[argh(option, default = "30.0")]
    fps: f64,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args: Args = argh::from_env();
    let config = load_config(&args)?;
    let pipeline = FlowPipeline::new(config).context("invalid flow configuration")?;

    let mut source = open_source(&args)?;
    let (width, height) = source.dimensions();
    let sink: Option<Box<dyn FrameSink>> = match &args.output {
        Some(path) => {
            let encoder = VideoEncoder::create(path, width, height, args.fps)
                .with_context(|| format!("unable to create {}", path.display()))?;
            Some(Box::new(encoder) as Box<dyn FrameSink>)
        }
        None => None,
    };

    let processed = run(&pipeline, source.as_mut(), sink, args.max_frames)?;
    info!("Processed {} frame pairs", processed);
    Ok(())
}

fn load_config(args: &Args) -> Result<FlowConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("unable to read config {}", path.display()))?;
            FlowConfig::from_json(&json)?
        }
        None => FlowConfig::default(),
    };
    if let Some(window_size) = args.window_size {
        config.window_size = window_size;
    }
    Ok(config)
}

/// Where frames come from.
#[derive(Debug, PartialEq)]
enum Input {
    Video(PathBuf),
    Camera(String),
    Synthetic((i32, i32)),
}

/// Pick the input from the arguments. With nothing given, fall back to the
/// platform's first camera.
fn select_input(args: &Args) -> Result<Input> {
    if let Some(device) = &args.camera {
        return Ok(Input::Camera(device.clone()));
    }
    if let Some(velocity) = &args.synthetic {
        return Ok(Input::Synthetic(parse_velocity(velocity)?));
    }
    if let Some(path) = &args.input {
        return Ok(Input::Video(path.clone()));
    }
    match default_camera() {
        Some(device) => Ok(Input::Camera(device.to_string())),
        None => bail!("no input given; pass a video path, --camera DEVICE or --synthetic DX,DY"),
    }
}

fn open_source(args: &Args) -> Result<Box<dyn FrameSource>> {
    match select_input(args)? {
        Input::Camera(device) => {
            let decoder = VideoDecoder::open_camera(&device)
                .with_context(|| format!("unable to open camera {device}"))?;
            Ok(Box::new(decoder))
        }
        Input::Synthetic(velocity) => {
            let frames = args.max_frames.map_or(60, |n| n + 1);
            Ok(Box::new(SyntheticSource::new(320, 240, frames, velocity)))
        }
        Input::Video(path) => {
            let decoder = VideoDecoder::open(&path)
                .with_context(|| format!("unable to open video {}", path.display()))?;
            Ok(Box::new(decoder))
        }
    }
}

fn parse_velocity(value: &str) -> Result<(i32, i32)> {
    let (dx, dy) = value
        .split_once(',')
        .with_context(|| format!("expected DX,DY, got {value:?}"))?;
    Ok((
        dx.trim().parse().context("invalid DX")?,
        dy.trim().parse().context("invalid DY")?,
    ))
}

/// Process consecutive frame pairs until the source runs dry or `max_frames`
/// pairs are done. Returns the number of pairs processed.
fn run(
    pipeline: &FlowPipeline,
    source: &mut dyn FrameSource,
    mut sink: Option<Box<dyn FrameSink>>,
    max_frames: Option<usize>,
) -> Result<usize> {
    let mut prev = source
        .next_frame()
        .context("could not grab initial frame")?
        .context("could not grab initial frame: stream is empty")?;
    info!("Stream dimensions: {}x{}", prev.width, prev.height);

    let mut processed = 0;
    while max_frames.map_or(true, |max| processed < max) {
        let Some(next) = source.next_frame()? else {
            debug!("End of stream");
            break;
        };
        let started = Instant::now();
        let estimate = pipeline.estimate(&prev, &next)?;
        debug!(
            frame = processed,
            candidates = estimate.candidates.len(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Frame pair processed"
        );
        if let Some(sink) = sink.as_mut() {
            sink.write_frame(&pipeline.render(&prev, &estimate))?;
        }
        prev = next;
        processed += 1;
    }

    if let Some(sink) = sink {
        sink.finish()?;
    }
    Ok(processed)
}
