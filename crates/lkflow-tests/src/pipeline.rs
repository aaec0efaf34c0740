//! Integration tests for the frame-pair pipeline.
//!
//! Feeds lkflow-media sources through the lkflow-tracking pipeline and into
//! frame sinks, configured from lkflow-core JSON.

use glam::Vec2;
use lkflow_core::{FlowConfig, FlowError, Frame, PixelFormat};
use lkflow_media::{FrameSink, FrameSource, MemorySink, SyntheticSource};
use lkflow_tracking::FlowPipeline;

// ── Helpers ────────────────────────────────────────────────────

fn next(source: &mut SyntheticSource) -> Frame {
    source.next_frame().unwrap().expect("source ended early")
}

// ── Detection and estimation ───────────────────────────────────

#[test]
fn synthetic_motion_is_estimated_at_detected_points() {
    let pipeline = FlowPipeline::new(FlowConfig::default()).unwrap();
    for velocity in [(1, 0), (0, 1), (1, -1)] {
        let mut source = SyntheticSource::new(64, 48, 2, velocity);
        let (i1, i2) = (next(&mut source), next(&mut source));
        let estimate = pipeline.estimate(&i1, &i2).unwrap();
        assert!(!estimate.candidates.is_empty());

        let k = pipeline.config().window_radius();
        let expected = Vec2::new(velocity.0 as f32, velocity.1 as f32);
        for p in &estimate.candidates {
            if !p.window_fits(k, 64, 48) {
                continue;
            }
            let got = estimate.field.at(p.x as u32, p.y as u32);
            assert!(
                (got - expected).abs().max_element() < 0.4,
                "{p:?}: expected {expected:?}, got {got:?}"
            );
        }
    }
}

#[test]
fn json_config_drives_the_pipeline() {
    let config = FlowConfig::from_json(r#"{ "window_size": 9, "detector": { "max_corners": 3 } }"#)
        .unwrap();
    assert_eq!(config.window_radius(), 4);
    let pipeline = FlowPipeline::new(config).unwrap();

    let mut source = SyntheticSource::new(64, 48, 2, (1, 0));
    let (i1, i2) = (next(&mut source), next(&mut source));
    let estimate = pipeline.estimate(&i1, &i2).unwrap();
    assert_eq!(estimate.candidates.len(), 3);
}

#[test]
fn invalid_json_config_is_rejected() {
    assert!(matches!(
        FlowConfig::from_json("{ window_size: }"),
        Err(FlowError::Config(_))
    ));
    let even = FlowConfig::from_json(r#"{ "window_size": 6 }"#).unwrap();
    assert!(FlowPipeline::new(even).is_err());
}

// ── Rendering into sinks ───────────────────────────────────────

#[test]
fn moving_scene_is_annotated() {
    let pipeline = FlowPipeline::new(FlowConfig::default()).unwrap();
    let mut source = SyntheticSource::new(96, 64, 4, (2, 0));
    let mut sink = MemorySink::default();

    let mut prev = next(&mut source);
    while let Some(frame) = source.next_frame().unwrap() {
        sink.write_frame(&pipeline.process(&prev, &frame).unwrap()).unwrap();
        prev = frame;
    }

    assert_eq!(sink.frames.len(), 3);
    for (t, rendered) in sink.frames.iter().enumerate() {
        assert_eq!(rendered.dimensions(), (96, 64));
        assert_ne!(rendered, &source.render(t), "frame {t} has no arrows");
    }
    Box::new(sink).finish().unwrap();
}

#[test]
fn static_scene_is_not_annotated() {
    let pipeline = FlowPipeline::new(FlowConfig::default()).unwrap();
    let source = SyntheticSource::new(64, 48, 1, (0, 0));
    let frame = source.render(0);
    assert_eq!(pipeline.process(&frame, &frame).unwrap(), frame);
}

#[test]
fn mismatched_frames_are_an_error() {
    let pipeline = FlowPipeline::new(FlowConfig::default()).unwrap();
    let a = SyntheticSource::new(64, 48, 1, (0, 0)).render(0);
    let b = Frame::new(48, 64, PixelFormat::Rgb8);
    let err = pipeline.process(&a, &b).unwrap_err();
    assert!(err.to_string().contains("64x48"), "{err}");
}
