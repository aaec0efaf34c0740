//! Integration tests for the flow estimator.
//!
//! Exercises lkflow-core frames through lkflow-tracking gradients, the
//! local solver and field assembly.

use glam::Vec2;
use lkflow_core::{CandidatePoint, Frame, GradientParams};
use lkflow_media::SyntheticSource;
use lkflow_tracking::{assemble, compute_gradients, solve_point, Gradients};

// ── Helpers ────────────────────────────────────────────────────

/// 100x100 black frame with a 40x40 square whose brightness ramps left to
/// right, shifted horizontally by `dx`.
fn shaded_square(dx: u32) -> Frame {
    Frame::from_fn(100, 100, |x, y| {
        let inside = (30 + dx..70 + dx).contains(&x) && (30..70).contains(&y);
        if inside {
            let v = (40 + 3 * (x - 30 - dx)) as u8;
            [v, v, v]
        } else {
            [0, 0, 0]
        }
    })
}

fn textured_pair(width: u32, height: u32, velocity: (i32, i32)) -> (Frame, Frame) {
    let source = SyntheticSource::new(width, height, 2, velocity);
    (source.render(0), source.render(1))
}

fn gradients(i1: &Frame, i2: &Frame) -> Gradients {
    compute_gradients(i1, i2, &GradientParams::default()).unwrap()
}

fn assert_close(actual: Vec2, expected: Vec2, tolerance: f32) {
    assert!(
        (actual - expected).abs().max_element() <= tolerance,
        "expected {expected:?} within {tolerance}, got {actual:?}"
    );
}

// ── End-to-end motion recovery ─────────────────────────────────

#[test]
fn shifted_square_moves_right() {
    let g = gradients(&shaded_square(0), &shaded_square(3));
    let field = assemble(&g, &[CandidatePoint::new(50, 50)], 2);
    assert_close(field.at(50, 50), Vec2::new(3.0, 0.0), 0.5);
}

#[test]
fn identical_frames_have_no_motion() {
    let (i1, _) = textured_pair(64, 48, (0, 0));
    let g = gradients(&i1, &i1);
    assert!(g.it.data.iter().all(|&v| v == 0.0));

    for y in 2..46 {
        for x in 2..62 {
            let velocity = solve_point(&g, x, y, 2).unwrap();
            assert!(velocity.length() < 1e-6, "({x}, {y}) -> {velocity:?}");
        }
    }
}

#[test]
fn texture_translation_is_recovered() {
    let points: Vec<CandidatePoint> = [13, 25, 38, 50]
        .into_iter()
        .flat_map(|x| [13, 25, 38].map(|y| CandidatePoint::new(x, y)))
        .collect();

    for velocity in [(1, 0), (0, 1), (1, -1)] {
        let (i1, i2) = textured_pair(64, 48, velocity);
        let g = gradients(&i1, &i2);
        let field = assemble(&g, &points, 4);
        let expected = Vec2::new(velocity.0 as f32, velocity.1 as f32);
        for p in &points {
            assert_close(field.at(p.x as u32, p.y as u32), expected, 0.2);
        }
    }
}

// ── Field assembly invariants ──────────────────────────────────

#[test]
fn border_candidates_stay_zero() {
    let g = gradients(&shaded_square(0), &shaded_square(3));
    let border = [
        CandidatePoint::new(1, 50),
        CandidatePoint::new(98, 50),
        CandidatePoint::new(50, 0),
        CandidatePoint::new(50, 99),
        CandidatePoint::new(-4, 10),
        CandidatePoint::new(250, 10),
    ];
    let field = assemble(&g, &border, 2);
    assert!(field.u.iter().all(|&u| u == 0.0));
    assert!(field.v.iter().all(|&v| v == 0.0));
    assert!(solve_point(&g, 1, 50, 2).is_none());
}

#[test]
fn only_candidates_are_written() {
    let (i1, i2) = textured_pair(64, 48, (1, 0));
    let g = gradients(&i1, &i2);
    let candidates = [CandidatePoint::new(20, 20), CandidatePoint::new(40, 30)];
    let field = assemble(&g, &candidates, 2);

    for y in 0..48 {
        for x in 0..64 {
            let is_candidate = candidates.contains(&CandidatePoint::new(x as i32, y as i32));
            if !is_candidate {
                assert_eq!(field.at(x, y), Vec2::ZERO, "({x}, {y}) was written");
            }
        }
    }
    assert!(field.magnitude_at(20, 20) > 0.5);
}

#[test]
fn assembly_is_idempotent() {
    let (i1, i2) = textured_pair(64, 48, (1, -1));
    let g = gradients(&i1, &i2);
    let candidates: Vec<CandidatePoint> = (3..45)
        .step_by(3)
        .flat_map(|y| (3..61).step_by(4).map(move |x| CandidatePoint::new(x, y)))
        .collect();

    let first = assemble(&g, &candidates, 2);
    let second = assemble(&g, &candidates, 2);
    assert_eq!(first, second);
    assert!(first
        .u
        .iter()
        .zip(&second.u)
        .all(|(a, b)| a.to_bits() == b.to_bits()));
}

#[test]
fn window_size_changes_the_estimate_only_slightly() {
    let (i1, i2) = textured_pair(64, 48, (1, 0));
    let g = gradients(&i1, &i2);
    let p = [CandidatePoint::new(25, 25)];
    let small = assemble(&g, &p, 2).at(25, 25);
    let large = assemble(&g, &p, 4).at(25, 25);
    assert_close(small, large, 0.3);
}
