//! Arrow overlay of a velocity field.

use crate::draw::draw_arrow;
use crate::flow_field::VelocityField;
use glam::Vec2;
use lkflow_core::{ArrowStyle, CandidatePoint, Frame};
use rayon::prelude::*;

/// A velocity arrow in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrow {
    pub start: Vec2,
    pub end: Vec2,
}

/// The arrow to draw for `velocity` at `point`, or `None` when its
/// magnitude falls outside `[min_magnitude, max_magnitude]`.
pub fn arrow_for(point: CandidatePoint, velocity: Vec2, style: &ArrowStyle) -> Option<Arrow> {
    let magnitude = velocity.x.hypot(velocity.y);
    if !magnitude.is_finite()
        || magnitude < style.min_magnitude
        || magnitude > style.max_magnitude
    {
        return None;
    }
    let start = Vec2::new(point.x as f32, point.y as f32);
    Some(Arrow {
        start,
        end: start + velocity * style.scale,
    })
}

/// Arrows for every candidate whose window fits inside the field and whose
/// velocity passes the magnitude filter, in candidate order.
pub fn flow_arrows(
    field: &VelocityField,
    candidates: &[CandidatePoint],
    k: i32,
    style: &ArrowStyle,
) -> Vec<Arrow> {
    candidates
        .par_iter()
        .filter(|p| p.window_fits(k, field.width, field.height))
        .filter_map(|p| arrow_for(*p, field.at(p.x as u32, p.y as u32), style))
        .collect()
}

/// Draw the flow of `candidates` over a copy of `i1`.
///
/// Arrow selection runs in parallel; rasterization is sequential since
/// arrows may overlap.
pub fn render_flow(
    i1: &Frame,
    field: &VelocityField,
    candidates: &[CandidatePoint],
    k: i32,
    style: &ArrowStyle,
) -> Frame {
    let mut out = i1.clone();
    for arrow in flow_arrows(field, candidates, k, style) {
        draw_arrow(
            &mut out,
            arrow.start,
            arrow.end,
            style.color,
            style.thickness,
            style.tip_length,
        );
    }
    out
}
