//! Anti-aliased line and arrow rasterization on [`Frame`]s.

use glam::Vec2;
use lkflow_core::{Frame, PixelFormat};
use std::f32::consts::FRAC_PI_4;

/// Blend `color` into the pixel at `(x, y)` with coverage `alpha`.
/// Pixels outside the frame are ignored.
#[inline]
fn blend_pixel(frame: &mut Frame, x: i64, y: i64, color: [u8; 3], alpha: f32) {
    if x < 0 || y < 0 || x >= frame.width as i64 || y >= frame.height as i64 || alpha <= 0.0 {
        return;
    }
    let alpha = alpha.min(1.0);
    let mix = |old: u8, new: f32| (old as f32 * (1.0 - alpha) + new * alpha).round() as u8;
    let format = frame.format;
    let px = frame.pixel_mut(x as u32, y as u32);
    match format {
        PixelFormat::Gray8 => {
            let luma = 0.299 * color[0] as f32 + 0.587 * color[1] as f32 + 0.114 * color[2] as f32;
            px[0] = mix(px[0], luma);
        }
        PixelFormat::Rgb8 | PixelFormat::Rgba8 => {
            for (sample, &target) in px.iter_mut().zip(&color) {
                *sample = mix(*sample, target as f32);
            }
        }
    }
}

/// Draw a one pixel wide anti-aliased line (Xiaolin Wu) between two
/// pixel-center coordinates.
pub fn draw_line_aa(frame: &mut Frame, p0: Vec2, p1: Vec2, color: [u8; 3]) {
    let (mut x0, mut y0, mut x1, mut y1) = (p0.x, p0.y, p1.x, p1.y);
    if !(x0.is_finite() && y0.is_finite() && x1.is_finite() && y1.is_finite()) {
        return;
    }
    let steep = (y1 - y0).abs() > (x1 - x0).abs();
    if steep {
        std::mem::swap(&mut x0, &mut y0);
        std::mem::swap(&mut x1, &mut y1);
    }
    if x0 > x1 {
        std::mem::swap(&mut x0, &mut x1);
        std::mem::swap(&mut y0, &mut y1);
    }

    let dx = x1 - x0;
    let gradient = if dx == 0.0 { 0.0 } else { (y1 - y0) / dx };

    let mut plot = |major: i64, minor: i64, coverage: f32| {
        if steep {
            blend_pixel(frame, minor, major, color, coverage);
        } else {
            blend_pixel(frame, major, minor, color, coverage);
        }
    };

    let start = x0.round() as i64;
    let end = x1.round() as i64;
    for major in start..=end {
        let minor = y0 + gradient * (major as f32 - x0);
        let base = minor.floor();
        let frac = minor - base;
        plot(major, base as i64, 1.0 - frac);
        plot(major, base as i64 + 1, frac);
    }
}

/// Draw a line of the given thickness as parallel anti-aliased strokes.
pub fn draw_line(frame: &mut Frame, p0: Vec2, p1: Vec2, color: [u8; 3], thickness: u32) {
    if thickness <= 1 {
        draw_line_aa(frame, p0, p1, color);
        return;
    }
    let normal = (p1 - p0).perp().normalize_or_zero();
    let half = (thickness - 1) as f32 * 0.5;
    for i in 0..thickness {
        let offset = normal * (i as f32 - half);
        draw_line_aa(frame, p0 + offset, p1 + offset, color);
    }
}

/// Draw an arrow from `start` to `end` with two tip strokes at ±45°
/// whose length is `tip_length` times the shaft length.
pub fn draw_arrow(
    frame: &mut Frame,
    start: Vec2,
    end: Vec2,
    color: [u8; 3],
    thickness: u32,
    tip_length: f32,
) {
    draw_line(frame, start, end, color, thickness);

    let tip_size = start.distance(end) * tip_length;
    let back = start - end;
    let angle = back.y.atan2(back.x);
    for side in [FRAC_PI_4, -FRAC_PI_4] {
        let tip = end + Vec2::from_angle(angle + side) * tip_size;
        draw_line(frame, tip, end, color, thickness);
    }
}
