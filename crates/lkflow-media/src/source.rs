//! Frame sources.

use lkflow_core::{Frame, Result};

/// A sequential producer of frames.
pub trait FrameSource {
    /// Dimensions shared by every frame of the stream.
    fn dimensions(&self) -> (u32, u32);

    /// The next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn dimensions(&self) -> (u32, u32) {
        (**self).dimensions()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }
}

/// A smooth grayscale texture that moves by a fixed integer velocity per frame.
///
/// Frame `t` samples the texture at `(x - t·vx, y - t·vy)`, so every pixel
/// of frame `t` reappears at `(x + vx, y + vy)` in frame `t + 1`.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    width: u32,
    height: u32,
    frames: usize,
    velocity: (i32, i32),
    index: usize,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32, frames: usize, velocity: (i32, i32)) -> Self {
        Self {
            width,
            height,
            frames,
            velocity,
            index: 0,
        }
    }

    /// Texture intensity at integer texture coordinates.
    pub fn texture(x: i64, y: i64) -> u8 {
        let (x, y) = (x as f32, y as f32);
        let v = 128.0 + 50.0 * (x / 4.0).sin() + 50.0 * (y / 4.0).sin();
        v.round().clamp(0.0, 255.0) as u8
    }

    /// Render frame `t` without advancing the stream.
    pub fn render(&self, t: usize) -> Frame {
        let dx = self.velocity.0 as i64 * t as i64;
        let dy = self.velocity.1 as i64 * t as i64;
        Frame::from_fn(self.width, self.height, |x, y| {
            let v = Self::texture(x as i64 - dx, y as i64 - dy);
            [v, v, v]
        })
    }
}

impl FrameSource for SyntheticSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.index >= self.frames {
            return Ok(None);
        }
        let frame = self.render(self.index);
        self.index += 1;
        Ok(Some(frame))
    }
}
