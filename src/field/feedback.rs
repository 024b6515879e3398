//! Rendered-frame history and the echo generator built on it.
//!
//! After every rendered frame the simulation pushes a box-filtered copy of
//! the frame into a [`FrameHistory`]. The feedback generator turns the
//! colors of the last few frames into directions (hue picks the angle,
//! brightness and saturation the length), weights older frames less, and
//! follows the result one step downstream for a recursive echo. With no
//! history yet it falls back to plain coherent noise.

use std::collections::VecDeque;
use std::f32::consts::TAU;

use glam::Vec2;

use super::FieldVector;
use crate::raster::FrameBuffer;
use crate::source::{brightness, hue_saturation};

/// Frames kept by the default history.
pub const HISTORY_CAPACITY: usize = 3;

/// Downscale factor per axis applied to stored frames.
pub const FEEDBACK_DOWNSCALE: u32 = 4;

/// A box-filtered copy of a rendered frame.
#[derive(Clone, Debug, PartialEq)]
pub struct DownsampledFrame {
    width: u32,
    height: u32,
    factor: u32,
    pixels: Vec<[u8; 4]>,
}

impl DownsampledFrame {
    /// Average `factor x factor` blocks of an RGBA frame.
    pub fn from_frame(frame: &FrameBuffer, factor: u32) -> Self {
        let factor = factor.max(1);
        let width = frame.width().div_ceil(factor).max(1);
        let height = frame.height().div_ceil(factor).max(1);
        let src = frame.pixels();
        let src_w = frame.width() as usize;
        let src_h = frame.height() as usize;
        let f = factor as usize;

        let mut pixels = Vec::with_capacity((width * height) as usize);
        for by in 0..height as usize {
            for bx in 0..width as usize {
                let mut sum = [0u32; 4];
                let mut count = 0u32;
                for y in (by * f)..((by + 1) * f).min(src_h) {
                    for x in (bx * f)..((bx + 1) * f).min(src_w) {
                        let p = src[y * src_w + x];
                        for (acc, c) in sum.iter_mut().zip(p) {
                            *acc += c as u32;
                        }
                        count += 1;
                    }
                }
                let count = count.max(1);
                pixels.push(sum.map(|c| (c / count) as u8));
            }
        }

        Self {
            width,
            height,
            factor,
            pixels,
        }
    }

    /// Stored width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Stored height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Stored pixels, row-major.
    pub fn pixels(&self) -> &[[u8; 4]] {
        &self.pixels
    }

    /// Nearest stored pixel to canvas position `pos`, clamped to the frame.
    pub fn sample(&self, pos: Vec2) -> [u8; 4] {
        let scale = self.factor as f32;
        let x = clamp_cell(pos.x / scale, self.width);
        let y = clamp_cell(pos.y / scale, self.height);
        self.pixels[y * self.width as usize + x]
    }
}

#[inline]
fn clamp_cell(v: f32, len: u32) -> usize {
    if v.is_finite() {
        v.floor().clamp(0.0, (len - 1) as f32) as usize
    } else {
        0
    }
}

/// A bounded ring of recent downsampled frames, newest first.
#[derive(Clone, Debug)]
pub struct FrameHistory {
    frames: VecDeque<DownsampledFrame>,
    capacity: usize,
    factor: u32,
}

impl Default for FrameHistory {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

impl FrameHistory {
    /// A history holding up to `capacity` frames (clamped to 1-3).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, HISTORY_CAPACITY);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
            factor: FEEDBACK_DOWNSCALE,
        }
    }

    /// Store a downsampled copy of `frame`, evicting the oldest when full.
    pub fn push(&mut self, frame: &FrameBuffer) {
        if self.frames.len() == self.capacity {
            self.frames.pop_back();
        }
        self.frames.push_front(DownsampledFrame::from_frame(frame, self.factor));
    }

    /// Drop every stored frame.
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent frame.
    pub fn newest(&self) -> Option<&DownsampledFrame> {
        self.frames.front()
    }

    /// Frames from newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &DownsampledFrame> {
        self.frames.iter()
    }

    /// Echo vector at `pos`, or `None` with an empty history.
    ///
    /// `step` is how far (in pixels) the recursive sample looks downstream.
    pub fn echo_at(&self, pos: Vec2, step: f32) -> Option<Vec2> {
        let newest = self.newest()?;
        let mut acc = Vec2::ZERO;
        let mut total = 0.0;
        let mut weight = 1.0;
        for frame in self.iter() {
            acc += color_vector(frame.sample(pos)) * weight;
            total += weight;
            weight *= 0.5;
        }
        acc /= total;

        let ahead = pos + acc.normalize_or_zero() * step;
        acc += color_vector(newest.sample(ahead)) * 0.5;
        Some(acc)
    }
}

/// Direction encoded by a color: hue is the angle, brightness scaled by
/// saturation the length.
#[inline]
pub fn color_vector(rgba: [u8; 4]) -> Vec2 {
    let rgb = [rgba[0] as f32, rgba[1] as f32, rgba[2] as f32];
    let (hue, saturation) = hue_saturation(rgb);
    Vec2::from_angle(hue.to_radians()) * brightness(rgb) * (0.5 + 0.5 * saturation)
}

/// Blend the echo with a noise direction: weak echoes lean on the noise.
pub fn feedback_at(echo: Vec2, noise: f32, strength: f32) -> FieldVector {
    let k = echo.length().clamp(0.0, 1.0);
    let wander = Vec2::from_angle(noise * TAU) * noise.abs();
    FieldVector::from_vec((echo * k + wander * (1.0 - k)) * strength)
}
