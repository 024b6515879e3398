//! Noise-driven generators: perlin, turbulent, directional and temporal.
//!
//! All of them sample [`PerlinNoise`] with the field time on the third axis,
//! so the pattern drifts smoothly as time advances.

use std::f32::consts::TAU;

use glam::Vec2;

use super::FieldVector;
use crate::noise::PerlinNoise;

/// Smallest and largest number of temporal blocks.
pub const MIN_BLOCKS: usize = 4;
pub const MAX_BLOCKS: usize = 16;

/// Smooth animated noise: the noise value picks both the angle and the
/// magnitude.
#[inline]
pub fn coherent_at(noise: &PerlinNoise, pos: Vec2, scale: f32, time: f32, strength: f32) -> FieldVector {
    let n = noise.noise3(pos.x * scale, pos.y * scale, time);
    FieldVector::from_angle(n * TAU, n.abs() * strength)
}

/// Fractal noise with `octaves` layers. Angles wrap twice as fast as the
/// coherent field, which breaks the flow into eddies.
#[inline]
pub fn turbulent_at(noise: &PerlinNoise, pos: Vec2, scale: f32, time: f32, octaves: u32, strength: f32) -> FieldVector {
    let n = noise.fbm3(pos.x * scale, pos.y * scale, time, octaves);
    FieldVector::from_angle(n * 2.0 * TAU, (0.25 + n.abs()) * strength)
}

/// A constant wind along `angle`, bent by noise.
#[inline]
pub fn directional_at(
    noise: &PerlinNoise,
    pos: Vec2,
    scale: f32,
    time: f32,
    angle: f32,
    influence: f32,
    strength: f32,
) -> FieldVector {
    let n = noise.noise3(pos.x * scale, pos.y * scale, time);
    let gust = Vec2::from_angle(n * TAU) * influence;
    FieldVector::from_vec((Vec2::from_angle(angle) + gust) * strength)
}

/// Number of blocks the temporal generator splits the canvas into, as
/// `(cols, rows)`.
pub fn block_layout(region_count: usize) -> (usize, usize) {
    let blocks = region_count.clamp(MIN_BLOCKS, MAX_BLOCKS);
    let cols = (blocks as f32).sqrt().ceil() as usize;
    let rows = blocks.div_ceil(cols);
    (cols, rows)
}

/// Phase offset and time rate of block `index`. Golden-ratio spacing keeps
/// neighboring blocks visibly out of step.
#[inline]
pub fn block_clock(index: usize) -> (f32, f32) {
    let i = index as f32;
    let phase = (i * 0.618_034).fract() * TAU;
    let rate = 0.5 + (i * 0.381_966 + 0.25).fract() * 1.5;
    (phase, rate)
}

/// Block index covering `pos` on a `width x height` canvas split into
/// `layout` blocks.
#[inline]
pub fn block_index(pos: Vec2, width: f32, height: f32, layout: (usize, usize)) -> usize {
    let (cols, rows) = layout;
    let c = ((pos.x / width.max(1.0)) * cols as f32).floor().clamp(0.0, (cols - 1) as f32) as usize;
    let r = ((pos.y / height.max(1.0)) * rows as f32).floor().clamp(0.0, (rows - 1) as f32) as usize;
    r * cols + c
}

/// Coherent noise where each block runs its own clock. The block index is
/// stored in the vector tag.
#[inline]
pub fn temporal_at(
    noise: &PerlinNoise,
    pos: Vec2,
    canvas: Vec2,
    layout: (usize, usize),
    scale: f32,
    time: f32,
    strength: f32,
) -> FieldVector {
    let block = block_index(pos, canvas.x, canvas.y, layout);
    let (phase, rate) = block_clock(block);
    coherent_at(noise, pos, scale, time * rate + phase, strength).with_tag(block as u32)
}
