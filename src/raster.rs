//! Rasterizing particles back into pixels.
//!
//! Every tick produces a fresh [`FrameBuffer`]: the canvas is cleared to
//! opaque black, trail strokes are blended in, and then each particle writes
//! its original color at its rounded position. Particles are drawn in
//! ascending id order, so when two land on the same pixel the higher id
//! wins. The same arena always rasterizes to the same bytes.
//!
//! [`RasterMode::Splat`] instead spreads each particle over the four pixels
//! around it with bilinear weights and normalizes the sums.

use glam::Vec2;

use crate::effects::Trails;
use crate::particles::ParticleArena;

/// Opaque black.
pub const BACKGROUND: [u8; 4] = [0, 0, 0, 255];

/// An RGBA8 frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl FrameBuffer {
    /// An opaque black frame.
    pub fn new(width: u32, height: u32) -> Self {
        let mut frame = Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        };
        frame.fill(BACKGROUND);
        frame
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes, row-major.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Pixels as `[r, g, b, a]`.
    pub fn pixels(&self) -> &[[u8; 4]] {
        bytemuck::cast_slice(&self.data)
    }

    pub fn pixels_mut(&mut self) -> &mut [[u8; 4]] {
        bytemuck::cast_slice_mut(&mut self.data)
    }

    /// Pixel at `(x, y)`. Panics when out of bounds.
    pub fn get(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels()[(y * self.width + x) as usize]
    }

    /// Overwrite the pixel at `(x, y)`. Panics when out of bounds.
    pub fn set(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let idx = (y * self.width + x) as usize;
        self.pixels_mut()[idx] = rgba;
    }

    /// Paint every pixel.
    pub fn fill(&mut self, rgba: [u8; 4]) {
        self.pixels_mut().fill(rgba);
    }

    /// Copy into an `image::RgbaImage`.
    pub fn to_image(&self) -> image::RgbaImage {
        image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .unwrap_or_else(|| image::RgbaImage::new(self.width, self.height))
    }

    /// Alpha-blend `rgb` over the pixel at `(x, y)`.
    fn blend(&mut self, x: u32, y: u32, rgb: [u8; 4], alpha: f32) {
        let idx = (y * self.width + x) as usize;
        let dst = &mut self.pixels_mut()[idx];
        for c in 0..3 {
            let v = dst[c] as f32 + (rgb[c] as f32 - dst[c] as f32) * alpha;
            dst[c] = v.round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// How particles become pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RasterMode {
    /// Round to the nearest pixel; last write wins.
    #[default]
    Nearest,
    /// Bilinear splat with normalized accumulation.
    Splat,
}

/// Turns an arena into frames.
#[derive(Clone, Debug, Default)]
pub struct Rasterizer {
    mode: RasterMode,
    accum: Vec<[f32; 4]>,
}

impl Rasterizer {
    pub fn new(mode: RasterMode) -> Self {
        Self {
            mode,
            accum: Vec::new(),
        }
    }

    pub fn mode(&self) -> RasterMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: RasterMode) {
        self.mode = mode;
    }

    /// Draw the arena, with trail strokes underneath when `trails` is given.
    /// `trail_intensity` (0-10) sets how strongly strokes show.
    pub fn rasterize(&mut self, arena: &ParticleArena, trails: Option<&Trails>, trail_intensity: f32) -> FrameBuffer {
        let mut frame = FrameBuffer::new(arena.width(), arena.height());
        if let Some(trails) = trails {
            draw_trails(&mut frame, arena, trails, trail_intensity);
        }
        match self.mode {
            RasterMode::Nearest => draw_nearest(&mut frame, arena),
            RasterMode::Splat => self.draw_splat(&mut frame, arena),
        }
        frame
    }

    fn draw_splat(&mut self, frame: &mut FrameBuffer, arena: &ParticleArena) {
        let (w, h) = (frame.width() as usize, frame.height() as usize);
        self.accum.clear();
        self.accum.resize(w * h, [0.0; 4]);

        for (pos, color) in arena.positions().iter().zip(arena.colors()) {
            let x0 = pos.x.floor();
            let y0 = pos.y.floor();
            let fx = pos.x - x0;
            let fy = pos.y - y0;
            let taps = [
                (x0, y0, (1.0 - fx) * (1.0 - fy)),
                (x0 + 1.0, y0, fx * (1.0 - fy)),
                (x0, y0 + 1.0, (1.0 - fx) * fy),
                (x0 + 1.0, y0 + 1.0, fx * fy),
            ];
            for (x, y, weight) in taps {
                if weight <= 0.0 || x < 0.0 || y < 0.0 || x >= w as f32 || y >= h as f32 {
                    continue;
                }
                let cell = &mut self.accum[y as usize * w + x as usize];
                cell[0] += color[0] as f32 * weight;
                cell[1] += color[1] as f32 * weight;
                cell[2] += color[2] as f32 * weight;
                cell[3] += weight;
            }
        }

        for (px, cell) in frame.pixels_mut().iter_mut().zip(&self.accum) {
            if cell[3] > 0.0 {
                let inv = 1.0 / cell[3];
                *px = [
                    (cell[0] * inv).round().clamp(0.0, 255.0) as u8,
                    (cell[1] * inv).round().clamp(0.0, 255.0) as u8,
                    (cell[2] * inv).round().clamp(0.0, 255.0) as u8,
                    255,
                ];
            }
        }
    }
}

/// Round each particle to a pixel and write its original color.
fn draw_nearest(frame: &mut FrameBuffer, arena: &ParticleArena) {
    let (w, h) = (frame.width(), frame.height());
    for (pos, color) in arena.positions().iter().zip(arena.colors()) {
        if let Some((x, y)) = pixel_of(*pos, w, h) {
            frame.set(x, y, [color[0], color[1], color[2], 255]);
        }
    }
}

#[inline]
fn pixel_of(pos: Vec2, width: u32, height: u32) -> Option<(u32, u32)> {
    let x = pos.x.round();
    let y = pos.y.round();
    if x >= 0.0 && y >= 0.0 && x < width as f32 && y < height as f32 {
        Some((x as u32, y as u32))
    } else {
        None
    }
}

/// Faint strokes along each trail. Older segments are fainter; segments
/// that jump across a wrapped edge are skipped.
fn draw_trails(frame: &mut FrameBuffer, arena: &ParticleArena, trails: &Trails, intensity: f32) {
    let strength = intensity.clamp(0.0, 10.0) / 10.0;
    if strength <= 0.0 {
        return;
    }
    let (w, h) = (frame.width(), frame.height());
    let max_jump = (w.min(h) as f32 * 0.5).max(1.0);
    let colors = arena.colors();

    for (id, history) in trails.iter_sorted() {
        let Some(color) = colors.get(id as usize).copied() else {
            continue;
        };
        let n = history.len();
        for (i, (a, b)) in history.iter().zip(history.iter().skip(1)).enumerate() {
            if a.distance(*b) > max_jump {
                continue;
            }
            let age = (i + 1) as f32 / n as f32;
            let alpha = (0.05 + 0.25 * age) * strength;
            let steps = a.distance(*b).ceil().max(1.0) as u32;
            for s in 0..=steps {
                let p = a.lerp(*b, s as f32 / steps as f32);
                if let Some((x, y)) = pixel_of(p, w, h) {
                    frame.blend(x, y, color, alpha);
                }
            }
        }
    }
}
