//! Particle storage and per-particle motion.
//!
//! Every source pixel becomes one particle. Particles live in a
//! struct-of-arrays [`ParticleArena`] keyed by a stable id `y * width + x`,
//! so the original pixel coordinates are implied by the id and never
//! stored or changed.
//!
//! Each tick the simulation runs [`accelerate`] (field, buoyancy, region
//! pull, jitter, damping, speed cap), then the effect stack, then
//! [`ParticleArena::integrate`] which moves and wraps every particle.

use glam::Vec2;
use rand::Rng;

use crate::field::VectorField;
use crate::params::Params;
use crate::region::{Region, Segmentation};
use crate::source::{brightness, SourceImage};

/// Per-frame velocity retention.
pub const DAMPING: f32 = 0.95;

/// Speed cap, as a multiple of the particle's movement speed.
pub const SPEED_CAP: f32 = 4.0;

/// Buoyancy force at full brightness and sensitivity 1.
const BUOYANCY: f32 = 0.05;

/// Region pull per pixel of distance to the region center.
const REGION_PULL: f32 = 0.0005;

/// Amplitude of the region pull oscillation.
const REGION_WOBBLE: f32 = 0.02;

/// Amplitude of the uniform jitter.
const JITTER: f32 = 0.02;

/// Wrap a position onto a `width x height` torus. The result is always in
/// `[0, width) x [0, height)`, including for non-finite input.
#[inline]
pub fn wrap_position(p: Vec2, width: f32, height: f32) -> Vec2 {
    Vec2::new(wrap_axis(p.x, width), wrap_axis(p.y, height))
}

#[inline]
fn wrap_axis(v: f32, size: f32) -> f32 {
    let w = v.rem_euclid(size);
    // rem_euclid can round up to exactly `size` for tiny negative input
    if w.is_finite() && w < size {
        w
    } else {
        0.0
    }
}

/// All particles of the loaded image.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleArena {
    width: u32,
    height: u32,
    positions: Vec<Vec2>,
    velocities: Vec<Vec2>,
    colors: Vec<[u8; 4]>,
    brightness: Vec<f32>,
    regions: Vec<Option<u16>>,
}

impl ParticleArena {
    /// One particle per pixel, each at its origin with zero velocity.
    pub fn from_image(image: &SourceImage) -> Self {
        let width = image.width();
        let height = image.height();
        let colors = image.pixels().to_vec();
        let brightness = colors
            .iter()
            .map(|c| brightness([c[0] as f32, c[1] as f32, c[2] as f32]))
            .collect();
        let count = colors.len();

        let mut arena = Self {
            width,
            height,
            positions: Vec::with_capacity(count),
            velocities: vec![Vec2::ZERO; count],
            colors,
            brightness,
            regions: vec![None; count],
        };
        arena.positions = (0..count as u32).map(|id| arena.origin_position(id)).collect();
        arena
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Original pixel coordinates of particle `id`.
    #[inline]
    pub fn origin(&self, id: u32) -> (u32, u32) {
        (id % self.width, id / self.width)
    }

    /// Original pixel coordinates as a position.
    #[inline]
    pub fn origin_position(&self, id: u32) -> Vec2 {
        let (x, y) = self.origin(id);
        Vec2::new(x as f32, y as f32)
    }

    pub fn positions(&self) -> &[Vec2] {
        &self.positions
    }

    pub fn positions_mut(&mut self) -> &mut [Vec2] {
        &mut self.positions
    }

    pub fn velocities(&self) -> &[Vec2] {
        &self.velocities
    }

    pub fn velocities_mut(&mut self) -> &mut [Vec2] {
        &mut self.velocities
    }

    /// Positions and velocities together, for effects that touch both.
    pub fn motion_mut(&mut self) -> (&mut [Vec2], &mut [Vec2]) {
        (&mut self.positions, &mut self.velocities)
    }

    /// Original colors.
    pub fn colors(&self) -> &[[u8; 4]] {
        &self.colors
    }

    /// Original brightness in `[0, 1]`.
    pub fn brightness(&self) -> &[f32] {
        &self.brightness
    }

    /// Region id of each particle, if any.
    pub fn regions(&self) -> &[Option<u16>] {
        &self.regions
    }

    /// Take region ids from a segmentation of the same image.
    pub fn assign_regions(&mut self, segmentation: &Segmentation) {
        let assignment = segmentation.assignment();
        if assignment.len() == self.regions.len() {
            self.regions.copy_from_slice(assignment);
        } else {
            log::warn!(
                "Segmentation covers {} pixels but {} particles are loaded; clearing regions",
                assignment.len(),
                self.regions.len()
            );
            self.regions.fill(None);
        }
    }

    /// Send every particle home and stop it.
    pub fn reset(&mut self) {
        for (id, pos) in self.positions.iter_mut().enumerate() {
            let id = id as u32;
            *pos = Vec2::new((id % self.width) as f32, (id / self.width) as f32);
        }
        self.velocities.fill(Vec2::ZERO);
    }

    /// Move every particle by `velocity * step` and wrap onto the canvas.
    pub fn integrate(&mut self, step: f32) {
        let (w, h) = (self.width as f32, self.height as f32);
        for (pos, vel) in self.positions.iter_mut().zip(&self.velocities) {
            *pos = wrap_position(*pos + *vel * step, w, h);
        }
    }

    /// Wrap every position onto the canvas without moving it.
    pub fn wrap(&mut self) {
        let (w, h) = (self.width as f32, self.height as f32);
        for pos in &mut self.positions {
            *pos = wrap_position(*pos, w, h);
        }
    }
}

/// What [`accelerate`] reads each tick.
pub struct MotionInput<'a> {
    pub field: &'a VectorField,
    /// Weight of the active generator (see `FieldKind::field_weight`).
    pub field_weight: f32,
    pub regions: &'a [Region],
    pub params: &'a Params,
    /// Field time.
    pub time: f32,
    /// Frames elapsed this tick (60 Hz units).
    pub step: f32,
}

/// Update every particle's velocity from its forces.
///
/// `v = v * 0.95 + force * step * speed`, then clamped to
/// `SPEED_CAP * speed`, where speed is the movement speed times the
/// particle's region velocity multiplier.
pub fn accelerate<R: Rng + ?Sized>(arena: &mut ParticleArena, input: &MotionInput<'_>, rng: &mut R) {
    let sensitivity = input.params.brightness_sensitivity;
    let base_speed = input.params.movement_speed;
    let time = input.time;
    let step = input.step;
    let damping = DAMPING.powf(step.max(0.0));

    for id in 0..arena.len() {
        let pos = arena.positions[id];
        let bright = arena.brightness[id];

        let mut force = input.field.sample_bilinear(pos.x, pos.y).force() * input.field_weight;

        let lift = (bright - 0.5) * 2.0 * sensitivity * BUOYANCY;
        force.y -= lift;
        if lift > 0.0 {
            let oy = (id as u32 / arena.width) as f32;
            force.x += (time * 3.0 + oy * 0.05).sin() * lift * 0.5;
        }

        let mut speed = base_speed;
        if let Some(region) = arena.regions[id].and_then(|r| input.regions.get(r as usize)) {
            let phase = time * 2.0 + id as f32 * 0.01;
            let wobble = Vec2::new(phase.sin(), (phase * 1.3).cos()) * REGION_WOBBLE;
            force += (region.center - pos) * REGION_PULL + wobble;
            speed *= region.velocity_multiplier;
        }

        force += Vec2::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)) * JITTER;

        let mut vel = arena.velocities[id] * damping + force * step * speed;
        let cap = SPEED_CAP * speed;
        let len = vel.length();
        if !len.is_finite() {
            vel = Vec2::ZERO;
        } else if len > cap {
            vel *= cap / len;
        }
        arena.velocities[id] = vel;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldVector;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn gradient_image(width: u32, height: u32) -> SourceImage {
        let mut data = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let v = ((x + y) * 255 / (width + height - 2).max(1)) as u8;
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        SourceImage::new(width, height, data).unwrap()
    }

    // ========== Wrapping ==========

    #[test]
    fn test_wrap_position() {
        assert_eq!(wrap_position(Vec2::new(-1.0, 5.0), 4.0, 4.0), Vec2::new(3.0, 1.0));
        assert_eq!(wrap_position(Vec2::new(4.0, 8.0), 4.0, 4.0), Vec2::new(0.0, 0.0));
        assert_eq!(wrap_position(Vec2::new(f32::NAN, f32::INFINITY), 4.0, 4.0), Vec2::ZERO);
        let tiny = wrap_position(Vec2::new(-1e-9, -1e-9), 4.0, 4.0);
        assert!(tiny.x < 4.0 && tiny.y < 4.0);
    }

    // ========== Arena ==========

    #[test]
    fn test_arena_starts_at_origins() {
        let arena = ParticleArena::from_image(&gradient_image(5, 3));
        assert_eq!(arena.len(), 15);
        assert_eq!(arena.origin(7), (2, 1));
        assert_eq!(arena.positions()[7], Vec2::new(2.0, 1.0));
        assert!(arena.velocities().iter().all(|v| *v == Vec2::ZERO));
        assert_eq!(arena.brightness()[0], 0.0);
    }

    #[test]
    fn test_reset_restores_origins() {
        let mut arena = ParticleArena::from_image(&gradient_image(4, 4));
        arena.velocities_mut().fill(Vec2::new(1.5, -0.5));
        arena.integrate(3.0);
        assert_ne!(arena.positions()[0], Vec2::ZERO);
        arena.reset();
        assert_eq!(arena, ParticleArena::from_image(&gradient_image(4, 4)));
    }

    #[test]
    fn test_integrate_wraps() {
        let mut arena = ParticleArena::from_image(&gradient_image(4, 4));
        arena.velocities_mut().fill(Vec2::new(-7.3, 11.9));
        for _ in 0..20 {
            arena.integrate(1.0);
        }
        for p in arena.positions() {
            assert!(p.x >= 0.0 && p.x < 4.0);
            assert!(p.y >= 0.0 && p.y < 4.0);
        }
    }

    // ========== Motion ==========

    #[test]
    fn test_speed_cap() {
        let image = gradient_image(8, 8);
        let mut arena = ParticleArena::from_image(&image);
        let mut field = VectorField::new(2, 2, 8, 8);
        field.fill(|_, _| FieldVector::from_vec(Vec2::new(1000.0, 0.0)));
        let params = Params::default().with_movement_speed(0.5);
        let input = MotionInput {
            field: &field,
            field_weight: 1.0,
            regions: &[],
            params: &params,
            time: 0.0,
            step: 1.0,
        };
        let mut rng = SmallRng::seed_from_u64(1);
        accelerate(&mut arena, &input, &mut rng);
        for v in arena.velocities() {
            assert!(v.length() <= SPEED_CAP * 0.5 + 1e-4);
            assert!(v.x > 0.0);
        }
    }

    #[test]
    fn test_buoyancy_direction() {
        let mut data = vec![0u8; 2 * 4];
        data[..4].copy_from_slice(&[255, 255, 255, 255]);
        data[4..].copy_from_slice(&[0, 0, 0, 255]);
        let image = SourceImage::new(2, 1, data).unwrap();
        let mut arena = ParticleArena::from_image(&image);
        let field = VectorField::new(1, 1, 2, 1);
        let params = Params::default();
        let input = MotionInput {
            field: &field,
            field_weight: 0.1,
            regions: &[],
            params: &params,
            time: 0.0,
            step: 1.0,
        };
        let mut rng = SmallRng::seed_from_u64(2);
        accelerate(&mut arena, &input, &mut rng);
        assert!(arena.velocities()[0].y < 0.0, "bright rises");
        assert!(arena.velocities()[1].y > 0.0, "dark sinks");
    }

    #[test]
    fn test_zero_step_only_keeps_velocity() {
        let mut arena = ParticleArena::from_image(&gradient_image(3, 3));
        arena.velocities_mut().fill(Vec2::new(0.5, 0.25));
        let field = VectorField::new(1, 1, 3, 3);
        let params = Params::default();
        let input = MotionInput {
            field: &field,
            field_weight: 0.1,
            regions: &[],
            params: &params,
            time: 0.0,
            step: 0.0,
        };
        let mut rng = SmallRng::seed_from_u64(3);
        accelerate(&mut arena, &input, &mut rng);
        assert!(arena.velocities().iter().all(|v| *v == Vec2::new(0.5, 0.25)));
    }
}
