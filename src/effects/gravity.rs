//! Gravity wells: a handful of point attractors that move every few
//! seconds.

use glam::Vec2;
use rand::Rng;

use crate::field::SINGULAR_EPSILON;
use crate::particles::ParticleArena;

/// Most wells alive at once.
pub const MAX_WELLS: usize = 10;

/// Ticks between well layouts.
pub const WELL_CADENCE: u64 = 180;

/// Velocity added per unit strength and mass at one pixel from a well.
const PULL: f32 = 0.5;

/// Fraction of the pull applied straight to position.
const NUDGE: f32 = 0.02;

/// Distance floor for the inverse-distance pull.
const MIN_DISTANCE: f32 = 4.0;

/// One attractor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GravityWell {
    pub position: Vec2,
    pub radius: f32,
    pub mass: f32,
}

/// The current well layout and when it is due to move.
#[derive(Clone, Debug)]
pub struct GravityWells {
    wells: Vec<GravityWell>,
    age: u64,
    stale: bool,
}

impl Default for GravityWells {
    fn default() -> Self {
        Self::new()
    }
}

impl GravityWells {
    pub fn new() -> Self {
        Self {
            wells: Vec::new(),
            age: 0,
            stale: true,
        }
    }

    pub fn wells(&self) -> &[GravityWell] {
        &self.wells
    }

    /// Lay the wells out again before the next pull.
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Drop every well.
    pub fn clear(&mut self) {
        self.wells.clear();
        self.age = 0;
        self.stale = true;
    }

    /// Place `strength`-dependent wells (one per unit, at least one, at most
    /// [`MAX_WELLS`]) at random on a `width x height` canvas.
    pub fn regenerate<R: Rng + ?Sized>(&mut self, width: u32, height: u32, strength: f32, rng: &mut R) {
        let w = width.max(1) as f32;
        let h = height.max(1) as f32;
        let count = (strength.ceil().max(1.0) as usize).min(MAX_WELLS);
        let span = w.min(h);
        self.wells = (0..count)
            .map(|_| GravityWell {
                position: Vec2::new(rng.gen_range(0.0..w), rng.gen_range(0.0..h)),
                radius: span * rng.gen_range(0.15..0.3),
                mass: rng.gen_range(0.5..1.5),
            })
            .collect();
        self.age = 0;
        self.stale = false;
        log::debug!("Placed {} gravity wells", count);
    }

    /// Pull particles within each well's radius. A strength of zero leaves
    /// the arena and the random stream untouched.
    pub fn apply<R: Rng + ?Sized>(&mut self, arena: &mut ParticleArena, strength: f32, step: f32, rng: &mut R) {
        if strength <= 0.0 {
            return;
        }
        if self.stale || self.age >= WELL_CADENCE {
            self.regenerate(arena.width(), arena.height(), strength, rng);
        }
        self.age += 1;

        let (positions, velocities) = arena.motion_mut();
        for (pos, vel) in positions.iter_mut().zip(velocities.iter_mut()) {
            for well in &self.wells {
                let d = well.position - *pos;
                let dist = d.length();
                if dist >= well.radius || dist < SINGULAR_EPSILON {
                    continue;
                }
                let pull = d / dist * (strength * well.mass * PULL / dist.max(MIN_DISTANCE)) * step;
                *vel += pull;
                *pos += pull * NUDGE;
            }
        }
    }
}
