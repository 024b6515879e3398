//! Auxiliary force effects.
//!
//! Effects run after the field forces and before integration, always in the
//! same order:
//!
//! 1. [`gravity`]: wells pull nearby particles
//! 2. [`scatter`]: periodic or pulsed bursts
//! 3. [`mirror`]: chords reflect particles about to cross them
//! 4. [`distortion`]: scan-line banding, then kaleidoscope folding
//!
//! [`trails`] records positions after integration so the rasterizer can
//! draw them. Every effect is a no-op at strength zero.

pub mod distortion;
pub mod gravity;
pub mod mirror;
pub mod scatter;
pub mod trails;

use rand::Rng;

use crate::params::Params;
use crate::particles::ParticleArena;

pub use gravity::GravityWells;
pub use mirror::Mirrors;
pub use scatter::{PulseSchedule, Scatter};
pub use trails::Trails;

/// What happened during one [`EffectStack::apply`] pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EffectReport {
    pub scattered: usize,
    pub reflected: usize,
}

/// State of every effect.
#[derive(Clone, Debug)]
pub struct EffectStack {
    pub gravity: GravityWells,
    pub scatter: Scatter,
    pub mirrors: Mirrors,
    pub trails: Trails,
}

impl Default for EffectStack {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectStack {
    pub fn new() -> Self {
        Self {
            gravity: GravityWells::new(),
            scatter: Scatter::new(),
            mirrors: Mirrors::new(),
            trails: Trails::new(),
        }
    }

    /// Drop all effect state; everything is rebuilt on first use.
    pub fn reset(&mut self) {
        self.gravity.clear();
        self.scatter.reset();
        self.mirrors.clear();
        self.trails.clear();
    }

    /// Run gravity, scatter, mirror and distortion on the arena.
    pub fn apply<R: Rng + ?Sized>(
        &mut self,
        arena: &mut ParticleArena,
        params: &Params,
        time: f32,
        tick: u64,
        step: f32,
        rng: &mut R,
    ) -> EffectReport {
        self.gravity.apply(arena, params.gravity_strength, step, rng);
        let scattered = self.scatter.apply(
            arena,
            params.scatter_strength,
            params.scatter_pulse,
            params.scatter_pulse_probability,
            params.movement_speed,
            tick,
            rng,
        );
        let reflected = self.mirrors.apply(arena, params.mirror_count, step, rng);
        distortion::scan_lines(arena, params.scan_line_interference, time, tick);
        distortion::kaleidoscope(arena, params.kaleidoscope_fractal, time);
        EffectReport { scattered, reflected }
    }

    /// Record trail points after integration.
    pub fn record_trails<R: Rng + ?Sized>(&mut self, arena: &ParticleArena, params: &Params, rng: &mut R) {
        self.trails.record(arena, params.trails, rng);
    }
}
