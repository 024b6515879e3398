//! Scatter bursts: a random share of particles is flung away at once.
//!
//! In periodic mode a burst fires every [`SCATTER_PERIOD`] ticks. In pulse
//! mode time is cut into windows of [`PULSE_WINDOW`] ticks; each window
//! holds at most one burst, with probability `scatter_pulse_probability`,
//! starting at a random offset and lasting [`PULSE_DURATION`] ticks. No
//! scatter happens outside a burst.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use crate::particles::ParticleArena;

/// Ticks between periodic bursts.
pub const SCATTER_PERIOD: u64 = 90;

/// Length of one pulse window in ticks.
pub const PULSE_WINDOW: u64 = 120;

/// Ticks a pulse burst stays active.
pub const PULSE_DURATION: u64 = 8;

/// Burst speed range, in multiples of the movement speed.
const BURST_SPEED: std::ops::Range<f32> = 3.0..6.0;

/// Position jump, in frames of the new velocity.
const JUMP: f32 = 2.0;

/// Decides which ticks fall inside a pulse burst.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PulseSchedule {
    window: Option<u64>,
    burst_start: Option<u64>,
}

impl PulseSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start of the burst in the current window, if any.
    pub fn burst_start(&self) -> Option<u64> {
        self.burst_start
    }

    /// Whether tick `tick` is inside a burst. Entering a new window draws
    /// that window's burst.
    pub fn is_active<R: Rng + ?Sized>(&mut self, tick: u64, probability: f32, rng: &mut R) -> bool {
        let window = tick / PULSE_WINDOW;
        if self.window != Some(window) {
            self.window = Some(window);
            let p = if probability.is_finite() { probability.clamp(0.0, 1.0) } else { 0.0 };
            self.burst_start = if rng.gen_bool(p as f64) {
                Some(window * PULSE_WINDOW + rng.gen_range(0..PULSE_WINDOW - PULSE_DURATION))
            } else {
                None
            };
        }
        matches!(self.burst_start, Some(start) if tick >= start && tick < start + PULSE_DURATION)
    }

    /// Forget the current window.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Periodic or pulsed scatter.
#[derive(Clone, Debug, Default)]
pub struct Scatter {
    pulse: PulseSchedule,
}

impl Scatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pulse(&self) -> &PulseSchedule {
        &self.pulse
    }

    pub fn reset(&mut self) {
        self.pulse.reset();
    }

    /// Whether a burst fires at `tick`.
    pub fn fires<R: Rng + ?Sized>(&mut self, tick: u64, pulse: bool, probability: f32, rng: &mut R) -> bool {
        if pulse {
            self.pulse.is_active(tick, probability, rng)
        } else {
            tick > 0 && tick % SCATTER_PERIOD == 0
        }
    }

    /// Fling `percent`% of particles (on average) when a burst fires.
    /// Returns how many particles were scattered.
    #[allow(clippy::too_many_arguments)]
    pub fn apply<R: Rng + ?Sized>(
        &mut self,
        arena: &mut ParticleArena,
        percent: f32,
        pulse: bool,
        probability: f32,
        speed: f32,
        tick: u64,
        rng: &mut R,
    ) -> usize {
        if percent <= 0.0 || !self.fires(tick, pulse, probability, rng) {
            return 0;
        }
        let fraction = (percent / 100.0).clamp(0.0, 1.0);
        let mut scattered = 0;
        let (positions, velocities) = arena.motion_mut();
        for (pos, vel) in positions.iter_mut().zip(velocities.iter_mut()) {
            if rng.gen::<f32>() >= fraction {
                continue;
            }
            *vel = Vec2::from_angle(rng.gen_range(0.0..TAU)) * rng.gen_range(BURST_SPEED) * speed;
            *pos += *vel * JUMP;
            scattered += 1;
        }
        log::debug!("Scatter burst at tick {} moved {} particles", tick, scattered);
        scattered
    }
}
