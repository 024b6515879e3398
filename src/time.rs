//! Frame clock for driving the simulation.
//!
//! The engine is clocked from outside: each call to
//! [`Simulation::tick`](crate::Simulation::tick) is one frame, and its delta
//! is clamped to [`MAX_DELTA`] there. `FrameClock` is a convenient source of
//! that delta. It reads wall time, applies the same ceiling, and can pause or
//! replay at a fixed step for offline rendering.
//!
//! # Example
//!
//! ```ignore
//! use pixel_drift::time::FrameClock;
//!
//! let mut clock = FrameClock::new();
//! while running {
//!     if let Some(frame) = sim.tick(clock.update()) {
//!         present(&frame);
//!     }
//! }
//! ```

use std::time::{Duration, Instant};

/// Largest delta a single tick may integrate, in seconds.
pub const MAX_DELTA: f32 = 0.05;

/// How often the frame rate estimate is refreshed.
const FPS_WINDOW: Duration = Duration::from_millis(500);

/// Clamp an externally supplied delta into `[0, MAX_DELTA]`.
///
/// NaN and negative deltas integrate nothing.
#[inline]
pub fn clamp_delta(delta: f32) -> f32 {
    clamp_to(delta, MAX_DELTA)
}

#[inline]
fn clamp_to(delta: f32, ceiling: f32) -> f32 {
    if delta.is_finite() {
        delta.clamp(0.0, ceiling)
    } else {
        0.0
    }
}

/// Frames counted over a sliding window.
#[derive(Debug, Clone, Copy)]
struct FpsMeter {
    window_start: Instant,
    frames_at_start: u64,
    rate: f32,
}

impl FpsMeter {
    fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames_at_start: 0,
            rate: 0.0,
        }
    }

    fn observe(&mut self, now: Instant, frames: u64) {
        let span = now.duration_since(self.window_start);
        if span < FPS_WINDOW {
            return;
        }
        self.rate = (frames - self.frames_at_start) as f32 / span.as_secs_f32();
        self.frames_at_start = frames;
        self.window_start = now;
    }
}

/// Wall-clock frame timing with a delta ceiling.
#[derive(Debug)]
pub struct FrameClock {
    created: Instant,
    previous: Instant,
    delta: f32,
    frames: u64,
    meter: FpsMeter,
    paused: bool,
    /// Step reported instead of wall time, for offline rendering.
    fixed: Option<f32>,
    ceiling: f32,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    /// A running clock starting now.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            created: now,
            previous: now,
            delta: 0.0,
            frames: 0,
            meter: FpsMeter::new(now),
            paused: false,
            fixed: None,
            ceiling: MAX_DELTA,
        }
    }

    /// A clock that reports `delta` every frame, however long the frame
    /// took to compute.
    pub fn fixed(delta: f32) -> Self {
        let mut clock = Self::new();
        clock.set_fixed_delta(Some(delta));
        clock
    }

    /// Advance one frame and return its clamped delta in seconds.
    /// A paused clock returns `0.0` and does not count the frame.
    pub fn update(&mut self) -> f32 {
        if self.paused {
            self.delta = 0.0;
            return 0.0;
        }

        let now = Instant::now();
        let measured = now.duration_since(self.previous).as_secs_f32();
        self.previous = now;
        self.delta = clamp_to(self.fixed.unwrap_or(measured), self.ceiling);
        self.frames += 1;
        self.meter.observe(now, self.frames);
        self.delta
    }

    /// Delta returned by the last [`FrameClock::update`].
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta
    }

    /// Frames counted so far.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frames
    }

    #[inline]
    pub fn fps(&self) -> f32 {
        self.meter.rate
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn max_delta(&self) -> f32 {
        self.ceiling
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Continue after [`FrameClock::pause`]. Time spent paused is skipped.
    pub fn resume(&mut self) {
        if std::mem::replace(&mut self.paused, false) {
            self.previous = Instant::now();
        }
    }

    /// Report a fixed step instead of wall time; `None` goes back to wall
    /// time. Non-finite steps are ignored.
    pub fn set_fixed_delta(&mut self, delta: Option<f32>) {
        self.fixed = delta.filter(|d| d.is_finite()).map(|d| d.max(0.0));
    }

    /// Change the delta ceiling. Non-positive values are ignored.
    pub fn set_max_delta(&mut self, ceiling: f32) {
        if ceiling.is_finite() && ceiling > 0.0 {
            self.ceiling = ceiling;
        }
    }

    /// Wall time since the clock was created.
    pub fn elapsed(&self) -> Duration {
        self.created.elapsed()
    }
}
