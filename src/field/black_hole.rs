//! A single attractor combining inverse-square pull with orbital swirl.

use glam::Vec2;
use rand::Rng;

use super::{FieldVector, SINGULAR_EPSILON};

/// Gravitational pull constant in pixels squared.
const GRAVITY: f32 = 4000.0;
/// Orbital swirl constant in pixels.
const ORBIT: f32 = 150.0;
/// Caps on the two components before blending.
const GRAVITY_CAP: f32 = 3.0;
const ORBIT_CAP: f32 = 2.0;
/// Distance floor for both terms.
const MIN_DISTANCE: f32 = 4.0;

/// Attractor state: where it sits and which way matter orbits it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlackHole {
    pub center: Vec2,
    /// `1.0` for counterclockwise orbits, `-1.0` for clockwise.
    pub spin: f32,
}

impl BlackHole {
    /// Place the attractor near the canvas center.
    pub fn new<R: Rng + ?Sized>(width: u32, height: u32, rng: &mut R) -> Self {
        let w = width.max(1) as f32;
        let h = height.max(1) as f32;
        Self {
            center: Vec2::new(w * rng.gen_range(0.4..0.6), h * rng.gen_range(0.4..0.6)),
            spin: if rng.gen_bool(0.5) { 1.0 } else { -1.0 },
        }
    }

    /// Whether `pos` is on the attractor itself.
    pub fn is_singular(&self, pos: Vec2) -> bool {
        let dist = self.center.distance(pos);
        dist.is_nan() || dist < SINGULAR_EPSILON
    }

    /// Field vector at `pos`.
    ///
    /// Higher strength shifts the blend from orbiting toward falling in.
    /// The swirl direction wobbles slowly with time.
    pub fn field_at(&self, pos: Vec2, time: f32, strength: f32) -> FieldVector {
        if self.is_singular(pos) {
            return FieldVector::ZERO;
        }
        let d = self.center - pos;
        let dist = d.length();
        let inward = d / dist;
        let clamped = dist.max(MIN_DISTANCE);

        let gravity = (GRAVITY * strength / (clamped * clamped)).min(GRAVITY_CAP);
        let orbital = (ORBIT * strength / clamped).min(ORBIT_CAP);
        let ratio = (strength / (strength + 1.0)).clamp(0.1, 0.9);
        let swirl = Vec2::from_angle((time * 3.0).sin() * 0.35).rotate(inward.perp() * self.spin);

        FieldVector::from_vec(inward * gravity * ratio + swirl * orbital * (1.0 - ratio))
    }
}
