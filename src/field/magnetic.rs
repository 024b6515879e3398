//! Magnetic poles with inverse-square forces and optional dipole curves.

use glam::Vec2;
use rand::Rng;

use super::{FieldVector, SINGULAR_EPSILON};
use crate::params::PoleMode;

/// Largest supported number of poles.
pub const MAX_POLES: usize = 16;

/// Pole strength in pixels squared: a unit pole pushes with force 1 at a
/// distance of `sqrt(POLE_CHARGE)` pixels.
pub const POLE_CHARGE: f32 = 400.0;

/// Distances below this are clamped before the inverse-square term.
pub const MIN_POLE_DISTANCE: f32 = 8.0;

/// Largest force a single point can receive before scaling by strength.
const MAX_FORCE: f32 = 3.0;

/// A pole. Positive charges repel, negative charges attract.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pole {
    pub position: Vec2,
    pub charge: f32,
}

/// The pole layout of the magnetic generator.
#[derive(Clone, Debug, Default)]
pub struct MagnetSet {
    poles: Vec<Pole>,
}

impl MagnetSet {
    /// Place `count` poles (clamped to [`MAX_POLES`]) at random inside the
    /// inner 80% of the canvas.
    pub fn new<R: Rng + ?Sized>(width: u32, height: u32, count: usize, mode: PoleMode, rng: &mut R) -> Self {
        let w = width.max(1) as f32;
        let h = height.max(1) as f32;
        let poles = (0..count.clamp(1, MAX_POLES))
            .map(|i| {
                let sign = match mode {
                    PoleMode::Positive => 1.0,
                    PoleMode::Negative => -1.0,
                    PoleMode::Mixed if i % 2 == 0 => 1.0,
                    PoleMode::Mixed => -1.0,
                };
                Pole {
                    position: Vec2::new(rng.gen_range(0.1..0.9) * w, rng.gen_range(0.1..0.9) * h),
                    charge: sign * rng.gen_range(0.6..1.4),
                }
            })
            .collect();
        Self { poles }
    }

    /// Build from explicit poles.
    pub fn from_poles(poles: Vec<Pole>) -> Self {
        Self { poles }
    }

    /// Current poles.
    pub fn poles(&self) -> &[Pole] {
        &self.poles
    }

    /// Whether `pos` sits on a pole, where the field is undefined.
    pub fn is_singular(&self, pos: Vec2) -> bool {
        self.poles.iter().any(|pole| {
            let dist = pos.distance(pole.position);
            dist.is_nan() || dist < SINGULAR_EPSILON
        })
    }

    /// Field vector at `pos`. Zero on top of any pole.
    pub fn field_at(&self, pos: Vec2, dipole_curves: bool, strength: f32) -> FieldVector {
        if self.is_singular(pos) {
            return FieldVector::ZERO;
        }
        let mut acc = Vec2::ZERO;
        for pole in &self.poles {
            let d = pos - pole.position;
            let dist = d.length();
            let clamped = dist.max(MIN_POLE_DISTANCE);
            acc += d / dist * pole.charge * POLE_CHARGE / (clamped * clamped);
        }

        if dipole_curves {
            acc += self.dipole_term(pos);
        }

        let len = acc.length();
        if len > MAX_FORCE {
            acc *= MAX_FORCE / len;
        }
        FieldVector::from_vec(acc * strength)
    }

    /// Curved lines from each positive pole toward its nearest negative
    /// pole. Lines bow away from the pole axis on the positive half and
    /// return to it on the negative half.
    fn dipole_term(&self, pos: Vec2) -> Vec2 {
        let mut acc = Vec2::ZERO;
        for a in self.poles.iter().filter(|p| p.charge > 0.0) {
            let nearest = self
                .poles
                .iter()
                .filter(|p| p.charge < 0.0)
                .min_by(|x, y| {
                    let dx = x.position.distance_squared(a.position);
                    let dy = y.position.distance_squared(a.position);
                    dx.total_cmp(&dy)
                });
            let Some(b) = nearest else {
                continue;
            };

            let axis = b.position - a.position;
            let half = axis.length() * 0.5;
            if half < SINGULAR_EPSILON {
                continue;
            }
            let axis_dir = axis / (2.0 * half);
            let r = pos - (a.position + b.position) * 0.5;
            let along = r.dot(axis_dir);
            let across = r.dot(axis_dir.perp());

            let bow = (-along / half).clamp(-1.0, 1.0) * across.signum() * 0.8;
            let dir = (axis_dir + axis_dir.perp() * bow).normalize_or_zero();
            let dist2 = r.length_squared().max(MIN_POLE_DISTANCE * MIN_POLE_DISTANCE);
            let weight = (POLE_CHARGE * 0.5 * a.charge.abs().min(b.charge.abs()) / dist2).min(1.0);
            acc += dir * weight;
        }
        acc
    }
}
