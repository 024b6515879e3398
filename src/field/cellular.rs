//! Pulsing cells that divide near their membrane.
//!
//! Every point belongs to the cell whose pulsing radius it sits deepest
//! inside. Within a cell the field has three zones: a gentle outward drift
//! in the nucleus, a spinning current along the membrane, and a weak pull
//! back toward the cell outside it.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use super::{FieldVector, SINGULAR_EPSILON};
use crate::particles::wrap_position;

/// Largest supported target population.
pub const MAX_TARGET: usize = 32;

/// The colony never grows beyond this multiple of its target.
pub const CAP_MULTIPLE: usize = 3;

/// Frames a cell must live before it may divide.
const MIN_DIVIDE_AGE: f32 = 30.0;

/// Division chance per frame for a cell old enough to divide.
const DIVIDE_CHANCE: f32 = 0.01;

/// Field zone a point falls into, stored in the vector tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum CellZone {
    Nucleus = 0,
    Membrane = 1,
    Outside = 2,
}

/// One cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cell {
    pub center: Vec2,
    pub base_radius: f32,
    pub phase: f32,
    pub pulse_rate: f32,
    pub age: f32,
    /// Membrane spin direction, `1.0` or `-1.0`.
    pub spin: f32,
}

impl Cell {
    /// Radius at field time `time`.
    #[inline]
    pub fn radius(&self, time: f32) -> f32 {
        self.base_radius * (1.0 + 0.25 * (time * self.pulse_rate + self.phase).sin())
    }
}

/// A population of cells around a target size.
#[derive(Clone, Debug)]
pub struct CellColony {
    cells: Vec<Cell>,
    target: usize,
    base_radius: f32,
    size: Vec2,
}

impl CellColony {
    /// Seed `target` cells (clamped to [`MAX_TARGET`]) at random.
    pub fn new<R: Rng + ?Sized>(width: u32, height: u32, target: usize, rng: &mut R) -> Self {
        let size = Vec2::new(width.max(1) as f32, height.max(1) as f32);
        let target = target.clamp(1, MAX_TARGET);
        let base_radius = (size.x.min(size.y) / (2.0 * (target as f32).sqrt()) * 0.8).max(2.0);
        let cells = (0..target)
            .map(|_| {
                let center = Vec2::new(rng.gen_range(0.0..size.x), rng.gen_range(0.0..size.y));
                spawn_cell(center, base_radius * rng.gen_range(0.8..1.2), rng)
            })
            .collect();
        Self {
            cells,
            target,
            base_radius,
            size,
        }
    }

    /// Current cells.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Population cap.
    pub fn capacity(&self) -> usize {
        self.target * CAP_MULTIPLE
    }

    /// Age every cell by `step` frames and let eligible cells divide.
    pub fn step<R: Rng + ?Sized>(&mut self, step: f32, time: f32, rng: &mut R) {
        if step <= 0.0 || !step.is_finite() {
            return;
        }
        let chance = (DIVIDE_CHANCE * step).clamp(0.0, 1.0) as f64;
        let cap = self.capacity();
        let existing = self.cells.len();
        let mut daughters = Vec::new();

        for cell in &mut self.cells {
            cell.age += step;
            if existing + daughters.len() >= cap {
                continue;
            }
            if cell.age < MIN_DIVIDE_AGE || !rng.gen_bool(chance) {
                continue;
            }
            let radius = cell.radius(time);
            let offset = Vec2::from_angle(rng.gen_range(0.0..TAU)) * radius * 0.9;
            let center = wrap_position(cell.center + offset, self.size.x, self.size.y);
            daughters.push(spawn_cell(center, cell.base_radius * rng.gen_range(0.7..0.9), rng));

            cell.age = 0.0;
            cell.base_radius = self.base_radius;
            cell.phase = rng.gen_range(0.0..TAU);
        }

        self.cells.extend(daughters);
        self.cells.truncate(cap);
    }

    /// Field vector at `pos` for field time `time`.
    pub fn field_at(&self, pos: Vec2, time: f32, strength: f32) -> FieldVector {
        let owner = self
            .cells
            .iter()
            .map(|c| (c, c.radius(time).max(1.0)))
            .min_by(|(a, ra), (b, rb)| {
                let da = pos.distance(a.center) / ra;
                let db = pos.distance(b.center) / rb;
                da.total_cmp(&db)
            });
        let Some((cell, radius)) = owner else {
            return FieldVector::ZERO;
        };

        let d = pos - cell.center;
        let dist = d.length();
        if dist < SINGULAR_EPSILON {
            return FieldVector::ZERO;
        }
        let dir = d / dist;
        let rn = dist / radius;

        let (v, zone) = if rn < 0.7 {
            (dir * 0.2 * (rn / 0.7), CellZone::Nucleus)
        } else if rn < 1.1 {
            (dir.perp() * cell.spin + dir * 0.3, CellZone::Membrane)
        } else {
            (-dir * 0.15 / rn, CellZone::Outside)
        };
        FieldVector::from_vec(v * strength).with_tag(zone as u32)
    }
}

fn spawn_cell<R: Rng + ?Sized>(center: Vec2, base_radius: f32, rng: &mut R) -> Cell {
    Cell {
        center,
        base_radius,
        phase: rng.gen_range(0.0..TAU),
        pulse_rate: rng.gen_range(3.0..8.0),
        age: 0.0,
        spin: if rng.gen_bool(0.5) { 1.0 } else { -1.0 },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_population_capped() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut colony = CellColony::new(200, 200, 4, &mut rng);
        assert_eq!(colony.cells().len(), 4);
        for i in 0..5000 {
            colony.step(5.0, i as f32 * 0.01, &mut rng);
            assert!(colony.cells().len() <= colony.capacity());
        }
        assert!(colony.cells().len() > 4);
    }

    #[test]
    fn test_daughters_stay_on_canvas() {
        let mut rng = SmallRng::seed_from_u64(2);
        let mut colony = CellColony::new(50, 30, 8, &mut rng);
        for i in 0..2000 {
            colony.step(3.0, i as f32 * 0.01, &mut rng);
        }
        for cell in colony.cells() {
            assert!(cell.center.x >= 0.0 && cell.center.x < 50.0);
            assert!(cell.center.y >= 0.0 && cell.center.y < 30.0);
        }
    }

    #[test]
    fn test_zones() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut colony = CellColony::new(400, 400, 1, &mut rng);
        colony.cells[0].center = Vec2::new(200.0, 200.0);
        colony.cells[0].base_radius = 40.0;
        colony.cells[0].phase = 0.0;
        let time = 0.0;

        let nucleus = colony.field_at(Vec2::new(210.0, 200.0), time, 1.0);
        let membrane = colony.field_at(Vec2::new(240.0, 200.0), time, 1.0);
        let outside = colony.field_at(Vec2::new(300.0, 200.0), time, 1.0);
        assert_eq!(nucleus.tag, CellZone::Nucleus as u32);
        assert_eq!(membrane.tag, CellZone::Membrane as u32);
        assert_eq!(outside.tag, CellZone::Outside as u32);
        assert!(outside.x < 0.0);
        assert_eq!(colony.field_at(Vec2::new(200.0, 200.0), time, 1.0), FieldVector::ZERO);
    }

    #[test]
    fn test_target_clamped() {
        let mut rng = SmallRng::seed_from_u64(4);
        let colony = CellColony::new(100, 100, 500, &mut rng);
        assert_eq!(colony.cells().len(), MAX_TARGET);
        assert_eq!(colony.capacity(), MAX_TARGET * CAP_MULTIPLE);
    }
}
