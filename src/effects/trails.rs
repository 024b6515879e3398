//! Trail histories for a random subset of particles.
//!
//! The subset size scales with intensity and is redrawn every
//! [`TRAIL_REFRESH`] ticks. Histories of particles that drop out of the
//! subset are purged immediately.

use std::collections::{HashMap, HashSet, VecDeque};

use glam::Vec2;
use rand::Rng;

use crate::particles::ParticleArena;

/// Ticks between subset redraws.
pub const TRAIL_REFRESH: u64 = 600;

/// Share of particles trailing at intensity 10.
pub const MAX_TRAIL_SHARE: f32 = 0.05;

/// Hard cap on trailing particles.
pub const MAX_TRAILING: usize = 20_000;

/// Longest history kept, in points.
pub const MAX_TRAIL_LENGTH: usize = 24;

/// Position histories keyed by particle id.
#[derive(Clone, Debug)]
pub struct Trails {
    histories: HashMap<u32, VecDeque<Vec2>>,
    age: u64,
    stale: bool,
}

impl Default for Trails {
    fn default() -> Self {
        Self::new()
    }
}

impl Trails {
    pub fn new() -> Self {
        Self {
            histories: HashMap::new(),
            age: 0,
            stale: true,
        }
    }

    /// Number of trailing particles.
    pub fn len(&self) -> usize {
        self.histories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }

    /// History of particle `id`, oldest point first.
    pub fn history(&self, id: u32) -> Option<&VecDeque<Vec2>> {
        self.histories.get(&id)
    }

    /// All histories in ascending id order.
    pub fn iter_sorted(&self) -> Vec<(u32, &VecDeque<Vec2>)> {
        let mut all: Vec<_> = self.histories.iter().map(|(id, h)| (*id, h)).collect();
        all.sort_unstable_by_key(|(id, _)| *id);
        all
    }

    /// Redraw the subset on the next pass.
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Drop every history.
    pub fn clear(&mut self) {
        self.histories.clear();
        self.age = 0;
        self.stale = true;
    }

    /// Points kept per history at `intensity`.
    #[inline]
    pub fn length_for(intensity: f32) -> usize {
        (4 + (intensity.clamp(0.0, 10.0) * 2.0) as usize).min(MAX_TRAIL_LENGTH)
    }

    /// Pick a fresh subset and purge histories that are no longer in it.
    pub fn reselect<R: Rng + ?Sized>(&mut self, particle_count: usize, intensity: f32, rng: &mut R) {
        let share = intensity.clamp(0.0, 10.0) / 10.0 * MAX_TRAIL_SHARE;
        let count = ((particle_count as f32 * share).round() as usize)
            .min(MAX_TRAILING)
            .min(particle_count);
        let chosen: HashSet<u32> = rand::seq::index::sample(rng, particle_count, count)
            .into_iter()
            .map(|i| i as u32)
            .collect();

        self.histories.retain(|id, _| chosen.contains(id));
        for id in chosen {
            self.histories.entry(id).or_default();
        }
        self.age = 0;
        self.stale = false;
        log::debug!("Trailing {} of {} particles", count, particle_count);
    }

    /// Record the current position of every trailing particle. An
    /// intensity of zero clears all trails.
    pub fn record<R: Rng + ?Sized>(&mut self, arena: &ParticleArena, intensity: f32, rng: &mut R) {
        if intensity <= 0.0 {
            if !self.histories.is_empty() {
                self.clear();
            }
            return;
        }
        if self.stale || self.age >= TRAIL_REFRESH {
            self.reselect(arena.len(), intensity, rng);
        }
        self.age += 1;

        let keep = Self::length_for(intensity);
        let positions = arena.positions();
        for (id, history) in self.histories.iter_mut() {
            let Some(pos) = positions.get(*id as usize) else {
                continue;
            };
            history.push_back(*pos);
            while history.len() > keep {
                history.pop_front();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceImage;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn arena(size: u32) -> ParticleArena {
        ParticleArena::from_image(&SourceImage::uniform(size, size, [9, 9, 9, 255]).unwrap())
    }

    #[test]
    fn test_subset_scales_with_intensity() {
        let a = arena(100);
        let mut rng = SmallRng::seed_from_u64(1);
        let mut trails = Trails::new();
        trails.record(&a, 10.0, &mut rng);
        assert_eq!(trails.len(), 500);
        trails.reselect(a.len(), 2.0, &mut rng);
        assert_eq!(trails.len(), 100);
    }

    #[test]
    fn test_history_bounded() {
        let mut a = arena(20);
        let mut rng = SmallRng::seed_from_u64(2);
        let mut trails = Trails::new();
        a.velocities_mut().fill(Vec2::new(0.5, 0.25));
        for _ in 0..100 {
            a.integrate(1.0);
            trails.record(&a, 3.0, &mut rng);
        }
        let keep = Trails::length_for(3.0);
        for (_, history) in trails.iter_sorted() {
            assert_eq!(history.len(), keep);
        }
    }

    #[test]
    fn test_reselect_purges_deselected() {
        let a = arena(50);
        let mut rng = SmallRng::seed_from_u64(3);
        let mut trails = Trails::new();
        trails.record(&a, 10.0, &mut rng);
        trails.reselect(a.len(), 2.0, &mut rng);
        assert_eq!(trails.len(), 25);
        for (_, history) in trails.iter_sorted() {
            assert!(history.len() <= 1);
        }
    }

    #[test]
    fn test_zero_intensity_clears() {
        let a = arena(30);
        let mut rng = SmallRng::seed_from_u64(4);
        let mut trails = Trails::new();
        trails.record(&a, 5.0, &mut rng);
        assert!(!trails.is_empty());
        trails.record(&a, 0.0, &mut rng);
        assert!(trails.is_empty());
    }

    #[test]
    fn test_sorted_iteration() {
        let a = arena(40);
        let mut rng = SmallRng::seed_from_u64(5);
        let mut trails = Trails::new();
        trails.record(&a, 4.0, &mut rng);
        let ids: Vec<u32> = trails.iter_sorted().into_iter().map(|(id, _)| id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }
}
