//! Mirror chords that reflect particles about to cross them.

use glam::Vec2;
use rand::Rng;

use crate::field::SINGULAR_EPSILON;
use crate::particles::ParticleArena;

/// A straight mirror between two points on the canvas border.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Chord {
    pub a: Vec2,
    pub b: Vec2,
    /// Unit normal of the chord.
    pub normal: Vec2,
}

impl Chord {
    /// A chord from `a` to `b`, or `None` when the points coincide.
    pub fn new(a: Vec2, b: Vec2) -> Option<Self> {
        let dir = b - a;
        let len = dir.length();
        if len < SINGULAR_EPSILON {
            return None;
        }
        Some(Self {
            a,
            b,
            normal: (dir / len).perp(),
        })
    }

    /// Where segment `p -> q` crosses this chord, as the fraction along
    /// `p -> q`. Parallel segments never cross.
    pub fn crossing(&self, p: Vec2, q: Vec2) -> Option<f32> {
        let r = q - p;
        let s = self.b - self.a;
        let denom = r.perp_dot(s);
        if denom.abs() < 1e-9 {
            return None;
        }
        let ap = self.a - p;
        let t = ap.perp_dot(s) / denom;
        let u = ap.perp_dot(r) / denom;
        if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
            Some(t)
        } else {
            None
        }
    }

    /// Reflect `v` about the chord normal.
    #[inline]
    pub fn reflect(&self, v: Vec2) -> Vec2 {
        v - 2.0 * v.dot(self.normal) * self.normal
    }
}

/// A random point on the border of a `w x h` canvas and the side it lies on.
fn border_point<R: Rng + ?Sized>(w: f32, h: f32, side: u32, rng: &mut R) -> Vec2 {
    match side {
        0 => Vec2::new(rng.gen_range(0.0..w), 0.0),
        1 => Vec2::new(w, rng.gen_range(0.0..h)),
        2 => Vec2::new(rng.gen_range(0.0..w), h),
        _ => Vec2::new(0.0, rng.gen_range(0.0..h)),
    }
}

/// The chord set.
#[derive(Clone, Debug)]
pub struct Mirrors {
    chords: Vec<Chord>,
    count: u32,
    stale: bool,
}

impl Default for Mirrors {
    fn default() -> Self {
        Self::new()
    }
}

impl Mirrors {
    pub fn new() -> Self {
        Self {
            chords: Vec::new(),
            count: 0,
            stale: true,
        }
    }

    pub fn chords(&self) -> &[Chord] {
        &self.chords
    }

    /// Redraw the chords before the next reflection pass.
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    pub fn clear(&mut self) {
        self.chords.clear();
        self.stale = true;
    }

    /// Draw `count` chords, each joining two different canvas sides.
    pub fn regenerate<R: Rng + ?Sized>(&mut self, width: u32, height: u32, count: u32, rng: &mut R) {
        let w = width.max(1) as f32;
        let h = height.max(1) as f32;
        self.chords.clear();
        while self.chords.len() < count as usize {
            let first = rng.gen_range(0..4);
            let second = (first + rng.gen_range(1..4)) % 4;
            let a = border_point(w, h, first, rng);
            let b = border_point(w, h, second, rng);
            if let Some(chord) = Chord::new(a, b) {
                self.chords.push(chord);
            }
        }
        self.count = count;
        self.stale = false;
        log::debug!("Drew {} mirror chords", count);
    }

    /// Reflect particles whose next step crosses a chord. Each particle is
    /// reflected at most once per call. Returns the number reflected.
    pub fn apply<R: Rng + ?Sized>(&mut self, arena: &mut ParticleArena, count: u32, step: f32, rng: &mut R) -> usize {
        if count == 0 {
            return 0;
        }
        if self.stale || self.count != count {
            self.regenerate(arena.width(), arena.height(), count, rng);
        }

        let mut reflected = 0;
        let (positions, velocities) = arena.motion_mut();
        for (pos, vel) in positions.iter_mut().zip(velocities.iter_mut()) {
            let next = *pos + *vel * step;
            for chord in &self.chords {
                if let Some(t) = chord.crossing(*pos, next) {
                    *pos += (next - *pos) * t;
                    *vel = chord.reflect(*vel);
                    reflected += 1;
                    break;
                }
            }
        }
        reflected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceImage;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn vertical() -> Chord {
        Chord::new(Vec2::new(5.0, 0.0), Vec2::new(5.0, 10.0)).unwrap()
    }

    #[test]
    fn test_crossing() {
        let chord = vertical();
        let t = chord.crossing(Vec2::new(4.0, 3.0), Vec2::new(6.0, 3.0)).unwrap();
        assert!((t - 0.5).abs() < 1e-6);
        assert!(chord.crossing(Vec2::new(1.0, 3.0), Vec2::new(2.0, 3.0)).is_none());
        assert!(chord.crossing(Vec2::new(4.0, 3.0), Vec2::new(4.0, 8.0)).is_none());
    }

    #[test]
    fn test_reflect() {
        let chord = vertical();
        let v = chord.reflect(Vec2::new(2.0, 1.0));
        assert!((v - Vec2::new(-2.0, 1.0)).length() < 1e-6);
    }

    #[test]
    fn test_degenerate_chord() {
        assert!(Chord::new(Vec2::ONE, Vec2::ONE).is_none());
    }

    #[test]
    fn test_regenerate_count() {
        let mut mirrors = Mirrors::new();
        let mut rng = SmallRng::seed_from_u64(1);
        mirrors.regenerate(64, 48, 20, &mut rng);
        assert_eq!(mirrors.chords().len(), 20);
        for chord in mirrors.chords() {
            assert!((chord.normal.length() - 1.0).abs() < 1e-5);
            for p in [chord.a, chord.b] {
                assert!(p.x >= 0.0 && p.x <= 64.0 && p.y >= 0.0 && p.y <= 48.0);
            }
        }
    }

    #[test]
    fn test_apply_reflects_once() {
        let image = SourceImage::uniform(10, 10, [0, 0, 0, 255]).unwrap();
        let mut arena = ParticleArena::from_image(&image);
        let id = 3 * 10 + 4;
        arena.velocities_mut()[id] = Vec2::new(2.0, 0.0);

        let mut mirrors = Mirrors::new();
        mirrors.chords = vec![vertical(), Chord::new(Vec2::new(5.5, 0.0), Vec2::new(5.5, 10.0)).unwrap()];
        mirrors.count = 2;
        mirrors.stale = false;
        let mut rng = SmallRng::seed_from_u64(2);

        assert_eq!(mirrors.apply(&mut arena, 2, 1.0, &mut rng), 1);
        assert!((arena.positions()[id] - Vec2::new(5.0, 3.0)).length() < 1e-5);
        assert!((arena.velocities()[id] - Vec2::new(-2.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_zero_count_is_noop() {
        let image = SourceImage::uniform(4, 4, [0, 0, 0, 255]).unwrap();
        let mut arena = ParticleArena::from_image(&image);
        arena.velocities_mut().fill(Vec2::new(3.0, 3.0));
        let before = arena.clone();
        let mut rng = SmallRng::seed_from_u64(3);
        assert_eq!(Mirrors::new().apply(&mut arena, 0, 1.0, &mut rng), 0);
        assert_eq!(arena, before);
    }
}
