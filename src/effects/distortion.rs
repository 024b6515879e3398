//! Scan-line interference and kaleidoscope folding.
//!
//! Both perturb velocities at any intensity and, above
//! [`DISPLACE_THRESHOLD`], also move particles directly.

use std::f32::consts::TAU;

use glam::Vec2;

use crate::field::SINGULAR_EPSILON;
use crate::particles::ParticleArena;

/// Intensity (0-10) above which particles are displaced directly.
pub const DISPLACE_THRESHOLD: f32 = 5.0;

/// Height of one scan-line band in pixels.
pub const BAND_HEIGHT: f32 = 4.0;

/// Kaleidoscope intensity above which sectors are folded a second time.
const NESTED_THRESHOLD: f32 = 4.0;

/// Kaleidoscope intensity above which the spiral and pulse terms join in.
const SPIRAL_THRESHOLD: f32 = 7.0;

/// Cheap hash of a band index and tick to `[-1, 1]`.
#[inline]
fn band_noise(band: i32, tick: u64) -> f32 {
    let x = (band as f32 * 12.9898 + (tick % 4096) as f32 * 78.233).sin() * 43_758.547;
    x.fract().abs() * 2.0 - 1.0
}

/// Horizontal jitter of scan-line band `band` at `tick`, in `[-1, 1]`.
/// Bands flicker on and off with a slow rolling envelope.
#[inline]
pub fn band_offset(band: i32, tick: u64, time: f32) -> f32 {
    let envelope = (band as f32 * 0.7 + time * 10.0).sin().max(0.0);
    band_noise(band, tick).clamp(-1.0, 1.0) * envelope
}

/// Shake particles sideways in horizontal bands.
pub fn scan_lines(arena: &mut ParticleArena, intensity: f32, time: f32, tick: u64) {
    if intensity <= 0.0 {
        return;
    }
    let displace = (intensity - DISPLACE_THRESHOLD).max(0.0);
    let (positions, velocities) = arena.motion_mut();
    for (pos, vel) in positions.iter_mut().zip(velocities.iter_mut()) {
        let band = (pos.y / BAND_HEIGHT).floor() as i32;
        let offset = band_offset(band, tick, time);
        vel.x += offset * intensity * 0.05;
        if displace > 0.0 {
            pos.x += offset * displace * 0.3;
        }
    }
}

/// Fold angle `theta` into the first half of a sector of width `sector`,
/// keeping the sector it started in.
#[inline]
pub fn fold_angle(theta: f32, sector: f32) -> f32 {
    let base = (theta / sector).floor() * sector;
    let local = theta - base;
    let folded = if local > sector * 0.5 { sector - local } else { local };
    base + folded
}

/// Number of kaleidoscope folds for an intensity in `0..=10`.
#[inline]
pub fn fold_count(intensity: f32) -> u32 {
    2 + intensity.round().clamp(0.0, 10.0) as u32
}

/// Mirror target of `pos` under an N-fold kaleidoscope around `center`.
pub fn kaleidoscope_target(pos: Vec2, center: Vec2, intensity: f32) -> Vec2 {
    let d = pos - center;
    let r = d.length();
    if r < SINGULAR_EPSILON {
        return pos;
    }
    let sector = TAU / fold_count(intensity) as f32;
    let mut theta = fold_angle(d.y.atan2(d.x), sector);
    if intensity > NESTED_THRESHOLD {
        theta = fold_angle(theta, sector * 0.5);
    }
    center + Vec2::from_angle(theta) * r
}

/// Pull particles toward their kaleidoscope mirror image.
pub fn kaleidoscope(arena: &mut ParticleArena, intensity: f32, time: f32) {
    if intensity <= 0.0 {
        return;
    }
    let center = Vec2::new(arena.width() as f32, arena.height() as f32) * 0.5;
    let pull = intensity * 0.001;
    let spiral = (intensity - SPIRAL_THRESHOLD).max(0.0) * 0.05;
    let displace = ((intensity - DISPLACE_THRESHOLD) / (10.0 - DISPLACE_THRESHOLD)).clamp(0.0, 1.0) * 0.05;

    let (positions, velocities) = arena.motion_mut();
    for (pos, vel) in positions.iter_mut().zip(velocities.iter_mut()) {
        let target = kaleidoscope_target(*pos, center, intensity);
        *vel += (target - *pos) * pull;

        if spiral > 0.0 {
            let d = *pos - center;
            let r = d.length();
            if r >= SINGULAR_EPSILON {
                let dir = d / r;
                *vel += dir.perp() * (time * 2.0).sin() * spiral;
                *vel += dir * (r * 0.05 - time * 5.0).sin() * spiral;
            }
        }
        if displace > 0.0 {
            *pos = pos.lerp(target, displace);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceImage;
    use std::f32::consts::PI;

    fn arena() -> ParticleArena {
        ParticleArena::from_image(&SourceImage::uniform(16, 16, [0, 0, 0, 255]).unwrap())
    }

    #[test]
    fn test_band_offset_range() {
        for band in -20..20 {
            for tick in 0..50 {
                let v = band_offset(band, tick, tick as f32 * 0.01);
                assert!((-1.0..=1.0).contains(&v));
            }
        }
    }

    #[test]
    fn test_fold_angle() {
        let sector = PI / 2.0;
        assert!((fold_angle(0.3, sector) - 0.3).abs() < 1e-6);
        assert!((fold_angle(sector - 0.3, sector) - 0.3).abs() < 1e-5);
        assert!((fold_angle(sector + 0.2, sector) - (sector + 0.2)).abs() < 1e-5);
    }

    #[test]
    fn test_kaleidoscope_target_keeps_radius() {
        let center = Vec2::new(8.0, 8.0);
        for i in 0..40 {
            let pos = center + Vec2::from_angle(i as f32 * 0.3) * 5.0;
            let target = kaleidoscope_target(pos, center, 6.0);
            assert!((target.distance(center) - 5.0).abs() < 1e-4);
        }
        assert_eq!(kaleidoscope_target(center, center, 6.0), center);
    }

    #[test]
    fn test_zero_intensity_is_noop() {
        let mut a = arena();
        a.velocities_mut().fill(Vec2::new(0.3, 0.1));
        let before = a.clone();
        scan_lines(&mut a, 0.0, 1.0, 5);
        kaleidoscope(&mut a, 0.0, 1.0);
        assert_eq!(a, before);
    }

    #[test]
    fn test_low_intensity_leaves_positions() {
        let mut a = arena();
        let before = a.positions().to_vec();
        scan_lines(&mut a, 3.0, 0.2, 7);
        kaleidoscope(&mut a, 3.0, 0.2);
        assert_eq!(a.positions(), &before[..]);
    }

    #[test]
    fn test_fold_count() {
        assert_eq!(fold_count(0.0), 2);
        assert_eq!(fold_count(10.0), 12);
        assert_eq!(fold_count(42.0), 12);
    }
}
