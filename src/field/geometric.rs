//! Stateless geometric generators.
//!
//! Each generator is a pure function of a canvas position and a handful of
//! scalars. Generators built around a center return [`FieldVector::ZERO`]
//! at the center itself.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::Vec2;

use super::{wrap_angle, FieldVector, SINGULAR_EPSILON};

/// Phase speed of the wave generator, in radians per time unit.
pub const WAVE_SPEED: f32 = 6.0;

/// Offset from `center` to `pos`, its length and unit direction, or `None`
/// at the singular point.
#[inline]
fn polar(pos: Vec2, center: Vec2) -> Option<(Vec2, f32, Vec2)> {
    let d = pos - center;
    let dist = d.length();
    if !dist.is_finite() || dist < SINGULAR_EPSILON {
        None
    } else {
        Some((d, dist, d / dist))
    }
}

/// Counterclockwise swirl decaying exponentially with distance.
pub fn vortex_at(pos: Vec2, center: Vec2, falloff: f32, strength: f32) -> FieldVector {
    let Some((_, dist, dir)) = polar(pos, center) else {
        return FieldVector::ZERO;
    };
    FieldVector::from_vec(dir.perp() * strength * (-dist * falloff).exp())
}

/// Outward push growing linearly with distance, saturating at `reach`.
pub fn radial_at(pos: Vec2, center: Vec2, reach: f32, strength: f32) -> FieldVector {
    let Some((_, dist, dir)) = polar(pos, center) else {
        return FieldVector::ZERO;
    };
    let t = (dist / reach.max(1.0)).min(1.0);
    FieldVector::from_vec(dir * strength * t)
}

/// Outward push plus a tangential component whose angle rotates with time
/// and a spiral that fades with distance.
pub fn centrifugal_at(pos: Vec2, center: Vec2, reach: f32, time: f32, strength: f32) -> FieldVector {
    let Some((d, dist, dir)) = polar(pos, center) else {
        return FieldVector::ZERO;
    };
    let rn = (dist / reach.max(1.0)).min(1.5);

    let outward = dir * (0.3 + 0.7 * rn);
    let tangential = Vec2::from_angle(time * 2.0).rotate(dir.perp()) * 0.5;
    let theta = d.y.atan2(d.x);
    let spiral = Vec2::from_angle(theta + rn * 2.0 * TAU + time) * 0.4 * (-rn * 3.0).exp();

    FieldVector::from_vec((outward + tangential + spiral) * strength)
}

/// Sinusoidal displacement travelling along `direction`. The vectors point
/// across the direction of travel.
pub fn wave_at(pos: Vec2, time: f32, wavelength: f32, amplitude: f32, direction: f32, strength: f32) -> FieldVector {
    let travel = Vec2::from_angle(direction);
    let phase = pos.dot(travel) * TAU / wavelength.max(1.0) - time * WAVE_SPEED;
    FieldVector::from_vec(travel.perp() * phase.sin() * amplitude * strength)
}

/// Current angle of the lidar scan line.
#[inline]
pub fn scan_angle(time: f32, speed: f32) -> f32 {
    (time * speed).rem_euclid(TAU)
}

/// Tangential impulse inside an angular band around the scan line, zero
/// elsewhere. The impulse fades linearly toward the band edges.
pub fn lidar_at(pos: Vec2, center: Vec2, scan: f32, band: f32, strength: f32) -> FieldVector {
    let Some((d, _, dir)) = polar(pos, center) else {
        return FieldVector::ZERO;
    };
    let offset = wrap_angle(d.y.atan2(d.x) - scan).abs();
    if offset >= band {
        return FieldVector::ZERO;
    }
    let impulse = (1.0 - offset / band) * 2.0 * strength;
    FieldVector::from_vec(dir.perp() * impulse)
}

/// Sub-triangle directions, indexed by [`sierpinski_cell`].
const SUB_ANGLES: [f32; 5] = [0.0, TAU / 3.0, 2.0 * TAU / 3.0, FRAC_PI_2, -FRAC_PI_2];

/// `(tiles per axis, rotation rate, weight)` for each nested scale.
const FRACTAL_SCALES: [(f32, f32, f32); 3] = [(1.0, 0.3, 0.5), (2.0, 0.5, 0.3), (4.0, 0.8, 0.2)];

/// Classify a point of the unit tile against a triangle `(0,0) (1,0) (0.5,1)`.
///
/// Returns the sub-triangle index (0-2 corners, 3 the inverted center, 4
/// outside) and the square of the largest barycentric weight, which peaks
/// at the corners.
pub fn sierpinski_cell(u: f32, v: f32) -> (usize, f32) {
    let lc = v;
    let lb = u - 0.5 * v;
    let la = 1.0 - lb - lc;
    if la < 0.0 || lb < 0.0 || lc < 0.0 {
        return (4, 0.0);
    }
    let peak = la.max(lb).max(lc);
    let sub = if la > 0.5 {
        0
    } else if lb > 0.5 {
        1
    } else if lc > 0.5 {
        2
    } else {
        3
    };
    (sub, peak * peak)
}

/// Multi-scale triangular subdivision. `u` and `v` are the position
/// normalized to the canvas.
pub fn fractal_at(u: f32, v: f32, time: f32, strength: f32) -> FieldVector {
    let mut acc = Vec2::ZERO;
    for (tiles, rate, weight) in FRACTAL_SCALES {
        let (sub, corner) = sierpinski_cell((u * tiles).fract(), (v * tiles).fract());
        let angle = SUB_ANGLES[sub] + time * rate * TAU;
        acc += Vec2::from_angle(angle) * weight * (0.25 + corner);
    }
    FieldVector::from_vec(acc * strength)
}

/// Overlapping spirals, pulses and axis interference. Strength enters
/// cubed, so small changes to it swing the field from calm to violent.
pub fn chromatic_at(pos: Vec2, center: Vec2, span: f32, time: f32, strength: f32) -> FieldVector {
    let Some((d, _, dir)) = polar(pos, center) else {
        return FieldVector::ZERO;
    };
    let q = d / span.max(1.0);
    let r = q.length();
    let theta = q.y.atan2(q.x);

    let p1 = time * 13.0;
    let p2 = time * 7.0 + 2.1;
    let p3 = time * 19.0 + 4.2;

    let spiral = Vec2::from_angle(theta + FRAC_PI_2) * (theta * 5.0 + r * 20.0 - p1).sin();
    let pulse = dir * (r * 30.0 - p2 * 3.0).sin();
    let beat = (q.x * 25.0 + p3).sin() * (q.y * 25.0 - p3).cos();
    let axis = Vec2::new((q.y * 17.0 + p3).sin(), (q.x * 17.0 - p3 + PI).cos()) * beat;
    let burst = dir * (0.5 + 0.5 * (p1 * 2.0).sin()) * r * 2.0;

    FieldVector::from_vec((spiral + pulse + axis + burst) * strength.powi(3))
}
