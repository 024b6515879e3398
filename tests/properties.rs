//! Invariants that must hold for any input.
//!
//! Inputs are drawn from seeded `SmallRng` streams so failures reproduce.

use glam::Vec2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use pixel_drift::field::black_hole::BlackHole;
use pixel_drift::field::geometric::{centrifugal_at, chromatic_at, lidar_at, radial_at, vortex_at};
use pixel_drift::field::magnetic::{MagnetSet, Pole};
use pixel_drift::field::{FieldInput, FieldLibrary, FieldVector, FrameHistory};
use pixel_drift::particles::wrap_position;
use pixel_drift::{
    FieldKind, FrameBuffer, ParticleArena, Params, RasterMode, Rasterizer, Segmentation, Simulation, SourceImage,
    VectorField,
};

fn random_image(rng: &mut SmallRng, width: u32, height: u32, palette: usize) -> SourceImage {
    let colors: Vec<[u8; 4]> = (0..palette)
        .map(|_| [rng.gen(), rng.gen(), rng.gen(), 255])
        .collect();
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            // Blocky layout so regions of varying size appear.
            let block = ((x / 7) + (y / 5) * 3) as usize;
            data.extend_from_slice(&colors[block % palette]);
        }
    }
    SourceImage::new(width, height, data).unwrap()
}

// ============================================================================
// Toroidal wrap
// ============================================================================

#[test]
fn test_wrap_position_in_bounds() {
    let mut rng = SmallRng::seed_from_u64(1);
    for _ in 0..10_000 {
        let w = rng.gen_range(1..500) as f32;
        let h = rng.gen_range(1..500) as f32;
        let p = Vec2::new(rng.gen_range(-1e5..1e5), rng.gen_range(-1e5..1e5));
        let q = wrap_position(p, w, h);
        assert!(q.x >= 0.0 && q.x < w, "{:?} -> {:?} in {}x{}", p, q, w, h);
        assert!(q.y >= 0.0 && q.y < h, "{:?} -> {:?} in {}x{}", p, q, w, h);
    }

    // Values that sit just below zero round up to the size under rem_euclid.
    let q = wrap_position(Vec2::new(-1e-9, -1e-9), 10.0, 10.0);
    assert!(q.x < 10.0 && q.y < 10.0);
    let q = wrap_position(Vec2::new(f32::NAN, f32::INFINITY), 10.0, 10.0);
    assert!(q.x >= 0.0 && q.x < 10.0 && q.y >= 0.0 && q.y < 10.0);
}

#[test]
fn test_simulated_positions_in_bounds() {
    let mut rng = SmallRng::seed_from_u64(2);
    for (i, kind) in FieldKind::ALL.into_iter().enumerate() {
        let (w, h) = (rng.gen_range(8..40), rng.gen_range(8..40));
        let params = Params::default()
            .with_field(kind)
            .with_flow_strength(rng.gen_range(0.0..5.0))
            .with_movement_speed(rng.gen_range(0.1..2.0))
            .with_gravity(rng.gen_range(0.0..10.0))
            .with_scatter(rng.gen_range(0.0..100.0))
            .with_mirrors(rng.gen_range(0..20));
        let mut sim = Simulation::with_seed(i as u64).with_params(params);
        sim.load_image(random_image(&mut rng, w, h, 4));

        for _ in 0..40 {
            sim.tick(rng.gen_range(0.0..0.2));
            let arena = sim.arena().unwrap();
            for p in arena.positions() {
                assert!(p.x >= 0.0 && p.x < w as f32, "{}: {:?}", kind, p);
                assert!(p.y >= 0.0 && p.y < h as f32, "{}: {:?}", kind, p);
            }
        }
    }
}

// ============================================================================
// Singular points
// ============================================================================

#[test]
fn test_singular_points_are_zero() {
    let mut rng = SmallRng::seed_from_u64(3);
    for _ in 0..1_000 {
        let center = Vec2::new(rng.gen_range(-500.0..500.0), rng.gen_range(-500.0..500.0));
        let time = rng.gen_range(0.0..100.0);
        let strength = rng.gen_range(0.0..5.0);

        assert_eq!(vortex_at(center, center, 0.01, strength), FieldVector::ZERO);
        assert_eq!(radial_at(center, center, 64.0, strength), FieldVector::ZERO);
        assert_eq!(centrifugal_at(center, center, 64.0, time, strength), FieldVector::ZERO);
        assert_eq!(lidar_at(center, center, time, 0.5, strength), FieldVector::ZERO);
        assert_eq!(chromatic_at(center, center, 80.0, time, strength), FieldVector::ZERO);

        let magnets = MagnetSet::from_poles(vec![Pole {
            position: center,
            charge: rng.gen_range(-1.5..1.5),
        }]);
        assert_eq!(magnets.field_at(center, true, strength), FieldVector::ZERO);

        let hole = BlackHole { center, spin: 1.0 };
        assert_eq!(hole.field_at(center, time, strength), FieldVector::ZERO);
    }
}

#[test]
fn test_near_singular_points_are_finite() {
    let mut rng = SmallRng::seed_from_u64(4);
    for _ in 0..1_000 {
        let center = Vec2::new(rng.gen_range(0.0..300.0), rng.gen_range(0.0..300.0));
        let time = rng.gen_range(0.0..100.0);
        let strength = rng.gen_range(0.0..5.0);

        let mut dist = 1.0;
        while dist > 1e-9 {
            let pos = center + Vec2::from_angle(rng.gen_range(0.0..std::f32::consts::TAU)) * dist;
            let magnets = MagnetSet::from_poles(vec![
                Pole { position: center, charge: 1.0 },
                Pole { position: center + Vec2::new(30.0, 0.0), charge: -1.0 },
            ]);
            let hole = BlackHole { center, spin: -1.0 };
            for v in [
                vortex_at(pos, center, 0.01, strength),
                radial_at(pos, center, 64.0, strength),
                centrifugal_at(pos, center, 64.0, time, strength),
                lidar_at(pos, center, time, 0.5, strength),
                chromatic_at(pos, center, 80.0, time, strength),
                magnets.field_at(pos, true, strength),
                hole.field_at(pos, time, strength),
            ] {
                assert!(v.is_finite(), "{:?} at distance {}", v, dist);
            }
            dist *= 0.1;
        }
    }
}

#[test]
fn test_every_generator_produces_finite_fields() {
    let mut rng = SmallRng::seed_from_u64(5);
    let image = random_image(&mut rng, 48, 32, 5);
    let segmentation = Segmentation::new(&image, 30.0, &mut rng);

    let mut history = FrameHistory::default();
    let mut frame = FrameBuffer::new(48, 32);
    for px in frame.pixels_mut() {
        *px = [rng.gen(), rng.gen(), rng.gen(), 255];
    }
    history.push(&frame);

    for kind in FieldKind::ALL {
        let params = Params::default().with_field(kind).with_flow_strength(5.0);
        let mut library = FieldLibrary::new(48, 32, &params, 9);
        for t in 0..20 {
            let input = FieldInput {
                width: 48,
                height: 32,
                time: t as f32 * 0.37,
                params: &params,
                regions: segmentation.regions(),
                history: &history,
            };
            library.regenerate(&input).unwrap();
            assert!(library.field().data().iter().all(FieldVector::is_finite), "{}", kind);
        }
    }
}

// ============================================================================
// Segmentation
// ============================================================================

#[test]
fn test_uniform_image_single_region() {
    let mut rng = SmallRng::seed_from_u64(6);
    for _ in 0..20 {
        let (w, h) = (rng.gen_range(1..60), rng.gen_range(1..60));
        let rgba = [rng.gen(), rng.gen(), rng.gen(), 255];
        let image = SourceImage::uniform(w, h, rgba).unwrap();
        let threshold = rng.gen_range(0.1..100.0);
        let seg = Segmentation::new(&image, threshold, &mut rng);
        assert_eq!(seg.len(), 1);
        assert_eq!(seg.regions()[0].size, (w * h) as usize);
        assert!(seg.assignment().iter().all(|a| *a == Some(0)));
    }
}

#[test]
fn test_regions_disjoint() {
    let mut rng = SmallRng::seed_from_u64(7);
    for _ in 0..20 {
        let (w, h) = (rng.gen_range(10..80), rng.gen_range(10..80));
        let colors = rng.gen_range(1..8);
        let image = random_image(&mut rng, w, h, colors);
        let threshold = rng.gen_range(0.0..100.0);
        let seg = Segmentation::new(&image, threshold, &mut rng);

        let total: usize = seg.regions().iter().map(|r| r.size).sum();
        assert!(total <= (w * h) as usize);

        let mut owner = vec![None; (w * h) as usize];
        for region in seg.regions() {
            assert_eq!(region.pixels.len(), region.size);
            for &idx in &region.pixels {
                assert!(owner[idx as usize].is_none(), "pixel {} in two regions", idx);
                owner[idx as usize] = Some(region.id as u16);
            }
        }
        assert_eq!(owner, seg.assignment());
    }
}

// ============================================================================
// Field sampling
// ============================================================================

#[test]
fn test_bilinear_matches_nearest_on_grid() {
    let mut rng = SmallRng::seed_from_u64(8);
    for _ in 0..20 {
        let (w, h) = (rng.gen_range(4..200), rng.gen_range(4..200));
        let cols = rng.gen_range(1..50);
        let rows = rng.gen_range(1..50);
        let mut field = VectorField::new(cols, rows, w, h);
        field.fill(|i, _| {
            FieldVector::from_angle(rng.gen_range(-10.0..10.0), rng.gen_range(0.0..5.0)).with_tag(i as u32 % 3)
        });

        for r in 0..rows {
            for c in 0..cols {
                let (gx, gy) = (c as f32, r as f32);
                assert_eq!(field.sample_grid_bilinear(gx, gy), field.sample_grid_nearest(gx, gy));
                assert_eq!(field.sample_grid_nearest(gx, gy), field.get(c, r));
            }
        }
    }
}

// ============================================================================
// Rasterizer
// ============================================================================

#[test]
fn test_rasterize_is_repeatable() {
    let mut rng = SmallRng::seed_from_u64(9);
    let image = random_image(&mut rng, 40, 30, 6);
    let mut arena = ParticleArena::from_image(&image);
    for v in arena.velocities_mut() {
        *v = Vec2::new(rng.gen_range(-3.0..3.0), rng.gen_range(-3.0..3.0));
    }
    arena.integrate(1.7);

    for mode in [RasterMode::Nearest, RasterMode::Splat] {
        let mut raster = Rasterizer::new(mode);
        let a = raster.rasterize(&arena, None, 0.0);
        let b = raster.rasterize(&arena, None, 0.0);
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_eq!(a.as_bytes().len(), 40 * 30 * 4);
        assert!(a.pixels().iter().all(|p| p[3] == 255));
    }
}
