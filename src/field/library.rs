//! Generator dispatch, generator state, and the regeneration schedule.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use super::black_hole::BlackHole;
use super::cellular::CellColony;
use super::feedback::{feedback_at, FrameHistory};
use super::geometric::{
    centrifugal_at, chromatic_at, fractal_at, lidar_at, radial_at, scan_angle, vortex_at, wave_at,
};
use super::magnetic::MagnetSet;
use super::noise_fields::{block_layout, coherent_at, directional_at, temporal_at, turbulent_at};
use super::swarm::Swarm;
use super::{grid_size, FieldVector, VectorField};
use crate::error::FieldError;
use crate::noise::PerlinNoise;
use crate::params::{FieldKind, FieldTuning, Params};
use crate::region::Region;

/// Everything a generator reads besides its own state.
#[derive(Clone, Copy)]
pub struct FieldInput<'a> {
    pub width: u32,
    pub height: u32,
    /// Field time, advanced by `time_step` each frame.
    pub time: f32,
    pub params: &'a Params,
    pub regions: &'a [Region],
    pub history: &'a FrameHistory,
}

/// Noise tables, randomness, and the state of the stateful generators.
///
/// All state is built up front for the current canvas; switching to a
/// stateful generator rebuilds its state through [`FieldContext::reinit`].
#[derive(Clone, Debug)]
pub struct FieldContext {
    noise: PerlinNoise,
    rng: SmallRng,
    swarm: Swarm,
    magnets: MagnetSet,
    colony: CellColony,
    black_hole: BlackHole,
    width: u32,
    height: u32,
}

impl FieldContext {
    /// Build noise and every generator's state for a `width x height`
    /// canvas.
    pub fn new(width: u32, height: u32, tuning: &FieldTuning, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let noise = PerlinNoise::new(seed ^ 0x9e37_79b9_7f4a_7c15);
        let swarm = Swarm::new(width, height, tuning.swarm_agents, &mut rng);
        let magnets = MagnetSet::new(width, height, tuning.magnetic_poles, tuning.pole_mode, &mut rng);
        let colony = CellColony::new(width, height, tuning.cell_target, &mut rng);
        let black_hole = BlackHole::new(width, height, &mut rng);
        Self {
            noise,
            rng,
            swarm,
            magnets,
            colony,
            black_hole,
            width,
            height,
        }
    }

    /// Rebuild the state `kind` depends on. Stateless kinds are untouched.
    pub fn reinit(&mut self, kind: FieldKind, tuning: &FieldTuning) {
        let (w, h) = (self.width, self.height);
        match kind {
            FieldKind::Swarm => self.swarm = Swarm::new(w, h, tuning.swarm_agents, &mut self.rng),
            FieldKind::Magnetic => {
                self.magnets = MagnetSet::new(w, h, tuning.magnetic_poles, tuning.pole_mode, &mut self.rng)
            }
            FieldKind::Cellular => self.colony = CellColony::new(w, h, tuning.cell_target, &mut self.rng),
            FieldKind::BlackHole => self.black_hole = BlackHole::new(w, h, &mut self.rng),
            _ => {}
        }
    }

    /// Rebuild all generator state for a (possibly new) canvas size.
    pub fn reset(&mut self, width: u32, height: u32, tuning: &FieldTuning) {
        self.width = width;
        self.height = height;
        for kind in [FieldKind::Swarm, FieldKind::Magnetic, FieldKind::Cellular, FieldKind::BlackHole] {
            self.reinit(kind, tuning);
        }
    }

    pub fn noise(&self) -> &PerlinNoise {
        &self.noise
    }

    pub fn swarm(&self) -> &Swarm {
        &self.swarm
    }

    pub fn magnets(&self) -> &MagnetSet {
        &self.magnets
    }

    pub fn colony(&self) -> &CellColony {
        &self.colony
    }

    pub fn black_hole(&self) -> &BlackHole {
        &self.black_hole
    }
}

/// Run generator `kind` into `out`.
///
/// `step` is the number of frames elapsed since the previous generation;
/// stateful generators advance their state by that much first.
pub fn generate(kind: FieldKind, ctx: &mut FieldContext, input: &FieldInput<'_>, step: f32, out: &mut VectorField) {
    let params = input.params;
    let tuning = &params.tuning;
    let strength = params.flow_strength;
    let scale = params.noise_scale;
    let time = input.time;
    let canvas = Vec2::new(input.width.max(1) as f32, input.height.max(1) as f32);
    let center = canvas * 0.5;
    let reach = center.length();
    let span = canvas.x.min(canvas.y);
    let noise = &ctx.noise;

    match kind {
        FieldKind::Perlin => out.fill(|_, p| coherent_at(noise, p, scale, time, strength)),
        FieldKind::Turbulent => out.fill(|_, p| turbulent_at(noise, p, scale, time, tuning.octaves, strength)),
        FieldKind::Directional => out.fill(|_, p| {
            directional_at(
                noise,
                p,
                scale,
                time,
                tuning.direction_angle,
                tuning.direction_influence,
                strength,
            )
        }),
        FieldKind::Vortex => out.fill(|_, p| vortex_at(p, center, tuning.vortex_falloff, strength)),
        FieldKind::Wave => out.fill(|_, p| {
            wave_at(
                p,
                time,
                tuning.wave_length,
                tuning.wave_amplitude,
                tuning.wave_direction,
                strength,
            )
        }),
        FieldKind::Swarm => {
            ctx.swarm.step(step, &mut ctx.rng);
            let swarm = &ctx.swarm;
            out.fill(|_, p| swarm.field_at(p, noise.noise3(p.x * scale, p.y * scale, time), strength))
        }
        FieldKind::Magnetic => {
            let magnets = &ctx.magnets;
            out.fill(|_, p| {
                if magnets.is_singular(p) {
                    return FieldVector::ZERO;
                }
                let base = magnets.field_at(p, tuning.dipole_curves, strength).force();
                let n = noise.noise3(p.x * scale, p.y * scale, time);
                FieldVector::from_vec(base + Vec2::from_angle(n * TAU) * 0.05 * strength)
            })
        }
        FieldKind::Cellular => {
            ctx.colony.step(step, time, &mut ctx.rng);
            let colony = &ctx.colony;
            out.fill(|_, p| colony.field_at(p, time, strength))
        }
        FieldKind::Radial => out.fill(|_, p| radial_at(p, center, reach, strength)),
        FieldKind::Centrifugal => out.fill(|_, p| centrifugal_at(p, center, reach, time, strength)),
        FieldKind::Chromatic => out.fill(|_, p| chromatic_at(p, center, span, time, strength)),
        FieldKind::Temporal => {
            if input.regions.is_empty() {
                out.fill(|_, p| coherent_at(noise, p, scale, time, strength))
            } else {
                let layout = block_layout(input.regions.len());
                out.fill(|_, p| temporal_at(noise, p, canvas, layout, scale, time, strength))
            }
        }
        FieldKind::Feedback => {
            let reach = out.cell_size().max_element();
            let history = input.history;
            out.fill(|_, p| {
                let n = noise.noise3(p.x * scale, p.y * scale, time);
                match history.echo_at(p, reach) {
                    Some(echo) => feedback_at(echo, n, strength),
                    None => coherent_at(noise, p, scale, time, strength),
                }
            })
        }
        FieldKind::Lidar => {
            let scan = scan_angle(time, tuning.lidar_speed);
            out.fill(|_, p| lidar_at(p, center, scan, tuning.lidar_band, strength))
        }
        FieldKind::Fractal => out.fill(|_, p| fractal_at(p.x / canvas.x, p.y / canvas.y, time, strength)),
        FieldKind::BlackHole => {
            let hole = &ctx.black_hole;
            out.fill(|_, p| {
                if hole.is_singular(p) {
                    return FieldVector::ZERO;
                }
                let base = hole.field_at(p, time, strength).force();
                let n = noise.noise3(p.x * scale, p.y * scale, time);
                FieldVector::from_vec(base + Vec2::from_angle(n * TAU) * 0.05 * strength)
            })
        }
    }
}

/// The active vector field, its generator, and when it next regenerates.
///
/// Each generator has a cadence (see [`FieldKind::cadence`]). The field is
/// regenerated on the first update, on every update where the cadence has
/// elapsed, and on the update after [`FieldLibrary::invalidate`]. A
/// generation that fails validation is dropped and the previous field stays
/// active.
#[derive(Debug)]
pub struct FieldLibrary {
    kind: FieldKind,
    field: VectorField,
    context: FieldContext,
    width: u32,
    height: u32,
    ticks_since: u32,
    pending_step: f32,
    stale: bool,
    generations: u64,
}

impl FieldLibrary {
    /// A library for a `width x height` canvas. The field starts zeroed and
    /// is generated on the first [`FieldLibrary::update`].
    pub fn new(width: u32, height: u32, params: &Params, seed: u64) -> Self {
        let kind = params.flow_field_type;
        Self {
            kind,
            field: VectorField::for_kind(kind, width, height),
            context: FieldContext::new(width, height, &params.tuning, seed),
            width,
            height,
            ticks_since: 0,
            pending_step: 0.0,
            stale: true,
            generations: 0,
        }
    }

    /// Active generator.
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// The committed field.
    pub fn field(&self) -> &VectorField {
        &self.field
    }

    /// Generator state.
    pub fn context(&self) -> &FieldContext {
        &self.context
    }

    /// Successful generations so far.
    pub fn generations(&self) -> u64 {
        self.generations
    }

    /// Switch generators. Stateful generators get fresh state; the old
    /// field stays active until the next update regenerates.
    pub fn set_kind(&mut self, kind: FieldKind, tuning: &FieldTuning) {
        if kind != self.kind {
            log::debug!("Switching field generator {} -> {}", self.kind, kind);
        }
        self.kind = kind;
        self.context.reinit(kind, tuning);
        self.stale = true;
    }

    /// Force regeneration on the next update.
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Rebuild all generator state for a new canvas and zero the field.
    pub fn reset(&mut self, width: u32, height: u32, tuning: &FieldTuning) {
        self.width = width;
        self.height = height;
        self.context.reset(width, height, tuning);
        self.field = VectorField::for_kind(self.kind, width, height);
        self.ticks_since = 0;
        self.pending_step = 0.0;
        self.stale = true;
    }

    /// Advance one tick of `step` frames and regenerate if due.
    ///
    /// Returns `Ok(true)` when a new field was committed.
    pub fn update(&mut self, input: &FieldInput<'_>, step: f32) -> Result<bool, FieldError> {
        self.ticks_since = self.ticks_since.saturating_add(1);
        self.pending_step += step;
        if !self.stale && self.ticks_since < self.kind.cadence() {
            return Ok(false);
        }
        self.regenerate(input)?;
        Ok(true)
    }

    /// Generate now, validate, and commit.
    ///
    /// A rejected grid leaves everything as it was: the previous field,
    /// the generator state, and the pending regeneration.
    pub fn regenerate(&mut self, input: &FieldInput<'_>) -> Result<(), FieldError> {
        let (cols, rows) = grid_size(self.kind, self.width, self.height);
        let mut next = VectorField::new(cols, rows, self.width, self.height);
        let snapshot = self.context.clone();
        generate(self.kind, &mut self.context, input, self.pending_step, &mut next);
        self.commit(next, snapshot)
    }

    fn commit(&mut self, next: VectorField, snapshot: FieldContext) -> Result<(), FieldError> {
        let (cols, rows) = grid_size(self.kind, self.width, self.height);
        if let Err(e) = next.validate(self.kind, cols * rows) {
            self.context = snapshot;
            return Err(e);
        }
        self.field = next;
        self.pending_step = 0.0;
        self.ticks_since = 0;
        self.stale = false;
        self.generations += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::magnetic::Pole;

    fn input<'a>(params: &'a Params, history: &'a FrameHistory, time: f32) -> FieldInput<'a> {
        FieldInput {
            width: 64,
            height: 48,
            time,
            params,
            regions: &[],
            history,
        }
    }

    #[test]
    fn test_every_kind_generates_finite() {
        let history = FrameHistory::default();
        for kind in FieldKind::ALL {
            let params = Params::default().with_field(kind).with_flow_strength(5.0);
            let mut library = FieldLibrary::new(64, 48, &params, 7);
            for i in 0..4 {
                library.update(&input(&params, &history, i as f32 * 0.01), 1.0).unwrap();
            }
            assert!(library.field().data().iter().all(|v| v.is_finite()), "{}", kind);
            assert_eq!(library.field().cols() * library.field().rows(), {
                let (c, r) = grid_size(kind, 64, 48);
                c * r
            });
        }
    }

    #[test]
    fn test_cadence() {
        let history = FrameHistory::default();
        let params = Params::default().with_field(FieldKind::Vortex);
        let mut library = FieldLibrary::new(64, 48, &params, 1);
        let inp = input(&params, &history, 0.0);

        let regenerated: Vec<bool> = (0..17).map(|_| library.update(&inp, 1.0).unwrap()).collect();
        let count = regenerated.iter().filter(|r| **r).count();
        assert!(regenerated[0]);
        assert!(regenerated[8]);
        assert!(regenerated[16]);
        assert_eq!(count, 3);
    }

    #[test]
    fn test_set_kind_regenerates_next_update() {
        let history = FrameHistory::default();
        let params = Params::default().with_field(FieldKind::Vortex);
        let mut library = FieldLibrary::new(64, 48, &params, 1);
        let inp = input(&params, &history, 0.0);
        assert!(library.update(&inp, 1.0).unwrap());
        assert!(!library.update(&inp, 1.0).unwrap());

        let params = params.with_field(FieldKind::Temporal);
        library.set_kind(FieldKind::Temporal, &params.tuning);
        let inp = input(&params, &history, 0.0);
        assert!(library.update(&inp, 1.0).unwrap());
        assert_eq!(library.field().cols(), 64);
        assert_eq!(library.generations(), 2);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let history = FrameHistory::default();
        let params = Params::default().with_field(FieldKind::Swarm);
        let mut a = FieldLibrary::new(64, 48, &params, 3);
        let mut b = FieldLibrary::new(64, 48, &params, 3);
        for i in 0..5 {
            let inp = input(&params, &history, i as f32 * 0.01);
            a.update(&inp, 1.0).unwrap();
            b.update(&inp, 1.0).unwrap();
        }
        assert_eq!(a.field(), b.field());
    }

    // ========== Singular points ==========

    #[test]
    fn test_singular_nodes_stay_zero() {
        let history = FrameHistory::default();
        let node = Vec2::new(16.0, 12.0);
        for kind in [FieldKind::Magnetic, FieldKind::BlackHole] {
            let params = Params::default().with_field(kind).with_flow_strength(2.0);
            let mut ctx = FieldContext::new(64, 48, &params.tuning, 5);
            ctx.magnets = MagnetSet::from_poles(vec![
                Pole {
                    position: node,
                    charge: 1.0,
                },
                Pole {
                    position: Vec2::new(40.0, 32.0),
                    charge: -1.0,
                },
            ]);
            ctx.black_hole = BlackHole {
                center: node,
                spin: 1.0,
            };

            let mut out = VectorField::for_kind(kind, 64, 48);
            assert_eq!(out.node_position(4, 3), node);
            for t in 0..10 {
                generate(kind, &mut ctx, &input(&params, &history, t as f32 * 0.1), 1.0, &mut out);
                assert_eq!(out.get(4, 3), FieldVector::ZERO, "{} at t={}", kind, t);
                assert!(!out.get(5, 3).is_zero(), "{} next to the singular node", kind);
            }
        }
    }

    // ========== Rejected generations ==========

    #[test]
    fn test_rejected_grid_keeps_state_and_retries() {
        let history = FrameHistory::default();
        let params = Params::default().with_field(FieldKind::Vortex);
        let mut library = FieldLibrary::new(64, 48, &params, 2);
        let inp = input(&params, &history, 0.0);
        assert!(library.update(&inp, 1.0).unwrap());
        let committed = library.field().clone();
        let agents = library.context().swarm().agents().to_vec();

        library.invalidate();
        library.pending_step = 2.0;
        let snapshot = library.context.clone();
        let ctx = &mut library.context;
        ctx.swarm.step(2.0, &mut ctx.rng);
        assert_ne!(library.context().swarm().agents(), &agents[..]);

        let mut bad = VectorField::for_kind(FieldKind::Vortex, 64, 48);
        bad.set(
            0,
            0,
            FieldVector {
                x: f32::NAN,
                ..FieldVector::ZERO
            },
        );
        assert_eq!(
            library.commit(bad, snapshot),
            Err(FieldError::NonFinite {
                kind: FieldKind::Vortex,
                index: 0
            })
        );

        assert_eq!(library.field(), &committed);
        assert_eq!(library.context().swarm().agents(), &agents[..]);
        assert_eq!(library.generations(), 1);
        assert_eq!(library.pending_step, 2.0);

        // Still due: the next update retries instead of waiting out the cadence.
        assert!(library.update(&inp, 1.0).unwrap());
        assert_eq!(library.generations(), 2);
        assert_eq!(library.pending_step, 0.0);
    }

    #[test]
    fn test_reset_changes_canvas() {
        let history = FrameHistory::default();
        let params = Params::default();
        let mut library = FieldLibrary::new(64, 48, &params, 3);
        library.update(&input(&params, &history, 0.0), 1.0).unwrap();
        library.reset(16, 8, &params.tuning);
        assert_eq!((library.field().cols(), library.field().rows()), (4, 2));
        assert!(library.field().data().iter().all(|v| v.is_zero()));
    }
}
