//! The simulation engine.
//!
//! A [`Simulation`] owns everything that changes from tick to tick: the
//! particle arena, the region segmentation, the field library with its
//! generator state, the effect stack, the frame history and the random
//! stream. It is driven from outside, one [`Simulation::tick`] per frame.
//!
//! # Example
//!
//! ```ignore
//! let mut sim = Simulation::with_seed(7).with_params(Params::default().with_field(FieldKind::Vortex));
//! sim.load_image(SourceImage::from_rgba_image(&img)?);
//!
//! let mut clock = FrameClock::fixed(1.0 / 30.0);
//! for _ in 0..300 {
//!     if let Some(frame) = sim.tick(clock.update()) {
//!         encoder.push(frame.as_bytes());
//!     }
//! }
//! println!("{:?}", sim.stats());
//! ```
//!
//! # Tick order
//!
//! 1. advance field time by `timeStep`, regenerate the field if due
//! 2. field, buoyancy, region pull and jitter forces update velocities
//! 3. effects: gravity, scatter, mirror, scan-line, kaleidoscope
//! 4. integrate positions and wrap them onto the canvas
//! 5. record trails, rasterize, push the frame into the feedback history

use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::effects::{EffectReport, EffectStack};
use crate::error::{LoadError, ParamError};
use crate::field::{FieldInput, FieldLibrary, FrameHistory, VectorField};
use crate::params::{FieldKind, ParamUpdate, Params, Recompute};
use crate::particles::{accelerate, MotionInput, ParticleArena};
use crate::raster::{FrameBuffer, RasterMode, Rasterizer};
use crate::region::{Region, Segmentation};
use crate::source::SourceImage;
use crate::time::clamp_delta;

/// Simulation steps per second that one unit of `step` stands for.
pub const REFERENCE_RATE: f32 = 60.0;

/// A snapshot of engine counters.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub frame_count: u64,
    pub particle_count: usize,
    pub region_count: usize,
    pub running: bool,
    pub recording: bool,
    pub field_kind: FieldKind,
    pub mean_field_magnitude: f32,
    pub skipped_field_updates: u64,
    pub time: f32,
}

impl Stats {
    /// Serialize for an external display.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Everything derived from the loaded image.
#[derive(Debug)]
struct Scene {
    image: SourceImage,
    segmentation: Segmentation,
    arena: ParticleArena,
    fields: FieldLibrary,
}

/// The image-to-particle animation engine.
#[derive(Debug)]
pub struct Simulation {
    params: Params,
    scene: Option<Scene>,
    history: FrameHistory,
    effects: EffectStack,
    rasterizer: Rasterizer,
    rng: SmallRng,
    seed: u64,
    time: f32,
    frame_count: u64,
    running: bool,
    recording: bool,
    skipped_fields: u64,
    last_report: EffectReport,
    last_frame: Option<Arc<FrameBuffer>>,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation {
    /// An engine with default parameters and a clock-derived seed.
    pub fn new() -> Self {
        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42);
        Self::with_seed(seed)
    }

    /// An engine whose every random draw derives from `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            params: Params::default(),
            scene: None,
            history: FrameHistory::default(),
            effects: EffectStack::new(),
            rasterizer: Rasterizer::default(),
            rng: SmallRng::seed_from_u64(seed),
            seed,
            time: 0.0,
            frame_count: 0,
            running: true,
            recording: false,
            skipped_fields: 0,
            last_report: EffectReport::default(),
            last_frame: None,
        }
    }

    /// Replace the parameter set (clamped into range).
    pub fn with_params(mut self, params: Params) -> Self {
        self.set_params(params);
        self
    }

    /// Choose how particles are drawn.
    pub fn with_raster_mode(mut self, mode: RasterMode) -> Self {
        self.rasterizer.set_mode(mode);
        self
    }

    /// Seed this engine was built with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    // ========== Loading ==========

    /// Load a validated image: segment it, create one particle per pixel,
    /// and start over from frame zero.
    pub fn load_image(&mut self, image: SourceImage) {
        let threshold = self.params.region_threshold as f32;
        let segmentation = Segmentation::new(&image, threshold, &mut self.rng);
        let mut arena = ParticleArena::from_image(&image);
        arena.assign_regions(&segmentation);
        let fields = FieldLibrary::new(image.width(), image.height(), &self.params, self.rng.gen());

        log::info!(
            "Loaded {}x{} image: {} particles, {} regions",
            image.width(),
            image.height(),
            arena.len(),
            segmentation.len()
        );

        self.scene = Some(Scene {
            image,
            segmentation,
            arena,
            fields,
        });
        self.restart();
    }

    /// Validate and load a raw RGBA buffer. On error the current image and
    /// particles are left untouched.
    pub fn load_rgba(&mut self, width: u32, height: u32, data: Vec<u8>) -> Result<(), LoadError> {
        let image = SourceImage::new(width, height, data)?;
        self.load_image(image);
        Ok(())
    }

    /// Load an `image::RgbaImage`.
    pub fn load_rgba_image(&mut self, image: &image::RgbaImage) -> Result<(), LoadError> {
        let image = SourceImage::from_rgba_image(image)?;
        self.load_image(image);
        Ok(())
    }

    /// Whether an image is loaded.
    pub fn is_loaded(&self) -> bool {
        self.scene.is_some()
    }

    // ========== Parameters ==========

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Apply one parameter change and rebuild whatever it invalidates.
    pub fn update(&mut self, update: ParamUpdate) -> Result<Recompute, ParamError> {
        let recompute = self.params.apply(update)?;
        self.rebuild(recompute);
        Ok(recompute)
    }

    /// Parse and apply a named control value (e.g. `"flowStrength"`, `"2.5"`).
    pub fn set_control(&mut self, name: &str, value: &str) -> Result<Recompute, ParamError> {
        self.update(ParamUpdate::from_control(name, value)?)
    }

    /// Replace every parameter at once.
    pub fn set_params(&mut self, params: Params) -> Recompute {
        let next = params.sanitized();
        let prev = std::mem::replace(&mut self.params, next);
        let p = &self.params;
        let recompute = Recompute {
            field: prev.noise_scale != p.noise_scale
                || prev.flow_strength != p.flow_strength
                || prev.flow_field_type != p.flow_field_type
                || prev.tuning != p.tuning
                || prev.region_threshold != p.region_threshold,
            generator_state: prev.flow_field_type != p.flow_field_type || prev.tuning != p.tuning,
            regions: prev.region_threshold != p.region_threshold,
            wells: prev.gravity_strength != p.gravity_strength,
            chords: prev.mirror_count != p.mirror_count,
            trails: prev.trails != p.trails,
        };
        self.rebuild(recompute);
        recompute
    }

    fn rebuild(&mut self, recompute: Recompute) {
        if recompute.wells {
            self.effects.gravity.invalidate();
        }
        if recompute.chords {
            self.effects.mirrors.invalidate();
        }
        if recompute.trails {
            self.effects.trails.invalidate();
        }

        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        if recompute.regions {
            let threshold = self.params.region_threshold as f32;
            scene.segmentation = Segmentation::new(&scene.image, threshold, &mut self.rng);
            scene.arena.assign_regions(&scene.segmentation);
            log::debug!("Re-segmented into {} regions", scene.segmentation.len());
        }
        if recompute.generator_state {
            scene.fields.set_kind(self.params.flow_field_type, &self.params.tuning);
        }
        if recompute.field {
            scene.fields.invalidate();
        }
    }

    // ========== Running ==========

    /// Advance one frame of `delta` seconds (clamped to 50 ms) and return
    /// the rendered frame. Returns `None` when stopped or with no image.
    pub fn tick(&mut self, delta: f32) -> Option<Arc<FrameBuffer>> {
        if !self.running {
            return None;
        }
        let scene = self.scene.as_mut()?;
        let step = clamp_delta(delta) * REFERENCE_RATE;
        let params = &self.params;
        self.time += params.time_step;

        let input = FieldInput {
            width: scene.arena.width(),
            height: scene.arena.height(),
            time: self.time,
            params,
            regions: scene.segmentation.regions(),
            history: &self.history,
        };
        if let Err(e) = scene.fields.update(&input, step) {
            self.skipped_fields += 1;
            log::warn!("Keeping previous field: {}", e);
        }

        let motion = MotionInput {
            field: scene.fields.field(),
            field_weight: scene.fields.kind().field_weight(),
            regions: scene.segmentation.regions(),
            params,
            time: self.time,
            step,
        };
        accelerate(&mut scene.arena, &motion, &mut self.rng);
        self.last_report = self
            .effects
            .apply(&mut scene.arena, params, self.time, self.frame_count, step, &mut self.rng);
        scene.arena.integrate(step);
        self.effects.record_trails(&scene.arena, params, &mut self.rng);

        let trails = (params.trails > 0.0).then_some(&self.effects.trails);
        let frame = Arc::new(self.rasterizer.rasterize(&scene.arena, trails, params.trails));
        self.history.push(&frame);
        self.frame_count += 1;
        self.last_frame = Some(Arc::clone(&frame));
        Some(frame)
    }

    /// Stop ticking. Takes effect before the next tick; nothing is lost.
    pub fn stop(&mut self) {
        if self.running {
            log::info!("Simulation stopped at frame {}", self.frame_count);
        }
        self.running = false;
    }

    /// Continue from where [`Simulation::stop`] left off.
    pub fn resume(&mut self) {
        self.running = true;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Send every particle home and drop all generator, effect, trail and
    /// history state. Parameters and the loaded image are kept.
    pub fn reset(&mut self) {
        if let Some(scene) = self.scene.as_mut() {
            scene.arena.reset();
            scene
                .fields
                .reset(scene.image.width(), scene.image.height(), &self.params.tuning);
        }
        self.restart();
        log::info!("Simulation reset");
    }

    fn restart(&mut self) {
        self.time = 0.0;
        self.frame_count = 0;
        self.skipped_fields = 0;
        self.history.clear();
        self.effects.reset();
        self.last_report = EffectReport::default();
        self.last_frame = None;
    }

    // ========== Recording ==========

    /// Mark frames as being recorded by an external encoder.
    pub fn start_recording(&mut self) {
        self.recording = true;
    }

    pub fn stop_recording(&mut self) {
        self.recording = false;
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    // ========== Queries ==========

    /// Regions of the loaded image, largest first.
    pub fn regions(&self) -> &[Region] {
        self.scene.as_ref().map(|s| s.segmentation.regions()).unwrap_or(&[])
    }

    /// Region the source pixel `(x, y)` belongs to.
    pub fn region_at(&self, x: u32, y: u32) -> Option<&Region> {
        self.scene.as_ref()?.segmentation.region_at(x, y)
    }

    pub fn arena(&self) -> Option<&ParticleArena> {
        self.scene.as_ref().map(|s| &s.arena)
    }

    /// The active vector field.
    pub fn field(&self) -> Option<&VectorField> {
        self.scene.as_ref().map(|s| s.fields.field())
    }

    pub fn field_library(&self) -> Option<&FieldLibrary> {
        self.scene.as_ref().map(|s| &s.fields)
    }

    pub fn effects(&self) -> &EffectStack {
        &self.effects
    }

    /// What the effects did on the last tick.
    pub fn last_report(&self) -> EffectReport {
        self.last_report
    }

    pub fn history(&self) -> &FrameHistory {
        &self.history
    }

    /// The most recent frame.
    pub fn last_frame(&self) -> Option<Arc<FrameBuffer>> {
        self.last_frame.clone()
    }

    /// Field time.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn stats(&self) -> Stats {
        Stats {
            frame_count: self.frame_count,
            particle_count: self.scene.as_ref().map_or(0, |s| s.arena.len()),
            region_count: self.scene.as_ref().map_or(0, |s| s.segmentation.len()),
            running: self.running,
            recording: self.recording,
            field_kind: self.params.flow_field_type,
            mean_field_magnitude: self.field().map_or(0.0, |f| f.mean_magnitude()),
            skipped_field_updates: self.skipped_fields,
            time: self.time,
        }
    }
}
