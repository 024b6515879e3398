//! # pixel-drift
//!
//! Turns a still image into a field of particles, one per pixel, and lets
//! procedural vector fields carry them around the canvas.
//!
//! ## Quick Start
//!
//! ```ignore
//! use pixel_drift::prelude::*;
//!
//! let img = image::open("photo.png")?.to_rgba8();
//! let mut sim = Simulation::with_seed(1)
//!     .with_params(Params::default().with_field(FieldKind::Swarm).with_trails(4.0));
//! sim.load_rgba_image(&img)?;
//!
//! for _ in 0..600 {
//!     if let Some(frame) = sim.tick(1.0 / 60.0) {
//!         // hand frame.as_bytes() to a display or encoder
//!     }
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Regions
//!
//! On load the image is split into connected regions of similar color
//! ([`region`]). Each region gets a centroid, a mean brightness and a speed
//! multiplier that all of its particles share.
//!
//! ### Fields
//!
//! A [`VectorField`] is a grid of direction and magnitude samples covering
//! the canvas. Sixteen generators ([`FieldKind`]) fill it, some from noise,
//! some from geometry, some from persistent agents, and one from previously
//! rendered frames. Fields regenerate on a per-generator cadence.
//!
//! ### Particles
//!
//! Each tick the field, a brightness buoyancy force, a pull toward the
//! particle's region centroid and a little jitter update velocities. Effects
//! ([`effects`]) then add gravity wells, scatter bursts, mirror chords and
//! image distortions before positions are integrated and wrapped.
//!
//! ### Frames
//!
//! The [`Rasterizer`] draws every particle in its source color onto an
//! opaque black [`FrameBuffer`]. The last few frames feed back into the
//! `feedback` field generator.
//!
//! ## Parameters
//!
//! [`Params`] holds every tunable value. It round-trips through JSON with
//! camelCase keys, and single values can be changed at runtime with
//! [`Simulation::update`], which reports what had to be rebuilt.

pub mod effects;
pub mod error;
pub mod field;
pub mod noise;
pub mod params;
pub mod particles;
pub mod raster;
pub mod region;
mod simulation;
pub mod source;
pub mod time;

pub use effects::{EffectReport, EffectStack};
pub use error::{FieldError, LoadError, ParamError};
pub use field::{FieldLibrary, FieldVector, FrameHistory, VectorField};
pub use glam::Vec2;
pub use noise::PerlinNoise;
pub use params::{FieldKind, FieldTuning, ParamUpdate, Params, PoleMode, Recompute};
pub use particles::ParticleArena;
pub use raster::{FrameBuffer, RasterMode, Rasterizer};
pub use region::{Region, Segmentation};
pub use simulation::{Simulation, Stats};
pub use source::SourceImage;
pub use time::FrameClock;

/// Everything needed to drive the engine.
pub mod prelude {
    pub use crate::error::{LoadError, ParamError};
    pub use crate::params::{FieldKind, FieldTuning, ParamUpdate, Params, PoleMode};
    pub use crate::raster::{FrameBuffer, RasterMode};
    pub use crate::simulation::{Simulation, Stats};
    pub use crate::source::SourceImage;
    pub use crate::time::FrameClock;
    pub use crate::Vec2;
}
