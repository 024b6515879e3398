//! Simulation parameters and their update rules.
//!
//! [`Params`] is the full, validated parameter set. It serializes to JSON
//! with camelCase keys so external controls can persist and restore it.
//!
//! Individual changes go through [`ParamUpdate`]. Applying an update clamps
//! the value into its documented range and returns a [`Recompute`] set that
//! names exactly which derived state must be rebuilt:
//!
//! ```ignore
//! let recompute = params.apply(ParamUpdate::RegionThreshold(45))?;
//! assert!(recompute.regions);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParamError;

/// The available vector field generators.
///
/// Each variant is a distinct algorithm; see [`crate::field`] for details.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Smooth coherent noise animated along a time axis.
    #[default]
    Perlin,
    /// Fractal sum of coherent noise octaves.
    Turbulent,
    /// Constant base direction perturbed by noise.
    Directional,
    /// Tangential swirl around the canvas center.
    Vortex,
    /// Travelling sinusoid, vectors perpendicular to propagation.
    Wave,
    /// Flocking agents that drag nearby pixels along.
    Swarm,
    /// Inverse-square field of magnetic poles.
    Magnetic,
    /// Pulsing, dividing cells.
    Cellular,
    /// Outward push from the center.
    Radial,
    /// Outward push with rotating tangential and spiral terms.
    Centrifugal,
    /// Three interfering periodic patterns, deliberately chaotic.
    Chromatic,
    /// Full-resolution blocks of desynchronized noise time.
    Temporal,
    /// Directions derived from previously rendered frames.
    Feedback,
    /// Rotating scan line impulse.
    Lidar,
    /// Self-similar triangular subdivision.
    Fractal,
    /// A single orbiting attractor.
    #[serde(alias = "black-hole", alias = "blackHole")]
    BlackHole,
}

impl FieldKind {
    /// Every generator, in declaration order.
    pub const ALL: [FieldKind; 16] = [
        FieldKind::Perlin,
        FieldKind::Turbulent,
        FieldKind::Directional,
        FieldKind::Vortex,
        FieldKind::Wave,
        FieldKind::Swarm,
        FieldKind::Magnetic,
        FieldKind::Cellular,
        FieldKind::Radial,
        FieldKind::Centrifugal,
        FieldKind::Chromatic,
        FieldKind::Temporal,
        FieldKind::Feedback,
        FieldKind::Lidar,
        FieldKind::Fractal,
        FieldKind::BlackHole,
    ];

    /// Canonical name, matching the serialized form.
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Perlin => "perlin",
            FieldKind::Turbulent => "turbulent",
            FieldKind::Directional => "directional",
            FieldKind::Vortex => "vortex",
            FieldKind::Wave => "wave",
            FieldKind::Swarm => "swarm",
            FieldKind::Magnetic => "magnetic",
            FieldKind::Cellular => "cellular",
            FieldKind::Radial => "radial",
            FieldKind::Centrifugal => "centrifugal",
            FieldKind::Chromatic => "chromatic",
            FieldKind::Temporal => "temporal",
            FieldKind::Feedback => "feedback",
            FieldKind::Lidar => "lidar",
            FieldKind::Fractal => "fractal",
            FieldKind::BlackHole => "blackhole",
        }
    }

    /// Weight of this field in the per-particle force sum.
    ///
    /// The chromatic field is much weaker per cell after its cubic scaling,
    /// so it gets a larger share to stay visible.
    pub fn field_weight(&self) -> f32 {
        match self {
            FieldKind::Chromatic => 0.8,
            _ => 0.1,
        }
    }

    /// Whether the field is generated at full canvas resolution.
    pub fn full_resolution(&self) -> bool {
        matches!(self, FieldKind::Temporal)
    }

    /// Number of ticks between regenerations.
    pub fn cadence(&self) -> u32 {
        match self {
            FieldKind::Wave
            | FieldKind::Swarm
            | FieldKind::Cellular
            | FieldKind::Chromatic
            | FieldKind::Lidar
            | FieldKind::BlackHole => 1,
            FieldKind::Perlin
            | FieldKind::Turbulent
            | FieldKind::Directional
            | FieldKind::Magnetic
            | FieldKind::Centrifugal
            | FieldKind::Feedback
            | FieldKind::Fractal => 2,
            FieldKind::Temporal => 3,
            FieldKind::Vortex | FieldKind::Radial => 8,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FieldKind {
    type Err = ParamError;

    /// Parse a generator name. Case, `-`, `_` and spaces are ignored, and a
    /// few descriptive aliases are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .map(|c| c.to_ascii_lowercase())
            .collect();

        let kind = match key.as_str() {
            "perlin" | "noise" | "coherent" | "coherentnoise" => FieldKind::Perlin,
            "turbulent" | "turbulence" => FieldKind::Turbulent,
            "directional" | "direction" => FieldKind::Directional,
            "vortex" => FieldKind::Vortex,
            "wave" => FieldKind::Wave,
            "swarm" | "flocking" | "boids" => FieldKind::Swarm,
            "magnetic" => FieldKind::Magnetic,
            "cellular" | "cells" => FieldKind::Cellular,
            "radial" => FieldKind::Radial,
            "centrifugal" => FieldKind::Centrifugal,
            "chromatic" => FieldKind::Chromatic,
            "temporal" | "timedisplacement" => FieldKind::Temporal,
            "feedback" | "feedbackecho" | "echo" => FieldKind::Feedback,
            "lidar" => FieldKind::Lidar,
            "fractal" | "ifs" => FieldKind::Fractal,
            "blackhole" => FieldKind::BlackHole,
            _ => return Err(ParamError::UnknownFieldKind(s.to_string())),
        };
        Ok(kind)
    }
}

/// Polarity layout for the magnetic generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoleMode {
    /// Alternating positive and negative poles.
    #[default]
    Mixed,
    /// Every pole repels.
    Positive,
    /// Every pole attracts.
    Negative,
}

/// Generator-specific tuning.
///
/// These only affect the generator that reads them. Changing any of them
/// regenerates the active field and, for stateful generators, rebuilds the
/// generator state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldTuning {
    /// Octaves for the turbulent generator (1-8).
    pub octaves: u32,
    /// Base direction for the directional generator, in radians.
    pub direction_angle: f32,
    /// How strongly noise perturbs the base direction (0-2).
    pub direction_influence: f32,
    /// Exponential falloff per pixel for the vortex generator.
    pub vortex_falloff: f32,
    /// Wavelength of the wave generator in pixels.
    pub wave_length: f32,
    /// Amplitude of the wave generator (0-2).
    pub wave_amplitude: f32,
    /// Propagation direction of the wave generator, in radians.
    pub wave_direction: f32,
    /// Number of flocking agents (1-200).
    pub swarm_agents: usize,
    /// Number of magnetic poles (1-16).
    pub magnetic_poles: usize,
    /// Polarity layout of the magnetic poles.
    pub pole_mode: PoleMode,
    /// Add curved dipole lines between nearest opposite poles.
    pub dipole_curves: bool,
    /// Target number of cells for the cellular generator (1-32).
    pub cell_target: usize,
    /// Angular half-width of the lidar band, in radians.
    pub lidar_band: f32,
    /// Lidar rotation speed in radians per time unit.
    pub lidar_speed: f32,
}

impl Default for FieldTuning {
    fn default() -> Self {
        Self {
            octaves: 4,
            direction_angle: 0.0,
            direction_influence: 0.3,
            vortex_falloff: 0.004,
            wave_length: 120.0,
            wave_amplitude: 1.0,
            wave_direction: 0.0,
            swarm_agents: 60,
            magnetic_poles: 6,
            pole_mode: PoleMode::Mixed,
            dipole_curves: true,
            cell_target: 8,
            lidar_band: 0.25,
            lidar_speed: 1.5,
        }
    }
}

impl FieldTuning {
    /// Clamp every value into its supported range.
    pub fn sanitized(mut self) -> Self {
        let defaults = FieldTuning::default();
        self.octaves = self.octaves.clamp(1, 8);
        self.direction_angle = finite_or(self.direction_angle, defaults.direction_angle);
        self.direction_influence = finite_or(self.direction_influence, defaults.direction_influence).clamp(0.0, 2.0);
        self.vortex_falloff = finite_or(self.vortex_falloff, defaults.vortex_falloff).clamp(0.0, 0.1);
        self.wave_length = finite_or(self.wave_length, defaults.wave_length).clamp(4.0, 4096.0);
        self.wave_amplitude = finite_or(self.wave_amplitude, defaults.wave_amplitude).clamp(0.0, 2.0);
        self.wave_direction = finite_or(self.wave_direction, defaults.wave_direction);
        self.swarm_agents = self.swarm_agents.clamp(1, crate::field::swarm::MAX_AGENTS);
        self.magnetic_poles = self.magnetic_poles.clamp(1, crate::field::magnetic::MAX_POLES);
        self.cell_target = self.cell_target.clamp(1, crate::field::cellular::MAX_TARGET);
        self.lidar_band = finite_or(self.lidar_band, defaults.lidar_band).clamp(0.01, std::f32::consts::PI);
        self.lidar_speed = finite_or(self.lidar_speed, defaults.lidar_speed).clamp(-20.0, 20.0);
        self
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// The complete parameter set consumed by the simulation.
///
/// All values are kept inside their documented ranges; construct through
/// [`Params::default`], [`Params::from_json`] or the `with_*` builders, all
/// of which clamp.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Params {
    /// Global speed multiplier (0.1-2.0).
    pub movement_speed: f32,
    /// Spatial frequency of noise-based fields (0.001-0.1).
    pub noise_scale: f32,
    /// Strength of the brightness buoyancy force (0.1-3.0).
    pub brightness_sensitivity: f32,
    /// RGB distance threshold for region growth (5-100).
    pub region_threshold: u32,
    /// Gravity well strength (0-10, 0 disables).
    pub gravity_strength: f32,
    /// Percentage of particles affected by scatter bursts (0-100).
    pub scatter_strength: f32,
    /// Use the pulse schedule instead of periodic scatter.
    pub scatter_pulse: bool,
    /// Chance that a pulse window contains a burst (0-1).
    pub scatter_pulse_probability: f32,
    /// Number of mirror chords (0-20).
    pub mirror_count: u32,
    /// Scan-line interference intensity (0-10).
    pub scan_line_interference: f32,
    /// Kaleidoscope intensity (0-10).
    pub kaleidoscope_fractal: f32,
    /// Trail intensity (0-10).
    pub trails: f32,
    /// Active vector field generator.
    pub flow_field_type: FieldKind,
    /// Strength of the active field (0-5).
    pub flow_strength: f32,
    /// Field time advanced per frame (0.001-0.05).
    pub time_step: f32,
    /// Generator-specific tuning.
    pub tuning: FieldTuning,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            movement_speed: 1.0,
            noise_scale: 0.01,
            brightness_sensitivity: 1.0,
            region_threshold: 30,
            gravity_strength: 0.0,
            scatter_strength: 0.0,
            scatter_pulse: false,
            scatter_pulse_probability: 0.5,
            mirror_count: 0,
            scan_line_interference: 0.0,
            kaleidoscope_fractal: 0.0,
            trails: 0.0,
            flow_field_type: FieldKind::Perlin,
            flow_strength: 1.0,
            time_step: 0.01,
            tuning: FieldTuning::default(),
        }
    }
}

/// Maximum number of mirror chords.
pub const MAX_MIRRORS: u32 = 20;

impl Params {
    /// Parse a parameter set from JSON. Missing keys take their defaults and
    /// every value is clamped into range.
    pub fn from_json(json: &str) -> Result<Self, ParamError> {
        let params: Params = serde_json::from_str(json)?;
        Ok(params.sanitized())
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, ParamError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Clamp every value into its supported range. Non-finite values fall
    /// back to the default.
    pub fn sanitized(mut self) -> Self {
        let d = Params::default();
        self.movement_speed = finite_or(self.movement_speed, d.movement_speed).clamp(0.1, 2.0);
        self.noise_scale = finite_or(self.noise_scale, d.noise_scale).clamp(0.001, 0.1);
        self.brightness_sensitivity = finite_or(self.brightness_sensitivity, d.brightness_sensitivity).clamp(0.1, 3.0);
        self.region_threshold = self.region_threshold.clamp(5, 100);
        self.gravity_strength = finite_or(self.gravity_strength, d.gravity_strength).clamp(0.0, 10.0);
        self.scatter_strength = finite_or(self.scatter_strength, d.scatter_strength).clamp(0.0, 100.0);
        self.scatter_pulse_probability =
            finite_or(self.scatter_pulse_probability, d.scatter_pulse_probability).clamp(0.0, 1.0);
        self.mirror_count = self.mirror_count.min(MAX_MIRRORS);
        self.scan_line_interference = finite_or(self.scan_line_interference, 0.0).clamp(0.0, 10.0);
        self.kaleidoscope_fractal = finite_or(self.kaleidoscope_fractal, 0.0).clamp(0.0, 10.0);
        self.trails = finite_or(self.trails, 0.0).clamp(0.0, 10.0);
        self.flow_strength = finite_or(self.flow_strength, d.flow_strength).clamp(0.0, 5.0);
        self.time_step = finite_or(self.time_step, d.time_step).clamp(0.001, 0.05);
        self.tuning = self.tuning.sanitized();
        self
    }

    /// Set the active field generator.
    pub fn with_field(mut self, kind: FieldKind) -> Self {
        self.flow_field_type = kind;
        self
    }

    /// Set the field strength (clamped to 0-5).
    pub fn with_flow_strength(mut self, strength: f32) -> Self {
        self.flow_strength = finite_or(strength, self.flow_strength).clamp(0.0, 5.0);
        self
    }

    /// Set the global speed multiplier (clamped to 0.1-2.0).
    pub fn with_movement_speed(mut self, speed: f32) -> Self {
        self.movement_speed = finite_or(speed, self.movement_speed).clamp(0.1, 2.0);
        self
    }

    /// Set the region threshold (clamped to 5-100).
    pub fn with_region_threshold(mut self, threshold: u32) -> Self {
        self.region_threshold = threshold.clamp(5, 100);
        self
    }

    /// Set the gravity well strength (clamped to 0-10).
    pub fn with_gravity(mut self, strength: f32) -> Self {
        self.gravity_strength = finite_or(strength, self.gravity_strength).clamp(0.0, 10.0);
        self
    }

    /// Set the scatter percentage (clamped to 0-100).
    pub fn with_scatter(mut self, percent: f32) -> Self {
        self.scatter_strength = finite_or(percent, self.scatter_strength).clamp(0.0, 100.0);
        self
    }

    /// Set the number of mirror chords (clamped to 0-20).
    pub fn with_mirrors(mut self, count: u32) -> Self {
        self.mirror_count = count.min(MAX_MIRRORS);
        self
    }

    /// Set the trail intensity (clamped to 0-10).
    pub fn with_trails(mut self, intensity: f32) -> Self {
        self.trails = finite_or(intensity, self.trails).clamp(0.0, 10.0);
        self
    }

    /// Apply a single update, returning the work it triggers.
    ///
    /// Returns [`Recompute::NONE`] when the clamped value equals the current
    /// one.
    pub fn apply(&mut self, update: ParamUpdate) -> Result<Recompute, ParamError> {
        update.check_finite()?;
        let before = self.clone();

        match update {
            ParamUpdate::MovementSpeed(v) => self.movement_speed = v.clamp(0.1, 2.0),
            ParamUpdate::NoiseScale(v) => self.noise_scale = v.clamp(0.001, 0.1),
            ParamUpdate::BrightnessSensitivity(v) => self.brightness_sensitivity = v.clamp(0.1, 3.0),
            ParamUpdate::RegionThreshold(v) => self.region_threshold = v.clamp(5, 100),
            ParamUpdate::GravityStrength(v) => self.gravity_strength = v.clamp(0.0, 10.0),
            ParamUpdate::ScatterStrength(v) => self.scatter_strength = v.clamp(0.0, 100.0),
            ParamUpdate::ScatterPulse(on) => self.scatter_pulse = on,
            ParamUpdate::ScatterPulseProbability(v) => self.scatter_pulse_probability = v.clamp(0.0, 1.0),
            ParamUpdate::MirrorCount(v) => self.mirror_count = v.min(MAX_MIRRORS),
            ParamUpdate::ScanLineInterference(v) => self.scan_line_interference = v.clamp(0.0, 10.0),
            ParamUpdate::KaleidoscopeFractal(v) => self.kaleidoscope_fractal = v.clamp(0.0, 10.0),
            ParamUpdate::Trails(v) => self.trails = v.clamp(0.0, 10.0),
            ParamUpdate::FlowFieldType(kind) => self.flow_field_type = kind,
            ParamUpdate::FlowStrength(v) => self.flow_strength = v.clamp(0.0, 5.0),
            ParamUpdate::TimeStep(v) => self.time_step = v.clamp(0.001, 0.05),
            ParamUpdate::Tuning(ref tuning) => self.tuning = tuning.clone().sanitized(),
        }

        if *self == before {
            return Ok(Recompute::NONE);
        }
        Ok(update.recompute())
    }
}

/// A single typed parameter change.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamUpdate {
    MovementSpeed(f32),
    NoiseScale(f32),
    BrightnessSensitivity(f32),
    RegionThreshold(u32),
    GravityStrength(f32),
    ScatterStrength(f32),
    ScatterPulse(bool),
    ScatterPulseProbability(f32),
    MirrorCount(u32),
    ScanLineInterference(f32),
    KaleidoscopeFractal(f32),
    Trails(f32),
    FlowFieldType(FieldKind),
    FlowStrength(f32),
    TimeStep(f32),
    Tuning(FieldTuning),
}

impl ParamUpdate {
    /// Build an update from an external control name and a raw value.
    ///
    /// Names use the camelCase keys of the serialized [`Params`].
    pub fn from_control(name: &str, value: &str) -> Result<Self, ParamError> {
        fn number(name: &'static str, value: &str) -> Result<f32, ParamError> {
            value
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or(ParamError::NotFinite(name))
        }

        let update = match name {
            "movementSpeed" => ParamUpdate::MovementSpeed(number("movementSpeed", value)?),
            "noiseScale" => ParamUpdate::NoiseScale(number("noiseScale", value)?),
            "brightnessSensitivity" => ParamUpdate::BrightnessSensitivity(number("brightnessSensitivity", value)?),
            "regionThreshold" => ParamUpdate::RegionThreshold(number("regionThreshold", value)?.round().max(0.0) as u32),
            "gravityStrength" => ParamUpdate::GravityStrength(number("gravityStrength", value)?),
            "scatterStrength" => ParamUpdate::ScatterStrength(number("scatterStrength", value)?),
            "scatterPulse" => ParamUpdate::ScatterPulse(matches!(value.trim(), "true" | "1" | "on")),
            "scatterPulseProbability" => {
                ParamUpdate::ScatterPulseProbability(number("scatterPulseProbability", value)?)
            }
            "mirrorCount" => ParamUpdate::MirrorCount(number("mirrorCount", value)?.round().max(0.0) as u32),
            "scanLineInterference" => ParamUpdate::ScanLineInterference(number("scanLineInterference", value)?),
            "kaleidoscopeFractal" => ParamUpdate::KaleidoscopeFractal(number("kaleidoscopeFractal", value)?),
            "trails" => ParamUpdate::Trails(number("trails", value)?),
            "flowFieldType" => ParamUpdate::FlowFieldType(value.parse()?),
            "flowStrength" => ParamUpdate::FlowStrength(number("flowStrength", value)?),
            "timeStep" => ParamUpdate::TimeStep(number("timeStep", value)?),
            _ => return Err(ParamError::UnknownParameter(name.to_string())),
        };
        Ok(update)
    }

    fn check_finite(&self) -> Result<(), ParamError> {
        let (name, value) = match self {
            ParamUpdate::MovementSpeed(v) => ("movementSpeed", *v),
            ParamUpdate::NoiseScale(v) => ("noiseScale", *v),
            ParamUpdate::BrightnessSensitivity(v) => ("brightnessSensitivity", *v),
            ParamUpdate::GravityStrength(v) => ("gravityStrength", *v),
            ParamUpdate::ScatterStrength(v) => ("scatterStrength", *v),
            ParamUpdate::ScatterPulseProbability(v) => ("scatterPulseProbability", *v),
            ParamUpdate::ScanLineInterference(v) => ("scanLineInterference", *v),
            ParamUpdate::KaleidoscopeFractal(v) => ("kaleidoscopeFractal", *v),
            ParamUpdate::Trails(v) => ("trails", *v),
            ParamUpdate::FlowStrength(v) => ("flowStrength", *v),
            ParamUpdate::TimeStep(v) => ("timeStep", *v),
            _ => return Ok(()),
        };
        if value.is_finite() {
            Ok(())
        } else {
            Err(ParamError::NotFinite(name))
        }
    }

    /// Derived state invalidated by this kind of update.
    pub fn recompute(&self) -> Recompute {
        match self {
            ParamUpdate::NoiseScale(_) | ParamUpdate::FlowStrength(_) => Recompute {
                field: true,
                ..Recompute::NONE
            },
            ParamUpdate::FlowFieldType(_) | ParamUpdate::Tuning(_) => Recompute {
                field: true,
                generator_state: true,
                ..Recompute::NONE
            },
            ParamUpdate::RegionThreshold(_) => Recompute {
                regions: true,
                field: true,
                ..Recompute::NONE
            },
            ParamUpdate::GravityStrength(_) => Recompute {
                wells: true,
                ..Recompute::NONE
            },
            ParamUpdate::MirrorCount(_) => Recompute {
                chords: true,
                ..Recompute::NONE
            },
            ParamUpdate::Trails(_) => Recompute {
                trails: true,
                ..Recompute::NONE
            },
            ParamUpdate::MovementSpeed(_)
            | ParamUpdate::BrightnessSensitivity(_)
            | ParamUpdate::ScatterStrength(_)
            | ParamUpdate::ScatterPulse(_)
            | ParamUpdate::ScatterPulseProbability(_)
            | ParamUpdate::ScanLineInterference(_)
            | ParamUpdate::KaleidoscopeFractal(_)
            | ParamUpdate::TimeStep(_) => Recompute::NONE,
        }
    }
}

/// Derived state that must be rebuilt after a parameter change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Recompute {
    /// Regenerate the active vector field now instead of at its cadence.
    pub field: bool,
    /// Rebuild the active generator's persistent state (agents, poles...).
    pub generator_state: bool,
    /// Re-run region segmentation.
    pub regions: bool,
    /// Regenerate gravity wells.
    pub wells: bool,
    /// Redraw mirror chords.
    pub chords: bool,
    /// Reselect trail particles.
    pub trails: bool,
}

impl Recompute {
    /// Nothing to rebuild.
    pub const NONE: Recompute = Recompute {
        field: false,
        generator_state: false,
        regions: false,
        wells: false,
        chords: false,
        trails: false,
    };

    /// Whether any rebuild is requested.
    pub fn any(&self) -> bool {
        *self != Recompute::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== FieldKind ==========

    #[test]
    fn test_field_kind_names_round_trip() {
        for kind in FieldKind::ALL {
            assert_eq!(kind.name().parse::<FieldKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_field_kind_aliases() {
        assert_eq!("Black-Hole".parse::<FieldKind>().unwrap(), FieldKind::BlackHole);
        assert_eq!("time_displacement".parse::<FieldKind>().unwrap(), FieldKind::Temporal);
        assert_eq!("feedback-echo".parse::<FieldKind>().unwrap(), FieldKind::Feedback);
        assert_eq!("IFS".parse::<FieldKind>().unwrap(), FieldKind::Fractal);
    }

    #[test]
    fn test_unknown_field_kind() {
        let err = "plasma".parse::<FieldKind>().unwrap_err();
        assert!(matches!(err, ParamError::UnknownFieldKind(ref n) if n == "plasma"));
    }

    #[test]
    fn test_field_weights() {
        assert!((FieldKind::Chromatic.field_weight() - 0.8).abs() < 1e-6);
        assert!((FieldKind::Perlin.field_weight() - 0.1).abs() < 1e-6);
        assert!(FieldKind::Temporal.full_resolution());
        assert!(!FieldKind::Vortex.full_resolution());
    }

    // ========== Params ==========

    #[test]
    fn test_params_default_in_range() {
        let params = Params::default();
        assert_eq!(params.clone().sanitized(), params);
    }

    #[test]
    fn test_params_builder_clamping() {
        let params = Params::default()
            .with_movement_speed(5.0)
            .with_region_threshold(1)
            .with_scatter(250.0)
            .with_mirrors(99);

        assert!((params.movement_speed - 2.0).abs() < 1e-6);
        assert_eq!(params.region_threshold, 5);
        assert!((params.scatter_strength - 100.0).abs() < 1e-6);
        assert_eq!(params.mirror_count, MAX_MIRRORS);
    }

    #[test]
    fn test_params_json_partial() {
        let params = Params::from_json(r#"{ "flowFieldType": "vortex", "movementSpeed": 9.0 }"#).unwrap();
        assert_eq!(params.flow_field_type, FieldKind::Vortex);
        assert!((params.movement_speed - 2.0).abs() < 1e-6);
        assert_eq!(params.region_threshold, 30);
    }

    #[test]
    fn test_params_json_round_trip() {
        let params = Params::default().with_field(FieldKind::BlackHole).with_trails(3.0);
        let json = params.to_json().unwrap();
        assert!(json.contains("\"blackhole\""));
        assert_eq!(Params::from_json(&json).unwrap(), params);
    }

    #[test]
    fn test_params_json_black_hole_spellings() {
        for name in ["blackhole", "black-hole", "blackHole"] {
            let json = format!(r#"{{ "flowFieldType": "{}" }}"#, name);
            let params = Params::from_json(&json).unwrap();
            assert_eq!(params.flow_field_type, FieldKind::BlackHole, "{}", name);
            assert_eq!(name.parse::<FieldKind>().unwrap(), FieldKind::BlackHole);
        }
    }

    #[test]
    fn test_params_json_invalid() {
        assert!(matches!(Params::from_json("{ nope"), Err(ParamError::Json(_))));
    }

    // ========== Updates ==========

    #[test]
    fn test_threshold_update_triggers_regions() {
        let mut params = Params::default();
        let recompute = params.apply(ParamUpdate::RegionThreshold(45)).unwrap();
        assert!(recompute.regions);
        assert!(recompute.field);
        assert!(!recompute.wells);
        assert_eq!(params.region_threshold, 45);
    }

    #[test]
    fn test_unchanged_update_is_noop() {
        let mut params = Params::default();
        let recompute = params.apply(ParamUpdate::RegionThreshold(30)).unwrap();
        assert!(!recompute.any());
    }

    #[test]
    fn test_update_clamps() {
        let mut params = Params::default();
        params.apply(ParamUpdate::NoiseScale(3.0)).unwrap();
        assert!((params.noise_scale - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_non_finite_update_rejected() {
        let mut params = Params::default();
        let err = params.apply(ParamUpdate::FlowStrength(f32::NAN)).unwrap_err();
        assert!(matches!(err, ParamError::NotFinite("flowStrength")));
        assert_eq!(params, Params::default());
    }

    #[test]
    fn test_field_type_update_rebuilds_state() {
        let mut params = Params::default();
        let recompute = params.apply(ParamUpdate::FlowFieldType(FieldKind::Swarm)).unwrap();
        assert!(recompute.field);
        assert!(recompute.generator_state);
    }

    #[test]
    fn test_from_control() {
        assert_eq!(
            ParamUpdate::from_control("regionThreshold", "42.4").unwrap(),
            ParamUpdate::RegionThreshold(42)
        );
        assert_eq!(
            ParamUpdate::from_control("flowFieldType", "black-hole").unwrap(),
            ParamUpdate::FlowFieldType(FieldKind::BlackHole)
        );
        assert!(ParamUpdate::from_control("trails", "lots").is_err());
        assert!(ParamUpdate::from_control("colour", "1").is_err());
    }
}
