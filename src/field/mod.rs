//! Procedural 2D vector fields.
//!
//! A vector field is a grid of [`FieldVector`]s laid over the canvas. Most
//! generators work at a quarter of the canvas resolution per axis; the
//! temporal generator works at full resolution. Particles read the field
//! through [`VectorField::sample_bilinear`] (or [`VectorField::sample_nearest`])
//! using canvas coordinates, so the grid resolution is invisible to them.
//!
//! # Generators
//!
//! | Kind | Character | State |
//! |------|-----------|-------|
//! | [`FieldKind::Perlin`] | smooth animated noise | - |
//! | [`FieldKind::Turbulent`] | fractal noise | - |
//! | [`FieldKind::Directional`] | wind with gusts | - |
//! | [`FieldKind::Vortex`] | swirl around the center | - |
//! | [`FieldKind::Wave`] | travelling sinusoid | - |
//! | [`FieldKind::Swarm`] | flocking agents | agents |
//! | [`FieldKind::Magnetic`] | poles and dipole lines | poles |
//! | [`FieldKind::Cellular`] | pulsing, dividing cells | cells |
//! | [`FieldKind::Radial`] | outward push | - |
//! | [`FieldKind::Centrifugal`] | outward spin with a spiral | - |
//! | [`FieldKind::Chromatic`] | chaotic interference | - |
//! | [`FieldKind::Temporal`] | desynchronized blocks | - |
//! | [`FieldKind::Feedback`] | echoes of rendered frames | frame history |
//! | [`FieldKind::Lidar`] | rotating scan line | - |
//! | [`FieldKind::Fractal`] | triangular subdivision | - |
//! | [`FieldKind::BlackHole`] | orbiting attractor | attractor |
//!
//! # Singular points
//!
//! Every generator with a center or pole returns [`FieldVector::ZERO`] when
//! sampled within [`SINGULAR_EPSILON`] of it, and every inverse or
//! exponential term clamps its distance first. Generated grids are checked
//! for non-finite values before they replace the active field.

pub mod black_hole;
pub mod cellular;
pub mod feedback;
pub mod geometric;
mod library;
pub mod magnetic;
pub mod noise_fields;
pub mod swarm;

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::error::FieldError;
use crate::params::FieldKind;

pub use feedback::{DownsampledFrame, FrameHistory};
pub use library::{generate, FieldContext, FieldInput, FieldLibrary};

/// Reduced-resolution fields are this many times smaller per axis.
pub const FIELD_DOWNSCALE: u32 = 4;

/// Distance (in pixels) below which a point counts as sitting on a center
/// or pole.
pub const SINGULAR_EPSILON: f32 = 1e-3;

/// One cell of a vector field: a unit direction, a magnitude, and a
/// generator-specific tag (cellular zone, temporal block...).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct FieldVector {
    pub x: f32,
    pub y: f32,
    pub magnitude: f32,
    pub tag: u32,
}

impl FieldVector {
    /// No force.
    pub const ZERO: FieldVector = FieldVector {
        x: 0.0,
        y: 0.0,
        magnitude: 0.0,
        tag: 0,
    };

    /// Build from a force vector. Degenerate or non-finite input yields
    /// [`FieldVector::ZERO`].
    #[inline]
    pub fn from_vec(v: Vec2) -> Self {
        let len = v.length();
        if !len.is_finite() || len <= 1e-9 {
            return Self::ZERO;
        }
        Self {
            x: v.x / len,
            y: v.y / len,
            magnitude: len,
            tag: 0,
        }
    }

    /// Build from a direction angle (radians) and a magnitude.
    #[inline]
    pub fn from_angle(angle: f32, magnitude: f32) -> Self {
        Self::from_vec(Vec2::from_angle(angle) * magnitude)
    }

    /// Attach a tag.
    #[inline]
    pub fn with_tag(mut self, tag: u32) -> Self {
        self.tag = tag;
        self
    }

    /// Direction scaled by magnitude.
    #[inline]
    pub fn force(&self) -> Vec2 {
        Vec2::new(self.x, self.y) * self.magnitude
    }

    /// Whether every component is finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.magnitude.is_finite()
    }

    /// Whether this is exactly the zero vector.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.magnitude == 0.0 && self.x == 0.0 && self.y == 0.0
    }
}

/// A grid of field vectors covering a `width x height` canvas.
#[derive(Clone, Debug, PartialEq)]
pub struct VectorField {
    cols: usize,
    rows: usize,
    cell_width: f32,
    cell_height: f32,
    data: Vec<FieldVector>,
}

impl VectorField {
    /// A zeroed `cols x rows` grid spanning a `width x height` canvas.
    pub fn new(cols: usize, rows: usize, width: u32, height: u32) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        Self {
            cols,
            rows,
            cell_width: width.max(1) as f32 / cols as f32,
            cell_height: height.max(1) as f32 / rows as f32,
            data: vec![FieldVector::ZERO; cols * rows],
        }
    }

    /// A zeroed grid at the resolution `kind` generates at.
    pub fn for_kind(kind: FieldKind, width: u32, height: u32) -> Self {
        let (cols, rows) = grid_size(kind, width, height);
        Self::new(cols, rows, width, height)
    }

    /// Grid columns.
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Grid rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Canvas pixels per grid cell along each axis.
    #[inline]
    pub fn cell_size(&self) -> Vec2 {
        Vec2::new(self.cell_width, self.cell_height)
    }

    /// Cells, row-major.
    #[inline]
    pub fn data(&self) -> &[FieldVector] {
        &self.data
    }

    /// Cell at grid coordinate `(col, row)`. Panics when out of range.
    #[inline]
    pub fn get(&self, col: usize, row: usize) -> FieldVector {
        self.data[row * self.cols + col]
    }

    /// Overwrite the cell at `(col, row)`.
    #[inline]
    pub fn set(&mut self, col: usize, row: usize, value: FieldVector) {
        self.data[row * self.cols + col] = value;
    }

    /// Canvas position of grid node `(col, row)`.
    #[inline]
    pub fn node_position(&self, col: usize, row: usize) -> Vec2 {
        Vec2::new(col as f32 * self.cell_width, row as f32 * self.cell_height)
    }

    /// Fill every cell from its flat index and canvas position.
    pub fn fill<F>(&mut self, mut f: F)
    where
        F: FnMut(usize, Vec2) -> FieldVector,
    {
        let cols = self.cols;
        let (cw, ch) = (self.cell_width, self.cell_height);
        for (i, cell) in self.data.iter_mut().enumerate() {
            let pos = Vec2::new((i % cols) as f32 * cw, (i / cols) as f32 * ch);
            *cell = f(i, pos);
        }
    }

    /// Nearest cell to grid coordinate `(gx, gy)`, clamped to the grid.
    pub fn sample_grid_nearest(&self, gx: f32, gy: f32) -> FieldVector {
        let c = clamp_index(gx.round(), self.cols);
        let r = clamp_index(gy.round(), self.rows);
        self.get(c, r)
    }

    /// Bilinear blend of the four cells around grid coordinate `(gx, gy)`.
    ///
    /// Direction components and magnitude are interpolated independently;
    /// the tag comes from the nearest cell. At integer coordinates the
    /// result equals [`VectorField::sample_grid_nearest`] exactly.
    pub fn sample_grid_bilinear(&self, gx: f32, gy: f32) -> FieldVector {
        let gx = clamp_coord(gx, self.cols);
        let gy = clamp_coord(gy, self.rows);
        let c0 = gx.floor() as usize;
        let r0 = gy.floor() as usize;
        let c1 = (c0 + 1).min(self.cols - 1);
        let r1 = (r0 + 1).min(self.rows - 1);
        let tx = gx - c0 as f32;
        let ty = gy - r0 as f32;

        let v00 = self.get(c0, r0);
        let v10 = self.get(c1, r0);
        let v01 = self.get(c0, r1);
        let v11 = self.get(c1, r1);

        let blend = |a: f32, b: f32, c: f32, d: f32| lerp(lerp(a, b, tx), lerp(c, d, tx), ty);

        FieldVector {
            x: blend(v00.x, v10.x, v01.x, v11.x),
            y: blend(v00.y, v10.y, v01.y, v11.y),
            magnitude: blend(v00.magnitude, v10.magnitude, v01.magnitude, v11.magnitude),
            tag: self.sample_grid_nearest(gx, gy).tag,
        }
    }

    /// Nearest-cell sample at canvas position `(x, y)`.
    #[inline]
    pub fn sample_nearest(&self, x: f32, y: f32) -> FieldVector {
        self.sample_grid_nearest(x / self.cell_width, y / self.cell_height)
    }

    /// Bilinear sample at canvas position `(x, y)`.
    #[inline]
    pub fn sample_bilinear(&self, x: f32, y: f32) -> FieldVector {
        self.sample_grid_bilinear(x / self.cell_width, y / self.cell_height)
    }

    /// Mean magnitude over all cells.
    pub fn mean_magnitude(&self) -> f32 {
        self.data.iter().map(|v| v.magnitude).sum::<f32>() / self.data.len() as f32
    }

    /// Check that `expected` cells were produced and all are finite.
    pub fn validate(&self, kind: FieldKind, expected: usize) -> Result<(), FieldError> {
        if self.data.len() != expected {
            return Err(FieldError::GridSize {
                expected,
                actual: self.data.len(),
            });
        }
        match self.data.iter().position(|v| !v.is_finite()) {
            Some(index) => Err(FieldError::NonFinite { kind, index }),
            None => Ok(()),
        }
    }

    /// Raw bytes of the grid, for handing to a visualizer.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}

/// Grid dimensions `kind` generates at for a `width x height` canvas.
pub fn grid_size(kind: FieldKind, width: u32, height: u32) -> (usize, usize) {
    if kind.full_resolution() {
        (width.max(1) as usize, height.max(1) as usize)
    } else {
        (
            width.div_ceil(FIELD_DOWNSCALE).max(1) as usize,
            height.div_ceil(FIELD_DOWNSCALE).max(1) as usize,
        )
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
fn clamp_coord(v: f32, len: usize) -> f32 {
    if v.is_finite() {
        v.clamp(0.0, (len - 1) as f32)
    } else {
        0.0
    }
}

#[inline]
fn clamp_index(v: f32, len: usize) -> usize {
    clamp_coord(v, len) as usize
}

/// Wrap an angle into `(-PI, PI]`.
#[inline]
pub(crate) fn wrap_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let a = (angle + PI).rem_euclid(TAU) - PI;
    if a <= -PI {
        a + TAU
    } else {
        a
    }
}
