//! Error types for pixel-drift.
//!
//! This module provides error types for image loading, parameter updates,
//! and vector field generation.

use std::fmt;

use crate::params::FieldKind;

/// Errors that can occur while loading a source image.
///
/// A failed load never touches the running simulation: the previous image,
/// particles and regions stay in place.
#[derive(Debug)]
pub enum LoadError {
    /// The image has zero width or height.
    EmptyImage,
    /// The RGBA buffer length does not match `width * height * 4`.
    BufferSize {
        /// Expected byte count.
        expected: usize,
        /// Actual byte count.
        actual: usize,
    },
    /// The image exceeds the supported resolution.
    TooLarge {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
    },
    /// Failed to decode or read an image through the `image` crate.
    Image(image::ImageError),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::EmptyImage => write!(f, "Image has zero width or height"),
            LoadError::BufferSize { expected, actual } => write!(
                f,
                "RGBA buffer has {} bytes, expected {} (width * height * 4)",
                actual, expected
            ),
            LoadError::TooLarge { width, height } => write!(
                f,
                "Image {}x{} exceeds the supported resolution of {} pixels",
                width,
                height,
                crate::source::MAX_PIXELS
            ),
            LoadError::Image(e) => write!(f, "Failed to load image: {}", e),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Image(e) => Some(e),
            _ => None,
        }
    }
}

impl From<image::ImageError> for LoadError {
    fn from(e: image::ImageError) -> Self {
        LoadError::Image(e)
    }
}

/// Errors produced when a parameter value is rejected at the boundary.
///
/// Out-of-range numbers are clamped rather than rejected; only values that
/// cannot be clamped meaningfully end up here.
#[derive(Debug)]
pub enum ParamError {
    /// A numeric parameter was NaN or infinite.
    NotFinite(&'static str),
    /// A flow field name did not match any generator.
    UnknownFieldKind(String),
    /// A control name did not match any parameter.
    UnknownParameter(String),
    /// A parameter set could not be parsed from JSON.
    Json(serde_json::Error),
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamError::NotFinite(name) => write!(f, "Parameter '{}' must be a finite number", name),
            ParamError::UnknownFieldKind(name) => write!(f, "Unknown flow field type '{}'", name),
            ParamError::UnknownParameter(name) => write!(f, "Unknown parameter '{}'", name),
            ParamError::Json(e) => write!(f, "Failed to parse parameters: {}", e),
        }
    }
}

impl std::error::Error for ParamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParamError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ParamError {
    fn from(e: serde_json::Error) -> Self {
        ParamError::Json(e)
    }
}

/// Errors raised by a vector field generation step.
///
/// The field library treats any of these as "skip this update": the
/// previously committed field stays active.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldError {
    /// A generator produced a NaN or infinite component.
    NonFinite {
        /// Generator that produced the value.
        kind: FieldKind,
        /// Flat grid index of the offending cell.
        index: usize,
    },
    /// A generated grid did not have the expected number of cells.
    GridSize {
        /// Expected cell count.
        expected: usize,
        /// Actual cell count.
        actual: usize,
    },
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::NonFinite { kind, index } => write!(
                f,
                "Field generator '{}' produced a non-finite vector at cell {}",
                kind.name(),
                index
            ),
            FieldError::GridSize { expected, actual } => write!(
                f,
                "Generated field has {} cells, expected {}",
                actual, expected
            ),
        }
    }
}

impl std::error::Error for FieldError {}
