//! Decoded source images.
//!
//! Decoding is left to the caller; a [`SourceImage`] is a validated RGBA8
//! buffer plus its dimensions. Construct one from raw bytes with
//! [`SourceImage::new`] or from an `image::RgbaImage` with
//! [`SourceImage::from_rgba_image`].

use crate::error::LoadError;

/// Largest supported image, in pixels (2048 x 2048).
pub const MAX_PIXELS: usize = 2048 * 2048;

/// A validated RGBA8 image buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl SourceImage {
    /// Wrap an RGBA8 buffer of `width * height * 4` bytes.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, LoadError> {
        if width == 0 || height == 0 {
            return Err(LoadError::EmptyImage);
        }
        let pixels = width as usize * height as usize;
        if pixels > MAX_PIXELS {
            return Err(LoadError::TooLarge { width, height });
        }
        let expected = pixels * 4;
        if data.len() != expected {
            return Err(LoadError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { width, height, data })
    }

    /// An image filled with a single color.
    pub fn uniform(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, LoadError> {
        let pixels = width as usize * height as usize;
        let data = rgba.iter().copied().cycle().take(pixels * 4).collect();
        Self::new(width, height, data)
    }

    /// Copy the pixels of an `image::RgbaImage`.
    pub fn from_rgba_image(image: &image::RgbaImage) -> Result<Self, LoadError> {
        Self::new(image.width(), image.height(), image.as_raw().clone())
    }

    /// Image width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of pixels.
    #[inline]
    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Always false; an empty image cannot be constructed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw RGBA bytes, row-major.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Pixels as `[r, g, b, a]` quadruples, row-major.
    #[inline]
    pub fn pixels(&self) -> &[[u8; 4]] {
        bytemuck::cast_slice(&self.data)
    }

    /// Pixel at `(x, y)`. Panics when out of bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels()[(y * self.width + x) as usize]
    }
}

/// Perceived brightness of an RGB color in `[0, 1]` (channel mean).
#[inline]
pub fn brightness(rgb: [f32; 3]) -> f32 {
    (rgb[0] + rgb[1] + rgb[2]) / (3.0 * 255.0)
}

/// Euclidean distance between two RGB colors (0-441).
#[inline]
pub fn rgb_distance(a: [u8; 4], b: [u8; 4]) -> f32 {
    let dr = a[0] as f32 - b[0] as f32;
    let dg = a[1] as f32 - b[1] as f32;
    let db = a[2] as f32 - b[2] as f32;
    (dr * dr + dg * dg + db * db).sqrt()
}

/// Hue in degrees `[0, 360)` and HSV saturation in `[0, 1]` of an RGB color
/// with channels in `0..=255`.
pub fn hue_saturation(rgb: [f32; 3]) -> (f32, f32) {
    let r = rgb[0] / 255.0;
    let g = rgb[1] / 255.0;
    let b = rgb[2] / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let chroma = max - min;

    if chroma <= f32::EPSILON {
        return (0.0, 0.0);
    }

    let hue = if max == r {
        60.0 * ((g - b) / chroma).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / chroma + 2.0)
    } else {
        60.0 * ((r - g) / chroma + 4.0)
    };
    let saturation = chroma / max;

    (hue.rem_euclid(360.0), saturation)
}
