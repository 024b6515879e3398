//! Deterministic coherent (gradient) noise.
//!
//! Classic lattice noise over a 256-entry shuffled permutation table,
//! duplicated to 512 entries so lookups never wrap. Gradients are the eight
//! directions at 45 degree steps and interpolation uses the quintic fade
//! `t³(6t² - 15t + 10)`, which keeps the second derivative continuous at
//! lattice boundaries.
//!
//! The 3D variant is used with time on the third axis to animate 2D fields.
//!
//! Two generators built from the same table return bit-identical values.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// The eight lattice gradients, 45 degrees apart.
const GRADIENTS: [(f32, f32); 8] = [
    (1.0, 0.0),
    (std::f32::consts::FRAC_1_SQRT_2, std::f32::consts::FRAC_1_SQRT_2),
    (0.0, 1.0),
    (-std::f32::consts::FRAC_1_SQRT_2, std::f32::consts::FRAC_1_SQRT_2),
    (-1.0, 0.0),
    (-std::f32::consts::FRAC_1_SQRT_2, -std::f32::consts::FRAC_1_SQRT_2),
    (0.0, -1.0),
    (std::f32::consts::FRAC_1_SQRT_2, -std::f32::consts::FRAC_1_SQRT_2),
];

/// Gradient noise over a fixed permutation table.
#[derive(Clone)]
pub struct PerlinNoise {
    perm: [u8; 512],
}

impl std::fmt::Debug for PerlinNoise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerlinNoise").field("perm[0..8]", &&self.perm[..8]).finish()
    }
}

impl PerlinNoise {
    /// Build a table by shuffling `0..=255` with a seeded RNG.
    pub fn new(seed: u64) -> Self {
        let mut table = [0u8; 256];
        for (i, v) in table.iter_mut().enumerate() {
            *v = i as u8;
        }
        table.shuffle(&mut SmallRng::seed_from_u64(seed));
        Self::from_permutation(table)
    }

    /// Use an explicit permutation table.
    pub fn from_permutation(table: [u8; 256]) -> Self {
        let mut perm = [0u8; 512];
        perm[..256].copy_from_slice(&table);
        perm[256..].copy_from_slice(&table);
        Self { perm }
    }

    #[inline]
    fn hash2(&self, x: usize, y: usize) -> usize {
        self.perm[self.perm[x] as usize + y] as usize
    }

    #[inline]
    fn hash3(&self, x: usize, y: usize, z: usize) -> usize {
        self.perm[self.hash2(x, y) + z] as usize
    }

    /// 2D noise, roughly in `[-1, 1]`.
    pub fn noise2(&self, x: f32, y: f32) -> f32 {
        let xf = x.floor();
        let yf = y.floor();
        let xi = (xf as i32 & 255) as usize;
        let yi = (yf as i32 & 255) as usize;
        let x = x - xf;
        let y = y - yf;

        let u = fade(x);
        let v = fade(y);

        let aa = grad2(self.hash2(xi, yi), x, y);
        let ba = grad2(self.hash2(xi + 1, yi), x - 1.0, y);
        let ab = grad2(self.hash2(xi, yi + 1), x, y - 1.0);
        let bb = grad2(self.hash2(xi + 1, yi + 1), x - 1.0, y - 1.0);

        let value = lerp(lerp(aa, ba, u), lerp(ab, bb, u), v);
        (value * std::f32::consts::SQRT_2).clamp(-1.0, 1.0)
    }

    /// 3D noise, roughly in `[-1, 1]`. The gradient of each corner is one
    /// of the planar directions plus a unit slope along z.
    pub fn noise3(&self, x: f32, y: f32, z: f32) -> f32 {
        let xf = x.floor();
        let yf = y.floor();
        let zf = z.floor();
        let xi = (xf as i32 & 255) as usize;
        let yi = (yf as i32 & 255) as usize;
        let zi = (zf as i32 & 255) as usize;
        let x = x - xf;
        let y = y - yf;
        let z = z - zf;

        let u = fade(x);
        let v = fade(y);
        let w = fade(z);

        let c000 = grad3(self.hash3(xi, yi, zi), x, y, z);
        let c100 = grad3(self.hash3(xi + 1, yi, zi), x - 1.0, y, z);
        let c010 = grad3(self.hash3(xi, yi + 1, zi), x, y - 1.0, z);
        let c110 = grad3(self.hash3(xi + 1, yi + 1, zi), x - 1.0, y - 1.0, z);
        let c001 = grad3(self.hash3(xi, yi, zi + 1), x, y, z - 1.0);
        let c101 = grad3(self.hash3(xi + 1, yi, zi + 1), x - 1.0, y, z - 1.0);
        let c011 = grad3(self.hash3(xi, yi + 1, zi + 1), x, y - 1.0, z - 1.0);
        let c111 = grad3(self.hash3(xi + 1, yi + 1, zi + 1), x - 1.0, y - 1.0, z - 1.0);

        let x00 = lerp(c000, c100, u);
        let x10 = lerp(c010, c110, u);
        let x01 = lerp(c001, c101, u);
        let x11 = lerp(c011, c111, u);
        let value = lerp(lerp(x00, x10, v), lerp(x01, x11, v), w);
        value.clamp(-1.0, 1.0)
    }

    /// Fractal sum of `octaves` layers of 3D noise. Amplitude halves and
    /// frequency doubles per octave; the result is normalized back into
    /// `[-1, 1]`.
    pub fn fbm3(&self, x: f32, y: f32, z: f32, octaves: u32) -> f32 {
        let mut sum = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        let mut norm = 0.0;

        for _ in 0..octaves.max(1) {
            sum += self.noise3(x * frequency, y * frequency, z * frequency) * amplitude;
            norm += amplitude;
            amplitude *= 0.5;
            frequency *= 2.0;
        }

        sum / norm
    }
}

impl Default for PerlinNoise {
    fn default() -> Self {
        Self::new(0)
    }
}

#[inline]
fn fade(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
fn grad2(hash: usize, x: f32, y: f32) -> f32 {
    let (gx, gy) = GRADIENTS[hash & 7];
    gx * x + gy * y
}

#[inline]
fn grad3(hash: usize, x: f32, y: f32, z: f32) -> f32 {
    let (gx, gy) = GRADIENTS[hash & 7];
    let gz = if hash & 8 == 0 { 1.0 } else { -1.0 };
    (gx * x + gy * y + gz * z) * 0.7
}
