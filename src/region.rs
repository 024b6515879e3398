//! Color-coherent region segmentation.
//!
//! Regions are grown once per image (and again whenever the threshold
//! changes) with a 4-connected flood fill. A candidate pixel joins the region
//! when its RGB distance to the *seed* color is within the threshold, so a
//! region never drifts along a gradient.
//!
//! After growth the regions are sorted by size, truncated to
//! [`MAX_REGIONS`], renumbered in that order and given their derived stats.
//! Pixels in dropped regions stay unassigned.
//!
//! # Example
//!
//! ```ignore
//! let segmentation = Segmentation::new(&image, 30.0, &mut rng);
//! for region in segmentation.regions() {
//!     println!("{}: {} px, hue {:.0}", region.id, region.size, region.hue);
//! }
//! ```

use glam::Vec2;
use rand::Rng;

use crate::source::{brightness, hue_saturation, rgb_distance, SourceImage};

/// Maximum number of regions kept (largest first).
pub const MAX_REGIONS: usize = 100;

/// Regions smaller than this are discarded.
pub const MIN_REGION_SIZE: usize = 50;

/// Inclusive pixel bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub min_x: u32,
    pub max_x: u32,
    pub min_y: u32,
    pub max_y: u32,
}

impl Bounds {
    fn point(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            max_x: x,
            min_y: y,
            max_y: y,
        }
    }

    fn include(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
    }

    /// Box width in pixels.
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    /// Box height in pixels.
    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }
}

/// A connected set of similarly colored pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    /// Position in the size-sorted region list.
    pub id: usize,
    /// Member pixel indices (`y * width + x`), in fill order.
    pub pixels: Vec<u32>,
    /// Mean RGB color, channels in `0..=255`.
    pub color: [f32; 3],
    /// Mean brightness in `[0, 1]`.
    pub brightness: f32,
    /// Inclusive bounding box.
    pub bounds: Bounds,
    /// Centroid of the member pixels.
    pub center: Vec2,
    /// Number of member pixels.
    pub size: usize,
    /// Hue of the mean color in degrees.
    pub hue: f32,
    /// Saturation of the mean color in `[0, 1]`.
    pub saturation: f32,
    /// Speed scaling for member particles. Bright and large regions move
    /// slower; a random jitter keeps neighbors from moving in lockstep.
    pub velocity_multiplier: f32,
    /// `ln(size + 1) / 10`.
    pub mass: f32,
}

/// The result of segmenting one image.
#[derive(Clone, Debug, Default)]
pub struct Segmentation {
    width: u32,
    height: u32,
    regions: Vec<Region>,
    assignment: Vec<Option<u16>>,
}

impl Segmentation {
    /// Segment `image` with the given RGB distance threshold.
    ///
    /// Never fails: a degenerate image or threshold yields a short (possibly
    /// empty) region list.
    pub fn new<R: Rng + ?Sized>(image: &SourceImage, threshold: f32, rng: &mut R) -> Self {
        let width = image.width();
        let height = image.height();
        let pixels = image.pixels();
        let total = pixels.len();
        let threshold = if threshold.is_finite() { threshold.max(0.0) } else { 0.0 };
        let min_size = MIN_REGION_SIZE.min(total);

        let mut visited = vec![false; total];
        let mut stack: Vec<u32> = Vec::new();
        let mut grown: Vec<Grown> = Vec::new();

        for start in 0..total {
            if visited[start] {
                continue;
            }

            let seed = pixels[start];
            let mut members = Vec::new();
            let mut sums = [0u64; 3];
            let mut cx = 0u64;
            let mut cy = 0u64;
            let mut bounds = Bounds::point(start as u32 % width, start as u32 / width);

            visited[start] = true;
            stack.push(start as u32);

            while let Some(idx) = stack.pop() {
                let x = idx % width;
                let y = idx / width;
                let p = pixels[idx as usize];

                members.push(idx);
                sums[0] += p[0] as u64;
                sums[1] += p[1] as u64;
                sums[2] += p[2] as u64;
                cx += x as u64;
                cy += y as u64;
                bounds.include(x, y);

                let mut visit = |n: u32| {
                    let n_idx = n as usize;
                    if !visited[n_idx] && rgb_distance(seed, pixels[n_idx]) <= threshold {
                        visited[n_idx] = true;
                        stack.push(n);
                    }
                };
                if x > 0 {
                    visit(idx - 1);
                }
                if x + 1 < width {
                    visit(idx + 1);
                }
                if y > 0 {
                    visit(idx - width);
                }
                if y + 1 < height {
                    visit(idx + width);
                }
            }

            if members.len() >= min_size {
                grown.push(Grown {
                    members,
                    sums,
                    centroid: (cx, cy),
                    bounds,
                });
            }
        }

        // Stable sort keeps scan order between equally sized regions.
        grown.sort_by(|a, b| b.members.len().cmp(&a.members.len()));
        grown.truncate(MAX_REGIONS);

        let mut assignment = vec![None; total];
        let regions: Vec<Region> = grown
            .into_iter()
            .enumerate()
            .map(|(id, g)| {
                for &idx in &g.members {
                    assignment[idx as usize] = Some(id as u16);
                }
                g.finish(id, total, rng)
            })
            .collect();

        log::debug!(
            "segmented {}x{} image at threshold {:.1}: {} regions",
            width,
            height,
            threshold,
            regions.len()
        );

        Self {
            width,
            height,
            regions,
            assignment,
        }
    }

    /// Regions sorted by size, largest first. `regions()[i].id == i`.
    #[inline]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Number of regions.
    #[inline]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether no region survived filtering.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Region id of the pixel at flat index `idx`.
    #[inline]
    pub fn region_id(&self, idx: usize) -> Option<u16> {
        self.assignment.get(idx).copied().flatten()
    }

    /// Region containing pixel `(x, y)`, if any.
    pub fn region_at(&self, x: u32, y: u32) -> Option<&Region> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.region_id((y * self.width + x) as usize)
            .map(|id| &self.regions[id as usize])
    }

    /// Per-pixel region ids, row-major.
    #[inline]
    pub fn assignment(&self) -> &[Option<u16>] {
        &self.assignment
    }
}

struct Grown {
    members: Vec<u32>,
    sums: [u64; 3],
    centroid: (u64, u64),
    bounds: Bounds,
}

impl Grown {
    fn finish<R: Rng + ?Sized>(self, id: usize, total: usize, rng: &mut R) -> Region {
        let size = self.members.len();
        let n = size as f32;
        let color = [
            self.sums[0] as f32 / n,
            self.sums[1] as f32 / n,
            self.sums[2] as f32 / n,
        ];
        let brightness = brightness(color);
        let (hue, saturation) = hue_saturation(color);
        let center = Vec2::new(self.centroid.0 as f32 / n, self.centroid.1 as f32 / n);

        let coverage = (n / total as f32).sqrt();
        let jitter = rng.gen_range(0.8..1.2);
        let velocity_multiplier = ((1.5 - 0.7 * brightness - 0.4 * coverage) * jitter).clamp(0.2, 2.0);

        Region {
            id,
            pixels: self.members,
            color,
            brightness,
            bounds: self.bounds,
            center,
            size,
            hue,
            saturation,
            velocity_multiplier,
            mass: (n + 1.0).ln() / 10.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(7)
    }

    /// Left half one color, right half another.
    fn split_image(width: u32, height: u32, left: [u8; 4], right: [u8; 4]) -> SourceImage {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for _y in 0..height {
            for x in 0..width {
                data.extend_from_slice(if x < width / 2 { &left } else { &right });
            }
        }
        SourceImage::new(width, height, data).unwrap()
    }

    #[test]
    fn test_uniform_black_4x4() {
        let image = SourceImage::uniform(4, 4, [0, 0, 0, 255]).unwrap();
        let seg = Segmentation::new(&image, 30.0, &mut rng());

        assert_eq!(seg.len(), 1);
        let region = &seg.regions()[0];
        assert_eq!(region.size, 16);
        assert_eq!(region.brightness, 0.0);
        assert_eq!(
            region.bounds,
            Bounds {
                min_x: 0,
                max_x: 3,
                min_y: 0,
                max_y: 3
            }
        );
        assert_eq!(region.center, Vec2::new(1.5, 1.5));
    }

    #[test]
    fn test_two_color_split() {
        let image = split_image(20, 10, [255, 0, 0, 255], [0, 0, 255, 255]);
        let seg = Segmentation::new(&image, 30.0, &mut rng());

        assert_eq!(seg.len(), 2);
        assert_eq!(seg.regions()[0].size, 100);
        assert_eq!(seg.regions()[1].size, 100);
        assert_eq!(seg.region_at(0, 0).unwrap().hue, 0.0);
        assert!((seg.region_at(19, 9).unwrap().hue - 240.0).abs() < 1e-3);
    }

    #[test]
    fn test_threshold_merges_similar_colors() {
        let image = split_image(20, 10, [100, 100, 100, 255], [110, 100, 100, 255]);
        assert_eq!(Segmentation::new(&image, 30.0, &mut rng()).len(), 1);
        assert_eq!(Segmentation::new(&image, 5.0, &mut rng()).len(), 2);
    }

    #[test]
    fn test_small_regions_discarded() {
        // 10x10 white with a 3x3 black square: the square is under the minimum.
        let mut data = vec![255u8; 10 * 10 * 4];
        for y in 2..5 {
            for x in 2..5 {
                let i = (y * 10 + x) * 4;
                data[i..i + 3].copy_from_slice(&[0, 0, 0]);
            }
        }
        let image = SourceImage::new(10, 10, data).unwrap();
        let seg = Segmentation::new(&image, 10.0, &mut rng());

        assert_eq!(seg.len(), 1);
        assert_eq!(seg.regions()[0].size, 91);
        assert!(seg.region_at(3, 3).is_none());
    }

    #[test]
    fn test_threshold_zero_respects_cap() {
        // 30x30 grid of 8x8 cells, each its own color at threshold 0.
        let (w, h) = (240u32, 240u32);
        let mut data = Vec::with_capacity((w * h * 4) as usize);
        for y in 0..h {
            for x in 0..w {
                let cell = (y / 8) * (w / 8) + x / 8;
                data.extend_from_slice(&[(cell % 256) as u8, (cell / 256) as u8 * 40, 7, 255]);
            }
        }
        let image = SourceImage::new(w, h, data).unwrap();
        let seg = Segmentation::new(&image, 0.0, &mut rng());

        assert_eq!(seg.len(), MAX_REGIONS);
        assert!(seg.regions().iter().all(|r| r.size == 64));
        assert!(seg.regions().iter().enumerate().all(|(i, r)| r.id == i));
    }

    #[test]
    fn test_regions_disjoint_and_bounded() {
        let image = split_image(30, 30, [10, 200, 10, 255], [200, 10, 10, 255]);
        let seg = Segmentation::new(&image, 20.0, &mut rng());

        let total: usize = seg.regions().iter().map(|r| r.size).sum();
        assert!(total <= 900);

        let mut seen = vec![false; 900];
        for region in seg.regions() {
            for &idx in &region.pixels {
                assert!(!seen[idx as usize], "pixel {} in two regions", idx);
                seen[idx as usize] = true;
                assert_eq!(seg.region_id(idx as usize), Some(region.id as u16));
            }
        }
    }

    #[test]
    fn test_derived_stats() {
        let image = SourceImage::uniform(10, 10, [255, 255, 255, 255]).unwrap();
        let seg = Segmentation::new(&image, 30.0, &mut rng());
        let region = &seg.regions()[0];

        assert!((region.brightness - 1.0).abs() < 1e-6);
        assert!((region.mass - (101.0f32).ln() / 10.0).abs() < 1e-6);
        assert!(region.velocity_multiplier >= 0.2 && region.velocity_multiplier <= 2.0);
        assert_eq!(region.saturation, 0.0);
    }

    #[test]
    fn test_brighter_regions_are_slower_on_average() {
        let dark = SourceImage::uniform(10, 10, [0, 0, 0, 255]).unwrap();
        let bright = SourceImage::uniform(10, 10, [255, 255, 255, 255]).unwrap();
        let mut r = rng();
        let dark_mean: f32 = (0..50)
            .map(|_| Segmentation::new(&dark, 30.0, &mut r).regions()[0].velocity_multiplier)
            .sum::<f32>()
            / 50.0;
        let bright_mean: f32 = (0..50)
            .map(|_| Segmentation::new(&bright, 30.0, &mut r).regions()[0].velocity_multiplier)
            .sum::<f32>()
            / 50.0;
        assert!(bright_mean < dark_mean);
    }
}
