//! Jump Flood raster engine.
//!
//! Seeds are stamped into an integer label grid and propagated with
//! decreasing-stride passes (plus two refinement passes at strides 2 and 1).
//! Every pass reads the previous grid and writes a fresh one, so rows are
//! independent and run in parallel under the `parallel` feature.
//! Polygons are recovered afterwards from label junctions, see [`extract`].

mod extract;

pub use extract::{extract_vertices, ExtractedVertices, PixelVertex};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::geometry::{Point, Rect};
use crate::pattern::{label_color, rgb_image, CellPolygon, FractureBackend, FracturePattern};
use crate::{FractureError, Result};

/// Label of a pixel no seed has reached yet
pub const NO_LABEL: u32 = u32::MAX;

/// Largest pixel count a raster grid may have
pub const MAX_GRID_PIXELS: u64 = 1 << 26;

/// Both sides at least 2 and the pixel count within [`MAX_GRID_PIXELS`]
pub(crate) fn check_grid(width: u32, height: u32) -> Result<()> {
    let pixels = u64::from(width) * u64::from(height);
    if width < 2 || height < 2 || pixels > MAX_GRID_PIXELS {
        return Err(FractureError::InvalidGrid { width, height });
    }
    Ok(())
}

/// A seed pixel; its label is its index in the seed slice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelSeed {
    pub x: u32,
    pub y: u32,
}

impl PixelSeed {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    #[inline]
    fn dist_sq(&self, x: usize, y: usize) -> u64 {
        let dx = self.x as i64 - x as i64;
        let dy = self.y as i64 - y as i64;
        (dx * dx + dy * dy) as u64
    }
}

/// Row-major grid of seed labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelGrid {
    pub width: u32,
    pub height: u32,
    pub labels: Vec<u32>,
}

impl LabelGrid {
    fn unlabelled(width: u32, height: u32) -> Self {
        Self { width, height, labels: vec![NO_LABEL; width as usize * height as usize] }
    }

    pub fn label_at(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        match self.labels[y as usize * self.width as usize + x as usize] {
            NO_LABEL => None,
            label => Some(label),
        }
    }

    /// Render the grid to an RGB buffer, one color per label
    pub fn render(&self) -> Vec<u8> {
        let mut pixels = vec![0u8; self.labels.len() * 3];
        for (i, &label) in self.labels.iter().enumerate() {
            if label != NO_LABEL {
                pixels[i * 3..i * 3 + 3].copy_from_slice(&label_color(label));
            }
        }
        pixels
    }

    /// Render to an image::RgbImage (grid row 0 at the top)
    ///
    /// # Errors
    ///
    /// Returns `Image` if `labels` does not hold `width * height` entries
    pub fn to_image(&self) -> Result<image::RgbImage> {
        rgb_image(self.width, self.height, self.render())
    }
}

/// Output of a raster computation
#[derive(Debug, Clone)]
pub struct RasterDiagram {
    pub grid: LabelGrid,
    pub seeds: Vec<PixelSeed>,
    pub bounds: Rect,
    pub vertices: ExtractedVertices,
    /// One polygon per label that produced vertices, in label order
    pub polygons: Vec<CellPolygon>,
}

impl RasterDiagram {
    pub fn to_pattern(&self) -> FracturePattern {
        FracturePattern {
            polygons: self.polygons.clone(),
            bounds: self.bounds,
            has_closing_errors: false,
        }
    }
}

/// Jump Flood engine for a fixed grid resolution.
///
/// The resolution belongs to the engine instance; engines with different
/// resolutions can be used side by side.
pub struct JumpFloodEngine {
    width: u32,
    height: u32,
    #[cfg(feature = "parallel")]
    pool: Option<rayon::ThreadPool>,
}

impl JumpFloodEngine {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        check_grid(width, height)?;
        Ok(Self {
            width,
            height,
            #[cfg(feature = "parallel")]
            pool: None,
        })
    }

    /// Engine running on a dedicated pool of `num_threads` threads
    /// (0 = Rayon default)
    #[cfg(feature = "parallel")]
    pub fn with_threads(width: u32, height: u32, num_threads: usize) -> Result<Self> {
        let mut engine = Self::new(width, height)?;
        if num_threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build()
                .map_err(|e| FractureError::ThreadPool(e.to_string()))?;
            engine.pool = Some(pool);
        }
        Ok(engine)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[cfg(feature = "parallel")]
    fn install<T: Send>(&self, op: impl FnOnce() -> T + Send) -> T {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn install<T>(&self, op: impl FnOnce() -> T) -> T {
        op()
    }

    /// World position of pixel `(i, j)`; the grid corners map to the
    /// rectangle corners.
    pub fn pixel_to_world(&self, i: u32, j: u32, bounds: &Rect) -> Point {
        Point::new(
            bounds.min_x + i as f64 * bounds.width() / (self.width - 1) as f64,
            bounds.min_y + j as f64 * bounds.height() / (self.height - 1) as f64,
        )
    }

    /// Nearest pixel to a world position, clamped to the grid
    pub fn world_to_pixel(&self, p: Point, bounds: &Rect) -> PixelSeed {
        let fx = (p.x - bounds.min_x) / bounds.width() * (self.width - 1) as f64;
        let fy = (p.y - bounds.min_y) / bounds.height() * (self.height - 1) as f64;
        let clamp = |v: f64, max: u32| -> u32 {
            if v.is_nan() {
                0
            } else {
                v.round().clamp(0.0, max as f64) as u32
            }
        };
        PixelSeed::new(clamp(fx, self.width - 1), clamp(fy, self.height - 1))
    }

    /// Grid with only the seed pixels labelled. A later seed on the same
    /// pixel overwrites an earlier one.
    pub fn seed_grid(&self, seeds: &[PixelSeed]) -> LabelGrid {
        let mut grid = LabelGrid::unlabelled(self.width, self.height);
        for (label, s) in seeds.iter().enumerate() {
            if s.x < self.width && s.y < self.height {
                grid.labels[s.y as usize * self.width as usize + s.x as usize] = label as u32;
            } else {
                tracing::trace!("Seed {} at ({}, {}) lies outside the grid", label, s.x, s.y);
            }
        }
        grid
    }

    /// Strides for the flood: halving from half the next power of two of
    /// the larger dimension down to 1, then 2 and 1 again.
    fn strides(&self) -> Vec<usize> {
        let mut step = (self.width.max(self.height) as usize).next_power_of_two() / 2;
        let mut strides = Vec::new();
        while step >= 1 {
            strides.push(step);
            step /= 2;
        }
        strides.extend([2, 1]);
        strides
    }

    /// Label every pixel with its (approximately) nearest seed.
    pub fn flood(&self, seeds: &[PixelSeed]) -> LabelGrid {
        let mut src = self.seed_grid(seeds);
        if seeds.is_empty() {
            return src;
        }
        let mut dst = LabelGrid::unlabelled(self.width, self.height);
        let strides = self.strides();
        for &step in &strides {
            self.install(|| flood_pass(&src, &mut dst, seeds, step));
            std::mem::swap(&mut src, &mut dst);
        }
        tracing::debug!(
            "Jump flood: {} seeds on {}x{} in {} passes",
            seeds.len(),
            self.width,
            self.height,
            strides.len()
        );
        src
    }

    /// Flood, extract junction vertices and assemble per-seed polygons.
    pub fn compute(&self, seeds: &[PixelSeed], bounds: &Rect) -> RasterDiagram {
        let grid = self.flood(seeds);
        let vertices = self.install(|| extract_vertices(&grid));
        let polygons = vertices
            .by_label
            .iter()
            .map(|(&label, pixels)| {
                let world: Vec<Point> =
                    pixels.iter().map(|v| self.pixel_to_world(v.x, v.y, bounds)).collect();
                let seed = seeds[label as usize];
                CellPolygon {
                    site_id: label as usize,
                    site: self.pixel_to_world(seed.x, seed.y, bounds),
                    vertices: order_around_centroid(world),
                }
            })
            .collect();
        RasterDiagram {
            grid,
            seeds: seeds.to_vec(),
            bounds: *bounds,
            vertices,
            polygons,
        }
    }
}

impl FractureBackend for JumpFloodEngine {
    fn fracture(&mut self, sites: &[Point], bounds: &Rect) -> Result<FracturePattern> {
        if sites.is_empty() {
            return Err(FractureError::NoSites);
        }
        if !bounds.is_valid() {
            return Err(FractureError::InvalidBounds(*bounds));
        }
        let seeds: Vec<PixelSeed> = sites.iter().map(|p| self.world_to_pixel(*p, bounds)).collect();
        Ok(self.compute(&seeds, bounds).to_pattern())
    }
}

/// One propagation pass at `step` pixels: each pixel keeps the closest seed
/// among its own label and the labels `step` away in the 8 directions.
fn flood_pass(src: &LabelGrid, dst: &mut LabelGrid, seeds: &[PixelSeed], step: usize) {
    let width = src.width as usize;
    let height = src.height as usize;
    let labels = &src.labels;

    let update_row = |(y, row): (usize, &mut [u32])| {
        for (x, out) in row.iter_mut().enumerate() {
            let mut best = labels[y * width + x];
            let mut best_dist = match best {
                NO_LABEL => u64::MAX,
                l => seeds[l as usize].dist_sq(x, y),
            };
            for dy in [-1i64, 0, 1] {
                let ny = y as i64 + dy * step as i64;
                if ny < 0 || ny >= height as i64 {
                    continue;
                }
                for dx in [-1i64, 0, 1] {
                    let nx = x as i64 + dx * step as i64;
                    if (dx == 0 && dy == 0) || nx < 0 || nx >= width as i64 {
                        continue;
                    }
                    let label = labels[ny as usize * width + nx as usize];
                    if label == NO_LABEL {
                        continue;
                    }
                    let d = seeds[label as usize].dist_sq(x, y);
                    if d < best_dist {
                        best = label;
                        best_dist = d;
                    }
                }
            }
            *out = best;
        }
    };

    #[cfg(feature = "parallel")]
    dst.labels.par_chunks_mut(width).enumerate().for_each(update_row);

    #[cfg(not(feature = "parallel"))]
    dst.labels.chunks_mut(width).enumerate().for_each(update_row);
}

/// Sort polygon vertices counter-clockwise around their mean
fn order_around_centroid(mut vertices: Vec<Point>) -> Vec<Point> {
    if vertices.is_empty() {
        return vertices;
    }
    let n = vertices.len() as f64;
    let (sx, sy) = vertices.iter().fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    let c = Point::new(sx / n, sy / n);
    vertices.sort_by(|a, b| {
        let ta = (a.y - c.y).atan2(a.x - c.x);
        let tb = (b.y - c.y).atan2(b.x - c.x);
        ta.total_cmp(&tb)
    });
    vertices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::signed_area;
    use crate::sites::SiteGenerator;

    fn brute_force(seeds: &[PixelSeed], width: u32, height: u32) -> Vec<u32> {
        let mut out = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height as usize {
            for x in 0..width as usize {
                let (label, _) = seeds
                    .iter()
                    .enumerate()
                    .map(|(i, s)| (i as u32, s.dist_sq(x, y)))
                    .min_by_key(|&(_, d)| d)
                    .unwrap();
                out.push(label);
            }
        }
        out
    }

    #[test]
    fn test_single_seed_labels_everything() {
        let engine = JumpFloodEngine::new(40, 30).unwrap();
        let bounds = Rect::new(0.0, 0.0, 4.0, 3.0);
        let r = engine.compute(&[PixelSeed::new(12, 20)], &bounds);
        assert!(r.grid.labels.iter().all(|&l| l == 0));
        assert_eq!(r.vertices.interior_count, 0);
        assert_eq!(r.polygons.len(), 1);
        let poly = &r.polygons[0];
        assert_eq!(poly.vertices.len(), 4);
        assert!((signed_area(&poly.vertices) - bounds.area()).abs() < 1e-9);
    }

    #[test]
    fn test_seed_pixels_keep_their_label() {
        let engine = JumpFloodEngine::new(64, 48).unwrap();
        let seeds: Vec<PixelSeed> = (0..10).map(|i| PixelSeed::new(5 + i * 6, 3 + i * 4)).collect();
        let grid = engine.flood(&seeds);
        for (label, s) in seeds.iter().enumerate() {
            assert_eq!(grid.label_at(s.x, s.y), Some(label as u32));
        }
        assert!(grid.labels.iter().all(|&l| l != NO_LABEL));
    }

    #[test]
    fn test_flood_matches_brute_force_closely() {
        let engine = JumpFloodEngine::new(64, 64).unwrap();
        let bounds = Rect::new(0.0, 0.0, 63.0, 63.0);
        let seeds: Vec<PixelSeed> = SiteGenerator::new(4)
            .uniform(6, &bounds)
            .into_iter()
            .map(|p| engine.world_to_pixel(p, &bounds))
            .collect();
        let grid = engine.flood(&seeds);
        let exact = brute_force(&seeds, 64, 64);
        // Compare distances rather than labels so ties do not count as errors
        let wrong = grid
            .labels
            .iter()
            .zip(&exact)
            .enumerate()
            .filter(|&(i, (&got, &want))| {
                let (x, y) = (i % 64, i / 64);
                seeds[got as usize].dist_sq(x, y) != seeds[want as usize].dist_sq(x, y)
            })
            .count();
        assert!(wrong * 100 < grid.labels.len(), "{} mislabelled pixels", wrong);
    }

    #[test]
    fn test_quadrants_meet_at_center() {
        let engine = JumpFloodEngine::new(64, 64).unwrap();
        let bounds = Rect::new(0.0, 0.0, 63.0, 63.0);
        let seeds = [
            PixelSeed::new(16, 16),
            PixelSeed::new(47, 16),
            PixelSeed::new(16, 47),
            PixelSeed::new(47, 47),
        ];
        let r = engine.compute(&seeds, &bounds);
        assert!(r.vertices.interior_count > 0);
        assert_eq!(r.polygons.len(), 4);
        let center = Point::new(31.5, 31.5);
        for poly in &r.polygons {
            assert!(
                poly.vertices.iter().any(|v| v.dist(&center) < 2.0),
                "polygon {} has no vertex near the center",
                poly.site_id
            );
            assert!(signed_area(&poly.vertices) > 0.0);
        }
    }

    #[test]
    fn test_rejects_bad_grid_sizes() {
        assert!(matches!(
            JumpFloodEngine::new(1, 10),
            Err(FractureError::InvalidGrid { width: 1, height: 10 })
        ));
        // 2^32 pixels would wrap a u32 index
        assert!(matches!(
            JumpFloodEngine::new(65_536, 65_536),
            Err(FractureError::InvalidGrid { .. })
        ));
        assert!(JumpFloodEngine::new(u32::MAX, 2).is_err());
    }

    #[test]
    fn test_grid_image_checks_label_count() {
        let engine = JumpFloodEngine::new(8, 4).unwrap();
        let r = engine.compute(&[PixelSeed::new(1, 1)], &Rect::new(0.0, 0.0, 7.0, 3.0));
        assert_eq!(r.grid.to_image().unwrap().dimensions(), (8, 4));

        let mut short = r.grid.clone();
        short.labels.pop();
        assert!(matches!(short.to_image(), Err(FractureError::Image(_))));
    }

    #[test]
    fn test_pixel_world_mapping() {
        let engine = JumpFloodEngine::new(11, 21).unwrap();
        let bounds = Rect::new(-5.0, -10.0, 5.0, 10.0);
        assert_eq!(engine.pixel_to_world(0, 0, &bounds), Point::new(-5.0, -10.0));
        assert_eq!(engine.pixel_to_world(10, 20, &bounds), Point::new(5.0, 10.0));
        assert_eq!(engine.world_to_pixel(Point::new(0.0, 0.0), &bounds), PixelSeed::new(5, 10));
        assert_eq!(engine.world_to_pixel(Point::new(99.0, -99.0), &bounds), PixelSeed::new(10, 0));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_dedicated_pool_matches_default() {
        let seeds = [PixelSeed::new(3, 4), PixelSeed::new(20, 9), PixelSeed::new(11, 25)];
        let a = JumpFloodEngine::new(32, 32).unwrap().flood(&seeds);
        let b = JumpFloodEngine::with_threads(32, 32, 2).unwrap().flood(&seeds);
        assert_eq!(a, b);
    }
}
