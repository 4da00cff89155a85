//! Engine-neutral fracture output and the backend seam.

use image::error::{ImageError, LimitError, LimitErrorKind, ParameterError, ParameterErrorKind};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::{EngineKind, FractureConfig};
use crate::fortune::FortuneEngine;
use crate::geometry::{Point, Rect};
use crate::raster::{JumpFloodEngine, MAX_GRID_PIXELS};
use crate::relax::{relax_with, RelaxOptions};
use crate::sites::SiteGenerator;
use crate::{FractureError, Result, Rgb};

/// One fracture piece: a CCW polygon and the site that owns it
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct CellPolygon {
    pub site_id: usize,
    pub site: Point,
    pub vertices: Vec<Point>,
}

impl CellPolygon {
    /// Point-in-polygon for the convex, CCW vertex list
    pub fn contains(&self, p: Point) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }
        (0..n).all(|i| {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x) >= 0.0
        })
    }
}

/// Result of fracturing a rectangle
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct FracturePattern {
    pub polygons: Vec<CellPolygon>,
    pub bounds: Rect,
    pub has_closing_errors: bool,
}

impl FracturePattern {
    /// Rasterize polygons into an RGB preview (row 0 is `bounds.max_y`)
    pub fn render(&self, width: u32, height: u32) -> Vec<u8> {
        let stride = width as usize * 3;
        let mut pixels = vec![0u8; stride * height as usize];
        let b = self.bounds;
        let sx = b.width() / width as f64;
        let sy = b.height() / height as f64;

        for poly in &self.polygons {
            let Some(bbox) = Rect::enclosing(&poly.vertices) else {
                continue;
            };
            let color = label_color(poly.site_id as u32);
            let col0 = (((bbox.min_x - b.min_x) / sx).floor().max(0.0) as u32).min(width);
            let col1 = (((bbox.max_x - b.min_x) / sx).ceil().max(0.0) as u32).min(width);
            let row0 = (((b.max_y - bbox.max_y) / sy).floor().max(0.0) as u32).min(height);
            let row1 = (((b.max_y - bbox.min_y) / sy).ceil().max(0.0) as u32).min(height);
            for row in row0..row1 {
                let y = b.max_y - (row as f64 + 0.5) * sy;
                for col in col0..col1 {
                    let x = b.min_x + (col as f64 + 0.5) * sx;
                    if poly.contains(Point::new(x, y)) {
                        let px = row as usize * stride + col as usize * 3;
                        pixels[px..px + 3].copy_from_slice(&color);
                    }
                }
            }
        }

        pixels
    }

    /// Render to an image::RgbImage
    ///
    /// # Errors
    ///
    /// Returns `Image` if either side is 0 or the image would exceed
    /// [`MAX_GRID_PIXELS`]
    pub fn to_image(&self, width: u32, height: u32) -> Result<image::RgbImage> {
        let pixels = u64::from(width) * u64::from(height);
        if pixels == 0 || pixels > MAX_GRID_PIXELS {
            let limit = LimitError::from_kind(LimitErrorKind::DimensionError);
            return Err(ImageError::Limits(limit).into());
        }
        rgb_image(width, height, self.render(width, height))
    }

    pub fn total_area(&self) -> f64 {
        self.polygons
            .iter()
            .map(|p| crate::geometry::signed_area(&p.vertices).abs())
            .sum()
    }
}

/// Deterministic, well-spread color for a cell label
pub(crate) fn label_color(label: u32) -> Rgb {
    let h = label.wrapping_mul(0x9E37_79B9).rotate_left(13) ^ 0x5bd1_e995;
    let [r, g, b, _] = h.to_le_bytes();
    // Keep pieces away from black so gaps stay visible
    [r | 0x40, g | 0x40, b | 0x40]
}

/// Wrap a packed RGB buffer, failing if its length does not match
pub(crate) fn rgb_image(width: u32, height: u32, pixels: Vec<u8>) -> Result<image::RgbImage> {
    image::RgbImage::from_raw(width, height, pixels).ok_or_else(|| {
        let mismatch = ParameterError::from_kind(ParameterErrorKind::DimensionMismatch);
        FractureError::Image(ImageError::Parameter(mismatch))
    })
}

/// Trait for fracture engines
pub trait FractureBackend {
    /// Partition `bounds` into one polygon per distinct site
    fn fracture(&mut self, sites: &[Point], bounds: &Rect) -> Result<FracturePattern>;
}

/// High-level fracturer that can use different backends
pub struct Fracturer<B: FractureBackend> {
    backend: B,
}

impl<B: FractureBackend> Fracturer<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn fracture(&mut self, sites: &[Point], bounds: &Rect) -> Result<FracturePattern> {
        self.backend.fracture(sites, bounds)
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

/// Run the configured pipeline: seeded sites, engine, then relaxation
/// (Fortune only).
pub fn fracture(config: &FractureConfig) -> Result<FracturePattern> {
    fracture_with(config, |_| {})
}

/// [`fracture`], calling `on_relax_round` with the 1-based number of each
/// finished relaxation round.
pub fn fracture_with<F: FnMut(usize)>(
    config: &FractureConfig,
    on_relax_round: F,
) -> Result<FracturePattern> {
    config.validate()?;
    let mut generator = SiteGenerator::new(config.seed);
    let sites = generator.sites_for(config);

    match config.engine {
        EngineKind::Fortune => {
            let mut engine = FortuneEngine::with_epsilon(config.epsilon);
            let diagram = engine.compute(&sites, config.bounds);
            let options = RelaxOptions::with_iterations(config.relax_iterations);
            let diagram =
                relax_with(&mut engine, &diagram, &options, generator.rng_mut(), on_relax_round);
            Ok(diagram.to_pattern())
        }
        EngineKind::JumpFlood => {
            let mut engine = JumpFloodEngine::new(config.grid_width, config.grid_height)?;
            engine.fracture(&sites, &config.bounds)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fracturer_with_fortune() {
        let mut fracturer = Fracturer::new(FortuneEngine::new());
        let bounds = Rect::centered(20.0);
        let pattern = fracturer
            .fracture(&[Point::new(-5.0, 0.0), Point::new(5.0, 0.0)], &bounds)
            .unwrap();
        assert_eq!(pattern.polygons.len(), 2);
        assert!((pattern.total_area() - bounds.area()).abs() < 1e-9);
        for poly in &pattern.polygons {
            assert!(poly.contains(poly.site));
        }
    }

    #[test]
    fn test_render_covers_every_pixel() {
        let mut engine = FortuneEngine::new();
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
        let sites = SiteGenerator::new(2).uniform(12, &bounds);
        let pattern = engine.fracture(&sites, &bounds).unwrap();
        let image = pattern.to_image(64, 64).unwrap();
        assert_eq!(image.dimensions(), (64, 64));
        // Colors are never black, so an unpainted pixel means a gap
        let unpainted = image.pixels().filter(|p| p.0 == [0, 0, 0]).count();
        assert_eq!(unpainted, 0);
    }

    #[test]
    fn test_fracture_pipeline_is_seeded() {
        let config = FractureConfig { site_count: 20, relax_iterations: 2, ..Default::default() };
        let a = fracture(&config).unwrap();
        let b = fracture(&config).unwrap();
        assert_eq!(a, b);
        assert!((a.total_area() - config.bounds.area()).abs() < 1e-6 * config.bounds.area());
    }

    #[test]
    fn test_to_image_rejects_bad_sizes() {
        let pattern = FortuneEngine::new()
            .fracture(&[Point::new(0.0, 0.0)], &Rect::centered(1.0))
            .unwrap();
        assert!(matches!(pattern.to_image(0, 16), Err(FractureError::Image(_))));
        assert!(matches!(pattern.to_image(65_536, 65_536), Err(FractureError::Image(_))));
        assert_eq!(pattern.to_image(3, 2).unwrap().dimensions(), (3, 2));
    }

    #[test]
    fn test_fracture_with_reports_each_round() {
        let config = FractureConfig { site_count: 15, relax_iterations: 4, ..Default::default() };
        let mut rounds = Vec::new();
        let pattern = fracture_with(&config, |round| rounds.push(round)).unwrap();
        assert_eq!(rounds, vec![1, 2, 3, 4]);
        assert_eq!(pattern, fracture(&config).unwrap());
    }

    #[test]
    fn test_default_config_covers_bounds() {
        let config = FractureConfig::default();
        let pattern = fracture(&config).unwrap();
        assert!(!pattern.has_closing_errors);
        assert!((pattern.total_area() - 400.0).abs() < 1e-6 * 400.0);
        for poly in &pattern.polygons {
            assert!(poly.contains(poly.site), "site {} outside its cell", poly.site_id);
        }
    }

    #[test]
    fn test_unit_bounds_pipeline() {
        let bounds = Rect::new(0.0, 0.0, 1.0, 1.0);
        for seed in 0..5 {
            let config = FractureConfig { seed, site_count: 20, bounds, ..Default::default() };
            let pattern = fracture(&config).unwrap();
            assert_eq!(pattern.polygons.len(), 20, "seed {}", seed);
            assert!(!pattern.has_closing_errors, "seed {}", seed);
            assert!((pattern.total_area() - 1.0).abs() < 1e-6, "seed {}", seed);
            for poly in &pattern.polygons {
                assert!(poly.contains(poly.site), "seed {}: site {} outside", seed, poly.site_id);
            }
        }
    }

    #[test]
    fn test_fracture_rejects_invalid_config() {
        let config = FractureConfig { site_count: 0, ..Default::default() };
        assert!(fracture(&config).is_err());
    }

    #[test]
    fn test_label_colors_differ() {
        assert_ne!(label_color(0), label_color(1));
        assert_eq!(label_color(7), label_color(7));
    }
}
