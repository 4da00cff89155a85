//! Fracture configuration and builder.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::fortune::DEFAULT_EPSILON;
use crate::geometry::{Point, Rect};
use crate::raster::check_grid;
use crate::{FractureError, Result};

/// Which engine computes the pattern
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineKind {
    /// Exact sweep-line diagram, supports relaxation
    #[default]
    Fortune,
    /// Raster approximation at `grid_width` x `grid_height`
    JumpFlood,
}

/// Configuration for one fracture computation
///
/// The same configuration always produces the same pattern.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FractureConfig {
    /// Seed for site placement and relaxation jitter
    pub seed: u64,
    pub site_count: usize,
    pub bounds: Rect,
    pub engine: EngineKind,
    /// Relaxation rounds (Fortune engine only)
    pub relax_iterations: usize,
    /// Where the object was struck; `None` places sites uniformly
    pub impact: Option<Point>,
    /// Pull toward `impact`, in `[0, 0.5]`
    pub impact_closeness: f64,
    pub grid_width: u32,
    pub grid_height: u32,
    /// Cap on the Fortune comparison tolerance, in world units. The working
    /// tolerance is 1e-7 of the larger bounds dimension when that is smaller.
    pub epsilon: f64,
}

impl Default for FractureConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            site_count: 32,
            bounds: Rect::centered(10.0),
            engine: EngineKind::Fortune,
            relax_iterations: 0,
            impact: None,
            impact_closeness: 0.0,
            grid_width: 256,
            grid_height: 256,
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl FractureConfig {
    /// Builder preloaded with this configuration's values
    pub fn to_builder(&self) -> FractureConfigBuilder {
        FractureConfigBuilder { config: *self }
    }

    /// Re-check every constraint the builder enforces
    pub fn validate(&self) -> Result<()> {
        self.to_builder().build().map(|_| ())
    }
}

/// Builder for creating FractureConfig with validation
///
/// # Example
///
/// ```rust
/// use fracture_core::*;
///
/// let config = FractureConfigBuilder::new()
///     .seed(7)
///     .site_count(50)
///     .unwrap()
///     .impact(Point::new(1.0, 2.0), 0.3)
///     .unwrap()
///     .build()
///     .unwrap();
/// assert_eq!(config.site_count, 50);
/// ```
#[derive(Debug, Clone)]
pub struct FractureConfigBuilder {
    config: FractureConfig,
}

impl FractureConfigBuilder {
    /// Create a new builder with default values
    ///
    /// Defaults: seed 0, 32 sites, bounds `[-10, 10]²`, Fortune engine, no
    /// relaxation, uniform sites, 256x256 raster grid, tolerance cap 0.1.
    pub fn new() -> Self {
        Self { config: FractureConfig::default() }
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// # Errors
    ///
    /// Returns `InvalidConfig` if `count` is 0
    pub fn site_count(mut self, count: usize) -> Result<Self> {
        if count == 0 {
            return Err(FractureError::InvalidConfig("site count must be positive".into()));
        }
        self.config.site_count = count;
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns `InvalidBounds` for non-finite or empty rectangles
    pub fn bounds(mut self, bounds: Rect) -> Result<Self> {
        if !bounds.is_valid() {
            return Err(FractureError::InvalidBounds(bounds));
        }
        self.config.bounds = bounds;
        Ok(self)
    }

    pub fn engine(mut self, engine: EngineKind) -> Self {
        self.config.engine = engine;
        self
    }

    /// # Errors
    ///
    /// Returns `InvalidConfig` if iterations > 50
    pub fn relax_iterations(mut self, iterations: usize) -> Result<Self> {
        if iterations > 50 {
            return Err(FractureError::InvalidConfig(format!(
                "relax iterations must be <= 50 (got {})",
                iterations
            )));
        }
        self.config.relax_iterations = iterations;
        Ok(self)
    }

    /// Bias sites toward `impact`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `closeness` is outside `[0, 0.5]` or the
    /// impact point is not finite
    pub fn impact(mut self, impact: Point, closeness: f64) -> Result<Self> {
        if !(0.0..=0.5).contains(&closeness) {
            return Err(FractureError::InvalidConfig(format!(
                "impact closeness must be in [0, 0.5] (got {})",
                closeness
            )));
        }
        if !impact.is_finite() {
            return Err(FractureError::InvalidConfig(format!(
                "impact point must be finite (got {:?})",
                impact
            )));
        }
        self.config.impact = Some(impact);
        self.config.impact_closeness = closeness;
        Ok(self)
    }

    pub fn clear_impact(mut self) -> Self {
        self.config.impact = None;
        self.config.impact_closeness = 0.0;
        self
    }

    /// # Errors
    ///
    /// Returns `InvalidGrid` if either dimension is below 2 or the grid has
    /// more than [`MAX_GRID_PIXELS`] pixels
    ///
    /// [`MAX_GRID_PIXELS`]: crate::MAX_GRID_PIXELS
    pub fn grid(mut self, width: u32, height: u32) -> Result<Self> {
        check_grid(width, height)?;
        self.config.grid_width = width;
        self.config.grid_height = height;
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns `InvalidConfig` unless `epsilon` is finite and positive
    pub fn epsilon(mut self, epsilon: f64) -> Result<Self> {
        if !(epsilon.is_finite() && epsilon > 0.0) {
            return Err(FractureError::InvalidConfig(format!(
                "epsilon must be positive (got {})",
                epsilon
            )));
        }
        self.config.epsilon = epsilon;
        Ok(self)
    }

    /// Build the configuration, re-running every setter's check so values
    /// loaded from elsewhere are validated too.
    pub fn build(self) -> Result<FractureConfig> {
        let c = self.config;
        let mut checked = Self::new()
            .seed(c.seed)
            .engine(c.engine)
            .site_count(c.site_count)?
            .bounds(c.bounds)?
            .relax_iterations(c.relax_iterations)?
            .grid(c.grid_width, c.grid_height)?
            .epsilon(c.epsilon)?;
        if let Some(impact) = c.impact {
            checked = checked.impact(impact, c.impact_closeness)?;
        }
        Ok(checked.config)
    }
}

impl Default for FractureConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
