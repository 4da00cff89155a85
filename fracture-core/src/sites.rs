//! Seeded site generation.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::FractureConfig;
use crate::geometry::{Point, Rect};

/// Deterministic source of site positions.
///
/// The same seed always yields the same sequence of sites, and the
/// generator can be handed on (via [`rng_mut`](Self::rng_mut)) so later
/// random steps stay on the same stream.
#[derive(Debug, Clone)]
pub struct SiteGenerator {
    rng: ChaCha8Rng,
}

impl SiteGenerator {
    pub fn new(seed: u64) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed) }
    }

    /// `count` sites uniformly distributed over `bounds`
    pub fn uniform(&mut self, count: usize, bounds: &Rect) -> Vec<Point> {
        (0..count)
            .map(|_| {
                Point::new(
                    self.rng.gen_range(bounds.min_x..bounds.max_x),
                    self.rng.gen_range(bounds.min_y..bounds.max_y),
                )
            })
            .collect()
    }

    /// `count` sites pulled toward an impact point.
    ///
    /// Each coordinate starts uniform over `bounds` and moves toward `impact`
    /// by a fraction drawn from `[closeness, 1]`, so larger `closeness`
    /// concentrates the pattern around the impact. `closeness` is clamped
    /// to `[0, 1]`.
    pub fn near_impact(
        &mut self,
        count: usize,
        bounds: &Rect,
        impact: Point,
        closeness: f64,
    ) -> Vec<Point> {
        let closeness = closeness.clamp(0.0, 1.0);
        let impact = bounds.clamp(impact);
        (0..count)
            .map(|_| {
                let mut x = self.rng.gen_range(bounds.min_x..bounds.max_x);
                let mut y = self.rng.gen_range(bounds.min_y..bounds.max_y);
                x += (impact.x - x) * self.rng.gen_range(closeness..=1.0);
                y += (impact.y - y) * self.rng.gen_range(closeness..=1.0);
                Point::new(x, y)
            })
            .collect()
    }

    /// Sites for `config`: near its impact point when one is set,
    /// otherwise uniform over its bounds
    pub fn sites_for(&mut self, config: &FractureConfig) -> Vec<Point> {
        match config.impact {
            Some(impact) => self.near_impact(
                config.site_count,
                &config.bounds,
                impact,
                config.impact_closeness,
            ),
            None => self.uniform(config.site_count, &config.bounds),
        }
    }

    pub fn rng_mut(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }
}
