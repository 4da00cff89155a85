//! Lloyd-style relaxation of a Fortune diagram.
//!
//! Each iteration moves every site toward the area-weighted centroid of its
//! cell and recomputes the diagram. A small per-cell probability instead
//! drops the site or spawns an extra site pushed outward from the centroid,
//! which keeps repeated fracturing from looking too regular.

use rand::Rng;

use crate::diagram::Diagram;
use crate::fortune::FortuneEngine;
use crate::geometry::Point;

/// Options for relaxation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelaxOptions {
    /// Number of relax-and-recompute rounds (0 = return the input)
    pub iterations: usize,
    /// Per-cell probability of each irregular outcome.
    /// `None` uses `0.1 / cell_count`.
    pub jitter_probability: Option<f64>,
    /// Centroid moves longer than this are halved
    pub max_step: f64,
}

impl Default for RelaxOptions {
    fn default() -> Self {
        Self {
            iterations: 1,
            jitter_probability: None,
            max_step: 2.0,
        }
    }
}

impl RelaxOptions {
    pub fn with_iterations(iterations: usize) -> Self {
        Self { iterations, ..Default::default() }
    }
}

/// Relax `diagram` for `options.iterations` rounds, drawing jitter from `rng`.
///
/// New sites are clamped to the diagram bounds. The engine's pools are reused
/// for every recomputation.
pub fn relax<R: Rng>(
    engine: &mut FortuneEngine,
    diagram: &Diagram,
    options: &RelaxOptions,
    rng: &mut R,
) -> Diagram {
    relax_with(engine, diagram, options, rng, |_| {})
}

/// [`relax`], calling `on_round` with the 1-based round number after each
/// recomputation.
pub fn relax_with<R: Rng, F: FnMut(usize)>(
    engine: &mut FortuneEngine,
    diagram: &Diagram,
    options: &RelaxOptions,
    rng: &mut R,
    mut on_round: F,
) -> Diagram {
    let mut current = diagram.clone();
    for iteration in 0..options.iterations {
        let sites = relaxed_sites(&current, options, rng);
        tracing::debug!(
            "Relaxation round {}: {} -> {} sites",
            iteration + 1,
            current.sites.len(),
            sites.len()
        );
        current = engine.compute(&sites, current.bounds);
        on_round(iteration + 1);
    }
    current
}

fn relaxed_sites<R: Rng>(diagram: &Diagram, options: &RelaxOptions, rng: &mut R) -> Vec<Point> {
    let count = diagram.sites.len();
    if count == 0 {
        return Vec::new();
    }
    let p = options.jitter_probability.unwrap_or(0.1 / count as f64);
    let bounds = diagram.bounds;
    let mut sites = Vec::with_capacity(count + 1);

    for site in &diagram.sites {
        let roll: f64 = rng.gen();
        if roll < p {
            continue;
        }
        let Some(mut target) = diagram.centroid(site.id) else {
            sites.push(site.position);
            continue;
        };
        let dist = target.dist(&site.position);
        if dist > options.max_step {
            target = target.midpoint(&site.position);
        }
        if roll > 1.0 - p && dist > 0.0 {
            let half = dist / 2.0;
            let outward = Point::new(
                target.x + (target.x - site.position.x) / half,
                target.y + (target.y - site.position.y) / half,
            );
            sites.push(bounds.clamp(outward));
        }
        sites.push(bounds.clamp(target));
    }
    sites
}
