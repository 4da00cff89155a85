//! Fortune sweep-line Voronoi engine.
//!
//! The sweep line advances toward increasing y. Site events insert arcs into
//! the beachline, circle events remove them and emit vertices. Edges left
//! open when the queue drains are extended to the bounding rectangle and
//! cells are closed along its sides.

mod beachline;
mod builder;
mod clip;
mod event;

use beachline::{ArcId, Beachline};
use builder::DiagramBuilder;
use event::{Event, EventQueue};

use crate::diagram::{Diagram, SiteId};
use crate::geometry::{circumcenter, Point, Rect};
use crate::pattern::{FractureBackend, FracturePattern};
use crate::{FractureError, Result};

/// Default cap on the tolerance for breakpoint, vertex and closure comparisons
pub const DEFAULT_EPSILON: f64 = 0.1;

/// Working tolerance as a fraction of the larger bounds dimension
const RELATIVE_TOLERANCE: f64 = 1e-7;

/// Collinearity cutoff for circle event detection
const CIRCLE_DETERMINANT_LIMIT: f64 = -2e-12;

/// Where a new site lands on the beachline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArcPosition {
    Empty,
    /// Strictly inside one arc, which gets split
    Inside(ArcId),
    /// On the breakpoint between two arcs
    Between(ArcId, ArcId),
    /// Past the right end of the beachline
    Rightmost(ArcId),
    /// On the left end, which the sweep order rules out
    Degenerate(ArcId),
}

/// Reusable Fortune engine.
///
/// Arc and circle event pools survive across calls to [`compute`], so
/// repeated computations (e.g. relaxation) avoid reallocating. `compute`
/// takes `&mut self`; one engine serves one computation at a time.
///
/// [`compute`]: FortuneEngine::compute
pub struct FortuneEngine {
    beachline: Beachline,
    queue: EventQueue,
    epsilon: f64,
    /// Tolerance of the computation in progress
    tolerance: f64,
}

impl FortuneEngine {
    pub fn new() -> Self {
        Self::with_epsilon(DEFAULT_EPSILON)
    }

    /// Engine with a custom cap on the comparison tolerance, in world units
    pub fn with_epsilon(epsilon: f64) -> Self {
        Self {
            beachline: Beachline::new(),
            queue: EventQueue::new(),
            epsilon,
            tolerance: epsilon,
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Tolerance used when computing inside `bounds`: a fixed fraction of
    /// the larger bounds dimension, never more than [`epsilon`].
    ///
    /// [`epsilon`]: FortuneEngine::epsilon
    pub fn tolerance_for(&self, bounds: &Rect) -> f64 {
        let extent = bounds.width().max(bounds.height());
        self.epsilon.min(RELATIVE_TOLERANCE * extent)
    }

    /// Compute the Voronoi diagram of `sites` clipped to `bounds`.
    ///
    /// Exact duplicates of the previously processed site are skipped, as are
    /// non-finite positions. Site ids follow processing order (ascending y,
    /// then x), not input order.
    pub fn compute(&mut self, sites: &[Point], bounds: Rect) -> Diagram {
        self.tolerance = self.tolerance_for(&bounds);
        let mut builder = DiagramBuilder::new(bounds, self.tolerance);
        self.queue.clear();
        self.beachline.clear();

        for (index, p) in sites.iter().enumerate() {
            if p.is_finite() {
                self.queue.push_site(index, p.x, p.y);
            } else {
                tracing::trace!("Skipping non-finite site {} at {:?}", index, p);
            }
        }

        let mut last: Option<Point> = None;
        while let Some(event) = self.queue.pop() {
            match event {
                Event::Site(index) => {
                    let position = sites[index];
                    if last == Some(position) {
                        tracing::trace!("Skipping duplicate site {} at {:?}", index, position);
                        continue;
                    }
                    last = Some(position);
                    self.add_arc(&mut builder, position);
                }
                Event::Circle(id) => self.collapse_arc(&mut builder, id),
            }
        }

        builder.clip_edges();
        builder.close_cells();
        self.beachline.clear();
        self.queue.clear();

        let diagram = builder.finish();
        tracing::debug!(
            "Fortune sweep: {} sites -> {} cells, {} edges{}",
            sites.len(),
            diagram.cells.len(),
            diagram.edges.len(),
            if diagram.has_closing_errors { " (closing errors)" } else { "" }
        );
        diagram
    }

    /// Left breakpoint of `arc` with the sweep line at `directrix`
    fn left_breakpoint(&self, builder: &DiagramBuilder, arc: ArcId, directrix: f64) -> f64 {
        let focus = builder.position(self.beachline.arc(arc).site);
        let pby2 = focus.y - directrix;
        if pby2 == 0.0 {
            return focus.x;
        }
        let Some(prev) = self.beachline.prev(arc) else {
            return f64::NEG_INFINITY;
        };
        let left = builder.position(self.beachline.arc(prev).site);
        let plby2 = left.y - directrix;
        if plby2 == 0.0 {
            return left.x;
        }
        let hl = left.x - focus.x;
        let aby2 = 1.0 / pby2 - 1.0 / plby2;
        let b = hl / plby2;
        if aby2 != 0.0 {
            let disc = b * b
                - 2.0 * aby2 * (hl * hl / (-2.0 * plby2) - left.y + plby2 / 2.0 + focus.y - pby2 / 2.0);
            return (-b + disc.max(0.0).sqrt()) / aby2 + focus.x;
        }
        (focus.x + left.x) / 2.0
    }

    fn right_breakpoint(&self, builder: &DiagramBuilder, arc: ArcId, directrix: f64) -> f64 {
        if let Some(next) = self.beachline.next(arc) {
            return self.left_breakpoint(builder, next, directrix);
        }
        let focus = builder.position(self.beachline.arc(arc).site);
        if focus.y == directrix {
            focus.x
        } else {
            f64::INFINITY
        }
    }

    /// Descend the tree comparing `site.x` with breakpoints at `site.y`.
    fn locate_arc(&self, builder: &DiagramBuilder, site: Point) -> ArcPosition {
        let eps = self.tolerance;
        let mut cursor = self.beachline.root();
        let mut found: Option<ArcPosition> = None;
        while let Some(node) = cursor {
            let dxl = self.left_breakpoint(builder, node, site.y) - site.x;
            if dxl > eps {
                cursor = self.beachline.left(node);
                continue;
            }
            let dxr = site.x - self.right_breakpoint(builder, node, site.y);
            if dxr > eps {
                match self.beachline.right(node) {
                    Some(r) => cursor = Some(r),
                    None => {
                        found = Some(ArcPosition::Rightmost(node));
                        break;
                    }
                }
                continue;
            }
            let prev = self.beachline.prev(node);
            found = Some(match prev {
                Some(prev) if dxl > -eps => ArcPosition::Between(prev, node),
                _ if dxr > -eps => match self.beachline.next(node) {
                    Some(next) => ArcPosition::Between(node, next),
                    None => ArcPosition::Rightmost(node),
                },
                None if dxl > -eps => ArcPosition::Degenerate(node),
                _ => ArcPosition::Inside(node),
            });
            break;
        }
        match found {
            Some(position) => position,
            // Empty tree, or fell off a left child (checked by the caller)
            None => ArcPosition::Empty,
        }
    }

    fn add_arc(&mut self, builder: &mut DiagramBuilder, position: Point) {
        let placement = self.locate_arc(builder, position);
        if let ArcPosition::Degenerate(arc) = placement {
            tracing::error!(
                "Site {:?} landed left of the first beachline arc (site {}); dropping it",
                position,
                self.beachline.arc(arc).site
            );
            return;
        }
        if placement == ArcPosition::Empty && !self.beachline.is_empty() {
            tracing::error!("Site {:?} found no arc on a non-empty beachline; dropping it", position);
            return;
        }

        let site = builder.add_site(position);
        let new_arc = self.beachline.alloc(site);

        match placement {
            ArcPosition::Empty => self.beachline.insert_after(None, new_arc),
            ArcPosition::Inside(arc) => self.split_arc(builder, arc, new_arc),
            ArcPosition::Rightmost(arc) => {
                self.beachline.insert_after(Some(arc), new_arc);
                let left_site = self.beachline.arc(arc).site;
                let edge = builder.create_edge(left_site, site, None, None);
                self.beachline.arc_mut(new_arc).edge = Some(edge);
            }
            ArcPosition::Between(left, right) => {
                let l_site = self.beachline.arc(left).site;
                let r_site = self.beachline.arc(right).site;
                let Some(vertex) =
                    circumcenter(&builder.position(l_site), &position, &builder.position(r_site))
                else {
                    tracing::trace!(
                        "Site {:?} is collinear with its neighbours; splitting the left arc",
                        position
                    );
                    self.split_arc(builder, left, new_arc);
                    return;
                };
                self.beachline.insert_after(Some(left), new_arc);
                self.detach_circle(left);
                self.detach_circle(right);

                if let Some(edge) = self.beachline.arc(right).edge {
                    builder.set_edge_start(edge, l_site, vertex);
                }
                let left_edge = builder.create_edge(l_site, site, None, Some(vertex));
                let right_edge = builder.create_edge(site, r_site, None, Some(vertex));
                self.beachline.arc_mut(new_arc).edge = Some(left_edge);
                self.beachline.arc_mut(right).edge = Some(right_edge);

                self.attach_circle(builder, left);
                self.attach_circle(builder, right);
            }
            ArcPosition::Degenerate(_) => {}
        }
    }

    /// Insert `new_arc` inside `arc`, leaving a copy of `arc` on its right.
    fn split_arc(&mut self, builder: &mut DiagramBuilder, arc: ArcId, new_arc: ArcId) {
        let site = self.beachline.arc(new_arc).site;
        self.beachline.insert_after(Some(arc), new_arc);
        self.detach_circle(arc);
        let split_site = self.beachline.arc(arc).site;
        let copy = self.beachline.alloc(split_site);
        self.beachline.insert_after(Some(new_arc), copy);
        let edge = builder.create_edge(split_site, site, None, None);
        self.beachline.arc_mut(new_arc).edge = Some(edge);
        self.beachline.arc_mut(copy).edge = Some(edge);
        self.attach_circle(builder, arc);
        self.attach_circle(builder, copy);
    }

    /// Handle a circle event: the arc and any neighbours converging on the
    /// same point vanish, and a vertex joins the surviving arcs' edges.
    fn collapse_arc(&mut self, builder: &mut DiagramBuilder, id: usize) {
        let event = *self.queue.circle(id);
        let arc = event.arc;
        let vertex = Point::new(event.x, event.y_center);
        let (Some(mut left), Some(mut right)) = (self.beachline.prev(arc), self.beachline.next(arc))
        else {
            tracing::error!("Circle event for arc without two neighbours");
            return;
        };

        // (site, left-breakpoint edge) of each arc touching the vertex, left to right
        let mut collapsed: Vec<(SiteId, Option<usize>)> = Vec::new();
        let center = self.beachline.arc(arc);
        let center_entry = (center.site, center.edge);
        self.remove_arc(arc);

        while self.converges_at(left, vertex) {
            let Some(prev) = self.beachline.prev(left) else {
                break;
            };
            let a = self.beachline.arc(left);
            collapsed.push((a.site, a.edge));
            self.remove_arc(left);
            left = prev;
        }
        collapsed.reverse();
        collapsed.push(center_entry);

        while self.converges_at(right, vertex) {
            let Some(next) = self.beachline.next(right) else {
                break;
            };
            let a = self.beachline.arc(right);
            collapsed.push((a.site, a.edge));
            self.remove_arc(right);
            right = next;
        }

        self.detach_circle(left);
        self.detach_circle(right);

        let left_site = self.beachline.arc(left).site;
        let right_entry = (self.beachline.arc(right).site, self.beachline.arc(right).edge);
        let mut chain = Vec::with_capacity(collapsed.len() + 2);
        chain.push((left_site, self.beachline.arc(left).edge));
        chain.extend(collapsed);
        chain.push(right_entry);

        for pair in chain.windows(2) {
            let (from, _) = pair[0];
            if let (_, Some(edge)) = pair[1] {
                builder.set_edge_start(edge, from, vertex);
            }
        }

        let right_site = right_entry.0;
        let edge = builder.create_edge(left_site, right_site, None, Some(vertex));
        self.beachline.arc_mut(right).edge = Some(edge);

        self.attach_circle(builder, left);
        self.attach_circle(builder, right);
    }

    fn converges_at(&self, arc: ArcId, vertex: Point) -> bool {
        match self.beachline.arc(arc).circle {
            Some(c) => {
                let ev = self.queue.circle(c);
                (vertex.x - ev.x).abs() < self.tolerance
                    && (vertex.y - ev.y_center).abs() < self.tolerance
            }
            None => false,
        }
    }

    fn remove_arc(&mut self, arc: ArcId) {
        self.detach_circle(arc);
        self.beachline.remove(arc);
    }

    fn detach_circle(&mut self, arc: ArcId) {
        if let Some(c) = self.beachline.arc_mut(arc).circle.take() {
            self.queue.cancel(c);
        }
    }

    /// Schedule the collapse of `arc` if its neighbours converge on it.
    fn attach_circle(&mut self, builder: &DiagramBuilder, arc: ArcId) {
        let (Some(prev), Some(next)) = (self.beachline.prev(arc), self.beachline.next(arc)) else {
            return;
        };
        let l_site = self.beachline.arc(prev).site;
        let c_site = self.beachline.arc(arc).site;
        let r_site = self.beachline.arc(next).site;
        if l_site == r_site {
            return;
        }

        let b = builder.position(c_site);
        let l = builder.position(l_site);
        let r = builder.position(r_site);
        let (ax, ay) = (l.x - b.x, l.y - b.y);
        let (cx, cy) = (r.x - b.x, r.y - b.y);
        // Breakpoints must be converging, which requires a clockwise turn
        let d = 2.0 * (ax * cy - ay * cx);
        if d >= CIRCLE_DETERMINANT_LIMIT {
            return;
        }
        let ha = ax * ax + ay * ay;
        let hc = cx * cx + cy * cy;
        let x = (cy * ha - ay * hc) / d;
        let y = (ax * hc - cx * ha) / d;
        let y_center = y + b.y;

        let id = self.queue.push_circle(arc, x + b.x, y_center + (x * x + y * y).sqrt(), y_center);
        self.beachline.arc_mut(arc).circle = Some(id);
    }
}

impl Default for FortuneEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FractureBackend for FortuneEngine {
    fn fracture(&mut self, sites: &[Point], bounds: &Rect) -> Result<FracturePattern> {
        if sites.is_empty() {
            return Err(FractureError::NoSites);
        }
        if !bounds.is_valid() {
            return Err(FractureError::InvalidBounds(*bounds));
        }
        Ok(self.compute(sites, *bounds).to_pattern())
    }
}
