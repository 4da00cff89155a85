//! Post-sweep finishing: extend open edges to the rectangle, clip them,
//! and close cells along the rectangle sides.

use super::builder::DiagramBuilder;
use crate::diagram::EdgeId;
use crate::geometry::Point;

/// Rectangle sides in the order a cell boundary walks them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    MinX,
    MaxY,
    MaxX,
    MinY,
}

const WALK: [Side; 4] = [Side::MinX, Side::MaxY, Side::MaxX, Side::MinY];

impl DiagramBuilder {
    fn eq_eps(&self, a: f64, b: f64) -> bool {
        (a - b).abs() < self.epsilon
    }

    fn lt_eps(&self, a: f64, b: f64) -> bool {
        b - a > self.epsilon
    }

    fn gt_eps(&self, a: f64, b: f64) -> bool {
        a - b > self.epsilon
    }

    /// Resolve every edge against the rectangle, discarding those that
    /// fall outside it or collapse to a point.
    pub fn clip_edges(&mut self) {
        for id in (0..self.edges.len()).rev() {
            let keep = self.connect_edge(id) && self.clip_edge(id) && {
                let e = &self.edges[id];
                match (e.start, e.end) {
                    (Some(a), Some(b)) => !a.approx_eq(&b, self.epsilon),
                    _ => false,
                }
            };
            if !keep {
                self.edges[id].start = None;
                self.edges[id].end = None;
            }
        }
    }

    /// Give a dangling edge its missing endpoint(s) on the rectangle.
    ///
    /// Returns false when the bisector never enters the rectangle.
    fn connect_edge(&mut self, id: EdgeId) -> bool {
        let edge = &self.edges[id];
        if edge.is_resolved() {
            return true;
        }
        let Some(right) = edge.right else {
            return false;
        };
        // Work from the perspective in which the known endpoint is the start.
        let flipped = edge.start.is_none() && edge.end.is_some();
        let (l, r, known) = if flipped {
            (right, edge.left, edge.end)
        } else {
            (edge.left, right, edge.start)
        };

        self.cells[l].needs_closure = true;
        self.cells[r].needs_closure = true;

        let (lp, rp) = (self.position(l), self.position(r));
        let b = self.bounds;
        let (xl, xr, yt, yb) = (b.min_x, b.max_x, b.min_y, b.max_y);
        let fx = (lp.x + rp.x) / 2.0;
        let fy = (lp.y + rp.y) / 2.0;

        let mut va = known;
        let vb;
        if rp.y == lp.y {
            // Vertical bisector
            if fx < xl || fx >= xr {
                return false;
            }
            if lp.x > rp.x {
                match va {
                    Some(v) if v.y >= yt => {
                        if v.y >= yb {
                            return false;
                        }
                    }
                    _ => va = Some(Point::new(fx, yt)),
                }
                vb = Point::new(fx, yb);
            } else {
                match va {
                    Some(v) if v.y <= yb => {
                        if v.y < yt {
                            return false;
                        }
                    }
                    _ => va = Some(Point::new(fx, yb)),
                }
                vb = Point::new(fx, yt);
            }
        } else {
            let fm = (lp.x - rp.x) / (rp.y - lp.y);
            let fb = fy - fm * fx;
            if !(-1.0..=1.0).contains(&fm) {
                // Closer to vertical: intersect with the horizontal sides
                if lp.x > rp.x {
                    match va {
                        Some(v) if v.y >= yt => {
                            if v.y >= yb {
                                return false;
                            }
                        }
                        _ => va = Some(Point::new((yt - fb) / fm, yt)),
                    }
                    vb = Point::new((yb - fb) / fm, yb);
                } else {
                    match va {
                        Some(v) if v.y <= yb => {
                            if v.y < yt {
                                return false;
                            }
                        }
                        _ => va = Some(Point::new((yb - fb) / fm, yb)),
                    }
                    vb = Point::new((yt - fb) / fm, yt);
                }
            } else if lp.y < rp.y {
                match va {
                    Some(v) if v.x >= xl => {
                        if v.x >= xr {
                            return false;
                        }
                    }
                    _ => va = Some(Point::new(xl, fm * xl + fb)),
                }
                vb = Point::new(xr, fm * xr + fb);
            } else {
                match va {
                    Some(v) if v.x <= xr => {
                        if v.x < xl {
                            return false;
                        }
                    }
                    _ => va = Some(Point::new(xr, fm * xr + fb)),
                }
                vb = Point::new(xl, fm * xl + fb);
            }
        }

        let edge = &mut self.edges[id];
        if flipped {
            edge.end = va;
            edge.start = Some(vb);
        } else {
            edge.start = va;
            edge.end = Some(vb);
        }
        true
    }

    /// Liang-Barsky clip of a resolved edge against the rectangle.
    fn clip_edge(&mut self, id: EdgeId) -> bool {
        let edge = &self.edges[id];
        let (Some(a), Some(b)) = (edge.start, edge.end) else {
            return false;
        };
        let bounds = self.bounds;
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let mut t0: f64 = 0.0;
        let mut t1: f64 = 1.0;
        let constraints = [
            (-dx, a.x - bounds.min_x),
            (dx, bounds.max_x - a.x),
            (-dy, a.y - bounds.min_y),
            (dy, bounds.max_y - a.y),
        ];
        for (p, q) in constraints {
            if p == 0.0 {
                if q < 0.0 {
                    return false;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return false;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return false;
                }
                t1 = t1.min(r);
            }
        }

        let (left, right) = (edge.left, edge.right);
        let edge = &mut self.edges[id];
        if t0 > 0.0 {
            edge.start = Some(Point::new(a.x + t0 * dx, a.y + t0 * dy));
        }
        if t1 < 1.0 {
            edge.end = Some(Point::new(a.x + t1 * dx, a.y + t1 * dy));
        }
        if t0 > 0.0 || t1 < 1.0 {
            self.cells[left].needs_closure = true;
            if let Some(r) = right {
                self.cells[r].needs_closure = true;
            }
        }
        true
    }

    /// Sort each cell's half-edges and fill gaps with border segments.
    pub fn close_cells(&mut self) {
        if self.cells.len() == 1 && self.cells[0].half_edges.is_empty() {
            self.enclose_single_cell();
            return;
        }
        for site in (0..self.cells.len()).rev() {
            self.prune_and_sort(site);
            if self.cells[site].half_edges.is_empty() || !self.cells[site].needs_closure {
                continue;
            }
            let mut i = 0;
            let mut n = self.cells[site].half_edges.len();
            while i < n {
                let cell = &self.cells[site];
                let v_start = cell.half_edges[i].end(&self.edges);
                let v_end = cell.half_edges[(i + 1) % n].start(&self.edges);
                let (Some(v_start), Some(v_end)) = (v_start, v_end) else {
                    i += 1;
                    continue;
                };
                if !v_start.approx_eq(&v_end, self.epsilon) {
                    match self.walk_border(site, i, v_start, v_end) {
                        Ok(inserted) => {
                            i += inserted;
                            n += inserted;
                        }
                        Err(inserted) => {
                            tracing::warn!(
                                "Could not close cell {} between ({:.3}, {:.3}) and ({:.3}, {:.3})",
                                site, v_start.x, v_start.y, v_end.x, v_end.y
                            );
                            self.closing_errors += 1;
                            i += inserted;
                            n += inserted;
                        }
                    }
                }
                i += 1;
            }
            self.cells[site].needs_closure = false;
        }
    }

    /// Drop half-edges whose edge was discarded and order the rest clockwise.
    fn prune_and_sort(&mut self, site: usize) {
        let edges = &self.edges;
        let cell = &mut self.cells[site];
        cell.half_edges.retain(|he| edges[he.edge].is_resolved());
        cell.half_edges.sort_by(|a, b| b.angle.total_cmp(&a.angle));
    }

    fn side_of(&self, v: Point) -> Option<usize> {
        let b = self.bounds;
        if self.eq_eps(v.x, b.min_x) && self.lt_eps(v.y, b.max_y) {
            Some(0)
        } else if self.eq_eps(v.y, b.max_y) && self.lt_eps(v.x, b.max_x) {
            Some(1)
        } else if self.eq_eps(v.x, b.max_x) && self.gt_eps(v.y, b.min_y) {
            Some(2)
        } else if self.eq_eps(v.y, b.min_y) && self.gt_eps(v.x, b.min_x) {
            Some(3)
        } else {
            None
        }
    }

    /// Insert border half-edges after position `at` leading from `v_start`
    /// along the rectangle to `v_end`.
    ///
    /// Returns the number inserted, as `Err` if `v_end` was never reached.
    fn walk_border(
        &mut self,
        site: usize,
        at: usize,
        mut v_start: Point,
        v_end: Point,
    ) -> Result<usize, usize> {
        let Some(first) = self.side_of(v_start) else {
            return Err(0);
        };
        let b = self.bounds;
        let mut inserted = 0;
        // Starting side plus at most three more; the walk never revisits it.
        for step in first..first + 4 {
            let side = WALK[step % 4];
            let (last, corner) = match side {
                Side::MinX => {
                    let last = self.eq_eps(v_end.x, b.min_x);
                    (last, Point::new(b.min_x, if last { v_end.y } else { b.max_y }))
                }
                Side::MaxY => {
                    let last = self.eq_eps(v_end.y, b.max_y);
                    (last, Point::new(if last { v_end.x } else { b.max_x }, b.max_y))
                }
                Side::MaxX => {
                    let last = self.eq_eps(v_end.x, b.max_x);
                    (last, Point::new(b.max_x, if last { v_end.y } else { b.min_y }))
                }
                Side::MinY => {
                    let last = self.eq_eps(v_end.y, b.min_y);
                    (last, Point::new(if last { v_end.x } else { b.min_x }, b.min_y))
                }
            };
            let he = self.create_border_edge(site, v_start, corner);
            inserted += 1;
            self.cells[site].half_edges.insert(at + inserted, he);
            if last {
                return Ok(inserted);
            }
            v_start = corner;
        }
        Err(inserted)
    }

    /// A lone site owns the whole rectangle.
    fn enclose_single_cell(&mut self) {
        let b = self.bounds;
        let ring = [
            Point::new(b.min_x, b.min_y),
            Point::new(b.min_x, b.max_y),
            Point::new(b.max_x, b.max_y),
            Point::new(b.max_x, b.min_y),
        ];
        for i in 0..4 {
            let he = self.create_border_edge(0, ring[i], ring[(i + 1) % 4]);
            self.cells[0].half_edges.push(he);
        }
        self.cells[0].needs_closure = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    #[test]
    fn test_unclosable_cells_are_flagged() {
        let mut builder = DiagramBuilder::new(Rect::centered(10.0), 1e-6);
        let left = builder.add_site(Point::new(-1.0, 0.0));
        let right = builder.add_site(Point::new(1.0, 0.0));
        // Both endpoints float inside the rectangle, so no border walk can join them
        builder.create_edge(left, right, Some(Point::new(0.0, -1.0)), Some(Point::new(0.0, 1.0)));
        builder.cells[left].needs_closure = true;
        builder.cells[right].needs_closure = true;

        builder.close_cells();
        assert_eq!(builder.closing_errors, 2);

        let d = builder.finish();
        assert!(d.has_closing_errors);
        assert_eq!(d.cells.len(), 2);
        assert_eq!(d.edges.len(), 1);
        assert_eq!(d.cells[left].half_edges.len(), 1);
    }

    #[test]
    fn test_border_walk_closes_corner_cell() {
        let mut builder = DiagramBuilder::new(Rect::new(0.0, 0.0, 10.0, 10.0), 1e-6);
        let a = builder.add_site(Point::new(2.0, 2.0));
        let b = builder.add_site(Point::new(8.0, 8.0));
        builder.create_edge(a, b, Some(Point::new(0.0, 10.0)), Some(Point::new(10.0, 0.0)));
        builder.cells[a].needs_closure = true;
        builder.cells[b].needs_closure = true;

        builder.close_cells();
        assert_eq!(builder.closing_errors, 0);
        let d = builder.finish();
        assert!(!d.has_closing_errors);
        assert!((d.area(a) - 50.0).abs() < 1e-9);
        assert!((d.area(b) - 50.0).abs() < 1e-9);
    }
}
