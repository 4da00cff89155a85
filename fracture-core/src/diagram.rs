//! Voronoi diagram data model and per-cell queries.
//!
//! A [`Diagram`] owns its sites, edges and cells. Cells refer to edges by
//! index through [`HalfEdge`]s, so the whole structure is plain data with no
//! shared ownership and can be cloned or sent across threads freely.

use crate::geometry::{polygon_centroid, signed_area, Point, Rect};
use crate::pattern::{CellPolygon, FracturePattern};

/// Index of a site (and of its cell) within a [`Diagram`]
pub type SiteId = usize;

/// Index of an edge within a [`Diagram`]
pub type EdgeId = usize;

/// Tolerance used by geometric queries on a finished diagram
const QUERY_EPSILON: f64 = 1e-7;

/// An input point that owns one cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Site {
    pub id: SiteId,
    pub position: Point,
}

/// A segment of the diagram.
///
/// Bisector edges separate `left` and `right`. Border edges lie on the
/// bounding rectangle and have `right == None`. The site pair never changes
/// after creation; `start` is the endpoint as seen from `left`.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub left: SiteId,
    pub right: Option<SiteId>,
    pub start: Option<Point>,
    pub end: Option<Point>,
}

impl Edge {
    pub(crate) fn new(left: SiteId, right: Option<SiteId>) -> Self {
        Self { left, right, start: None, end: None }
    }

    pub fn is_border(&self) -> bool {
        self.right.is_none()
    }

    /// Both endpoints assigned
    pub fn is_resolved(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    /// Assign the endpoint that starts the edge when walked with `from` on the left.
    pub(crate) fn set_start(&mut self, from: SiteId, vertex: Point) {
        if from == self.left {
            self.start = Some(vertex);
        } else {
            self.end = Some(vertex);
        }
    }

    /// Assign the endpoint that ends the edge when walked with `from` on the left.
    pub(crate) fn set_end(&mut self, from: SiteId, vertex: Point) {
        if from == self.left {
            self.end = Some(vertex);
        } else {
            self.start = Some(vertex);
        }
    }

    /// The site on the other side of this edge from `site`
    pub fn other_site(&self, site: SiteId) -> Option<SiteId> {
        if self.left == site {
            self.right
        } else {
            Some(self.left)
        }
    }
}

/// An edge seen from one of the cells it bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfEdge {
    pub edge: EdgeId,
    pub site: SiteId,
    /// Sort key around the owning site
    pub angle: f64,
}

impl HalfEdge {
    pub fn start(&self, edges: &[Edge]) -> Option<Point> {
        let edge = &edges[self.edge];
        if edge.left == self.site {
            edge.start
        } else {
            edge.end
        }
    }

    pub fn end(&self, edges: &[Edge]) -> Option<Point> {
        let edge = &edges[self.edge];
        if edge.left == self.site {
            edge.end
        } else {
            edge.start
        }
    }
}

/// The region owned by one site
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub site: SiteId,
    /// Clockwise around the site (descending angle)
    pub half_edges: Vec<HalfEdge>,
    pub needs_closure: bool,
}

impl Cell {
    pub(crate) fn new(site: SiteId) -> Self {
        Self { site, half_edges: Vec::new(), needs_closure: false }
    }
}

/// Result of testing a point against a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointLocation {
    Inside,
    Boundary,
    Outside,
}

/// A bounded Voronoi diagram
#[derive(Debug, Clone, PartialEq)]
pub struct Diagram {
    /// Distinct sites in processing order; `sites[i].id == i`
    pub sites: Vec<Site>,
    pub edges: Vec<Edge>,
    /// One cell per site, indexed by [`SiteId`]
    pub cells: Vec<Cell>,
    pub bounds: Rect,
    /// Some cell boundary could not be closed against the rectangle
    pub has_closing_errors: bool,
}

impl Diagram {
    pub fn empty(bounds: Rect) -> Self {
        Self {
            sites: Vec::new(),
            edges: Vec::new(),
            cells: Vec::new(),
            bounds,
            has_closing_errors: false,
        }
    }

    pub fn site_positions(&self) -> Vec<Point> {
        self.sites.iter().map(|s| s.position).collect()
    }

    /// Cell boundary as a counter-clockwise vertex list (y-up)
    pub fn polygon(&self, site: SiteId) -> Vec<Point> {
        let Some(cell) = self.cells.get(site) else {
            return Vec::new();
        };
        let mut vertices: Vec<Point> = cell
            .half_edges
            .iter()
            .filter_map(|he| he.start(&self.edges))
            .collect();
        vertices.reverse();
        vertices
    }

    pub fn area(&self, site: SiteId) -> f64 {
        signed_area(&self.polygon(site)).abs()
    }

    pub fn centroid(&self, site: SiteId) -> Option<Point> {
        polygon_centroid(&self.polygon(site))
    }

    pub fn cell_bounds(&self, site: SiteId) -> Option<Rect> {
        Rect::enclosing(&self.polygon(site))
    }

    /// Classify `point` against the cell of `site`.
    ///
    /// Cells are convex, so the point is inside when it lies to the left of
    /// every CCW boundary segment.
    pub fn locate(&self, site: SiteId, point: Point) -> PointLocation {
        let polygon = self.polygon(site);
        let n = polygon.len();
        if n < 3 {
            return PointLocation::Outside;
        }
        let mut on_boundary = false;
        for i in 0..n {
            let a = polygon[i];
            let b = polygon[(i + 1) % n];
            let len = a.dist(&b);
            if len < QUERY_EPSILON {
                continue;
            }
            let cross = (b.x - a.x) * (point.y - a.y) - (b.y - a.y) * (point.x - a.x);
            let tol = QUERY_EPSILON * len;
            if cross < -tol {
                return PointLocation::Outside;
            }
            if cross <= tol {
                on_boundary = true;
            }
        }
        if on_boundary {
            PointLocation::Boundary
        } else {
            PointLocation::Inside
        }
    }

    /// Sites sharing a bisector edge with `site`
    pub fn neighbors(&self, site: SiteId) -> Vec<SiteId> {
        let Some(cell) = self.cells.get(site) else {
            return Vec::new();
        };
        cell.half_edges
            .iter()
            .filter_map(|he| self.edges[he.edge].other_site(site))
            .collect()
    }

    /// Edges separating two sites (border segments excluded)
    pub fn bisectors(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(|e| !e.is_border())
    }

    /// Distinct bisector endpoints that do not lie on the bounding rectangle
    pub fn interior_vertices(&self) -> Vec<Point> {
        let mut vertices: Vec<Point> = Vec::new();
        for edge in self.bisectors() {
            for v in [edge.start, edge.end].into_iter().flatten() {
                if self.bounds.on_border(&v, QUERY_EPSILON) {
                    continue;
                }
                if !vertices.iter().any(|u| u.approx_eq(&v, QUERY_EPSILON)) {
                    vertices.push(v);
                }
            }
        }
        vertices
    }

    /// Engine-neutral polygon output
    pub fn to_pattern(&self) -> FracturePattern {
        let polygons = self
            .sites
            .iter()
            .map(|site| CellPolygon {
                site_id: site.id,
                site: site.position,
                vertices: self.polygon(site.id),
            })
            .collect();
        FracturePattern {
            polygons,
            bounds: self.bounds,
            has_closing_errors: self.has_closing_errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Unit square owned by one site, built by hand
    fn square_diagram() -> Diagram {
        let bounds = Rect::new(0.0, 0.0, 1.0, 1.0);
        let corners = [
            Point::new(0.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(1.0, 1.0),
            Point::new(1.0, 0.0),
        ];
        let mut edges = Vec::new();
        let mut cell = Cell::new(0);
        for i in 0..4 {
            let mut e = Edge::new(0, None);
            e.start = Some(corners[i]);
            e.end = Some(corners[(i + 1) % 4]);
            edges.push(e);
            cell.half_edges.push(HalfEdge { edge: i, site: 0, angle: 0.0 });
        }
        Diagram {
            sites: vec![Site { id: 0, position: Point::new(0.5, 0.5) }],
            edges,
            cells: vec![cell],
            bounds,
            has_closing_errors: false,
        }
    }

    #[test]
    fn test_polygon_is_ccw() {
        let d = square_diagram();
        let poly = d.polygon(0);
        assert_eq!(poly.len(), 4);
        assert!(signed_area(&poly) > 0.0);
        assert!((d.area(0) - 1.0).abs() < 1e-12);
        assert!(d.centroid(0).unwrap().approx_eq(&Point::new(0.5, 0.5), 1e-12));
    }

    #[test]
    fn test_locate() {
        let d = square_diagram();
        assert_eq!(d.locate(0, Point::new(0.5, 0.5)), PointLocation::Inside);
        assert_eq!(d.locate(0, Point::new(1.0, 0.5)), PointLocation::Boundary);
        assert_eq!(d.locate(0, Point::new(1.5, 0.5)), PointLocation::Outside);
        assert_eq!(d.locate(7, Point::new(0.5, 0.5)), PointLocation::Outside);
    }

    #[test]
    fn test_edge_endpoint_perspective() {
        let mut e = Edge::new(3, Some(5));
        e.set_start(5, Point::new(1.0, 2.0));
        assert_eq!(e.end, Some(Point::new(1.0, 2.0)));
        assert_eq!(e.start, None);
        e.set_end(5, Point::new(4.0, 4.0));
        assert_eq!(e.start, Some(Point::new(4.0, 4.0)));
        assert_eq!(e.other_site(3), Some(5));
        assert_eq!(e.other_site(5), Some(3));

        let edges = vec![e];
        let from_right = HalfEdge { edge: 0, site: 5, angle: 0.0 };
        assert_eq!(from_right.start(&edges), Some(Point::new(1.0, 2.0)));
        assert_eq!(from_right.end(&edges), Some(Point::new(4.0, 4.0)));
    }
}
