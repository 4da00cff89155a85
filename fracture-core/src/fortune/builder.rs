//! Incremental diagram assembly used by the sweep.

use crate::diagram::{Cell, Diagram, Edge, EdgeId, HalfEdge, Site, SiteId};
use crate::geometry::{Point, Rect};

pub(crate) struct DiagramBuilder {
    pub sites: Vec<Site>,
    pub edges: Vec<Edge>,
    pub cells: Vec<Cell>,
    pub bounds: Rect,
    pub epsilon: f64,
    pub closing_errors: usize,
}

impl DiagramBuilder {
    pub fn new(bounds: Rect, epsilon: f64) -> Self {
        Self {
            sites: Vec::new(),
            edges: Vec::new(),
            cells: Vec::new(),
            bounds,
            epsilon,
            closing_errors: 0,
        }
    }

    /// Register a site and its (empty) cell, returning the new id.
    pub fn add_site(&mut self, position: Point) -> SiteId {
        let id = self.sites.len();
        self.sites.push(Site { id, position });
        self.cells.push(Cell::new(id));
        id
    }

    pub fn position(&self, site: SiteId) -> Point {
        self.sites[site].position
    }

    /// Bisector between `left` and `right` with optional known endpoints,
    /// expressed from `left`'s point of view.
    pub fn create_edge(
        &mut self,
        left: SiteId,
        right: SiteId,
        start: Option<Point>,
        end: Option<Point>,
    ) -> EdgeId {
        let id = self.edges.len();
        let mut edge = Edge::new(left, Some(right));
        if let Some(v) = start {
            edge.set_start(left, v);
        }
        if let Some(v) = end {
            edge.set_end(left, v);
        }
        self.edges.push(edge);
        let (lp, rp) = (self.position(left), self.position(right));
        self.cells[left].half_edges.push(HalfEdge {
            edge: id,
            site: left,
            angle: (rp.y - lp.y).atan2(rp.x - lp.x),
        });
        self.cells[right].half_edges.push(HalfEdge {
            edge: id,
            site: right,
            angle: (lp.y - rp.y).atan2(lp.x - rp.x),
        });
        id
    }

    /// Segment of the bounding rectangle owned by `site` alone.
    ///
    /// The half-edge is returned rather than attached so the caller can
    /// splice it into position.
    pub fn create_border_edge(&mut self, site: SiteId, start: Point, end: Point) -> HalfEdge {
        let id = self.edges.len();
        self.edges.push(Edge { left: site, right: None, start: Some(start), end: Some(end) });
        HalfEdge {
            edge: id,
            site,
            angle: (end.x - start.x).atan2(start.y - end.y),
        }
    }

    pub fn set_edge_start(&mut self, edge: EdgeId, from: SiteId, vertex: Point) {
        self.edges[edge].set_start(from, vertex);
    }

    /// Drop edges without two endpoints and renumber half-edge references.
    pub fn finish(mut self) -> Diagram {
        let mut remap = vec![usize::MAX; self.edges.len()];
        let mut kept = Vec::with_capacity(self.edges.len());
        for (old, edge) in self.edges.into_iter().enumerate() {
            if edge.is_resolved() {
                remap[old] = kept.len();
                kept.push(edge);
            }
        }
        for cell in &mut self.cells {
            cell.half_edges.retain(|he| remap[he.edge] != usize::MAX);
            for he in &mut cell.half_edges {
                he.edge = remap[he.edge];
            }
        }
        Diagram {
            sites: self.sites,
            edges: kept,
            cells: self.cells,
            bounds: self.bounds,
            has_closing_errors: self.closing_errors > 0,
        }
    }
}
