//! Planar Voronoi fracture patterns.
//!
//! Two engines partition a bounding rectangle into one convex cell per site:
//! an exact Fortune sweep-line engine and an approximate Jump Flood raster
//! engine. Both produce CCW polygons suitable for extruding fracture pieces.

mod config;
mod diagram;
mod fortune;
mod geometry;
mod pattern;
mod raster;
mod relax;
mod sites;

pub use config::{EngineKind, FractureConfig, FractureConfigBuilder};
pub use diagram::{Cell, Diagram, Edge, EdgeId, HalfEdge, PointLocation, Site, SiteId};
pub use fortune::{FortuneEngine, DEFAULT_EPSILON};
pub use geometry::{circumcenter, polygon_centroid, signed_area, Point, Rect};
pub use pattern::{
    fracture, fracture_with, CellPolygon, FractureBackend, FracturePattern, Fracturer,
};
pub use raster::{
    extract_vertices, ExtractedVertices, JumpFloodEngine, LabelGrid, PixelSeed, PixelVertex,
    RasterDiagram, MAX_GRID_PIXELS, NO_LABEL,
};
pub use relax::{relax, relax_with, RelaxOptions};
pub use sites::SiteGenerator;

/// RGB color tuple
pub type Rgb = [u8; 3];

/// Error type for fracture operations
#[derive(Debug, thiserror::Error)]
pub enum FractureError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("No sites provided")]
    NoSites,

    #[error("Invalid bounds: {0:?}")]
    InvalidBounds(Rect),

    #[error("Invalid raster grid {width}x{height} (need at least 2x2 and at most 2^26 pixels)")]
    InvalidGrid { width: u32, height: u32 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

pub type Result<T> = std::result::Result<T, FractureError>;
