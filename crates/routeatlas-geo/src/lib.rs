//! RouteAtlas Geo - CRS transformation and spatial operations
//!
//! This crate handles the geospatial math of the pipeline: reprojection
//! between coordinate reference systems, route length measurement, OS
//! National Grid references, Web Mercator tile arithmetic, spatial
//! predicates, a feature R-tree, and raster zonal statistics.

pub mod index;
pub mod measure;
pub mod mercator;
pub mod models;
pub mod osgrid;
pub mod spatial;
pub mod transform;
pub mod zonal;

// Re-export key types for convenience
pub use index::{IndexedFeature, SpatialIndex};
pub use mercator::TileCoord;
pub use models::GeometryExt;
