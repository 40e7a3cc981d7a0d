pub mod dataset;
pub mod feature;
pub mod geometry;
pub mod raster;

pub use dataset::{Dataset, DatasetId, DatasetMeta, FormatMetadata};
pub use feature::{Feature, FeatureId};
pub use geometry::{Crs, Geometry, GeometryType};
pub use raster::{RasterGrid, ZonalStatistics};
