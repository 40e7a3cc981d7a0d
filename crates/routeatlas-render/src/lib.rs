//! Map rendering: static Leaflet HTML documents and cached GeoJSON tiles
//!
//! Two output paths share the same feature-collection encoding:
//! [`map::MapDocument`] renders stored features into a standalone HTML page,
//! while [`tiles::TileBuilder`] cuts them into slippy-map GeoJSON tiles that
//! [`cache::TileCache`] serves through a bounded memory tier with an optional
//! disk tier.

pub mod cache;
pub mod map;
pub mod style;
pub mod tiles;

pub use cache::{CacheStats, TileCache};
pub use map::{MapDocument, MapOptions};
pub use style::LayerStyle;
pub use tiles::{feature_collection, TileBuilder};
