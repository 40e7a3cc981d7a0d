use std::sync::Arc;

use routeatlas_core::formats::FormatRegistry;
use routeatlas_render::{LayerStyle, TileBuilder, TileCache};
use routeatlas_store::FeatureStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn FeatureStore>,
    pub formats: Arc<FormatRegistry>,
    pub tiles: Arc<TileBuilder>,
    pub cache: Arc<TileCache>,
    pub style: LayerStyle,
    /// CRS assumed for uploads that do not declare one
    pub ingest_crs: u32,
}

impl AppState {
    pub fn new(store: Arc<dyn FeatureStore>, cache: TileCache, ingest_crs: u32) -> Self {
        let tiles = Arc::new(TileBuilder::new(Arc::clone(&store)));
        Self {
            store,
            formats: Arc::new(FormatRegistry::default()),
            tiles,
            cache: Arc::new(cache),
            style: LayerStyle::default(),
            ingest_crs,
        }
    }
}
