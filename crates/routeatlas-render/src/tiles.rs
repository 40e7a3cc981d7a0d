//! GeoJSON tile assembly from stored features

use std::sync::Arc;

use routeatlas_core::models::{Feature, Geometry};
use routeatlas_core::Result;
use routeatlas_geo::{mercator, spatial, TileCoord};
use routeatlas_store::FeatureStore;
use serde_json::{json, Map, Value};

/// Render features as an RFC 7946 FeatureCollection value.
///
/// Properties are emitted in sorted key order so the output is deterministic
/// for a given input.
pub fn feature_collection(features: &[Feature]) -> Value {
    let features: Vec<Value> = features.iter().map(feature_value).collect();
    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

fn feature_value(feature: &Feature) -> Value {
    let mut properties = Map::new();
    let mut keys: Vec<&String> = feature.properties.keys().collect();
    keys.sort();
    for key in keys {
        properties.insert(key.clone(), feature.properties[key].clone());
    }

    json!({
        "type": "Feature",
        "id": feature.id.0,
        "geometry": feature.geometry.to_geojson(),
        "properties": Value::Object(properties),
    })
}

/// Builds the GeoJSON content of slippy-map tiles from the feature store.
///
/// The queried envelope is the tile's WGS84 bounds widened by a buffer
/// fraction, so strokes crossing a tile edge still render on both sides.
pub struct TileBuilder {
    store: Arc<dyn FeatureStore>,
    buffer: f64,
    per_tile_limit: usize,
}

impl TileBuilder {
    pub const DEFAULT_BUFFER: f64 = 0.1;
    pub const DEFAULT_PER_TILE_LIMIT: usize = 2000;

    pub fn new(store: Arc<dyn FeatureStore>) -> Self {
        Self {
            store,
            buffer: Self::DEFAULT_BUFFER,
            per_tile_limit: Self::DEFAULT_PER_TILE_LIMIT,
        }
    }

    /// Buffer fraction added on every side of the tile bounds
    pub fn with_buffer(mut self, buffer: f64) -> Self {
        self.buffer = buffer;
        self
    }

    /// Cap on features included in one tile
    pub fn with_per_tile_limit(mut self, limit: usize) -> Self {
        self.per_tile_limit = limit;
        self
    }

    /// The envelope queried for a tile
    pub fn query_bounds(&self, tile: &TileCoord) -> [f64; 4] {
        let [west, south, east, north] = mercator::tile_bounds(tile);
        let pad_x = (east - west) * self.buffer;
        let pad_y = (north - south) * self.buffer;
        [west - pad_x, south - pad_y, east + pad_x, north + pad_y]
    }

    /// Build one tile's encoded FeatureCollection
    pub async fn build(&self, tile: &TileCoord) -> Result<Vec<u8>> {
        let bounds = self.query_bounds(tile);
        let candidates = self
            .store
            .features_in_bbox(bounds, Some(self.per_tile_limit))
            .await?;

        // The store matched on envelopes; refine against the actual bounds
        let rect = bounds_polygon(bounds);
        let features: Vec<Feature> = candidates
            .into_iter()
            .filter(|f| spatial::intersects(&f.geometry, &rect))
            .collect();

        let collection = feature_collection(&features);
        tracing::debug!(tile = %tile, features = features.len(), "built tile");
        Ok(collection.to_string().into_bytes())
    }
}

fn bounds_polygon(bounds: [f64; 4]) -> Geometry {
    let [min_x, min_y, max_x, max_y] = bounds;
    Geometry::polygon(vec![vec![
        [min_x, min_y],
        [max_x, min_y],
        [max_x, max_y],
        [min_x, max_y],
        [min_x, min_y],
    ]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use routeatlas_core::models::{
        Dataset, DatasetId, FormatMetadata, GeometryType,
    };
    use routeatlas_store::MemoryStore;
    use serde_json::json;
    use std::path::PathBuf;

    // Central Edinburgh falls in this tile at zoom 12
    const EDINBURGH_TILE: TileCoord = TileCoord { z: 12, x: 2011, y: 1276 };

    async fn store_with_features(features: Vec<Feature>) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let dataset = Dataset {
            id: DatasetId(0),
            name: "edinburgh".to_string(),
            source_path: PathBuf::from("/data/edinburgh.geojson"),
            geometry_type: GeometryType::LineString,
            feature_count: 0,
            crs: 4326,
            format: FormatMetadata::named("GeoJSON"),
            added_at: Utc::now(),
        };
        let id = store.store_dataset(&dataset).await.unwrap();
        store.store_features(id, &features).await.unwrap();
        store
    }

    #[test]
    fn test_feature_collection_shape() {
        let feature = Feature::new(Geometry::point(-3.19, 55.95), 4326)
            .with_property("street", json!("Princes Street"))
            .with_property("route_type", json!("Cycle Lane"));

        let collection = feature_collection(&[feature]);
        assert_eq!(collection["type"], "FeatureCollection");
        assert_eq!(collection["features"].as_array().unwrap().len(), 1);

        let first = &collection["features"][0];
        assert_eq!(first["type"], "Feature");
        assert_eq!(first["geometry"]["type"], "Point");
        assert_eq!(first["properties"]["street"], "Princes Street");
    }

    #[test]
    fn test_feature_collection_is_deterministic() {
        let feature = Feature::new(Geometry::point(-3.19, 55.95), 4326)
            .with_property("zebra", json!(1))
            .with_property("alpha", json!(2))
            .with_property("mid", json!(3));

        let first = feature_collection(std::slice::from_ref(&feature)).to_string();
        let second = feature_collection(std::slice::from_ref(&feature)).to_string();
        assert_eq!(first, second);

        // Property keys serialize sorted
        let alpha = first.find("\"alpha\"").unwrap();
        let mid = first.find("\"mid\"").unwrap();
        let zebra = first.find("\"zebra\"").unwrap();
        assert!(alpha < mid && mid < zebra);
    }

    #[test]
    fn test_query_bounds_widened_by_buffer() {
        let store = Arc::new(MemoryStore::new());
        let builder = TileBuilder::new(store).with_buffer(0.5);

        let tile = TileCoord { z: 1, x: 0, y: 0 };
        let [west, south, east, north] = mercator::tile_bounds(&tile);
        let [qw, qs, qe, qn] = builder.query_bounds(&tile);

        assert!((qw - (west - 90.0)).abs() < 1e-9);
        assert!((qe - (east + 90.0)).abs() < 1e-9);
        assert!(qs < south && qn > north);
    }

    #[tokio::test]
    async fn test_build_includes_features_in_tile() {
        let inside = Feature::new(
            Geometry::line_string(vec![[-3.20, 55.95], [-3.19, 55.952]]),
            4326,
        )
        .with_property("route_type", json!("Cycle Lane"));
        // Glasgow is several tiles west at zoom 12
        let outside = Feature::new(
            Geometry::line_string(vec![[-4.25, 55.86], [-4.24, 55.861]]),
            4326,
        );

        let store = store_with_features(vec![inside, outside]).await;
        let builder = TileBuilder::new(store);

        let bytes = builder.build(&EDINBURGH_TILE).await.unwrap();
        let collection: Value = serde_json::from_slice(&bytes).unwrap();
        let features = collection["features"].as_array().unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0]["properties"]["route_type"], "Cycle Lane");
    }

    #[tokio::test]
    async fn test_build_empty_tile() {
        let store = Arc::new(MemoryStore::new());
        let builder = TileBuilder::new(store);

        let bytes = builder.build(&EDINBURGH_TILE).await.unwrap();
        let collection: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(collection["type"], "FeatureCollection");
        assert!(collection["features"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_per_tile_limit_caps_features() {
        let features: Vec<Feature> = (0..10)
            .map(|i| {
                Feature::new(
                    Geometry::line_string(vec![
                        [-3.20 + 0.0001 * i as f64, 55.95],
                        [-3.19 + 0.0001 * i as f64, 55.952],
                    ]),
                    4326,
                )
            })
            .collect();

        let store = store_with_features(features).await;
        let builder = TileBuilder::new(store).with_per_tile_limit(4);

        let bytes = builder.build(&EDINBURGH_TILE).await.unwrap();
        let collection: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(collection["features"].as_array().unwrap().len(), 4);
    }
}
