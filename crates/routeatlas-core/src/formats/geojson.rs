//! GeoJSON format reader implementation
//!
//! Accepts the shapes route data actually arrives in: a FeatureCollection,
//! a single Feature, a bare Geometry, or a bare JSON array of features.
//! The legacy `crs` member is honored when present; otherwise coordinates
//! are taken to be WGS 84 as RFC 7946 specifies.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{AtlasError, Result};
use crate::formats::validation::FormatValidator;
use crate::formats::{FormatDataset, FormatFeature, FormatMetadata, FormatReader, FormatValidation};

/// GeoJSON format reader
pub struct GeoJsonReader;

#[async_trait]
impl FormatReader for GeoJsonReader {
    async fn read(&self, path: &Path) -> Result<FormatDataset> {
        let content = fs::read_to_string(path).map_err(AtlasError::Io)?;

        let (features, crs) = self.parse_content(&content)?;

        // Get dataset name from filename
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unnamed")
            .to_string();

        Ok(FormatDataset {
            name,
            format_metadata: FormatMetadata::named("GeoJSON"),
            crs: Some(crs),
            features,
        })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["json", "geojson"]
    }

    fn format_name(&self) -> &str {
        "GeoJSON"
    }

    async fn validate(&self, path: &Path) -> Result<FormatValidation> {
        // Basic file validation
        let mut validation = FormatValidator::validate_file_exists(path);
        if !validation.is_valid() {
            return Ok(validation);
        }

        // Validate JSON structure
        let json_validation = FormatValidator::validate_json_structure(path);

        // If JSON is valid, check it parses as one of the accepted shapes
        if json_validation.is_valid() {
            match fs::read_to_string(path) {
                Ok(content) => {
                    if let Err(e) = self.parse_content(&content) {
                        validation.errors.push(format!("Invalid GeoJSON: {}", e));
                    }
                }
                Err(e) => {
                    validation.errors.push(format!("Cannot read file: {}", e));
                }
            }
        }

        Ok(FormatValidator::merge_validations(vec![validation, json_validation]))
    }
}

impl GeoJsonReader {
    /// Parse GeoJSON text into features and the declared EPSG code
    fn parse_content(&self, content: &str) -> Result<(Vec<FormatFeature>, u32)> {
        let value: serde_json::Value =
            serde_json::from_str(content).map_err(|e| AtlasError::FormatError {
                format: "GeoJSON".to_string(),
                message: format!("Failed to parse JSON: {}", e),
            })?;

        // A bare array is a list of features without the collection wrapper
        if value.is_array() {
            let features: Vec<geojson::Feature> =
                serde_json::from_value(value).map_err(|e| AtlasError::FormatError {
                    format: "GeoJSON".to_string(),
                    message: format!("Array is not a list of features: {}", e),
                })?;
            let converted = features
                .iter()
                .enumerate()
                .map(|(idx, feature)| self.convert_feature(feature, idx))
                .collect();
            return Ok((converted, 4326));
        }

        let geojson: geojson::GeoJson = content.parse().map_err(|e| AtlasError::FormatError {
            format: "GeoJSON".to_string(),
            message: format!("Failed to parse GeoJSON: {}", e),
        })?;
        self.extract_features_and_crs(&geojson)
    }

    /// Extract features and CRS from a parsed GeoJSON document
    fn extract_features_and_crs(
        &self,
        geojson: &geojson::GeoJson,
    ) -> Result<(Vec<FormatFeature>, u32)> {
        match geojson {
            geojson::GeoJson::FeatureCollection(fc) => {
                let features = fc
                    .features
                    .iter()
                    .enumerate()
                    .map(|(idx, feature)| self.convert_feature(feature, idx))
                    .collect();

                // Legacy crs member overrides the RFC 7946 default
                let crs = fc
                    .foreign_members
                    .as_ref()
                    .and_then(|fm| fm.get("crs"))
                    .and_then(extract_epsg_from_crs)
                    .unwrap_or(4326);

                Ok((features, crs))
            }
            geojson::GeoJson::Feature(feature) => {
                let features = vec![self.convert_feature(feature, 0)];
                Ok((features, 4326))
            }
            geojson::GeoJson::Geometry(geom) => {
                // Single geometry, wrap in a feature
                let geometry_json = serde_json::to_value(geom).map_err(|e| {
                    AtlasError::Serialization(format!("Failed to serialize geometry: {}", e))
                })?;

                let feature = FormatFeature {
                    id: "0".to_string(),
                    geometry: Some(geometry_json),
                    properties: HashMap::new(),
                };

                Ok((vec![feature], 4326))
            }
        }
    }

    /// Convert a GeoJSON feature to FormatFeature
    fn convert_feature(&self, feature: &geojson::Feature, idx: usize) -> FormatFeature {
        // Use the feature's own id, falling back to its index
        let id = feature
            .id
            .as_ref()
            .map(|id| match id {
                geojson::feature::Id::String(s) => s.clone(),
                geojson::feature::Id::Number(n) => n.to_string(),
            })
            .unwrap_or_else(|| idx.to_string());

        let geometry = feature
            .geometry
            .as_ref()
            .and_then(|geom| serde_json::to_value(geom).ok());

        let properties = feature
            .properties
            .as_ref()
            .map(|props| props.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();

        FormatFeature {
            id,
            geometry,
            properties,
        }
    }
}

/// Extract EPSG code from a legacy CRS object
fn extract_epsg_from_crs(crs: &serde_json::Value) -> Option<u32> {
    let name_str = crs.get("properties")?.get("name")?.as_str()?;

    // "urn:ogc:def:crs:OGC:1.3:CRS84" is WGS 84 with lon/lat order
    if name_str.rsplit(':').next()?.eq_ignore_ascii_case("crs84") {
        return Some(4326);
    }

    // Parse "EPSG:27700" or "urn:ogc:def:crs:EPSG::27700"
    name_str.rsplit(':').next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_feature_collection_with_crs_member() {
        let reader = GeoJsonReader;

        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("cycle_network.geojson");

        let geojson_content = r#"{
            "type": "FeatureCollection",
            "crs": {
                "type": "name",
                "properties": { "name": "urn:ogc:def:crs:EPSG::27700" }
            },
            "features": [
                {
                    "type": "Feature",
                    "id": "segment-1",
                    "geometry": {
                        "type": "LineString",
                        "coordinates": [[325940.0, 673060.0], [326010.0, 673115.0]]
                    },
                    "properties": {
                        "route_type": "Cycle Lane",
                        "street": "Princes Street"
                    }
                }
            ]
        }"#;

        fs::write(&file_path, geojson_content).unwrap();

        let result = reader.read(&file_path).await.unwrap();

        assert_eq!(result.name, "cycle_network");
        assert_eq!(result.format_metadata.format_name, "GeoJSON");
        assert_eq!(result.crs, Some(27700));
        assert_eq!(result.features.len(), 1);
        assert_eq!(result.features[0].id, "segment-1");
        assert_eq!(
            result.features[0].properties["route_type"],
            serde_json::json!("Cycle Lane")
        );
    }

    #[tokio::test]
    async fn test_collection_without_crs_defaults_to_wgs84() {
        let reader = GeoJsonReader;

        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("points.geojson");

        let geojson_content = r#"{
            "type": "FeatureCollection",
            "features": []
        }"#;

        fs::write(&file_path, geojson_content).unwrap();

        let result = reader.read(&file_path).await.unwrap();
        assert_eq!(result.crs, Some(4326));
    }

    #[tokio::test]
    async fn test_single_feature_document() {
        let reader = GeoJsonReader;

        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("single.geojson");

        let geojson_content = r#"{
            "type": "Feature",
            "geometry": {
                "type": "Point",
                "coordinates": [-3.19, 55.95]
            },
            "properties": {
                "name": "Depot"
            }
        }"#;

        fs::write(&file_path, geojson_content).unwrap();

        let result = reader.read(&file_path).await.unwrap();

        assert_eq!(result.features.len(), 1);
        assert!(result.features[0].geometry.is_some());
    }

    #[tokio::test]
    async fn test_bare_geometry_document() {
        let reader = GeoJsonReader;

        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("geometry.json");

        fs::write(
            &file_path,
            r#"{ "type": "Point", "coordinates": [-3.19, 55.95] }"#,
        )
        .unwrap();

        let result = reader.read(&file_path).await.unwrap();
        assert_eq!(result.features.len(), 1);
        assert_eq!(result.features[0].id, "0");
    }

    #[tokio::test]
    async fn test_bare_feature_array() {
        let reader = GeoJsonReader;

        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("array.json");

        let content = r#"[
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [-3.2, 55.9] },
                "properties": { "route_id": "NCN1" }
            },
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [-3.1, 55.8] },
                "properties": { "route_id": "NCN76" }
            }
        ]"#;

        fs::write(&file_path, content).unwrap();

        let result = reader.read(&file_path).await.unwrap();
        assert_eq!(result.features.len(), 2);
        assert_eq!(result.crs, Some(4326));
    }

    #[tokio::test]
    async fn test_validation_catches_invalid_json() {
        let reader = GeoJsonReader;

        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("invalid.geojson");

        fs::write(&file_path, "not valid json").unwrap();

        let validation = reader.validate(&file_path).await.unwrap();

        assert!(!validation.is_valid());
        assert!(!validation.errors.is_empty());
    }

    #[test]
    fn test_extract_epsg_variants() {
        let named = serde_json::json!({
            "type": "name",
            "properties": { "name": "EPSG:27700" }
        });
        assert_eq!(extract_epsg_from_crs(&named), Some(27700));

        let urn = serde_json::json!({
            "type": "name",
            "properties": { "name": "urn:ogc:def:crs:EPSG::3857" }
        });
        assert_eq!(extract_epsg_from_crs(&urn), Some(3857));

        let crs84 = serde_json::json!({
            "type": "name",
            "properties": { "name": "urn:ogc:def:crs:OGC:1.3:CRS84" }
        });
        assert_eq!(extract_epsg_from_crs(&crs84), Some(4326));
    }
}
