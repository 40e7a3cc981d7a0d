//! Format abstraction layer for multi-format ingestion
//!
//! Each vector format implements the `FormatReader` trait, and the
//! `FormatRegistry` manages format detection and dispatching to the right
//! reader. Raster input has its own entry point in [`ascii_grid`] since it
//! produces a grid rather than features.

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;

pub mod ascii_grid;
pub mod csv_wkt;
pub mod geojson;
pub mod shapefile;
pub mod validation;

pub use crate::models::dataset::FormatMetadata;

/// Format reader trait that all vector format implementations must implement
#[async_trait]
pub trait FormatReader: Send + Sync {
    /// Read a dataset from the given path
    async fn read(&self, path: &Path) -> Result<FormatDataset>;

    /// Get supported file extensions (e.g., ["shp", "geojson"])
    fn supported_extensions(&self) -> &[&str];

    /// Get human-readable format name (e.g., "Shapefile", "GeoJSON")
    fn format_name(&self) -> &str;

    /// Validate file structure without a full read (optional)
    ///
    /// This allows format readers to perform quick validation checks
    /// before attempting a full read operation.
    async fn validate(&self, _path: &Path) -> Result<FormatValidation> {
        // Default implementation: no validation errors or warnings
        Ok(FormatValidation::default())
    }
}

/// Result of format validation
#[derive(Debug, Clone, Default)]
pub struct FormatValidation {
    /// Validation errors that prevent reading
    pub errors: Vec<String>,

    /// Warnings that don't prevent reading but indicate potential issues
    pub warnings: Vec<String>,
}

impl FormatValidation {
    /// Check if validation passed (no errors)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Check if there are any warnings
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Dataset representation returned by format readers
///
/// This is the raw read result; the ingest pipeline turns it into the core
/// dataset and feature models after CRS normalization.
#[derive(Debug, Clone)]
pub struct FormatDataset {
    /// Dataset name, usually the file stem
    pub name: String,

    /// Format-specific metadata
    pub format_metadata: FormatMetadata,

    /// CRS EPSG code declared by the source, `None` when the format does
    /// not carry one (the pipeline then falls back to the configured
    /// ingest CRS)
    pub crs: Option<u32>,

    /// Features extracted from the source
    pub features: Vec<FormatFeature>,
}

/// Feature extracted from a source file
#[derive(Debug, Clone)]
pub struct FormatFeature {
    /// Feature identifier as written in the source, or its record index
    pub id: String,

    /// Geometry as a GeoJSON value, `None` for records without one
    pub geometry: Option<serde_json::Value>,

    /// Feature properties
    pub properties: std::collections::HashMap<String, serde_json::Value>,
}

/// Central registry for format readers
///
/// The registry maintains a collection of format readers and provides
/// format detection based on file extensions.
pub struct FormatRegistry {
    readers: Vec<Box<dyn FormatReader>>,
}

impl FormatRegistry {
    /// Create a new empty format registry
    pub fn new() -> Self {
        Self {
            readers: Vec::new(),
        }
    }

    /// Register a format reader
    pub fn register(&mut self, reader: Box<dyn FormatReader>) {
        self.readers.push(reader);
    }

    /// Detect format and return the appropriate reader
    pub fn detect_format(&self, path: &Path) -> Result<&dyn FormatReader> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .ok_or_else(|| crate::error::AtlasError::UnsupportedFormat {
                extension: "none".to_string(),
                supported: self.supported_formats().join(", "),
            })?;

        self.readers
            .iter()
            .find(|r| r.supported_extensions().contains(&extension.as_str()))
            .map(|r| r.as_ref())
            .ok_or_else(|| crate::error::AtlasError::UnsupportedFormat {
                extension,
                supported: self.supported_formats().join(", "),
            })
    }

    /// Get the list of all supported format extensions
    pub fn supported_formats(&self) -> Vec<String> {
        self.readers
            .iter()
            .flat_map(|r| r.supported_extensions())
            .map(|s| s.to_string())
            .collect()
    }

    /// Get all registered readers
    pub fn readers(&self) -> &[Box<dyn FormatReader>] {
        &self.readers
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(geojson::GeoJsonReader));
        registry.register(Box::new(shapefile::ShapefileFormatReader));
        registry.register(Box::new(csv_wkt::CsvWktReader::new()));
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Mock format reader for testing
    struct MockReader {
        extensions: Vec<&'static str>,
        name: &'static str,
    }

    #[async_trait]
    impl FormatReader for MockReader {
        async fn read(&self, _path: &Path) -> Result<FormatDataset> {
            Ok(FormatDataset {
                name: "test".to_string(),
                format_metadata: FormatMetadata::named(self.name),
                crs: None,
                features: vec![],
            })
        }

        fn supported_extensions(&self) -> &[&str] {
            &self.extensions
        }

        fn format_name(&self) -> &str {
            self.name
        }
    }

    #[test]
    fn test_format_registration() {
        let mut registry = FormatRegistry::new();
        registry.register(Box::new(MockReader {
            extensions: vec!["json", "geojson"],
            name: "GeoJSON",
        }));

        assert_eq!(registry.readers().len(), 1);
        assert_eq!(registry.supported_formats(), vec!["json", "geojson"]);
    }

    #[test]
    fn test_format_detection() {
        let mut registry = FormatRegistry::new();
        registry.register(Box::new(MockReader {
            extensions: vec!["json", "geojson"],
            name: "GeoJSON",
        }));
        registry.register(Box::new(MockReader {
            extensions: vec!["shp"],
            name: "Shapefile",
        }));

        let reader = registry.detect_format(Path::new("routes.geojson")).unwrap();
        assert_eq!(reader.format_name(), "GeoJSON");

        // Extension match is case-insensitive
        let reader = registry.detect_format(Path::new("routes.SHP")).unwrap();
        assert_eq!(reader.format_name(), "Shapefile");
    }

    #[test]
    fn test_unsupported_format() {
        let registry = FormatRegistry::new();
        let result = registry.detect_format(Path::new("routes.xyz"));
        assert!(result.is_err());
    }

    #[test]
    fn test_default_registry_covers_vector_formats() {
        let registry = FormatRegistry::default();
        let formats = registry.supported_formats();
        assert!(formats.contains(&"geojson".to_string()));
        assert!(formats.contains(&"shp".to_string()));
        assert!(formats.contains(&"csv".to_string()));
    }

    #[test]
    fn test_format_validation_flags() {
        let validation = FormatValidation::default();
        assert!(validation.is_valid());
        assert!(!validation.has_warnings());

        let validation = FormatValidation {
            errors: vec!["Missing file".to_string()],
            warnings: vec!["No CRS specified".to_string()],
        };
        assert!(!validation.is_valid());
        assert!(validation.has_warnings());
    }
}
