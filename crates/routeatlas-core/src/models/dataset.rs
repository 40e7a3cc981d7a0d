use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::geometry::GeometryType;

/// Unique identifier for a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetId(pub i64);

impl std::fmt::Display for DatasetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dataset metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMeta {
    /// Unique identifier
    pub id: DatasetId,

    /// Dataset name
    pub name: String,

    /// Geometry type
    pub geometry_type: GeometryType,

    /// Number of features
    pub feature_count: usize,

    /// CRS EPSG code the stored features are in
    pub crs: u32,

    /// When the dataset was added
    pub added_at: DateTime<Utc>,
}

/// Full dataset information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    /// Unique identifier
    pub id: DatasetId,

    /// Dataset name
    pub name: String,

    /// Path to the source file
    pub source_path: PathBuf,

    /// Geometry type
    pub geometry_type: GeometryType,

    /// Number of features
    pub feature_count: usize,

    /// CRS EPSG code the stored features are in
    pub crs: u32,

    /// Format-specific metadata
    pub format: FormatMetadata,

    /// When the dataset was added
    pub added_at: DateTime<Utc>,
}

impl Dataset {
    /// The metadata view of this dataset
    pub fn meta(&self) -> DatasetMeta {
        DatasetMeta {
            id: self.id,
            name: self.name.clone(),
            geometry_type: self.geometry_type,
            feature_count: self.feature_count,
            crs: self.crs,
            added_at: self.added_at,
        }
    }
}

/// Format-specific metadata for datasets
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormatMetadata {
    /// Format name (e.g., "GeoJSON", "Shapefile", "CSV")
    pub format_name: String,

    /// Optional format version
    pub format_version: Option<String>,

    /// Optional layer name (for multi-layer sources)
    pub layer_name: Option<String>,
}

impl FormatMetadata {
    pub fn named(format_name: impl Into<String>) -> Self {
        Self {
            format_name: format_name.into(),
            format_version: None,
            layer_name: None,
        }
    }
}
