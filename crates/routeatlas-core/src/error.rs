//! Error types for RouteAtlas

use std::path::PathBuf;
use thiserror::Error;

use crate::manifest::ManifestError;

#[derive(Debug, Error)]
pub enum AtlasError {
    // Dataset errors
    #[error("Dataset not found: {name}")]
    DatasetNotFound { name: String },

    #[error("Dataset already exists: {name}. Use --drop-existing to replace stored data")]
    DatasetExists { name: String },

    // CRS and geometry errors
    #[error("CRS mismatch: dataset has {dataset_crs}, workspace expects {workspace_crs}")]
    CrsMismatch {
        dataset_crs: String,
        workspace_crs: String,
    },

    #[error("Invalid geometry at feature {feature_id}: {reason}")]
    InvalidGeometry { feature_id: String, reason: String },

    #[error("Projection from {from} to {to} failed: {reason}")]
    Projection {
        from: String,
        to: String,
        reason: String,
    },

    #[error("OS grid precision must be 6, 8, or 10 figures, got {precision}")]
    GridPrecision { precision: usize },

    // Format errors
    #[error("Unsupported format '{extension}'. Supported: {supported}")]
    UnsupportedFormat {
        extension: String,
        supported: String,
    },

    #[error("{format} error: {message}")]
    FormatError { format: String, message: String },

    #[error("Invalid path {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    #[error("Invalid raster: {reason}")]
    InvalidRaster { reason: String },

    // Manifest errors
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // Storage errors
    #[error("Storage error: {message}")]
    Storage { message: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, AtlasError>;
