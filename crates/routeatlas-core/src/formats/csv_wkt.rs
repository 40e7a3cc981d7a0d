//! CSV format reader implementation
//!
//! Reads tabular route data with geometries encoded as WKT in a dedicated
//! column (`geometry_wkt` by default). Remaining columns become feature
//! properties, with numeric-looking cells parsed into JSON numbers.
//!
//! CSV carries no CRS declaration, so the dataset CRS is left unset and
//! the pipeline falls back to the configured ingest CRS.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use crate::error::{AtlasError, Result};
use crate::formats::validation::pre_read_validation;
use crate::formats::{FormatDataset, FormatFeature, FormatMetadata, FormatReader, FormatValidation};

/// CSV format reader with WKT geometry support
pub struct CsvWktReader {
    geometry_column: String,
}

impl CsvWktReader {
    pub fn new() -> Self {
        Self {
            geometry_column: "geometry_wkt".to_string(),
        }
    }

    /// Use a different column name for the WKT geometry
    pub fn with_geometry_column(column: impl Into<String>) -> Self {
        Self {
            geometry_column: column.into(),
        }
    }
}

impl Default for CsvWktReader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FormatReader for CsvWktReader {
    async fn read(&self, path: &Path) -> Result<FormatDataset> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| AtlasError::FormatError {
            format: "CSV".to_string(),
            message: format!("Failed to open CSV: {}", e),
        })?;

        let headers = reader
            .headers()
            .map_err(|e| AtlasError::FormatError {
                format: "CSV".to_string(),
                message: format!("Failed to read header row: {}", e),
            })?
            .clone();

        let geometry_idx = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(&self.geometry_column))
            .ok_or_else(|| AtlasError::FormatError {
                format: "CSV".to_string(),
                message: format!("Missing geometry column '{}'", self.geometry_column),
            })?;

        let mut features = Vec::new();

        for (idx, record) in reader.records().enumerate() {
            // Header is row 1, so data rows start at 2
            let row = idx + 2;
            let record = record.map_err(|e| AtlasError::FormatError {
                format: "CSV".to_string(),
                message: format!("Failed to read row {}: {}", row, e),
            })?;

            let wkt_text = record.get(geometry_idx).unwrap_or("").trim();
            let geometry = if wkt_text.is_empty() {
                None
            } else {
                Some(parse_wkt_geometry(wkt_text).map_err(|reason| AtlasError::FormatError {
                    format: "CSV".to_string(),
                    message: format!("Row {}: {}", row, reason),
                })?)
            };

            let mut properties = HashMap::new();
            for (col, value) in record.iter().enumerate() {
                if col == geometry_idx {
                    continue;
                }
                let Some(name) = headers.get(col) else {
                    continue;
                };
                if value.is_empty() {
                    continue;
                }
                properties.insert(name.to_string(), sniff_value(value));
            }

            features.push(FormatFeature {
                id: idx.to_string(),
                geometry,
                properties,
            });
        }

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unnamed")
            .to_string();

        Ok(FormatDataset {
            name,
            format_metadata: FormatMetadata::named("CSV"),
            crs: None,
            features,
        })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["csv"]
    }

    fn format_name(&self) -> &str {
        "CSV"
    }

    async fn validate(&self, path: &Path) -> Result<FormatValidation> {
        let mut validation = pre_read_validation(path, &["csv"]);
        if !validation.is_valid() {
            return Ok(validation);
        }

        match csv::Reader::from_path(path) {
            Ok(mut reader) => match reader.headers() {
                Ok(headers) => {
                    let has_geometry = headers
                        .iter()
                        .any(|h| h.eq_ignore_ascii_case(&self.geometry_column));
                    if !has_geometry {
                        validation.errors.push(format!(
                            "Missing geometry column '{}'",
                            self.geometry_column
                        ));
                    }
                }
                Err(e) => {
                    validation
                        .errors
                        .push(format!("Failed to read header row: {}", e));
                }
            },
            Err(e) => {
                validation.errors.push(format!("Failed to open CSV: {}", e));
            }
        }

        Ok(validation)
    }
}

/// Parse a WKT string into a GeoJSON geometry value
fn parse_wkt_geometry(text: &str) -> std::result::Result<serde_json::Value, String> {
    let wkt = wkt::Wkt::<f64>::from_str(text).map_err(|e| format!("Invalid WKT: {}", e))?;

    let geometry = geo_types::Geometry::try_from(wkt)
        .map_err(|e| format!("Unsupported WKT geometry: {:?}", e))?;

    let value = geojson::Value::from(&geometry);
    serde_json::to_value(geojson::Geometry::new(value))
        .map_err(|e| format!("Failed to serialize geometry: {}", e))
}

/// Convert a CSV cell to a JSON value, preferring numbers where they parse
fn sniff_value(value: &str) -> serde_json::Value {
    if let Ok(i) = value.parse::<i64>() {
        return serde_json::Value::from(i);
    }
    if let Ok(f) = value.parse::<f64>() {
        if f.is_finite() {
            return serde_json::Value::from(f);
        }
    }
    serde_json::Value::String(value.to_string())
}
