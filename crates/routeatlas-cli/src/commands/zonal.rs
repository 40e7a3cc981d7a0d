//! Zonal statistics command implementation
//!
//! Reads an ESRI ASCII grid and a polygon zone file, reprojects zones
//! into the raster CRS when they differ, and reports per-zone raster
//! statistics.

use std::path::Path;

use anyhow::{bail, Result};
use serde::Serialize;
use tabled::Tabled;

use routeatlas_core::formats::ascii_grid::read_ascii_grid;
use routeatlas_core::formats::FormatRegistry;
use routeatlas_core::models::{Crs, Geometry};
use routeatlas_geo::transform::reproject_geometry;
use routeatlas_geo::zonal::zonal_statistics;

use crate::cli::ZonalArgs;
use crate::output::OutputWriter;
use crate::output_types::{ZonalOutput, ZoneStatsInfo};
use crate::progress::create_spinner;

#[derive(Tabled, Serialize)]
struct ZoneRow {
    #[tabled(rename = "Zone")]
    zone: String,
    #[tabled(rename = "Cells")]
    cells: usize,
    #[tabled(rename = "Min")]
    min: String,
    #[tabled(rename = "Max")]
    max: String,
    #[tabled(rename = "Mean")]
    mean: String,
    #[tabled(rename = "Sum")]
    sum: String,
}

pub async fn execute(
    args: ZonalArgs,
    config_path: Option<&Path>,
    output: &OutputWriter,
) -> Result<()> {
    if !args.raster.exists() {
        bail!("Raster file not found: {}", args.raster.display());
    }
    if !args.zones.exists() {
        bail!("Zones file not found: {}", args.zones.display());
    }

    let config = super::load_config(config_path)?;
    let raster_crs = Crs::from_epsg(args.raster_crs.unwrap_or(config.ingest_crs.value));

    let grid = read_ascii_grid(&args.raster)?;

    let registry = FormatRegistry::default();
    let reader = registry.detect_format(&args.zones)?;
    let zones = reader.read(&args.zones).await?;
    let zones_crs = Crs::from_epsg(zones.crs.unwrap_or(config.ingest_crs.value));

    let spinner = create_spinner("Computing zonal statistics...", output.is_json());
    let mut stats = Vec::new();
    let mut empty_zones = Vec::new();
    for (index, record) in zones.features.iter().enumerate() {
        let Some(geometry) = record.geometry.as_ref().and_then(Geometry::from_geojson) else {
            continue;
        };

        let label = zone_label(record, args.property.as_deref(), index);
        let geometry = if zones_crs.epsg == raster_crs.epsg {
            geometry
        } else {
            reproject_geometry(&geometry, &zones_crs, &raster_crs)?
        };

        match zonal_statistics(&grid, &geometry) {
            Some(zone_stats) => stats.push(ZoneStatsInfo {
                zone: label,
                count: zone_stats.count,
                min: zone_stats.min,
                max: zone_stats.max,
                mean: zone_stats.mean,
                sum: zone_stats.sum,
            }),
            None => empty_zones.push(label),
        }
    }
    spinner.finish_and_clear();

    for label in &empty_zones {
        output.warning(format!("Zone {}: no raster cells with data", label));
    }
    if stats.is_empty() {
        bail!("No zones intersected the raster");
    }

    if output.is_json() {
        output.result(ZonalOutput {
            raster: args.raster.display().to_string(),
            zones: stats,
        })?;
    } else {
        let rows: Vec<ZoneRow> = stats
            .iter()
            .map(|s| ZoneRow {
                zone: s.zone.clone(),
                cells: s.count,
                min: format!("{:.2}", s.min),
                max: format!("{:.2}", s.max),
                mean: format!("{:.2}", s.mean),
                sum: format!("{:.2}", s.sum),
            })
            .collect();
        output.table(rows);
    }

    Ok(())
}

/// Zone display label: the requested property, else the source feature id
fn zone_label(
    record: &routeatlas_core::formats::FormatFeature,
    property: Option<&str>,
    index: usize,
) -> String {
    if let Some(key) = property {
        if let Some(value) = record.properties.get(key) {
            return match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
        }
    }
    if record.id.is_empty() {
        (index + 1).to_string()
    } else {
        record.id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routeatlas_core::formats::FormatFeature;
    use std::collections::HashMap;

    fn zone_record(id: &str, name: Option<&str>) -> FormatFeature {
        let mut properties = HashMap::new();
        if let Some(name) = name {
            properties.insert("name".to_string(), serde_json::json!(name));
        }
        FormatFeature {
            id: id.to_string(),
            geometry: None,
            properties,
        }
    }

    #[test]
    fn test_zone_label_prefers_property() {
        let record = zone_record("7", Some("Leith"));
        assert_eq!(zone_label(&record, Some("name"), 0), "Leith");
        assert_eq!(zone_label(&record, Some("missing"), 0), "7");
        assert_eq!(zone_label(&record, None, 0), "7");
    }

    #[test]
    fn test_zone_label_falls_back_to_index() {
        let record = zone_record("", None);
        assert_eq!(zone_label(&record, None, 4), "5");
    }
}
