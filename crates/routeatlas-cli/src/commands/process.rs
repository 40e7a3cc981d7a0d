//! Process command implementation
//!
//! Reads a source vector file, measures route lengths in the projected
//! source CRS, attaches provenance properties, normalizes everything to
//! the workspace CRS, and writes a timestamped GeoJSON or CSV artifact.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Local;
use wkt::ToWkt;

use routeatlas_core::config::CliConfigOverrides;
use routeatlas_core::formats::FormatRegistry;
use routeatlas_core::models::{Crs, Feature, FeatureId, Geometry};
use routeatlas_geo::measure::projected_length_m;
use routeatlas_geo::models::to_geo_geometry;
use routeatlas_geo::osgrid::os_grid_reference;
use routeatlas_geo::transform::normalize_features;
use routeatlas_geo::GeometryExt;

use crate::cli::{ProcessArgs, ProcessFormat};
use crate::output::OutputWriter;
use crate::output_types::ProcessOutput;
use crate::progress::{create_progress_bar, finish_success};

const BRITISH_NATIONAL_GRID: u32 = 27700;
const GRID_REF_PRECISION: usize = 10;

pub async fn execute(
    args: ProcessArgs,
    config_path: Option<&Path>,
    output: &OutputWriter,
) -> Result<()> {
    if !args.input.exists() {
        bail!("Input file not found: {}", args.input.display());
    }

    let mut config = super::load_config(config_path)?;
    config.update_from_cli(CliConfigOverrides {
        output_dir: args.output_dir.clone(),
        ..Default::default()
    });

    let registry = FormatRegistry::default();
    let reader = registry.detect_format(&args.input)?;
    let dataset = reader.read(&args.input).await?;

    let source_crs = resolve_source_crs(args.source_crs, dataset.crs, config.ingest_crs.value);
    let workspace_crs = Crs::from_epsg(config.workspace_crs.value);
    let source_file = args
        .input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    let progress = create_progress_bar(
        dataset.features.len() as u64,
        "Processing features",
        output.is_json(),
    );

    let mut features = Vec::with_capacity(dataset.features.len());
    let mut skipped = 0usize;
    for (index, record) in dataset.features.into_iter().enumerate() {
        progress.inc(1);
        let Some(geometry) = record.geometry.as_ref().and_then(Geometry::from_geojson) else {
            skipped += 1;
            continue;
        };

        let mut feature = Feature::new(geometry, source_crs);
        feature.id = FeatureId(index as i64 + 1);
        feature.properties = record.properties;

        // Measured in the projected source CRS, before normalization
        feature.properties.insert(
            "route_length_m".to_string(),
            serde_json::json!(projected_length_m(&feature.geometry)),
        );
        feature
            .properties
            .insert("source_file".to_string(), serde_json::json!(source_file));

        if source_crs == BRITISH_NATIONAL_GRID {
            if let Some([easting, northing]) = feature.geometry.centroid_coords() {
                let grid_ref = os_grid_reference(easting, northing, GRID_REF_PRECISION)?;
                if !grid_ref.is_empty() {
                    feature
                        .properties
                        .insert("os_grid_ref".to_string(), serde_json::json!(grid_ref));
                }
            }
        }

        features.push(feature);
    }
    finish_success(&progress, &format!("Processed {} features", features.len()));

    if features.is_empty() {
        bail!(
            "No features with usable geometry found in {}",
            args.input.display()
        );
    }

    let features = normalize_features(features, &workspace_crs)?;

    let output_dir = &config.output_dir.value;
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let stem = args
        .input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("processed");
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let output_path = match args.format {
        ProcessFormat::Geojson => {
            let path = output_dir.join(format!("{}_{}.geojson", stem, timestamp));
            let collection = routeatlas_render::feature_collection(&features);
            fs::write(&path, serde_json::to_string_pretty(&collection)?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            path
        }
        ProcessFormat::Csv => {
            let path = output_dir.join(format!("{}_{}.csv", stem, timestamp));
            write_csv(&path, &features)?;
            path
        }
    };

    if output.is_json() {
        output.result(ProcessOutput {
            input: args.input.display().to_string(),
            output: output_path.display().to_string(),
            format: match args.format {
                ProcessFormat::Geojson => "geojson".to_string(),
                ProcessFormat::Csv => "csv".to_string(),
            },
            feature_count: features.len(),
            skipped,
            source_crs,
            workspace_crs: workspace_crs.epsg,
        })?;
    } else {
        output.success(format!("Processed {}", args.input.display()));
        output.section("Processing Summary");
        output.kv("Features", features.len());
        output.kv("Source CRS", format!("EPSG:{}", source_crs));
        output.kv("Workspace CRS", format!("EPSG:{}", workspace_crs.epsg));
        output.kv("Output", output_path.display());
        if skipped > 0 {
            output.warning(format!("{} features skipped (no usable geometry)", skipped));
        }
    }

    Ok(())
}

/// Source CRS precedence: CLI flag, then file metadata, then config
fn resolve_source_crs(cli_crs: Option<u32>, file_crs: Option<u32>, ingest_crs: u32) -> u32 {
    cli_crs.or(file_crs).unwrap_or(ingest_crs)
}

/// Write features as CSV with properties in sorted column order and a
/// trailing WKT geometry column
fn write_csv(path: &Path, features: &[Feature]) -> Result<()> {
    let mut columns: BTreeSet<String> = BTreeSet::new();
    for feature in features {
        columns.extend(feature.properties.keys().cloned());
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    let mut header: Vec<&str> = columns.iter().map(String::as_str).collect();
    header.push("geometry_wkt");
    writer.write_record(&header)?;

    for feature in features {
        let mut record: Vec<String> = columns
            .iter()
            .map(|column| feature.property_str(column).unwrap_or_default())
            .collect();
        record.push(to_geo_geometry(&feature.geometry).wkt_string());
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}
