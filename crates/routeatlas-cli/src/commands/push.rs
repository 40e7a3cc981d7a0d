//! Push command implementation
//!
//! Loads processed GeoJSON into the feature store in batches. A whole
//! directory can be loaded in one run; `--drop-existing` clears stored
//! data before the first file only.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;

use routeatlas_core::error::AtlasError;
use routeatlas_core::formats::FormatRegistry;
use routeatlas_core::models::{Crs, Dataset, DatasetId, Feature, Geometry, GeometryType};
use routeatlas_geo::transform::normalize_features;
use routeatlas_store::FeatureStore;

use crate::cli::{PushArgs, StorageBackend};
use crate::output::OutputWriter;
use crate::output_types::{PushFileResult, PushOutput};
use crate::progress::{create_progress_bar, finish_success};
use crate::storage::Storage;

pub async fn execute(
    args: PushArgs,
    backend: &StorageBackend,
    config_path: Option<&Path>,
    output: &OutputWriter,
) -> Result<()> {
    if args.input_file.is_some() && args.input_dir.is_some() {
        output.warning("Both --input-file and --input-dir provided. Using --input-file only.");
    }

    let config = super::load_config(config_path)?;

    let files: Vec<PathBuf> = if let Some(file) = &args.input_file {
        if !file.exists() {
            bail!("Input file not found: {}", file.display());
        }
        vec![file.clone()]
    } else if let Some(dir) = &args.input_dir {
        collect_matching_files(dir, &args.pattern)?
    } else {
        bail!("Either --input-file or --input-dir is required");
    };

    if args.name.is_some() && files.len() > 1 {
        output.warning("--name is ignored when loading multiple files");
    }

    let storage = Storage::connect(backend, config.database_url.value.as_deref()).await?;

    if args.drop_existing {
        storage.store.clear().await?;
        output.info("Cleared existing stored data");
    }

    let registry = FormatRegistry::default();
    let job = PushJob {
        registry: &registry,
        store: storage.store.as_ref(),
        workspace_crs: Crs::from_epsg(config.workspace_crs.value),
        batch_size: args.batch_size.unwrap_or(config.batch_size.value).max(1),
        force: args.force,
    };

    let mut results = Vec::new();
    for (index, path) in files.iter().enumerate() {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        output.info(format!(
            "Processing file {}/{}: {}",
            index + 1,
            files.len(),
            file_name
        ));

        let dataset_name = match (&args.name, files.len()) {
            (Some(name), 1) => name.clone(),
            _ => path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("unnamed")
                .to_string(),
        };

        match job.push_file(path, &dataset_name, output).await {
            Ok(records) => {
                results.push(PushFileResult {
                    file: file_name,
                    dataset: dataset_name,
                    records,
                });
            }
            Err(e) => {
                output.error(format!("Error processing {}: {:#}", path.display(), e));
            }
        }
    }

    if results.is_empty() {
        bail!("No files were loaded");
    }

    let total_records: usize = results.iter().map(|r| r.records).sum();
    if output.is_json() {
        output.result(PushOutput {
            total_files: results.len(),
            total_records,
            files: results,
        })?;
    } else {
        output.section("Summary");
        output.kv("Files loaded", results.len());
        output.kv("Records inserted", total_records);
    }

    Ok(())
}

/// Shared context for loading files into one store
struct PushJob<'a> {
    registry: &'a FormatRegistry,
    store: &'a dyn FeatureStore,
    workspace_crs: Crs,
    batch_size: usize,
    force: bool,
}

impl PushJob<'_> {
    async fn push_file(
        &self,
        path: &Path,
        dataset_name: &str,
        output: &OutputWriter,
    ) -> Result<usize> {
        let reader = self.registry.detect_format(path)?;
        let source = reader.read(path).await?;

        // Processed GeoJSON is WGS84 unless it declares otherwise
        let file_crs = source.crs.unwrap_or(4326);

        let mut features = Vec::with_capacity(source.features.len());
        for record in &source.features {
            let Some(geometry) = record.geometry.as_ref().and_then(Geometry::from_geojson) else {
                continue;
            };
            let mut feature = Feature::new(geometry, file_crs);
            feature.properties = record.properties.clone();
            features.push(feature);
        }

        if features.is_empty() {
            bail!("No features with usable geometry in {}", path.display());
        }

        let features = if file_crs == self.workspace_crs.epsg {
            features
        } else if self.force {
            output.warning(format!(
                "Reprojecting {} from EPSG:{} to EPSG:{}",
                path.display(),
                file_crs,
                self.workspace_crs.epsg
            ));
            normalize_features(features, &self.workspace_crs)?
        } else {
            return Err(AtlasError::CrsMismatch {
                dataset_crs: format!("EPSG:{}", file_crs),
                workspace_crs: format!("EPSG:{}", self.workspace_crs.epsg),
            })
            .context("Use --force to reproject while loading, or re-run `routeatlas process`");
        };

        let dataset = Dataset {
            id: DatasetId(0),
            name: dataset_name.to_string(),
            source_path: path.to_path_buf(),
            geometry_type: dataset_geometry_type(&features),
            feature_count: 0,
            crs: self.workspace_crs.epsg,
            format: source.format_metadata.clone(),
            added_at: Utc::now(),
        };
        let dataset_id = self.store.store_dataset(&dataset).await?;

        let progress = create_progress_bar(
            features.len() as u64,
            &format!("Inserting into {}", dataset_name),
            output.is_json(),
        );
        let mut inserted = 0usize;
        for chunk in features.chunks(self.batch_size) {
            inserted += self.store.store_features(dataset_id, chunk).await?;
            progress.inc(chunk.len() as u64);
        }
        finish_success(
            &progress,
            &format!("Inserted {} records into {}", inserted, dataset_name),
        );

        Ok(inserted)
    }
}

/// Find files in `dir` matching a glob pattern, in sorted order
fn collect_matching_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Input directory not found: {}", dir.display());
    }

    let full_pattern = dir.join(pattern);
    let mut files: Vec<PathBuf> = glob::glob(&full_pattern.to_string_lossy())
        .with_context(|| format!("Invalid file pattern: {}", pattern))?
        .filter_map(std::result::Result::ok)
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    if files.is_empty() {
        bail!(
            "No files matching pattern '{}' found in {}",
            pattern,
            dir.display()
        );
    }
    Ok(files)
}

/// Single geometry type when the features agree, otherwise Mixed
fn dataset_geometry_type(features: &[Feature]) -> GeometryType {
    let mut types = features.iter().map(|f| f.geometry.geometry_type());
    let Some(first) = types.next() else {
        return GeometryType::Mixed;
    };
    if types.all(|t| t == first) {
        first
    } else {
        GeometryType::Mixed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_dataset_geometry_type() {
        let lines = vec![
            Feature::new(Geometry::line_string(vec![[0.0, 0.0], [1.0, 1.0]]), 4326),
            Feature::new(Geometry::line_string(vec![[2.0, 2.0], [3.0, 3.0]]), 4326),
        ];
        assert_eq!(dataset_geometry_type(&lines), GeometryType::LineString);

        let mixed = vec![
            Feature::new(Geometry::point(0.0, 0.0), 4326),
            Feature::new(Geometry::line_string(vec![[0.0, 0.0], [1.0, 1.0]]), 4326),
        ];
        assert_eq!(dataset_geometry_type(&mixed), GeometryType::Mixed);
        assert_eq!(dataset_geometry_type(&[]), GeometryType::Mixed);
    }

    #[test]
    fn test_collect_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b_20250101.geojson"), "{}").unwrap();
        fs::write(dir.path().join("a_20250102.geojson"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = collect_matching_files(dir.path(), "*.geojson").unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a_20250102.geojson"));
        assert!(files[1].ends_with("b_20250101.geojson"));

        let err = collect_matching_files(dir.path(), "*.shp").unwrap_err();
        assert!(err.to_string().contains("No files matching"));
    }
}
