//! Status command implementation

use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

use routeatlas_core::config::AtlasConfig;
use routeatlas_core::models::DatasetMeta;

use crate::cli::StorageBackend;
use crate::output::OutputWriter;
use crate::output_types::{ConfigEntry, DatasetInfo, StatusOutput};
use crate::storage::Storage;

#[derive(Tabled, Serialize)]
struct DatasetRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Geometry")]
    geometry: String,
    #[tabled(rename = "Features")]
    features: usize,
    #[tabled(rename = "CRS")]
    crs: String,
    #[tabled(rename = "Added")]
    added: String,
}

impl DatasetRow {
    fn from_meta(meta: &DatasetMeta) -> Self {
        Self {
            id: meta.id.0,
            name: meta.name.clone(),
            geometry: meta.geometry_type.as_str().to_string(),
            features: meta.feature_count,
            crs: format!("EPSG:{}", meta.crs),
            added: meta.added_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

#[derive(Tabled, Serialize)]
struct ConfigRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Source")]
    source: String,
}

pub async fn execute(
    backend: &StorageBackend,
    config_path: Option<&Path>,
    output: &OutputWriter,
) -> Result<()> {
    let config = super::load_config(config_path)?;
    let storage = Storage::connect(backend, config.database_url.value.as_deref()).await?;

    let datasets = storage.store.list_datasets().await?;
    let feature_count = storage.store.count_features(None).await?;

    if output.is_json() {
        output.result(StatusOutput {
            backend: storage.backend.to_string(),
            dataset_count: datasets.len(),
            feature_count,
            datasets: datasets
                .iter()
                .map(|meta| DatasetInfo {
                    id: meta.id.0,
                    name: meta.name.clone(),
                    geometry_type: meta.geometry_type,
                    feature_count: meta.feature_count,
                    crs: meta.crs,
                    added_at: meta.added_at,
                })
                .collect(),
            config: config_entries(&config),
        })?;
    } else {
        output.section("Storage");
        output.kv("Backend", storage.backend);
        output.kv("Datasets", datasets.len());
        output.kv("Features", feature_count);

        output.section("Datasets");
        let rows: Vec<DatasetRow> = datasets.iter().map(DatasetRow::from_meta).collect();
        output.table(rows);

        output.section("Configuration");
        let rows: Vec<ConfigRow> = config_entries(&config)
            .into_iter()
            .map(|entry| ConfigRow {
                key: entry.key,
                value: entry.value,
                source: entry.source,
            })
            .collect();
        output.table(rows);
    }

    Ok(())
}

/// Configuration values with their sources, sorted by key
fn config_entries(config: &AtlasConfig) -> Vec<ConfigEntry> {
    let mut entries: Vec<ConfigEntry> = config
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| ConfigEntry {
            key,
            value,
            source: source.as_str().to_string(),
        })
        .collect();
    entries.sort_by(|a, b| a.key.cmp(&b.key));
    entries
}
