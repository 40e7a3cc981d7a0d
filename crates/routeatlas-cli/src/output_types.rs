use chrono::{DateTime, Utc};
use routeatlas_core::models::GeometryType;
use serde::Serialize;

/// Output for the process command
#[derive(Debug, Serialize)]
pub struct ProcessOutput {
    pub input: String,
    pub output: String,
    pub format: String,
    pub feature_count: usize,
    pub skipped: usize,
    pub source_crs: u32,
    pub workspace_crs: u32,
}

/// Output for the push command
#[derive(Debug, Serialize)]
pub struct PushOutput {
    pub files: Vec<PushFileResult>,
    pub total_files: usize,
    pub total_records: usize,
}

#[derive(Debug, Serialize)]
pub struct PushFileResult {
    pub file: String,
    pub dataset: String,
    pub records: usize,
}

/// Output for the render command
#[derive(Debug, Serialize)]
pub struct RenderOutput {
    pub output: String,
    pub feature_count: usize,
}

/// Output for the zonal command
#[derive(Debug, Serialize)]
pub struct ZonalOutput {
    pub raster: String,
    pub zones: Vec<ZoneStatsInfo>,
}

#[derive(Debug, Serialize)]
pub struct ZoneStatsInfo {
    pub zone: String,
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub sum: f64,
}

/// Output for the status command
#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub backend: String,
    pub dataset_count: usize,
    pub feature_count: u64,
    pub datasets: Vec<DatasetInfo>,
    pub config: Vec<ConfigEntry>,
}

#[derive(Debug, Serialize)]
pub struct DatasetInfo {
    pub id: i64,
    pub name: String,
    pub geometry_type: GeometryType,
    pub feature_count: usize,
    pub crs: u32,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub source: String,
}

/// Output for manifest check
#[derive(Debug, Serialize)]
pub struct ManifestCheckOutput {
    pub path: String,
    pub packages: usize,
    pub findings: Vec<FindingInfo>,
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct FindingInfo {
    pub level: String,
    pub package: String,
    pub lines: Vec<usize>,
    pub message: String,
}

/// Output for manifest lock when writing to a file
#[derive(Debug, Serialize)]
pub struct ManifestLockOutput {
    pub path: String,
    pub output: String,
    pub packages: usize,
}
