//! HTTP routes and handlers
//!
//! Handlers map errors onto `(StatusCode, Json<ErrorResponse>)` so every
//! failure leaves the API as a JSON body with a stable shape.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderName, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use routeatlas_core::error::AtlasError;
use routeatlas_core::models::{
    Crs, Dataset, DatasetId, DatasetMeta, Feature, Geometry, GeometryType,
};
use routeatlas_geo::transform::normalize_features;
use routeatlas_geo::TileCoord;

use crate::state::AppState;
use crate::viewer;

/// Features inserted per storage round trip during ingest
const INGEST_BATCH_SIZE: usize = 1024;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<i64>,
    pub feature_count: usize,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DatasetInfo {
    pub id: i64,
    pub name: String,
    pub geometry_type: String,
    pub feature_count: usize,
    pub crs: u32,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct DatasetListResponse {
    pub datasets: Vec<DatasetInfo>,
    pub count: usize,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Viewer
        .route("/", get(handle_viewer))

        // Health
        .route("/health", get(health_check))

        // Datasets
        .route("/api/v1/datasets", get(handle_list_datasets))
        .route("/api/v1/ingest", post(handle_ingest))

        // Tiles
        .route("/tiles/{z}/{x}/{y}", get(handle_tile))

        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "routeatlas-api",
    }))
}

async fn handle_viewer(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(viewer::render_viewer(&state.style))
}

async fn handle_list_datasets(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let datasets = state.store.list_datasets().await.map_err(|e| {
        tracing::error!("Failed to list datasets: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to list datasets".to_string(),
                details: Some(e.to_string()),
            }),
        )
    })?;

    let datasets: Vec<DatasetInfo> = datasets.iter().map(dataset_meta_to_info).collect();
    let count = datasets.len();

    Ok(Json(DatasetListResponse { datasets, count }))
}

async fn handle_ingest(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    tracing::info!("Received ingest request");

    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Invalid multipart request".to_string(),
                details: Some(e.to_string()),
            }),
        )
    })? {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("upload.geojson").to_string();
            let bytes = field.bytes().await.map_err(|e| {
                (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse {
                        error: "Failed to read uploaded file".to_string(),
                        details: Some(e.to_string()),
                    }),
                )
            })?;
            upload = Some((filename, bytes.to_vec()));
        }
    }

    let (filename, bytes) = upload.ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "No 'file' field in upload".to_string(),
                details: None,
            }),
        )
    })?;

    // Strip client-supplied directory components before the name touches disk
    let filename = std::path::Path::new(&filename)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.geojson".to_string());

    tracing::info!(filename = %filename, bytes = bytes.len(), "Processing upload");

    // Format detection keys off the extension, so the upload has to land on
    // disk under its original name first
    let temp_dir = tempfile::tempdir().map_err(|e| {
        tracing::error!("Failed to create temp directory: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to stage upload".to_string(),
                details: Some(e.to_string()),
            }),
        )
    })?;
    let temp_path = temp_dir.path().join(&filename);
    std::fs::write(&temp_path, &bytes).map_err(|e| {
        tracing::error!("Failed to write upload to disk: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to stage upload".to_string(),
                details: Some(e.to_string()),
            }),
        )
    })?;

    let reader = state.formats.detect_format(&temp_path).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Unsupported file format".to_string(),
                details: Some(e.to_string()),
            }),
        )
    })?;

    let source = reader.read(&temp_path).await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("Failed to parse {}", filename),
                details: Some(e.to_string()),
            }),
        )
    })?;

    let file_crs = source.crs.unwrap_or(state.ingest_crs);
    let mut features = Vec::with_capacity(source.features.len());
    for record in &source.features {
        let Some(geometry) = record.geometry.as_ref().and_then(Geometry::from_geojson) else {
            continue;
        };
        let mut feature = Feature::new(geometry, file_crs);
        feature.properties = record.properties.clone();
        features.push(feature);
    }

    let skipped = source.features.len() - features.len();
    if skipped > 0 {
        tracing::warn!(skipped = skipped, "Upload contained records without usable geometry");
    }
    if features.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("No features with usable geometry in {}", filename),
                details: None,
            }),
        ));
    }

    let workspace_crs = Crs::wgs84();
    let features = normalize_features(features, &workspace_crs).map_err(|e| {
        tracing::error!("Reprojection failed: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Failed to reproject from EPSG:{}", file_crs),
                details: Some(e.to_string()),
            }),
        )
    })?;

    let name = dataset_name(&filename);
    let dataset = Dataset {
        id: DatasetId(0),
        name: name.clone(),
        source_path: temp_path.clone(),
        geometry_type: dataset_geometry_type(&features),
        feature_count: 0,
        crs: workspace_crs.epsg,
        format: source.format_metadata.clone(),
        added_at: Utc::now(),
    };

    let dataset_id = state.store.store_dataset(&dataset).await.map_err(|e| match e {
        AtlasError::DatasetExists { .. } => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: format!("Dataset '{}' already exists", name),
                details: Some(e.to_string()),
            }),
        ),
        _ => {
            tracing::error!("Failed to store dataset: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to store dataset".to_string(),
                    details: Some(e.to_string()),
                }),
            )
        }
    })?;

    let mut inserted = 0;
    for chunk in features.chunks(INGEST_BATCH_SIZE) {
        inserted += state.store.store_features(dataset_id, chunk).await.map_err(|e| {
            tracing::error!("Failed to store features: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to store features".to_string(),
                    details: Some(e.to_string()),
                }),
            )
        })?;
    }

    // Stored features changed, so every cached tile is stale
    if let Err(e) = state.cache.clear() {
        tracing::warn!("Failed to clear tile cache: {}", e);
    }

    tracing::info!(
        dataset_id = dataset_id.0,
        feature_count = inserted,
        "Ingested dataset"
    );

    Ok(Json(IngestResponse {
        success: true,
        dataset_id: Some(dataset_id.0),
        feature_count: inserted,
        message: format!("Ingested {} with {} features", name, inserted),
    }))
}

async fn handle_tile(
    State(state): State<Arc<AppState>>,
    Path((z, x, y)): Path<(u8, u32, u32)>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let tile = TileCoord::new(z, x, y);
    if !tile.is_valid() {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Tile {} is outside the tile grid", tile),
                details: None,
            }),
        ));
    }

    let (content, cached) = state
        .cache
        .get_or_build(&tile, &state.tiles)
        .await
        .map_err(|e| {
            tracing::error!(tile = %tile, "Failed to build tile: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to build tile".to_string(),
                    details: Some(e.to_string()),
                }),
            )
        })?;

    let headers = [
        (header::CONTENT_TYPE, "application/geo+json"),
        (header::CACHE_CONTROL, "public, max-age=60"),
        (
            HeaderName::from_static("x-cache"),
            if cached { "hit" } else { "miss" },
        ),
    ];
    Ok((headers, content.as_ref().clone()))
}

fn dataset_name(filename: &str) -> String {
    std::path::Path::new(filename)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string())
}

fn dataset_meta_to_info(meta: &DatasetMeta) -> DatasetInfo {
    DatasetInfo {
        id: meta.id.0,
        name: meta.name.clone(),
        geometry_type: meta.geometry_type.as_str().to_string(),
        feature_count: meta.feature_count,
        crs: meta.crs,
        added_at: meta.added_at,
    }
}

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
