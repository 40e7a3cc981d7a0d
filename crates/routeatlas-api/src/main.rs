use std::env;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use routeatlas_render::TileCache;
use routeatlas_store::memory::MemoryStore;
use routeatlas_store::ports::FeatureStore;
use routeatlas_store::postgres::{PostgresConfig, PostgresStore};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use routeatlas_api::routes::create_router;
use routeatlas_api::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "routeatlas_api=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port: u16 = env::var("ROUTEATLAS_PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(3001);

    let tile_dir =
        env::var("ROUTEATLAS_TILE_CACHE_DIR").unwrap_or_else(|_| ".routeatlas/tiles".to_string());

    let ingest_crs: u32 =
        env::var("ROUTEATLAS_INGEST_CRS").ok().and_then(|v| v.parse().ok()).unwrap_or(27700);

    tracing::info!(
        port = port,
        tile_dir = %tile_dir,
        ingest_crs = ingest_crs,
        "Starting RouteAtlas API server"
    );

    // Storage backend follows the DATABASE_URL environment variable
    let store: Arc<dyn FeatureStore> = match env::var("DATABASE_URL") {
        Ok(database_url) => {
            tracing::info!("DATABASE_URL found, connecting to PostgreSQL...");
            match init_postgres_storage(&database_url).await {
                Ok(store) => {
                    tracing::info!("Connected to PostgreSQL");
                    store
                }
                Err(e) => {
                    tracing::error!("Failed to connect to PostgreSQL: {}", e);
                    tracing::error!(
                        "Remediation:\n\
                        1. Ensure PostgreSQL is running\n\
                        2. Verify DATABASE_URL is correct\n\
                        3. Check that the database exists and the postgis extension can be installed"
                    );
                    std::process::exit(1);
                }
            }
        }
        Err(_) => {
            tracing::info!("Using in-memory storage (set DATABASE_URL for PostgreSQL)");
            Arc::new(MemoryStore::new())
        }
    };

    let cache = match TileCache::with_disk_tier(&tile_dir) {
        Ok(cache) => cache,
        Err(e) => {
            tracing::warn!("Tile directory {} unavailable ({}), caching in memory only", tile_dir, e);
            TileCache::new()
        }
    };

    let state = Arc::new(AppState::new(store, cache, ingest_crs));

    let cors_origin =
        env::var("ROUTEATLAS_CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let cors = CorsLayer::new()
        .allow_origin(cors_origin.parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let app = create_router(state).layer(TraceLayer::new_for_http()).layer(cors);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();

    tracing::info!("Listening on {}", addr);
    tracing::info!("CORS enabled for {}", cors_origin);

    axum::serve(listener, app).await.unwrap();
}

/// Initialize PostgreSQL storage from a database URL
async fn init_postgres_storage(database_url: &str) -> Result<Arc<PostgresStore>, String> {
    let config = PostgresConfig::new(database_url.to_string())
        .map_err(|e| format!("Invalid DATABASE_URL: {}", e))?;

    PostgresStore::with_migrations(config)
        .await
        .map(Arc::new)
        .map_err(|e| format!("Connection failed: {}", e))
}
