//! PostgreSQL/PostGIS storage adapter

pub mod config;
pub mod migrations;
pub mod spatial;

pub use config::{ConfigError, MigrationConfig, PoolConfig, PostgresConfig};
pub use migrations::{MigrationManager, MigrationStatus};

use routeatlas_core::error::AtlasError;
use routeatlas_core::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Wrap a database failure into a storage error with context
pub(crate) fn storage_error(action: &str, err: impl std::fmt::Display) -> AtlasError {
    AtlasError::Storage {
        message: format!("{}: {}", action, err),
    }
}

/// PostgreSQL storage adapter.
///
/// Geometries live in a PostGIS `GEOMETRY(Geometry, 4326)` column, so this
/// backend expects features already normalized to EPSG:4326. The ingest
/// pipeline guarantees that; `doctor` flags a workspace configured otherwise.
pub struct PostgresStore {
    pool: PgPool,
    config: PostgresConfig,
}

impl PostgresStore {
    /// Connect to the database and verify the connection with a probe query
    pub async fn new(config: PostgresConfig) -> Result<Self> {
        config.validate().map_err(|e| AtlasError::ConfigInvalid {
            key: "database_url".to_string(),
            reason: e.to_string(),
        })?;

        let pool = PgPoolOptions::new()
            .min_connections(config.pool.min_connections)
            .max_connections(config.pool.max_connections)
            .acquire_timeout(config.pool.acquire_timeout)
            .idle_timeout(config.pool.idle_timeout)
            .max_lifetime(config.pool.max_lifetime)
            .connect(&config.database_url)
            .await
            .map_err(|e| storage_error("Failed to connect to database", e))?;

        sqlx::query("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| storage_error("Connection test failed", e))?;

        tracing::debug!(
            max_connections = config.pool.max_connections,
            "connected to PostgreSQL"
        );

        Ok(Self { pool, config })
    }

    /// Connect and run any pending migrations
    pub async fn with_migrations(config: PostgresConfig) -> Result<Self> {
        let store = Self::new(config).await?;
        store.run_migrations().await?;
        Ok(store)
    }

    /// Connect, honoring the configured auto-run migration setting
    pub async fn connect(config: PostgresConfig) -> Result<Self> {
        if config.migrations.auto_run {
            Self::with_migrations(config).await
        } else {
            Self::new(config).await
        }
    }

    /// Apply pending schema migrations
    pub async fn run_migrations(&self) -> Result<()> {
        tracing::info!("running pending migrations");
        MigrationManager::new(self.pool.clone())
            .run_migrations()
            .await
            .map_err(|e| storage_error("Migration failed", e))
    }

    /// Status of each embedded migration
    pub async fn migration_status(&self) -> Result<Vec<MigrationStatus>> {
        MigrationManager::new(self.pool.clone())
            .check_status()
            .await
            .map_err(|e| storage_error("Failed to check migration status", e))
    }

    /// Whether any migration has not been applied yet
    pub async fn has_pending_migrations(&self) -> Result<bool> {
        MigrationManager::new(self.pool.clone())
            .has_pending_migrations()
            .await
            .map_err(|e| storage_error("Failed to check pending migrations", e))
    }

    /// Highest applied schema version, if any
    pub async fn current_version(&self) -> Result<Option<i64>> {
        MigrationManager::new(self.pool.clone())
            .current_version()
            .await
            .map_err(|e| storage_error("Failed to get schema version", e))
    }

    /// PostGIS extension version, when installed in the connected database
    pub async fn postgis_version(&self) -> Result<Option<String>> {
        sqlx::query_scalar("SELECT extversion FROM pg_extension WHERE extname = 'postgis'")
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to check PostGIS extension", e))
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &PostgresConfig {
        &self.config
    }
}
