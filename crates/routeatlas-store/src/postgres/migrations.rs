//! Schema migrations, embedded at compile time via `sqlx::migrate!`

use std::collections::HashSet;

use sqlx::PgPool;
use thiserror::Error;

/// Migration error types
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration failed: {0}")]
    Failed(#[from] sqlx::migrate::MigrateError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Status of one known migration
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    /// Version number of the migration
    pub version: i64,
    /// Description parsed from the migration file name
    pub description: String,
    /// Whether the migration has been applied
    pub applied: bool,
}

/// Runs and inspects the embedded migration set
pub struct MigrationManager {
    pool: PgPool,
}

impl MigrationManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply all pending migrations in version order
    pub async fn run_migrations(&self) -> Result<(), MigrationError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(MigrationError::Failed)?;
        Ok(())
    }

    /// Status of every embedded migration against the database.
    ///
    /// A database without the tracking table reports everything as pending.
    pub async fn check_status(&self) -> Result<Vec<MigrationStatus>, MigrationError> {
        let applied: HashSet<i64> =
            sqlx::query_scalar("SELECT version FROM _sqlx_migrations ORDER BY version")
                .fetch_all(&self.pool)
                .await
                .unwrap_or_default()
                .into_iter()
                .collect();

        Ok(sqlx::migrate!("./migrations")
            .iter()
            .map(|migration| MigrationStatus {
                version: migration.version,
                description: migration.description.to_string(),
                applied: applied.contains(&migration.version),
            })
            .collect())
    }

    /// Whether any embedded migration has not been applied yet
    pub async fn has_pending_migrations(&self) -> Result<bool, MigrationError> {
        let status = self.check_status().await?;
        Ok(status.iter().any(|s| !s.applied))
    }

    /// Highest applied migration version, if any
    pub async fn current_version(&self) -> Result<Option<i64>, MigrationError> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM _sqlx_migrations ORDER BY version DESC LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;
        Ok(version)
    }
}
