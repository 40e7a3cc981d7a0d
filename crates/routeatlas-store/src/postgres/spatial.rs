//! `FeatureStore` implementation on top of PostGIS
//!
//! Geometries cross the wire as GeoJSON text: inserts go through
//! `ST_GeomFromGeoJSON`, reads through `ST_AsGeoJSON`. Attribute filters use
//! the JSONB `->>` operator and envelope filters the `&&` operator against
//! `ST_MakeEnvelope`, both backed by the indexes from migration 0002.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use routeatlas_core::error::AtlasError;
use routeatlas_core::models::{
    Dataset, DatasetId, DatasetMeta, Feature, FeatureId, FormatMetadata, Geometry, GeometryType,
};
use routeatlas_core::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;

use super::{storage_error, PostgresStore};
use crate::ports::{FeatureQuery, FeatureStore};

/// SRID of the geometry column, pinned by migration 0002
const STORED_SRID: u32 = 4326;

fn feature_from_row(row: &PgRow) -> Result<Feature> {
    let id: i64 = row.get("id");
    let geometry_text: String = row.get("geometry");
    let geometry: Geometry = serde_json::from_str(&geometry_text)
        .map_err(|e| storage_error("Failed to parse stored geometry", e))?;

    let properties: serde_json::Value = row.get("properties");
    let properties = properties
        .as_object()
        .map(|obj| obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();

    Ok(Feature {
        id: FeatureId(id),
        geometry,
        properties,
        crs: STORED_SRID,
    })
}

fn dataset_from_row(row: &PgRow) -> Dataset {
    let geometry_type: String = row.get("geometry_type");
    let added_at: DateTime<Utc> = row.get("added_at");

    Dataset {
        id: DatasetId(row.get("id")),
        name: row.get("name"),
        source_path: std::path::PathBuf::from(row.get::<String, _>("source_path")),
        geometry_type: GeometryType::parse(&geometry_type).unwrap_or(GeometryType::Mixed),
        feature_count: row.get::<i64, _>("feature_count") as usize,
        crs: row.get::<i32, _>("crs") as u32,
        format: FormatMetadata {
            format_name: row.get("format_name"),
            format_version: row.get("format_version"),
            layer_name: row.get("layer_name"),
        },
        added_at,
    }
}

#[async_trait]
impl FeatureStore for PostgresStore {
    async fn store_dataset(&self, dataset: &Dataset) -> Result<DatasetId> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO datasets
                (name, source_path, format_name, format_version, layer_name,
                 geometry_type, feature_count, crs, added_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(&dataset.name)
        .bind(dataset.source_path.to_string_lossy().to_string())
        .bind(&dataset.format.format_name)
        .bind(&dataset.format.format_version)
        .bind(&dataset.format.layer_name)
        .bind(dataset.geometry_type.as_str())
        .bind(dataset.feature_count as i64)
        .bind(dataset.crs as i32)
        .bind(dataset.added_at)
        .fetch_one(self.pool())
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return AtlasError::DatasetExists {
                        name: dataset.name.clone(),
                    };
                }
            }
            storage_error("Failed to store dataset", e)
        })?;

        Ok(DatasetId(id))
    }

    async fn get_dataset(&self, name: &str) -> Result<Option<Dataset>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, source_path, format_name, format_version, layer_name,
                   geometry_type, feature_count, crs, added_at
            FROM datasets
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| storage_error("Failed to get dataset", e))?;

        Ok(row.as_ref().map(dataset_from_row))
    }

    async fn list_datasets(&self) -> Result<Vec<DatasetMeta>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, geometry_type, feature_count, crs, added_at
            FROM datasets
            ORDER BY id
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(|e| storage_error("Failed to list datasets", e))?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let geometry_type: String = row.get("geometry_type");
                DatasetMeta {
                    id: DatasetId(row.get("id")),
                    name: row.get("name"),
                    geometry_type: GeometryType::parse(&geometry_type)
                        .unwrap_or(GeometryType::Mixed),
                    feature_count: row.get::<i64, _>("feature_count") as usize,
                    crs: row.get::<i32, _>("crs") as u32,
                    added_at: row.get("added_at"),
                }
            })
            .collect())
    }

    async fn delete_dataset(&self, name: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM datasets WHERE name = $1")
            .bind(name)
            .execute(self.pool())
            .await
            .map_err(|e| storage_error("Failed to delete dataset", e))?;

        if result.rows_affected() == 0 {
            return Err(AtlasError::DatasetNotFound {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    async fn store_features(&self, dataset: DatasetId, features: &[Feature]) -> Result<usize> {
        if features.is_empty() {
            return Ok(0);
        }

        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| storage_error("Failed to begin transaction", e))?;

        for feature in features {
            let geometry_json = serde_json::to_string(&feature.geometry)
                .map_err(|e| storage_error("Failed to serialize geometry", e))?;
            let properties = serde_json::to_value(&feature.properties)
                .map_err(|e| storage_error("Failed to serialize properties", e))?;

            sqlx::query(
                r#"
                INSERT INTO features (dataset_id, geometry, properties)
                VALUES ($1, ST_SetSRID(ST_GeomFromGeoJSON($2), 4326), $3)
                "#,
            )
            .bind(dataset.0)
            .bind(geometry_json)
            .bind(properties)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db) = &e {
                    if db.is_foreign_key_violation() {
                        return AtlasError::DatasetNotFound {
                            name: format!("id {}", dataset),
                        };
                    }
                }
                storage_error("Failed to store feature", e)
            })?;
        }

        sqlx::query("UPDATE datasets SET feature_count = feature_count + $1 WHERE id = $2")
            .bind(features.len() as i64)
            .bind(dataset.0)
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_error("Failed to update feature count", e))?;

        tx.commit()
            .await
            .map_err(|e| storage_error("Failed to commit transaction", e))?;

        tracing::debug!(dataset = dataset.0, count = features.len(), "stored features");
        Ok(features.len())
    }

    async fn count_features(&self, dataset: Option<DatasetId>) -> Result<u64> {
        let count: i64 = match dataset {
            Some(id) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM features WHERE dataset_id = $1")
                    .bind(id.0)
                    .fetch_one(self.pool())
                    .await
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM features")
                    .fetch_one(self.pool())
                    .await
            }
        }
        .map_err(|e| storage_error("Failed to count features", e))?;

        Ok(count as u64)
    }

    async fn query(&self, filter: &FeatureQuery) -> Result<Vec<Feature>> {
        let mut sql =
            String::from("SELECT id, ST_AsGeoJSON(geometry) AS geometry, properties FROM features");

        // Placeholders are numbered in the same order the binds run below
        let mut clauses: Vec<String> = Vec::new();
        let mut n = 0usize;
        if filter.dataset.is_some() {
            n += 1;
            clauses.push(format!(
                "dataset_id = (SELECT id FROM datasets WHERE name = ${})",
                n
            ));
        }
        for _ in &filter.equals {
            clauses.push(format!("properties ->> ${} = ${}", n + 1, n + 2));
            n += 2;
        }
        if filter.bbox.is_some() {
            clauses.push(format!(
                "geometry && ST_MakeEnvelope(${}, ${}, ${}, ${}, 4326)",
                n + 1,
                n + 2,
                n + 3,
                n + 4
            ));
            n += 4;
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY id");
        if filter.limit.is_some() {
            n += 1;
            sql.push_str(&format!(" LIMIT ${}", n));
        }

        let mut query = sqlx::query(&sql);
        if let Some(name) = &filter.dataset {
            query = query.bind(name);
        }
        for (key, value) in &filter.equals {
            query = query.bind(key).bind(value);
        }
        if let Some([min_x, min_y, max_x, max_y]) = filter.bbox {
            query = query.bind(min_x).bind(min_y).bind(max_x).bind(max_y);
        }
        if let Some(limit) = filter.limit {
            query = query.bind(limit as i64);
        }

        let rows = query
            .fetch_all(self.pool())
            .await
            .map_err(|e| storage_error("Failed to execute feature query", e))?;

        rows.iter().map(feature_from_row).collect()
    }

    async fn property_values(&self, key: &str) -> Result<Vec<String>> {
        sqlx::query_scalar(
            r#"
            SELECT DISTINCT properties ->> $1 AS value
            FROM features
            WHERE properties ->> $1 IS NOT NULL
            ORDER BY value
            "#,
        )
        .bind(key)
        .fetch_all(self.pool())
        .await
        .map_err(|e| storage_error("Failed to list property values", e))
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("TRUNCATE features, datasets RESTART IDENTITY CASCADE")
            .execute(self.pool())
            .await
            .map_err(|e| storage_error("Failed to clear store", e))?;
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(self.pool())
            .await
            .map_err(|e| storage_error("Health check failed", e))?;
        Ok(())
    }
}
