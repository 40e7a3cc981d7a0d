//! Port traits decoupling the pipeline from storage backends

use async_trait::async_trait;
use routeatlas_core::models::{Dataset, DatasetId, DatasetMeta, Feature};
use routeatlas_core::Result;

/// Attribute and envelope filter for feature queries.
///
/// Clauses are conjunctive; an empty query matches every stored feature.
#[derive(Debug, Clone, Default)]
pub struct FeatureQuery {
    /// Restrict to features of the named dataset
    pub dataset: Option<String>,
    /// Property equality clauses, compared on the text rendering of the
    /// stored value (the JSON `->>` convention)
    pub equals: Vec<(String, String)>,
    /// Bounding envelope `[min_x, min_y, max_x, max_y]` in the workspace CRS
    pub bbox: Option<[f64; 4]>,
    /// Maximum number of features to return
    pub limit: Option<usize>,
}

impl FeatureQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_dataset(mut self, name: impl Into<String>) -> Self {
        self.dataset = Some(name.into());
        self
    }

    pub fn with_equals(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.equals.push((key.into(), value.into()));
        self
    }

    pub fn with_bbox(mut self, bbox: [f64; 4]) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Storage port for datasets and their normalized features.
///
/// Implementations return features ordered by ascending feature id so that
/// limits and rendered output are deterministic across backends.
#[async_trait]
pub trait FeatureStore: Send + Sync {
    /// Register a dataset and return its assigned id.
    ///
    /// Fails with `AtlasError::DatasetExists` when a dataset with the same
    /// name is already stored.
    async fn store_dataset(&self, dataset: &Dataset) -> Result<DatasetId>;

    /// Fetch a dataset by name
    async fn get_dataset(&self, name: &str) -> Result<Option<Dataset>>;

    /// List metadata for every stored dataset, oldest first
    async fn list_datasets(&self) -> Result<Vec<DatasetMeta>>;

    /// Delete a dataset and all of its features.
    ///
    /// Fails with `AtlasError::DatasetNotFound` when no dataset has the name.
    async fn delete_dataset(&self, name: &str) -> Result<()>;

    /// Store a batch of features under a dataset and return how many were
    /// written. Callers chunk large inputs to the configured batch size.
    async fn store_features(&self, dataset: DatasetId, features: &[Feature]) -> Result<usize>;

    /// Count stored features, optionally restricted to one dataset
    async fn count_features(&self, dataset: Option<DatasetId>) -> Result<u64>;

    /// Run an attribute/envelope query
    async fn query(&self, filter: &FeatureQuery) -> Result<Vec<Feature>>;

    /// Features whose envelope intersects `bbox`, up to `limit`
    async fn features_in_bbox(
        &self,
        bbox: [f64; 4],
        limit: Option<usize>,
    ) -> Result<Vec<Feature>> {
        let mut filter = FeatureQuery::new().with_bbox(bbox);
        filter.limit = limit;
        self.query(&filter).await
    }

    /// Distinct non-null text values of a property across all features,
    /// sorted ascending
    async fn property_values(&self, key: &str) -> Result<Vec<String>>;

    /// Remove every dataset and feature
    async fn clear(&self) -> Result<()>;

    /// Verify the backend is reachable
    async fn health_check(&self) -> Result<()>;
}
