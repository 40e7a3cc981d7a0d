//! In-memory storage adapter for development and tests
//!
//! These implementations call `RwLock::unwrap()` deliberately. A poisoned
//! lock means another thread panicked while holding it, which is not a state
//! worth recovering from here. Production workloads should use the
//! PostgreSQL backend.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use routeatlas_core::error::AtlasError;
use routeatlas_core::models::{Dataset, DatasetId, DatasetMeta, Feature, FeatureId};
use routeatlas_core::Result;
use routeatlas_geo::{IndexedFeature, SpatialIndex};

use crate::ports::{FeatureQuery, FeatureStore};

/// In-memory feature store backed by hash maps and an R-tree.
///
/// Cloning is cheap and clones share state, matching how the pooled
/// PostgreSQL adapter behaves.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    datasets: Arc<RwLock<HashMap<i64, Dataset>>>,
    /// Feature id -> (owning dataset id, feature)
    features: Arc<RwLock<HashMap<i64, (i64, Feature)>>>,
    index: Arc<RwLock<SpatialIndex>>,
    next_dataset_id: Arc<RwLock<i64>>,
    next_feature_id: Arc<RwLock<i64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn dataset_id_by_name(&self, name: &str) -> Option<i64> {
        let datasets = self.datasets.read().unwrap();
        datasets.values().find(|d| d.name == name).map(|d| d.id.0)
    }
}

fn matches_equals(feature: &Feature, equals: &[(String, String)]) -> bool {
    equals
        .iter()
        .all(|(key, value)| feature.property_str(key).as_deref() == Some(value.as_str()))
}

#[async_trait]
impl FeatureStore for MemoryStore {
    async fn store_dataset(&self, dataset: &Dataset) -> Result<DatasetId> {
        let mut datasets = self.datasets.write().unwrap();
        if datasets.values().any(|d| d.name == dataset.name) {
            return Err(AtlasError::DatasetExists {
                name: dataset.name.clone(),
            });
        }

        let mut next = self.next_dataset_id.write().unwrap();
        *next += 1;
        let id = DatasetId(*next);

        let mut stored = dataset.clone();
        stored.id = id;
        datasets.insert(id.0, stored);
        Ok(id)
    }

    async fn get_dataset(&self, name: &str) -> Result<Option<Dataset>> {
        let datasets = self.datasets.read().unwrap();
        Ok(datasets.values().find(|d| d.name == name).cloned())
    }

    async fn list_datasets(&self) -> Result<Vec<DatasetMeta>> {
        let datasets = self.datasets.read().unwrap();
        let mut metas: Vec<DatasetMeta> = datasets.values().map(Dataset::meta).collect();
        metas.sort_by_key(|m| m.id.0);
        Ok(metas)
    }

    async fn delete_dataset(&self, name: &str) -> Result<()> {
        let id = self
            .dataset_id_by_name(name)
            .ok_or_else(|| AtlasError::DatasetNotFound {
                name: name.to_string(),
            })?;

        self.datasets.write().unwrap().remove(&id);

        let mut features = self.features.write().unwrap();
        let mut index = self.index.write().unwrap();
        let owned: Vec<i64> = features
            .iter()
            .filter(|(_, (dataset, _))| *dataset == id)
            .map(|(feature_id, _)| *feature_id)
            .collect();
        for feature_id in owned {
            features.remove(&feature_id);
            index.remove(feature_id);
        }
        Ok(())
    }

    async fn store_features(&self, dataset: DatasetId, features: &[Feature]) -> Result<usize> {
        {
            let datasets = self.datasets.read().unwrap();
            if !datasets.contains_key(&dataset.0) {
                return Err(AtlasError::DatasetNotFound {
                    name: format!("id {}", dataset),
                });
            }
        }

        let mut stored = self.features.write().unwrap();
        let mut index = self.index.write().unwrap();
        let mut next = self.next_feature_id.write().unwrap();
        for feature in features {
            *next += 1;
            let mut feature = feature.clone();
            feature.id = FeatureId(*next);
            if let Some(entry) = IndexedFeature::from_feature(&feature) {
                index.insert(entry);
            }
            stored.insert(*next, (dataset.0, feature));
        }
        drop(stored);
        drop(index);
        drop(next);

        let mut datasets = self.datasets.write().unwrap();
        if let Some(entry) = datasets.get_mut(&dataset.0) {
            entry.feature_count += features.len();
        }
        Ok(features.len())
    }

    async fn count_features(&self, dataset: Option<DatasetId>) -> Result<u64> {
        let features = self.features.read().unwrap();
        let count = match dataset {
            Some(id) => features.values().filter(|(owner, _)| *owner == id.0).count(),
            None => features.len(),
        };
        Ok(count as u64)
    }

    async fn query(&self, filter: &FeatureQuery) -> Result<Vec<Feature>> {
        let dataset_id = match &filter.dataset {
            Some(name) => match self.dataset_id_by_name(name) {
                Some(id) => Some(id),
                // No such dataset, so nothing can match
                None => return Ok(Vec::new()),
            },
            None => None,
        };

        let features = self.features.read().unwrap();

        // Envelope prefilter through the R-tree when a bbox is given. The
        // R-tree compares envelopes, matching what PostGIS `&&` does.
        let candidates: Vec<i64> = match filter.bbox {
            Some(bbox) => self.index.read().unwrap().query_bbox(bbox),
            None => features.keys().copied().collect(),
        };

        let mut matched: Vec<Feature> = Vec::new();
        for feature_id in candidates {
            let Some((owner, feature)) = features.get(&feature_id) else {
                continue;
            };
            if let Some(id) = dataset_id {
                if *owner != id {
                    continue;
                }
            }
            if !matches_equals(feature, &filter.equals) {
                continue;
            }
            matched.push(feature.clone());
        }

        matched.sort_by_key(|f| f.id.0);
        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn property_values(&self, key: &str) -> Result<Vec<String>> {
        let features = self.features.read().unwrap();
        let mut values = BTreeSet::new();
        for (_, feature) in features.values() {
            if let Some(value) = feature.property_str(key) {
                values.insert(value);
            }
        }
        Ok(values.into_iter().collect())
    }

    async fn clear(&self) -> Result<()> {
        self.datasets.write().unwrap().clear();
        self.features.write().unwrap().clear();
        self.index.write().unwrap().clear();
        *self.next_dataset_id.write().unwrap() = 0;
        *self.next_feature_id.write().unwrap() = 0;
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
