//! R-tree index over feature envelopes
//!
//! Backs the memory store's bbox queries. Only envelopes and feature ids
//! live in the tree; geometries stay with their owning store.

use rstar::{RTree, RTreeObject, AABB};

use routeatlas_core::models::Feature;

/// Feature id plus its bounding box, as stored in the tree
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedFeature {
    pub id: i64,
    envelope: AABB<[f64; 2]>,
}

impl IndexedFeature {
    pub fn new(id: i64, bbox: [f64; 4]) -> Self {
        Self {
            id,
            envelope: AABB::from_corners([bbox[0], bbox[1]], [bbox[2], bbox[3]]),
        }
    }

    /// Index entry for a feature, `None` when its geometry has no extent
    pub fn from_feature(feature: &Feature) -> Option<Self> {
        feature
            .geometry
            .bbox()
            .map(|bbox| Self::new(feature.id.0, bbox))
    }
}

impl RTreeObject for IndexedFeature {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Spatial index for envelope queries
#[derive(Debug)]
pub struct SpatialIndex {
    tree: RTree<IndexedFeature>,
}

impl SpatialIndex {
    /// Create a new empty spatial index
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Build an index from a batch of entries in one pass
    pub fn bulk_load(entries: Vec<IndexedFeature>) -> Self {
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Insert one entry
    pub fn insert(&mut self, entry: IndexedFeature) {
        self.tree.insert(entry);
    }

    /// Remove the entry for a feature id, reporting whether it was present
    pub fn remove(&mut self, id: i64) -> bool {
        let found = self.tree.iter().find(|entry| entry.id == id).cloned();
        match found {
            Some(entry) => self.tree.remove(&entry).is_some(),
            None => false,
        }
    }

    /// Ids of all features whose envelope intersects the query box
    pub fn query_bbox(&self, bbox: [f64; 4]) -> Vec<i64> {
        let envelope = AABB::from_corners([bbox[0], bbox[1]], [bbox[2], bbox[3]]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.tree = RTree::new();
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}
