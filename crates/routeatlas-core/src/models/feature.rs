//! Feature model: a geometry with attributes, tied to a CRS.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::geometry::Geometry;

/// Unique feature identifier, assigned by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct FeatureId(pub i64);

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single spatial feature: geometry plus attribute properties.
///
/// Features entering a store have already been normalized to the workspace
/// CRS; `crs` records which one that is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Store-assigned identifier, zero until stored
    pub id: FeatureId,
    pub geometry: Geometry,
    pub properties: HashMap<String, serde_json::Value>,
    /// EPSG code of the coordinates in `geometry`
    pub crs: u32,
}

impl Feature {
    pub fn new(geometry: Geometry, crs: u32) -> Self {
        Self {
            id: FeatureId(0),
            geometry,
            properties: HashMap::new(),
            crs,
        }
    }

    /// Builder-style property insertion
    pub fn with_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Property value rendered as a string, if present.
    ///
    /// Strings come back without quotes; numbers and booleans are formatted.
    pub fn property_str(&self, key: &str) -> Option<String> {
        match self.properties.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Numeric property value, if present and numeric
    pub fn property_f64(&self, key: &str) -> Option<f64> {
        self.properties.get(key)?.as_f64()
    }
}
