//! Layer styling: category palette and popup configuration

use std::collections::BTreeMap;

use routeatlas_core::models::Feature;

/// How rendered features are colored and what their popups show.
///
/// Line color is keyed by the value of `category_property` through the
/// palette, falling back to `default_color` for unknown or missing values.
#[derive(Debug, Clone)]
pub struct LayerStyle {
    /// Property whose value selects the palette color
    pub category_property: String,
    /// Category value -> CSS color
    pub palette: BTreeMap<String, String>,
    /// Color for categories not in the palette
    pub default_color: String,
    pub line_weight: u32,
    pub line_opacity: f64,
    /// Popup rows as `(property key, display label)` pairs, in order
    pub popup_fields: Vec<(String, String)>,
}

impl Default for LayerStyle {
    fn default() -> Self {
        let palette = [
            ("Cycle Lane", "#00aa00"),
            ("Cycle Path", "#0066ff"),
            ("Mixed Use Path", "#aa00aa"),
            ("Shared Use Path", "#ff9900"),
        ]
        .into_iter()
        .map(|(category, color)| (category.to_string(), color.to_string()))
        .collect();

        let popup_fields = [
            ("route_id", "Route ID"),
            ("street", "Street"),
            ("locality", "Locality"),
            ("route_type", "Type"),
            ("surface", "Surface"),
            ("route_length_m", "Length (m)"),
        ]
        .into_iter()
        .map(|(key, label)| (key.to_string(), label.to_string()))
        .collect();

        Self {
            category_property: "route_type".to_string(),
            palette,
            default_color: "#3388ff".to_string(),
            line_weight: 4,
            line_opacity: 1.0,
            popup_fields,
        }
    }
}

impl LayerStyle {
    /// Style keyed by a different category property
    pub fn with_category_property(mut self, key: impl Into<String>) -> Self {
        self.category_property = key.into();
        self
    }

    /// Color for one feature, from the palette or the default
    pub fn color_for(&self, feature: &Feature) -> &str {
        feature
            .property_str(&self.category_property)
            .and_then(|value| self.palette.get(&value))
            .map(String::as_str)
            .unwrap_or(&self.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routeatlas_core::models::Geometry;
    use serde_json::json;

    fn segment(route_type: Option<&str>) -> Feature {
        let feature = Feature::new(
            Geometry::line_string(vec![[-3.2, 55.9], [-3.19, 55.91]]),
            4326,
        );
        match route_type {
            Some(value) => feature.with_property("route_type", json!(value)),
            None => feature,
        }
    }

    #[test]
    fn test_default_palette() {
        let style = LayerStyle::default();
        assert_eq!(style.palette.get("Cycle Lane").map(String::as_str), Some("#00aa00"));
        assert_eq!(style.palette.get("Cycle Path").map(String::as_str), Some("#0066ff"));
        assert_eq!(style.default_color, "#3388ff");
        assert_eq!(style.line_weight, 4);
    }

    #[test]
    fn test_color_for_known_category() {
        let style = LayerStyle::default();
        assert_eq!(style.color_for(&segment(Some("Shared Use Path"))), "#ff9900");
    }

    #[test]
    fn test_color_for_unknown_category_falls_back() {
        let style = LayerStyle::default();
        assert_eq!(style.color_for(&segment(Some("Towpath"))), "#3388ff");
        assert_eq!(style.color_for(&segment(None)), "#3388ff");
    }

    #[test]
    fn test_custom_category_property() {
        let style = LayerStyle::default().with_category_property("surface");
        let feature = segment(None).with_property("surface", json!("Cycle Lane"));
        // The surface value happens to name a palette entry
        assert_eq!(style.color_for(&feature), "#00aa00");
    }
}
