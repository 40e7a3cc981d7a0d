//! Static Leaflet map document generation
//!
//! The page embeds the feature collection inline, so the file opens without
//! any backend. Only the Leaflet assets and the basemap come from the
//! network.

use std::path::Path;

use routeatlas_core::models::Feature;
use routeatlas_core::Result;
use serde_json::{json, Value};

use crate::style::LayerStyle;
use crate::tiles::feature_collection;

/// Map center used when the data has no extent (central Scotland)
pub const DEFAULT_CENTER: [f64; 2] = [56.4907, -4.2026];
pub const DEFAULT_ZOOM: u8 = 6;

/// Presentation options for a rendered map page
#[derive(Debug, Clone)]
pub struct MapOptions {
    pub title: String,
    /// Fallback center as `[lat, lon]`
    pub center: [f64; 2],
    pub zoom: u8,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            title: "RouteAtlas".to_string(),
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
        }
    }
}

impl MapOptions {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

/// A self-contained HTML map page with embedded GeoJSON
pub struct MapDocument {
    html: String,
}

impl MapDocument {
    /// Render features into a standalone Leaflet page.
    ///
    /// Output is deterministic for a given input: properties serialize in
    /// sorted key order and the palette is an ordered map.
    pub fn build(features: &[Feature], style: &LayerStyle, options: &MapOptions) -> Self {
        // A literal "</" would close the inline script block early
        let data = feature_collection(features).to_string().replace("</", "<\\/");

        let palette = Value::Object(
            style
                .palette
                .iter()
                .map(|(category, color)| (category.clone(), Value::String(color.clone())))
                .collect(),
        );
        let popup_fields = Value::Array(
            style
                .popup_fields
                .iter()
                .map(|(key, label)| json!([key, label]))
                .collect(),
        );

        let fit_bounds = match union_bounds(features) {
            Some([min_x, min_y, max_x, max_y]) => format!(
                "map.fitBounds([[{}, {}], [{}, {}]]);",
                min_y, min_x, max_y, max_x
            ),
            None => String::new(),
        };

        let html = TEMPLATE
            .replace("__TITLE__", &escape_html(&options.title))
            .replace("__CENTER_LAT__", &options.center[0].to_string())
            .replace("__CENTER_LON__", &options.center[1].to_string())
            .replace("__ZOOM__", &options.zoom.to_string())
            .replace("__DATA__", &data)
            .replace("__CATEGORY__", &json!(style.category_property).to_string())
            .replace("__PALETTE__", &palette.to_string())
            .replace("__DEFAULT_COLOR__", &json!(style.default_color).to_string())
            .replace("__WEIGHT__", &style.line_weight.to_string())
            .replace("__OPACITY__", &style.line_opacity.to_string())
            .replace("__POPUP_FIELDS__", &popup_fields.to_string())
            .replace("__FIT_BOUNDS__", &fit_bounds);

        Self { html }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// Write the page to disk, creating parent directories as needed
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, &self.html)?;
        Ok(())
    }
}

/// Union of the feature envelopes as `[min_x, min_y, max_x, max_y]`
fn union_bounds(features: &[Feature]) -> Option<[f64; 4]> {
    let mut bounds: Option<[f64; 4]> = None;
    for feature in features {
        let Some(b) = feature.geometry.bbox() else {
            continue;
        };
        bounds = Some(match bounds {
            Some([min_x, min_y, max_x, max_y]) => [
                min_x.min(b[0]),
                min_y.min(b[1]),
                max_x.max(b[2]),
                max_y.max(b[3]),
            ],
            None => b,
        });
    }
    bounds
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const TEMPLATE: &str = r##"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>__TITLE__</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>
html, body { margin: 0; height: 100%; }
#map { height: 100%; }
</style>
</head>
<body>
<div id="map"></div>
<script>
var map = L.map('map').setView([__CENTER_LAT__, __CENTER_LON__], __ZOOM__);
var basemap = L.tileLayer('https://tile.openstreetmap.org/{z}/{x}/{y}.png', {
    maxZoom: 19,
    attribution: '&copy; OpenStreetMap contributors'
}).addTo(map);

var data = __DATA__;
var categoryProperty = __CATEGORY__;
var palette = __PALETTE__;
var defaultColor = __DEFAULT_COLOR__;
var popupFields = __POPUP_FIELDS__;

function colorFor(feature) {
    var category = feature.properties ? feature.properties[categoryProperty] : null;
    return palette[category] || defaultColor;
}

function popupHtml(feature) {
    var rows = [];
    for (var i = 0; i < popupFields.length; i++) {
        var key = popupFields[i][0];
        var label = popupFields[i][1];
        var value = feature.properties && feature.properties[key] != null
            ? feature.properties[key]
            : 'N/A';
        rows.push('<b>' + label + ':</b> ' + value);
    }
    return rows.join('<br>');
}

var routes = L.geoJSON(data, {
    style: function (feature) {
        return { color: colorFor(feature), weight: __WEIGHT__, opacity: __OPACITY__ };
    },
    onEachFeature: function (feature, layer) {
        layer.bindPopup(popupHtml(feature), { maxWidth: 300 });
    }
}).addTo(map);

L.control.layers({ 'OpenStreetMap': basemap }, { 'Routes': routes }).addTo(map);
__FIT_BOUNDS__
</script>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use routeatlas_core::models::Geometry;
    use serde_json::json;

    fn segment(route_type: &str) -> Feature {
        Feature::new(
            Geometry::line_string(vec![[-3.2, 55.9], [-3.19, 55.91]]),
            4326,
        )
        .with_property("route_type", json!(route_type))
        .with_property("street", json!("Leith Walk"))
    }

    #[test]
    fn test_empty_map_uses_fallback_center() {
        let doc = MapDocument::build(&[], &LayerStyle::default(), &MapOptions::default());
        assert!(doc.html().contains("setView([56.4907, -4.2026], 6)"));
        assert!(!doc.html().contains("fitBounds"));
    }

    #[test]
    fn test_map_with_features_fits_bounds() {
        let doc = MapDocument::build(
            &[segment("Cycle Lane")],
            &LayerStyle::default(),
            &MapOptions::default(),
        );
        assert!(doc.html().contains("map.fitBounds([[55.9, -3.2], [55.91, -3.19]]);"));
        // Palette and data are embedded
        assert!(doc.html().contains("#00aa00"));
        assert!(doc.html().contains("Leith Walk"));
    }

    #[test]
    fn test_output_is_deterministic() {
        let features = [segment("Cycle Lane"), segment("Cycle Path")];
        let style = LayerStyle::default();
        let options = MapOptions::default();

        let first = MapDocument::build(&features, &style, &options);
        let second = MapDocument::build(&features, &style, &options);
        assert_eq!(first.html(), second.html());
    }

    #[test]
    fn test_embedded_data_cannot_close_script() {
        let feature = segment("Cycle Lane")
            .with_property("notes", json!("beware </script><script>alert(1)"));
        let doc = MapDocument::build(&[feature], &LayerStyle::default(), &MapOptions::default());
        assert!(doc.html().contains("beware <\\/script>"));
    }

    #[test]
    fn test_title_is_escaped() {
        let options = MapOptions::default().with_title("Routes <north & south>");
        let doc = MapDocument::build(&[], &LayerStyle::default(), &options);
        assert!(doc.html().contains("<title>Routes &lt;north &amp; south&gt;</title>"));
    }

    #[test]
    fn test_write_to_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maps/routes.html");

        let doc = MapDocument::build(&[], &LayerStyle::default(), &MapOptions::default());
        doc.write_to(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("<!DOCTYPE html>"));
    }
}
