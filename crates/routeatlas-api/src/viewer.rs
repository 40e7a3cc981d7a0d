//! Interactive viewer page served at the API root
//!
//! Unlike the static page the CLI renders, this one embeds no data. A
//! Leaflet grid layer fetches GeoJSON tiles from `/tiles/{z}/{x}/{y}` as
//! the map moves. Features are deduplicated by id on the client because
//! the tile buffer makes edge-crossing features appear in more than one
//! tile.

use routeatlas_render::LayerStyle;
use serde_json::{json, Value};

/// Render the viewer page with the layer style baked into its script.
pub fn render_viewer(style: &LayerStyle) -> String {
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

    TEMPLATE
        .replace("__CATEGORY__", &json!(style.category_property).to_string())
        .replace("__PALETTE__", &palette.to_string())
        .replace("__DEFAULT_COLOR__", &json!(style.default_color).to_string())
        .replace("__WEIGHT__", &style.line_weight.to_string())
        .replace("__OPACITY__", &style.line_opacity.to_string())
        .replace("__POPUP_FIELDS__", &popup_fields.to_string())
}

const TEMPLATE: &str = r##"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>RouteAtlas</title>
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
var map = L.map('map').setView([56.4907, -4.2026], 6);
var basemap = L.tileLayer('https://tile.openstreetmap.org/{z}/{x}/{y}.png', {
    maxZoom: 19,
    attribution: '&copy; OpenStreetMap contributors'
}).addTo(map);

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

var seen = {};
var routes = L.geoJSON(null, {
    style: function (feature) {
        return { color: colorFor(feature), weight: __WEIGHT__, opacity: __OPACITY__ };
    },
    onEachFeature: function (feature, layer) {
        layer.bindPopup(popupHtml(feature), { maxWidth: 300 });
    },
    filter: function (feature) {
        if (seen[feature.id]) { return false; }
        seen[feature.id] = true;
        return true;
    }
}).addTo(map);

var RouteTiles = L.GridLayer.extend({
    createTile: function (coords, done) {
        var tile = document.createElement('div');
        fetch('/tiles/' + coords.z + '/' + coords.x + '/' + coords.y)
            .then(function (response) {
                if (!response.ok) { return { type: 'FeatureCollection', features: [] }; }
                return response.json();
            })
            .then(function (collection) {
                routes.addData(collection);
                done(null, tile);
            })
            .catch(function (err) { done(err, tile); });
        return tile;
    }
});
new RouteTiles().addTo(map);

map.on('zoomstart', function () {
    seen = {};
    routes.clearLayers();
});

L.control.layers({ 'OpenStreetMap': basemap }, { 'Routes': routes }).addTo(map);
</script>
</body>
</html>
"##;
