//! Shapefile format reader implementation
//!
//! A shapefile is a set of sidecar files sharing one stem: `.shp` holds
//! geometry, `.shx` the index, `.dbf` the attribute table, and `.prj`
//! (optional) the projection. Without a `.prj` the dataset CRS is left
//! unset and the pipeline falls back to the configured ingest CRS.

use async_trait::async_trait;
use shapefile::dbase::FieldValue;
use shapefile::Shape;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{AtlasError, Result};
use crate::formats::validation::{pre_read_validation, FormatValidator};
use crate::formats::{FormatDataset, FormatFeature, FormatMetadata, FormatReader, FormatValidation};

/// Shapefile format reader
pub struct ShapefileFormatReader;

#[async_trait]
impl FormatReader for ShapefileFormatReader {
    async fn read(&self, path: &Path) -> Result<FormatDataset> {
        let validation = self.validate(path).await?;
        FormatValidator::validation_to_result(&validation, "Shapefile")?;

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unnamed")
            .to_string();

        let crs = extract_crs(path);
        let features = read_features(path)?;

        Ok(FormatDataset {
            name: name.clone(),
            format_metadata: FormatMetadata {
                layer_name: Some(name),
                ..FormatMetadata::named("Shapefile")
            },
            crs,
            features,
        })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["shp"]
    }

    fn format_name(&self) -> &str {
        "Shapefile"
    }

    async fn validate(&self, path: &Path) -> Result<FormatValidation> {
        let mut validation = pre_read_validation(path, &["shp"]);
        if !validation.is_valid() {
            return Ok(validation);
        }

        let components = FormatValidator::validate_component_files(path, &["shx", "dbf"], &["prj"]);
        validation = FormatValidator::merge_validations(vec![validation, components]);

        Ok(validation)
    }
}

/// Read the sidecar `.prj` file and extract an EPSG code, if any
fn extract_crs(path: &Path) -> Option<u32> {
    let prj_path = path.with_extension("prj");
    let wkt_text = fs::read_to_string(prj_path).ok()?;
    parse_epsg_from_wkt(&wkt_text)
}

/// Scan projection WKT for `AUTHORITY["EPSG","nnnn"]` declarations.
///
/// WKT1 nests an authority per node; the last one in the text belongs to
/// the outermost (whole-CRS) node, which is the code we want.
fn parse_epsg_from_wkt(wkt_text: &str) -> Option<u32> {
    let mut last_code = None;
    let mut rest = wkt_text;

    while let Some(pos) = rest.find("AUTHORITY[") {
        let tail = &rest[pos + "AUTHORITY[".len()..];
        if let Some(end) = tail.find(']') {
            let inner = &tail[..end];
            // Expect two quoted tokens: authority name and code
            let mut parts = inner.split(',').map(|p| p.trim().trim_matches('"'));
            if let (Some(authority), Some(code)) = (parts.next(), parts.next()) {
                if authority.eq_ignore_ascii_case("epsg") {
                    if let Ok(code) = code.parse::<u32>() {
                        last_code = Some(code);
                    }
                }
            }
            rest = &tail[end..];
        } else {
            break;
        }
    }

    last_code
}

/// Read all shapes and attribute records from the shapefile
fn read_features(path: &Path) -> Result<Vec<FormatFeature>> {
    let mut reader = shapefile::Reader::from_path(path).map_err(|e| AtlasError::FormatError {
        format: "Shapefile".to_string(),
        message: format!("Failed to open shapefile: {}", e),
    })?;

    let mut features = Vec::new();

    for (idx, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result.map_err(|e| AtlasError::FormatError {
            format: "Shapefile".to_string(),
            message: format!("Failed to read shape {}: {}", idx, e),
        })?;

        let geometry = convert_shape_to_geojson(&shape);

        let mut properties = HashMap::new();
        for (field_name, field_value) in record {
            if let Some(value) = convert_field_value(field_value) {
                properties.insert(field_name, value);
            }
        }

        features.push(FormatFeature {
            id: idx.to_string(),
            geometry,
            properties,
        });
    }

    Ok(features)
}

/// Convert a dBASE field value to JSON, dropping nulls
fn convert_field_value(value: FieldValue) -> Option<serde_json::Value> {
    match value {
        FieldValue::Character(Some(s)) => Some(serde_json::Value::String(s)),
        FieldValue::Numeric(Some(n)) => Some(serde_json::json!(n)),
        FieldValue::Logical(Some(b)) => Some(serde_json::Value::Bool(b)),
        FieldValue::Integer(i) => Some(serde_json::json!(i)),
        FieldValue::Float(Some(f)) => Some(serde_json::json!(f as f64)),
        FieldValue::Double(d) => Some(serde_json::json!(d)),
        FieldValue::Currency(c) => Some(serde_json::json!(c)),
        FieldValue::Date(Some(d)) => Some(serde_json::Value::String(format!(
            "{:04}-{:02}-{:02}",
            d.year(),
            d.month(),
            d.day()
        ))),
        FieldValue::Memo(s) => Some(serde_json::Value::String(s)),
        _ => None,
    }
}

/// Convert an ESRI shape to a GeoJSON geometry value.
///
/// M and Z variants are flattened to 2D, which is all the pipeline
/// carries through normalization and storage.
fn convert_shape_to_geojson(shape: &Shape) -> Option<serde_json::Value> {
    match shape {
        Shape::NullShape => None,
        Shape::Point(p) => Some(serde_json::json!({
            "type": "Point",
            "coordinates": [p.x, p.y]
        })),
        Shape::PointM(p) => Some(serde_json::json!({
            "type": "Point",
            "coordinates": [p.x, p.y]
        })),
        Shape::PointZ(p) => Some(serde_json::json!({
            "type": "Point",
            "coordinates": [p.x, p.y]
        })),
        Shape::Multipoint(mp) => Some(multipoint_json(
            mp.points().iter().map(|p| [p.x, p.y]).collect(),
        )),
        Shape::MultipointM(mp) => Some(multipoint_json(
            mp.points().iter().map(|p| [p.x, p.y]).collect(),
        )),
        Shape::MultipointZ(mp) => Some(multipoint_json(
            mp.points().iter().map(|p| [p.x, p.y]).collect(),
        )),
        Shape::Polyline(pl) => Some(polyline_json(
            pl.parts()
                .iter()
                .map(|part| part.iter().map(|p| [p.x, p.y]).collect())
                .collect(),
        )),
        Shape::PolylineM(pl) => Some(polyline_json(
            pl.parts()
                .iter()
                .map(|part| part.iter().map(|p| [p.x, p.y]).collect())
                .collect(),
        )),
        Shape::PolylineZ(pl) => Some(polyline_json(
            pl.parts()
                .iter()
                .map(|part| part.iter().map(|p| [p.x, p.y]).collect())
                .collect(),
        )),
        Shape::Polygon(pg) => Some(polygon_json(group_rings(pg.rings().iter().map(|ring| {
            (
                matches!(ring, shapefile::PolygonRing::Outer(_)),
                ring.points().iter().map(|p| [p.x, p.y]).collect(),
            )
        })))),
        Shape::PolygonM(pg) => Some(polygon_json(group_rings(pg.rings().iter().map(|ring| {
            (
                matches!(ring, shapefile::PolygonRing::Outer(_)),
                ring.points().iter().map(|p| [p.x, p.y]).collect(),
            )
        })))),
        Shape::PolygonZ(pg) => Some(polygon_json(group_rings(pg.rings().iter().map(|ring| {
            (
                matches!(ring, shapefile::PolygonRing::Outer(_)),
                ring.points().iter().map(|p| [p.x, p.y]).collect(),
            )
        })))),
        Shape::Multipatch(_) => None,
    }
}

fn multipoint_json(coords: Vec<[f64; 2]>) -> serde_json::Value {
    serde_json::json!({
        "type": "MultiPoint",
        "coordinates": coords
    })
}

/// One part becomes a LineString, several become a MultiLineString
fn polyline_json(parts: Vec<Vec<[f64; 2]>>) -> serde_json::Value {
    if parts.len() == 1 {
        serde_json::json!({
            "type": "LineString",
            "coordinates": parts[0]
        })
    } else {
        serde_json::json!({
            "type": "MultiLineString",
            "coordinates": parts
        })
    }
}

/// Group shapefile rings into polygons: each outer ring opens a new
/// polygon and inner rings become holes in the one before them.
fn group_rings(
    rings: impl Iterator<Item = (bool, Vec<[f64; 2]>)>,
) -> Vec<Vec<Vec<[f64; 2]>>> {
    let mut polygons: Vec<Vec<Vec<[f64; 2]>>> = Vec::new();

    for (is_outer, ring) in rings {
        if is_outer || polygons.is_empty() {
            polygons.push(vec![ring]);
        } else if let Some(current) = polygons.last_mut() {
            current.push(ring);
        }
    }

    polygons
}

fn polygon_json(polygons: Vec<Vec<Vec<[f64; 2]>>>) -> serde_json::Value {
    if polygons.len() == 1 {
        serde_json::json!({
            "type": "Polygon",
            "coordinates": polygons[0]
        })
    } else {
        serde_json::json!({
            "type": "MultiPolygon",
            "coordinates": polygons
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapefile::dbase::TableWriterBuilder;
    use shapefile::{Point, Polyline};

    const BNG_WKT: &str = r#"PROJCS["British_National_Grid",GEOGCS["GCS_OSGB_1936",DATUM["D_OSGB_1936",SPHEROID["Airy_1830",6377563.396,299.3249646,AUTHORITY["EPSG","7001"]],AUTHORITY["EPSG","6277"]],PRIMEM["Greenwich",0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["latitude_of_origin",49],PARAMETER["central_meridian",-2],PARAMETER["scale_factor",0.9996012717],PARAMETER["false_easting",400000],PARAMETER["false_northing",-100000],UNIT["Meter",1],AUTHORITY["EPSG","27700"]]"#;

    fn write_test_shapefile(dir: &Path, stem: &str) -> std::path::PathBuf {
        let shp_path = dir.join(format!("{}.shp", stem));

        let table = TableWriterBuilder::new()
            .add_character_field(shapefile::dbase::FieldName::try_from("street").unwrap(), 50);
        let mut writer = shapefile::Writer::from_path(&shp_path, table).unwrap();

        let line = Polyline::new(vec![
            Point::new(325940.0, 673060.0),
            Point::new(326010.0, 673115.0),
        ]);
        let mut record = shapefile::dbase::Record::default();
        record.insert(
            "street".to_string(),
            FieldValue::Character(Some("Princes Street".to_string())),
        );
        writer.write_shape_and_record(&line, &record).unwrap();
        drop(writer);

        shp_path
    }

    #[tokio::test]
    async fn test_read_shapefile_with_prj() {
        let temp_dir = tempfile::tempdir().unwrap();
        let shp_path = write_test_shapefile(temp_dir.path(), "network");
        fs::write(temp_dir.path().join("network.prj"), BNG_WKT).unwrap();

        let reader = ShapefileFormatReader;
        let result = reader.read(&shp_path).await.unwrap();

        assert_eq!(result.name, "network");
        assert_eq!(result.crs, Some(27700));
        assert_eq!(result.features.len(), 1);

        let feature = &result.features[0];
        assert_eq!(
            feature.properties["street"],
            serde_json::json!("Princes Street")
        );

        let geometry = feature.geometry.as_ref().unwrap();
        assert_eq!(geometry["type"], serde_json::json!("LineString"));
        assert_eq!(
            geometry["coordinates"],
            serde_json::json!([[325940.0, 673060.0], [326010.0, 673115.0]])
        );
    }

    #[tokio::test]
    async fn test_missing_prj_leaves_crs_unset() {
        let temp_dir = tempfile::tempdir().unwrap();
        let shp_path = write_test_shapefile(temp_dir.path(), "noprj");

        let reader = ShapefileFormatReader;
        let result = reader.read(&shp_path).await.unwrap();

        assert_eq!(result.crs, None);
    }

    #[tokio::test]
    async fn test_missing_components_fail_validation() {
        let temp_dir = tempfile::tempdir().unwrap();
        let shp_path = temp_dir.path().join("lonely.shp");
        fs::write(&shp_path, b"").unwrap();

        let reader = ShapefileFormatReader;
        let validation = reader.validate(&shp_path).await.unwrap();

        assert!(!validation.is_valid());
        assert!(validation.errors.iter().any(|e| e.contains("shx")));
        assert!(validation.errors.iter().any(|e| e.contains("dbf")));
    }

    #[test]
    fn test_parse_epsg_picks_outermost_authority() {
        assert_eq!(parse_epsg_from_wkt(BNG_WKT), Some(27700));
    }

    #[test]
    fn test_parse_epsg_without_authority() {
        assert_eq!(parse_epsg_from_wkt(r#"PROJCS["Unnamed"]"#), None);
    }

    #[test]
    fn test_polyline_with_multiple_parts() {
        let parts = vec![
            vec![[0.0, 0.0], [1.0, 1.0]],
            vec![[2.0, 2.0], [3.0, 3.0]],
        ];
        let value = polyline_json(parts);
        assert_eq!(value["type"], serde_json::json!("MultiLineString"));
    }

    #[test]
    fn test_ring_grouping_attaches_holes() {
        let rings = vec![
            (true, vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 0.0]]),
            (false, vec![[2.0, 2.0], [4.0, 2.0], [4.0, 4.0], [2.0, 2.0]]),
            (true, vec![[20.0, 20.0], [30.0, 20.0], [30.0, 30.0], [20.0, 20.0]]),
        ];
        let grouped = group_rings(rings.into_iter());

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].len(), 2);
        assert_eq!(grouped[1].len(), 1);
    }
}
