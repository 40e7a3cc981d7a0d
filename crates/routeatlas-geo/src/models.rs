//! Geometry models for routeatlas-geo.
//!
//! This module re-exports canonical types from `routeatlas-core` and
//! provides conversions into the `geo` crate types the algorithms here
//! operate on.

use geo::Geometry as GeoGeometry;

// Re-export canonical types from routeatlas-core
pub use routeatlas_core::models::{Crs, Geometry, GeometryType};

/// Convert a canonical Geometry to a geo::Geometry
pub fn to_geo_geometry(geom: &Geometry) -> GeoGeometry {
    match geom {
        Geometry::Point { coordinates } => {
            GeoGeometry::Point(geo::Point::new(coordinates[0], coordinates[1]))
        }
        Geometry::LineString { coordinates } => {
            GeoGeometry::LineString(ring_to_line_string(coordinates))
        }
        Geometry::Polygon { coordinates } => {
            GeoGeometry::Polygon(rings_to_polygon(coordinates))
        }
        Geometry::MultiPoint { coordinates } => {
            let points: Vec<geo::Point> = coordinates
                .iter()
                .map(|c| geo::Point::new(c[0], c[1]))
                .collect();
            GeoGeometry::MultiPoint(geo::MultiPoint::new(points))
        }
        Geometry::MultiLineString { coordinates } => {
            let lines: Vec<geo::LineString> =
                coordinates.iter().map(|l| ring_to_line_string(l)).collect();
            GeoGeometry::MultiLineString(geo::MultiLineString::new(lines))
        }
        Geometry::MultiPolygon { coordinates } => {
            let polygons: Vec<geo::Polygon> =
                coordinates.iter().map(|p| rings_to_polygon(p)).collect();
            GeoGeometry::MultiPolygon(geo::MultiPolygon::new(polygons))
        }
    }
}

fn ring_to_line_string(coords: &[[f64; 2]]) -> geo::LineString {
    geo::LineString::new(coords.iter().map(|c| geo::Coord { x: c[0], y: c[1] }).collect())
}

/// First ring is the exterior, the rest are holes
fn rings_to_polygon(rings: &[Vec<[f64; 2]>]) -> geo::Polygon {
    match rings.split_first() {
        Some((exterior, interiors)) => geo::Polygon::new(
            ring_to_line_string(exterior),
            interiors.iter().map(|r| ring_to_line_string(r)).collect(),
        ),
        None => geo::Polygon::new(geo::LineString::new(vec![]), vec![]),
    }
}

/// Extension trait for Geometry with geo-crate operations
pub trait GeometryExt {
    /// Convert to geo::Geometry
    fn to_geo(&self) -> GeoGeometry;

    /// Get the centroid as coordinates
    fn centroid_coords(&self) -> Option<[f64; 2]>;
}

impl GeometryExt for Geometry {
    fn to_geo(&self) -> GeoGeometry {
        to_geo_geometry(self)
    }

    fn centroid_coords(&self) -> Option<[f64; 2]> {
        use geo::algorithm::centroid::Centroid;
        let geo_geom = self.to_geo();
        geo_geom.centroid().map(|p| [p.x(), p.y()])
    }
}
