//! Spatial predicates over canonical geometries

use geo::algorithm::centroid::Centroid;
use geo::algorithm::contains::Contains;
use geo::algorithm::intersects::Intersects;
use geo::{Distance, Haversine, Point};

use crate::models::{Geometry, GeometryExt};

/// Check if two geometries intersect
pub fn intersects(a: &Geometry, b: &Geometry) -> bool {
    a.to_geo().intersects(&b.to_geo())
}

/// Check if `outer` completely contains `inner`
pub fn contains(outer: &Geometry, inner: &Geometry) -> bool {
    outer.to_geo().contains(&inner.to_geo())
}

/// Check if `inner` lies completely within `outer`
pub fn within(inner: &Geometry, outer: &Geometry) -> bool {
    contains(outer, inner)
}

/// Check if a zone geometry contains a bare coordinate
pub fn contains_point(zone: &Geometry, point: [f64; 2]) -> bool {
    zone.to_geo().contains(&Point::new(point[0], point[1]))
}

/// Check if two `[min_x, min_y, max_x, max_y]` boxes overlap
pub fn bbox_intersects(a: [f64; 4], b: [f64; 4]) -> bool {
    a[0] <= b[2] && a[2] >= b[0] && a[1] <= b[3] && a[3] >= b[1]
}

/// Haversine distance in meters between two geometries in WGS 84.
///
/// Points are measured directly; other geometries are measured between
/// centroids. Returns `None` when a centroid cannot be computed.
pub fn haversine_distance_m(a: &Geometry, b: &Geometry) -> Option<f64> {
    let geo_a = a.to_geo();
    let geo_b = b.to_geo();

    match (&geo_a, &geo_b) {
        (geo::Geometry::Point(p1), geo::Geometry::Point(p2)) => {
            Some(Haversine.distance(*p1, *p2))
        }
        _ => {
            let c1: Point = geo_a.centroid()?;
            let c2: Point = geo_b.centroid()?;
            Some(Haversine.distance(c1, c2))
        }
    }
}

/// Check if two geometries lie within `meters` of each other
pub fn dwithin(a: &Geometry, b: &Geometry, meters: f64) -> bool {
    haversine_distance_m(a, b).is_some_and(|d| d <= meters)
}
