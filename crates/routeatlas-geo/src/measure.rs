//! Route length measurement

use geo::{Euclidean, Length};

use crate::models::{Geometry, GeometryExt};

/// Planar length of a (Multi)LineString in meters.
///
/// Coordinates must be in a projected CRS with meter units, which holds
/// for British National Grid where route lengths are measured before
/// normalization. Non-line geometries have length zero.
pub fn projected_length_m(geometry: &Geometry) -> f64 {
    match geometry.to_geo() {
        geo::Geometry::LineString(ls) => Euclidean.length(&ls),
        geo::Geometry::MultiLineString(mls) => Euclidean.length(&mls),
        _ => 0.0,
    }
}
