//! CRS transformation and normalization

use proj::Proj;

use crate::models::{Crs, Geometry};
use routeatlas_core::error::{AtlasError, Result};
use routeatlas_core::models::Feature;

/// Check if two CRS are the same
pub fn crs_match(crs1: &Crs, crs2: &Crs) -> bool {
    crs1.epsg == crs2.epsg
}

/// Detect CRS mismatch and return error if they don't match
pub fn check_crs_mismatch(dataset_crs: &Crs, workspace_crs: &Crs) -> Result<()> {
    if !crs_match(dataset_crs, workspace_crs) {
        return Err(AtlasError::CrsMismatch {
            dataset_crs: format!("EPSG:{} ({})", dataset_crs.epsg, dataset_crs.name),
            workspace_crs: format!("EPSG:{} ({})", workspace_crs.epsg, workspace_crs.name),
        });
    }
    Ok(())
}

/// Reproject a geometry from one CRS to another
pub fn reproject_geometry(geometry: &Geometry, from_crs: &Crs, to_crs: &Crs) -> Result<Geometry> {
    // If CRS are the same, no transformation needed
    if crs_match(from_crs, to_crs) {
        return Ok(geometry.clone());
    }

    let proj = build_projection(from_crs, to_crs)?;
    project_geometry(&proj, geometry, &epsg_def(from_crs), &epsg_def(to_crs))
}

/// Reproject a feature's geometry to the target CRS and retag it
pub fn normalize_feature(feature: Feature, target_crs: &Crs) -> Result<Feature> {
    let from_crs = Crs::from_epsg(feature.crs);
    let geometry = reproject_geometry(&feature.geometry, &from_crs, target_crs)?;
    Ok(Feature {
        geometry,
        crs: target_crs.epsg,
        ..feature
    })
}

/// Normalize a batch of features to the target CRS.
///
/// The projection object is reused while consecutive features share a
/// source CRS, which they do for any single-dataset batch.
pub fn normalize_features(features: Vec<Feature>, target_crs: &Crs) -> Result<Vec<Feature>> {
    tracing::debug!(
        count = features.len(),
        target_epsg = target_crs.epsg,
        "normalizing features"
    );

    let to_def = epsg_def(target_crs);
    let mut cached: Option<(u32, Proj)> = None;
    let mut normalized = Vec::with_capacity(features.len());

    for mut feature in features {
        if feature.crs != target_crs.epsg {
            if !matches!(&cached, Some((epsg, _)) if *epsg == feature.crs) {
                let from_crs = Crs::from_epsg(feature.crs);
                cached = Some((feature.crs, build_projection(&from_crs, target_crs)?));
            }
            if let Some((epsg, proj)) = &cached {
                let from_def = format!("EPSG:{}", epsg);
                feature.geometry =
                    project_geometry(proj, &feature.geometry, &from_def, &to_def)?;
                feature.crs = target_crs.epsg;
            }
        }
        normalized.push(feature);
    }

    Ok(normalized)
}

fn epsg_def(crs: &Crs) -> String {
    format!("EPSG:{}", crs.epsg)
}

fn build_projection(from_crs: &Crs, to_crs: &Crs) -> Result<Proj> {
    let from_def = epsg_def(from_crs);
    let to_def = epsg_def(to_crs);
    Proj::new_known_crs(&from_def, &to_def, None).map_err(|e| AtlasError::Projection {
        from: from_def,
        to: to_def,
        reason: e.to_string(),
    })
}

fn project_geometry(proj: &Proj, geometry: &Geometry, from: &str, to: &str) -> Result<Geometry> {
    Ok(match geometry {
        Geometry::Point { coordinates } => Geometry::Point {
            coordinates: project_coord(proj, *coordinates, from, to)?,
        },
        Geometry::LineString { coordinates } => Geometry::LineString {
            coordinates: project_ring(proj, coordinates, from, to)?,
        },
        Geometry::Polygon { coordinates } => Geometry::Polygon {
            coordinates: project_rings(proj, coordinates, from, to)?,
        },
        Geometry::MultiPoint { coordinates } => Geometry::MultiPoint {
            coordinates: project_ring(proj, coordinates, from, to)?,
        },
        Geometry::MultiLineString { coordinates } => Geometry::MultiLineString {
            coordinates: project_rings(proj, coordinates, from, to)?,
        },
        Geometry::MultiPolygon { coordinates } => Geometry::MultiPolygon {
            coordinates: coordinates
                .iter()
                .map(|polygon| project_rings(proj, polygon, from, to))
                .collect::<Result<Vec<_>>>()?,
        },
    })
}

fn project_coord(proj: &Proj, coord: [f64; 2], from: &str, to: &str) -> Result<[f64; 2]> {
    let (x, y) = proj
        .convert((coord[0], coord[1]))
        .map_err(|e| AtlasError::Projection {
            from: from.to_string(),
            to: to.to_string(),
            reason: e.to_string(),
        })?;
    Ok([x, y])
}

fn project_ring(proj: &Proj, coords: &[[f64; 2]], from: &str, to: &str) -> Result<Vec<[f64; 2]>> {
    coords
        .iter()
        .map(|c| project_coord(proj, *c, from, to))
        .collect()
}

fn project_rings(
    proj: &Proj,
    rings: &[Vec<[f64; 2]>],
    from: &str,
    to: &str,
) -> Result<Vec<Vec<[f64; 2]>>> {
    rings
        .iter()
        .map(|ring| project_ring(proj, ring, from, to))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Tests that exercise an actual PROJ transformation live in
    // tests/reprojection_test.rs; these cover the paths that never
    // reach libproj.

    #[test]
    fn test_crs_match() {
        assert!(crs_match(&Crs::wgs84(), &Crs::from_epsg(4326)));
        assert!(!crs_match(&Crs::wgs84(), &Crs::british_national_grid()));
    }

    #[test]
    fn test_identity_reprojection_is_a_clone() {
        let geometry = Geometry::point(-3.19, 55.95);
        let result =
            reproject_geometry(&geometry, &Crs::wgs84(), &Crs::from_epsg(4326)).unwrap();
        assert_eq!(result, geometry);
    }

    #[test]
    fn test_mismatch_error_names_both_systems() {
        let err =
            check_crs_mismatch(&Crs::british_national_grid(), &Crs::wgs84()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("EPSG:27700"));
        assert!(message.contains("EPSG:4326"));
    }

    #[test]
    fn test_features_already_in_target_pass_through() {
        let features = vec![
            Feature::new(Geometry::point(-3.19, 55.95), 4326),
            Feature::new(Geometry::point(-3.20, 55.94), 4326),
        ];
        let normalized = normalize_features(features.clone(), &Crs::wgs84()).unwrap();
        assert_eq!(normalized, features);
    }
}
