//! Ordnance Survey National Grid references
//!
//! Converts British National Grid (EPSG:27700) eastings and northings
//! into lettered grid references, e.g. `NT 25940 73060` for a point in
//! central Edinburgh. Supported precisions are 6, 8, and 10 figures
//! (100 m, 10 m, and 1 m squares).

use routeatlas_core::error::{AtlasError, Result};

// The grid letter sequence skips I
const GRID_LETTERS: &[u8; 25] = b"ABCDEFGHJKLMNOPQRSTUVWXYZ";

/// Format an easting/northing pair as an OS grid reference.
///
/// Coordinates outside the lettered grid (0..700 km east, 0..1300 km
/// north) produce an empty string rather than an error, matching how
/// offshore or foreign points are handled downstream. An unsupported
/// precision is an error.
pub fn os_grid_reference(easting: f64, northing: f64, precision: usize) -> Result<String> {
    let digits_per_axis = match precision {
        6 => 3,
        8 => 4,
        10 => 5,
        _ => return Err(AtlasError::GridPrecision { precision }),
    };

    // 100km-grid indices select the letter pair
    let e100k = (easting / 100_000.0).floor();
    let n100k = (northing / 100_000.0).floor();
    if !(0.0..=6.0).contains(&e100k) || !(0.0..=12.0).contains(&n100k) {
        return Ok(String::new());
    }
    let e100k = e100k as i64;
    let n100k = n100k as i64;

    let l1 = (19 - n100k) - (19 - n100k) % 5 + (e100k + 10) / 5;
    let l2 = (19 - n100k) * 5 % 25 + e100k % 5;
    let first = GRID_LETTERS[l1 as usize] as char;
    let second = GRID_LETTERS[l2 as usize] as char;

    // Floor the remaining meters to the precision's cell size so a point
    // is always reported in the square it falls in, never rounded out
    let scale = 10f64.powi(5 - digits_per_axis as i32);
    let e_digits = ((easting % 100_000.0) / scale).floor() as u64;
    let n_digits = ((northing % 100_000.0) / scale).floor() as u64;

    let reference = if precision == 6 {
        format!("{}{}{:03}{:03}", first, second, e_digits, n_digits)
    } else {
        format!(
            "{}{} {:0width$} {:0width$}",
            first,
            second,
            e_digits,
            n_digits,
            width = digits_per_axis
        )
    };

    Ok(reference)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Easting/northing of a point on the Royal Mile, Edinburgh
    const EDINBURGH: (f64, f64) = (325940.0, 673060.0);

    #[test]
    fn test_edinburgh_at_all_precisions() {
        let (e, n) = EDINBURGH;

        assert_eq!(os_grid_reference(e, n, 6).unwrap(), "NT259730");
        assert_eq!(os_grid_reference(e, n, 8).unwrap(), "NT 2594 7306");
        assert_eq!(os_grid_reference(e, n, 10).unwrap(), "NT 25940 73060");
    }

    #[test]
    fn test_shetland_northings_above_one_million() {
        // Unst sits in the HP square, the top of the lettered grid
        let reference = os_grid_reference(440_000.0, 1_220_000.0, 10).unwrap();
        assert_eq!(reference, "HP 40000 20000");
    }

    #[test]
    fn test_out_of_range_is_empty() {
        assert_eq!(os_grid_reference(-1.0, 500_000.0, 10).unwrap(), "");
        assert_eq!(os_grid_reference(700_000.0, 500_000.0, 10).unwrap(), "");
        assert_eq!(os_grid_reference(300_000.0, 1_300_000.0, 10).unwrap(), "");
    }

    #[test]
    fn test_upper_edges_inside_range() {
        // Just inside the last 100km squares
        assert_ne!(os_grid_reference(699_999.0, 500_000.0, 10).unwrap(), "");
        assert_ne!(os_grid_reference(300_000.0, 1_299_999.0, 10).unwrap(), "");
    }

    #[test]
    fn test_unsupported_precision_is_an_error() {
        let err = os_grid_reference(325940.0, 673060.0, 7).unwrap_err();
        assert!(matches!(err, AtlasError::GridPrecision { precision: 7 }));
    }

    #[test]
    fn test_sub_cell_offsets_floor_not_round() {
        // 99m into a 100m cell must not round up into the next one
        let reference = os_grid_reference(325_999.0, 673_099.0, 6).unwrap();
        assert_eq!(reference, "NT259730");
    }
}
