//! Raster zonal statistics
//!
//! Aggregates raster cell values inside a zone geometry. A cell counts
//! when its center lies inside the zone, nodata cells are skipped, and
//! the scan window is clipped to the rows and columns overlapping the
//! zone's bounding box so large rasters are not walked in full.

use routeatlas_core::models::{Geometry, RasterGrid, ZonalStatistics};

use crate::spatial;

/// Collect statistics for the raster cells inside `zone`.
///
/// Returns `None` when no cell with data falls inside the zone, so
/// callers never see NaN aggregates. The zone must be in the raster's
/// own CRS; reproject first if it is not.
pub fn zonal_statistics(grid: &RasterGrid, zone: &Geometry) -> Option<ZonalStatistics> {
    let zone_bbox = zone.bbox()?;
    let grid_bounds = grid.bounds();
    if !spatial::bbox_intersects(zone_bbox, grid_bounds) {
        return None;
    }

    // Rows count from the north edge, so the max y maps to the min row
    let y_top = grid_bounds[3];
    let col_min = clamp_index((zone_bbox[0] - grid.xllcorner) / grid.cellsize, grid.ncols);
    let col_max = clamp_index((zone_bbox[2] - grid.xllcorner) / grid.cellsize, grid.ncols);
    let row_min = clamp_index((y_top - zone_bbox[3]) / grid.cellsize, grid.nrows);
    let row_max = clamp_index((y_top - zone_bbox[1]) / grid.cellsize, grid.nrows);

    let mut values = Vec::new();
    for row in row_min..=row_max {
        for col in col_min..=col_max {
            let Some(value) = grid.value(row, col) else {
                continue;
            };
            if grid.is_nodata(value) {
                continue;
            }
            if spatial::contains_point(zone, grid.cell_center(row, col)) {
                values.push(value);
            }
        }
    }

    ZonalStatistics::from_values(&values)
}

fn clamp_index(raw: f64, len: usize) -> usize {
    let max_index = len.saturating_sub(1) as f64;
    raw.floor().clamp(0.0, max_index) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 4x4 grid, origin (0, 0), cellsize 10, values 1..=16 north to south
    fn grid_4x4() -> RasterGrid {
        RasterGrid::new(
            4,
            4,
            0.0,
            0.0,
            10.0,
            -9999.0,
            (1..=16).map(f64::from).collect(),
        )
        .unwrap()
    }

    fn square(min: f64, max: f64) -> Geometry {
        Geometry::polygon(vec![vec![
            [min, min],
            [max, min],
            [max, max],
            [min, max],
            [min, min],
        ]])
    }

    #[test]
    fn test_full_coverage() {
        let stats = zonal_statistics(&grid_4x4(), &square(0.0, 40.0)).unwrap();

        assert_eq!(stats.count, 16);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 16.0);
        assert_eq!(stats.sum, 136.0);
        assert_eq!(stats.mean, 8.5);
    }

    #[test]
    fn test_partial_zone_selects_by_cell_center() {
        // The north-west quarter covers cell centers at x in {5, 15} and
        // y in {25, 35}: values 1, 2, 5, 6
        let zone = Geometry::polygon(vec![vec![
            [0.0, 20.0],
            [20.0, 20.0],
            [20.0, 40.0],
            [0.0, 40.0],
            [0.0, 20.0],
        ]]);
        let stats = zonal_statistics(&grid_4x4(), &zone).unwrap();

        assert_eq!(stats.count, 4);
        assert_eq!(stats.sum, 14.0);
    }

    #[test]
    fn test_nodata_cells_are_skipped() {
        let grid = RasterGrid::new(
            2,
            2,
            0.0,
            0.0,
            10.0,
            -9999.0,
            vec![1.0, -9999.0, 3.0, -9999.0],
        )
        .unwrap();

        let stats = zonal_statistics(&grid, &square(0.0, 20.0)).unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.sum, 4.0);
    }

    #[test]
    fn test_disjoint_zone_is_none() {
        assert_eq!(zonal_statistics(&grid_4x4(), &square(100.0, 120.0)), None);
    }

    #[test]
    fn test_zone_of_only_nodata_is_none() {
        let grid = RasterGrid::new(1, 1, 0.0, 0.0, 10.0, -9999.0, vec![-9999.0]).unwrap();
        assert_eq!(zonal_statistics(&grid, &square(0.0, 10.0)), None);
    }
}
