//! Raster grid model and zonal statistics.
//!
//! A [`RasterGrid`] is a regular grid of cell values anchored to world
//! coordinates by its lower-left corner and cell size, the way ESRI ASCII
//! grids describe themselves. Values are stored row-major with row 0 at the
//! top, matching file order.

use serde::{Deserialize, Serialize};

use crate::error::{AtlasError, Result};

/// A single-band raster grid with affine placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterGrid {
    /// Number of columns
    pub ncols: usize,

    /// Number of rows
    pub nrows: usize,

    /// X coordinate of the lower-left corner
    pub xllcorner: f64,

    /// Y coordinate of the lower-left corner
    pub yllcorner: f64,

    /// Cell edge length in CRS units
    pub cellsize: f64,

    /// Sentinel value marking cells with no data
    pub nodata: f64,

    /// Cell values, row-major, northernmost row first
    data: Vec<f64>,
}

impl RasterGrid {
    /// Build a grid, validating that `data` holds exactly `ncols * nrows`
    /// values and that `cellsize` is positive.
    pub fn new(
        ncols: usize,
        nrows: usize,
        xllcorner: f64,
        yllcorner: f64,
        cellsize: f64,
        nodata: f64,
        data: Vec<f64>,
    ) -> Result<Self> {
        if cellsize <= 0.0 {
            return Err(AtlasError::InvalidRaster {
                reason: format!("cellsize must be positive, got {}", cellsize),
            });
        }
        if data.len() != ncols * nrows {
            return Err(AtlasError::InvalidRaster {
                reason: format!(
                    "expected {} values for {}x{} grid, got {}",
                    ncols * nrows,
                    ncols,
                    nrows,
                    data.len()
                ),
            });
        }
        Ok(Self {
            ncols,
            nrows,
            xllcorner,
            yllcorner,
            cellsize,
            nodata,
            data,
        })
    }

    /// Cell value at (row, col), row 0 being the northernmost row
    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.nrows || col >= self.ncols {
            return None;
        }
        Some(self.data[row * self.ncols + col])
    }

    /// Whether a value is this grid's nodata sentinel
    pub fn is_nodata(&self, value: f64) -> bool {
        value == self.nodata
    }

    /// World coordinates of a cell's center
    pub fn cell_center(&self, row: usize, col: usize) -> [f64; 2] {
        let x = self.xllcorner + (col as f64 + 0.5) * self.cellsize;
        let y_top = self.yllcorner + self.nrows as f64 * self.cellsize;
        let y = y_top - (row as f64 + 0.5) * self.cellsize;
        [x, y]
    }

    /// Grid extent as `[min_x, min_y, max_x, max_y]`
    pub fn bounds(&self) -> [f64; 4] {
        [
            self.xllcorner,
            self.yllcorner,
            self.xllcorner + self.ncols as f64 * self.cellsize,
            self.yllcorner + self.nrows as f64 * self.cellsize,
        ]
    }

    /// All cell values in storage order
    pub fn values(&self) -> &[f64] {
        &self.data
    }
}

/// Summary statistics over the raster cells inside a zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZonalStatistics {
    /// Number of cells with data inside the zone
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub mean: f64,
}

impl ZonalStatistics {
    /// Aggregate a set of cell values. Returns `None` for an empty set so
    /// callers never see NaN statistics.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for &v in values {
            min = min.min(v);
            max = max.max(v);
            sum += v;
        }
        Some(Self {
            count: values.len(),
            min,
            max,
            sum,
            mean: sum / values.len() as f64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_3x2() -> RasterGrid {
        // 3 columns, 2 rows, origin (100, 200), cellsize 10
        RasterGrid::new(
            3,
            2,
            100.0,
            200.0,
            10.0,
            -9999.0,
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        )
        .unwrap()
    }

    #[test]
    fn test_value_lookup() {
        let grid = grid_3x2();
        assert_eq!(grid.value(0, 0), Some(1.0));
        assert_eq!(grid.value(1, 2), Some(6.0));
        assert_eq!(grid.value(2, 0), None);
    }

    #[test]
    fn test_cell_center_top_row_is_north() {
        let grid = grid_3x2();
        // Top of the grid is yll + nrows * cellsize = 220
        assert_eq!(grid.cell_center(0, 0), [105.0, 215.0]);
        assert_eq!(grid.cell_center(1, 2), [125.0, 205.0]);
    }

    #[test]
    fn test_bounds() {
        assert_eq!(grid_3x2().bounds(), [100.0, 200.0, 130.0, 220.0]);
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let result = RasterGrid::new(3, 2, 0.0, 0.0, 10.0, -9999.0, vec![1.0, 2.0]);
        assert!(matches!(result, Err(AtlasError::InvalidRaster { .. })));
    }

    #[test]
    fn test_zonal_statistics_empty_is_none() {
        assert_eq!(ZonalStatistics::from_values(&[]), None);

        let stats = ZonalStatistics::from_values(&[2.0, 4.0, 6.0]).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 6.0);
        assert_eq!(stats.sum, 12.0);
        assert_eq!(stats.mean, 4.0);
    }
}
