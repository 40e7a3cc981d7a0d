//! ESRI ASCII grid raster reader
//!
//! Rasters do not flow through the `FormatRegistry`; zonal analysis loads
//! them directly through [`read_ascii_grid`]. The format is a plain-text
//! header (`ncols`, `nrows`, lower-left anchor, `cellsize`, optional
//! `NODATA_value`) followed by whitespace-separated cell values in row-major
//! order, northernmost row first.

use std::fs;
use std::path::Path;

use crate::error::{AtlasError, Result};
use crate::models::RasterGrid;

const DEFAULT_NODATA: f64 = -9999.0;

/// Read an ESRI ASCII grid file into a [`RasterGrid`]
pub fn read_ascii_grid(path: &Path) -> Result<RasterGrid> {
    if !path.exists() {
        return Err(AtlasError::InvalidPath {
            path: path.to_path_buf(),
            reason: "File does not exist".to_string(),
        });
    }
    let content = fs::read_to_string(path).map_err(AtlasError::Io)?;
    parse_ascii_grid(&content)
}

/// Parse ASCII grid text.
///
/// Header keys are matched case-insensitively. `xllcenter`/`yllcenter`
/// anchors are converted to the corner convention [`RasterGrid`] uses.
pub fn parse_ascii_grid(content: &str) -> Result<RasterGrid> {
    let mut ncols: Option<usize> = None;
    let mut nrows: Option<usize> = None;
    let mut x_anchor: Option<(f64, bool)> = None;
    let mut y_anchor: Option<(f64, bool)> = None;
    let mut cellsize: Option<f64> = None;
    let mut nodata = DEFAULT_NODATA;

    let mut data = Vec::new();

    for line in content.lines() {
        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else {
            continue;
        };

        // Header lines start with a key; data tokens are numeric
        if first.starts_with(|c: char| c.is_ascii_alphabetic()) {
            let raw = tokens.next().ok_or_else(|| AtlasError::InvalidRaster {
                reason: format!("Header '{}' has no value", first),
            })?;

            match first.to_ascii_lowercase().as_str() {
                "ncols" => ncols = Some(parse_header(first, raw)?),
                "nrows" => nrows = Some(parse_header(first, raw)?),
                "xllcorner" => x_anchor = Some((parse_header(first, raw)?, false)),
                "xllcenter" => x_anchor = Some((parse_header(first, raw)?, true)),
                "yllcorner" => y_anchor = Some((parse_header(first, raw)?, false)),
                "yllcenter" => y_anchor = Some((parse_header(first, raw)?, true)),
                "cellsize" => cellsize = Some(parse_header(first, raw)?),
                "nodata_value" => nodata = parse_header(first, raw)?,
                other => {
                    return Err(AtlasError::InvalidRaster {
                        reason: format!("Unknown header '{}'", other),
                    });
                }
            }
        } else {
            data.push(parse_cell(first)?);
            for token in tokens {
                data.push(parse_cell(token)?);
            }
        }
    }

    let ncols = ncols.ok_or_else(|| missing_header("ncols"))?;
    let nrows = nrows.ok_or_else(|| missing_header("nrows"))?;
    let (x, x_is_center) = x_anchor.ok_or_else(|| missing_header("xllcorner"))?;
    let (y, y_is_center) = y_anchor.ok_or_else(|| missing_header("yllcorner"))?;
    let cellsize = cellsize.ok_or_else(|| missing_header("cellsize"))?;

    let xllcorner = if x_is_center { x - cellsize / 2.0 } else { x };
    let yllcorner = if y_is_center { y - cellsize / 2.0 } else { y };

    RasterGrid::new(ncols, nrows, xllcorner, yllcorner, cellsize, nodata, data)
}

fn parse_header<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.parse().map_err(|_| AtlasError::InvalidRaster {
        reason: format!("Invalid {} value '{}'", key, raw),
    })
}

fn parse_cell(token: &str) -> Result<f64> {
    token.parse().map_err(|_| AtlasError::InvalidRaster {
        reason: format!("Invalid cell value '{}'", token),
    })
}

fn missing_header(key: &str) -> AtlasError {
    AtlasError::InvalidRaster {
        reason: format!("Missing required header '{}'", key),
    }
}
