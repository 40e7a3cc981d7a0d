//! Web Mercator slippy tile arithmetic
//!
//! Tile addressing follows the OSM convention: x grows eastward from
//! 180 W, y grows southward from the projection's northern limit, and
//! zoom z doubles the grid in each dimension.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Latitude limit of the Web Mercator projection
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Deepest zoom level tiles are served at
pub const MAX_ZOOM: u8 = 22;

/// Address of one slippy map tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Whether this address falls inside the `2^z * 2^z` grid
    pub fn is_valid(&self) -> bool {
        if self.z > MAX_ZOOM {
            return false;
        }
        let n = 1u64 << self.z;
        (self.x as u64) < n && (self.y as u64) < n
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Tile containing a WGS 84 coordinate at the given zoom.
///
/// Latitudes beyond the projection limit are clamped onto the edge
/// tiles rather than rejected.
pub fn lat_lon_to_tile(lat: f64, lon: f64, zoom: u8) -> TileCoord {
    let n = f64::powi(2.0, zoom as i32);
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);

    let x = ((lon + 180.0) / 360.0 * n).floor();
    let y = ((1.0 - lat.to_radians().tan().asinh() / PI) / 2.0 * n).floor();

    let max_index = n - 1.0;
    TileCoord::new(
        zoom,
        x.clamp(0.0, max_index) as u32,
        y.clamp(0.0, max_index) as u32,
    )
}

/// North-west corner of a tile as `(lat, lon)`
pub fn tile_to_lat_lon(tile: &TileCoord) -> (f64, f64) {
    let n = f64::powi(2.0, tile.z as i32);
    let lon = tile.x as f64 / n * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * tile.y as f64 / n)).sinh().atan().to_degrees();
    (lat, lon)
}

/// Tile extent as `[min_lon, min_lat, max_lon, max_lat]`
pub fn tile_bounds(tile: &TileCoord) -> [f64; 4] {
    let (north, west) = tile_to_lat_lon(tile);
    let (south, east) = tile_to_lat_lon(&TileCoord::new(tile.z, tile.x + 1, tile.y + 1));
    [west, south, east, north]
}

/// Every tile overlapping a `[min_lon, min_lat, max_lon, max_lat]` box
pub fn tiles_for_bbox(bbox: [f64; 4], zoom: u8) -> Vec<TileCoord> {
    let north_west = lat_lon_to_tile(bbox[3], bbox[0], zoom);
    let south_east = lat_lon_to_tile(bbox[1], bbox[2], zoom);

    let mut tiles = Vec::new();
    for x in north_west.x..=south_east.x {
        for y in north_west.y..=south_east.y {
            tiles.push(TileCoord::new(zoom, x, y));
        }
    }
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_zoom_zero_is_one_tile() {
        assert_eq!(lat_lon_to_tile(55.95, -3.19, 0), TileCoord::new(0, 0, 0));
        assert_eq!(lat_lon_to_tile(-80.0, 179.9, 0), TileCoord::new(0, 0, 0));
    }

    #[test]
    fn test_edinburgh_tile_at_z12() {
        let tile = lat_lon_to_tile(55.95, -3.19, 12);
        assert_eq!((tile.x, tile.y), (2011, 1276));
    }

    #[test]
    fn test_tile_bounds_contain_the_point() {
        let tile = lat_lon_to_tile(55.95, -3.19, 14);
        let [west, south, east, north] = tile_bounds(&tile);

        assert!(west <= -3.19 && -3.19 < east);
        assert!(south <= 55.95 && 55.95 < north);
    }

    #[test]
    fn test_poles_clamp_to_edge_tiles() {
        let north = lat_lon_to_tile(90.0, 0.0, 4);
        assert_eq!(north.y, 0);

        let south = lat_lon_to_tile(-90.0, 0.0, 4);
        assert_eq!(south.y, 15);
    }

    #[test]
    fn test_tiles_for_bbox_covers_the_corners() {
        // A box a bit wider than one z12 tile around Edinburgh
        let bbox = [-3.25, 55.90, -3.10, 55.99];
        let tiles = tiles_for_bbox(bbox, 12);

        assert!(tiles.contains(&lat_lon_to_tile(55.99, -3.25, 12)));
        assert!(tiles.contains(&lat_lon_to_tile(55.90, -3.10, 12)));
        assert!(!tiles.is_empty());
    }

    #[test]
    fn test_validity_bounds() {
        assert!(TileCoord::new(0, 0, 0).is_valid());
        assert!(TileCoord::new(12, 4095, 4095).is_valid());
        assert!(!TileCoord::new(12, 4096, 0).is_valid());
        assert!(!TileCoord::new(23, 0, 0).is_valid());
    }

    #[test]
    fn test_display_is_path_shaped() {
        assert_eq!(TileCoord::new(12, 2011, 1276).to_string(), "12/2011/1276");
    }

    proptest! {
        #[test]
        fn prop_containing_tile_bounds_contain_the_point(
            lat in -84.0f64..84.0,
            lon in -179.99f64..179.99,
            zoom in 0u8..16,
        ) {
            let tile = lat_lon_to_tile(lat, lon, zoom);
            prop_assert!(tile.is_valid());

            let [west, south, east, north] = tile_bounds(&tile);
            prop_assert!(west <= lon && lon <= east);
            prop_assert!(south <= lat && lat <= north);
        }
    }
}
