//! Tile identifier → world coordinates of the tile's lower-left corner.
//!
//! Tile structure follows the Dutch national tiling guideline
//! ("Nederlandse richtlijn tiling", v1.1): the zoom-0 extent is halved at
//! every zoom level. Columns and rows are not range checked; out-of-grid
//! values simply extrapolate.

use crate::config::TilingScheme;
use crate::types::TileId;

/// Width (and height) in metres of one tile at `zoom`.
pub fn tile_width(scheme: &TilingScheme, zoom: u8) -> f64 {
    (scheme.t_max - scheme.t_min) * 0.5_f64.powi(i32::from(zoom))
}

impl TilingScheme {
    /// World coordinates of the lower-left corner of `tile` at `zoom`.
    pub fn resolve(&self, tile: &TileId, zoom: u8) -> [f64; 2] {
        let t = tile_width(self, zoom);
        [
            tile.column as f64 * t + self.x_origin,
            tile.row as f64 * t + self.y_origin,
        ]
    }
}
