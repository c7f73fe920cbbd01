//! Pixel → planar world coordinates within one tile.
//!
//! Pixel y grows downwards, world y grows northwards, hence the flip around the
//! tile height. Nothing is rounded here; callers round when writing output.

use crate::config::PipelineConfig;

/// Project one pixel coordinate relative to a tile's lower-left `origin`.
pub fn project(
    origin: [f64; 2],
    pixel_x: f64,
    pixel_y: f64,
    tile_size_px: f64,
    tile_size_m: f64,
) -> [f64; 2] {
    let scale = tile_size_m / tile_size_px;
    [
        origin[0] + scale * pixel_x,
        origin[1] + scale * (tile_size_px - pixel_y),
    ]
}

/// Affine pixel-to-world map shared by all tiles of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projector {
    tile_size_px: f64,
    tile_size_m: f64,
}

impl Projector {
    pub fn new(tile_size_px: u32, tile_size_m: f64) -> Self {
        Self {
            tile_size_px: f64::from(tile_size_px),
            tile_size_m,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.tile_size_px, config.tile_size_m)
    }

    /// Metres per pixel.
    pub fn scale(&self) -> f64 {
        self.tile_size_m / self.tile_size_px
    }

    pub fn project(&self, origin: [f64; 2], pixel: [f64; 2]) -> [f64; 2] {
        project(origin, pixel[0], pixel[1], self.tile_size_px, self.tile_size_m)
    }

    pub fn project_ring(&self, origin: [f64; 2], ring: &[[f64; 2]]) -> Vec<[f64; 2]> {
        ring.iter().map(|&pixel| self.project(origin, pixel)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TilingScheme;
    use crate::types::{round3, TileId};

    fn reference() -> (Projector, [f64; 2]) {
        let origin = TilingScheme::rijksdriehoek().resolve(&TileId::new(3700, 4220), 13);
        (Projector::new(256, 107.52), origin)
    }

    #[test]
    fn upper_left_pixel_is_origin_plus_tile_height() {
        let (projector, origin) = reference();
        let [x, y] = projector.project(origin, [0.0, 0.0]);
        assert_eq!(round3(x), round3(origin[0]));
        assert_eq!(round3(y), round3(origin[1] + 107.52));
    }

    #[test]
    fn tile_edges_are_one_tile_apart() {
        let (projector, origin) = reference();
        let corner = projector.project(origin, [0.0, 0.0]);
        let right = projector.project(origin, [256.0, 0.0]);
        let bottom = projector.project(origin, [0.0, 256.0]);

        assert!((round3(right[0] - corner[0]) - 107.52).abs() < 1e-9);
        assert_eq!(round3(right[1]), round3(corner[1]));
        assert!((round3(corner[1] - bottom[1]) - 107.52).abs() < 1e-9);
        assert_eq!(round3(bottom[0]), round3(corner[0]));
        // The lower-left pixel corner is the resolved tile origin.
        assert_eq!(round3(bottom[1]), round3(origin[1]));
    }

    #[test]
    fn free_function_matches_projector() {
        let (projector, origin) = reference();
        let via_fn = project(origin, 12.5, 200.25, 256.0, 107.52);
        assert_eq!(via_fn, projector.project(origin, [12.5, 200.25]));
        assert!((projector.scale() - 0.42).abs() < 1e-12);
    }

    #[test]
    fn project_ring_keeps_vertex_count() {
        let (projector, origin) = reference();
        let ring = [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 0.0]];
        assert_eq!(projector.project_ring(origin, &ring).len(), 4);
    }
}
