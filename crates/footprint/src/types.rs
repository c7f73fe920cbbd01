use std::fmt;
use std::str::FromStr;

use geo_types::{Coord, LineString, Polygon};
use image::GrayImage;
use serde::Serialize;

use crate::error::{FootprintError, Result};

/// Round to the 3 decimals used whenever a coordinate or length leaves the crate.
///
/// Rounds the exact binary value, ties to even, through decimal formatting;
/// scaling by 1000 first would round twice.
pub fn round3(value: f64) -> f64 {
    format!("{value:.3}").parse().unwrap_or(value)
}

/// Address of one tile in the national grid.
///
/// Parsed from either `"<column>/<row>"` (zoom taken from the run configuration)
/// or `"<zoom>_<column>_<row>"`. `Display` writes the form it was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    pub zoom: Option<u8>,
    pub column: i64,
    pub row: i64,
}

impl TileId {
    pub fn new(column: i64, row: i64) -> Self {
        Self { zoom: None, column, row }
    }

    pub fn with_zoom(zoom: u8, column: i64, row: i64) -> Self {
        Self { zoom: Some(zoom), column, row }
    }

    /// Parse a mask file stem: `<column>_<row>` or `<zoom>_<column>_<row>`.
    pub fn from_file_stem(stem: &str) -> Result<Self> {
        let invalid = || FootprintError::TileIdentifierFormat(stem.to_string());
        let parts: Vec<&str> = stem.split('_').collect();
        match parts.as_slice() {
            [column, row] => Ok(Self::new(
                column.parse().map_err(|_| invalid())?,
                row.parse().map_err(|_| invalid())?,
            )),
            [_, _, _] => stem.parse(),
            _ => Err(invalid()),
        }
    }

    /// Path-safe rendering, used for file names.
    pub fn file_stem(&self) -> String {
        match self.zoom {
            Some(zoom) => format!("{}_{}_{}", zoom, self.column, self.row),
            None => format!("{}_{}", self.column, self.row),
        }
    }
}

impl FromStr for TileId {
    type Err = FootprintError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let invalid = || FootprintError::TileIdentifierFormat(s.to_string());

        if let Some((column, row)) = trimmed.split_once('/') {
            return Ok(Self::new(
                column.trim().parse().map_err(|_| invalid())?,
                row.trim().parse().map_err(|_| invalid())?,
            ));
        }

        let parts: Vec<&str> = trimmed.split('_').collect();
        match parts.as_slice() {
            [zoom, column, row] => Ok(Self::with_zoom(
                zoom.parse().map_err(|_| invalid())?,
                column.parse().map_err(|_| invalid())?,
                row.parse().map_err(|_| invalid())?,
            )),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.zoom {
            Some(zoom) => write!(f, "{}_{}_{}", zoom, self.column, self.row),
            None => write!(f, "{}/{}", self.column, self.row),
        }
    }
}

/// Binary object mask for a single tile, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterMask {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

impl RasterMask {
    /// An all-background mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width as usize * height as usize],
        }
    }

    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> bool,
    {
        let mut cells = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                cells.push(f(x, y));
            }
        }
        Self { width, height, cells }
    }

    /// Foreground wherever the luma value exceeds `threshold`.
    pub fn from_gray(image: &GrayImage, threshold: u8) -> Self {
        Self::from_fn(image.width(), image.height(), |x, y| {
            image.get_pixel(x, y).0[0] > threshold
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.cells[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        if x < self.width && y < self.height {
            self.cells[(y * self.width + x) as usize] = value;
        }
    }

    pub fn foreground_count(&self) -> usize {
        self.cells.iter().filter(|&&cell| cell).count()
    }

    /// True for an all-background or all-foreground mask.
    pub fn is_uniform(&self) -> bool {
        match self.cells.first() {
            Some(&first) => self.cells.iter().all(|&cell| cell == first),
            None => true,
        }
    }
}

/// Exterior ring in tile-local pixel space (origin upper-left, y down).
///
/// Holds at least 3 vertices. The ring is implicitly closed; rings produced by
/// the vectorizer repeat their first vertex at the end.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PixelPolygon {
    vertices: Vec<[f64; 2]>,
}

impl PixelPolygon {
    pub fn new(vertices: Vec<[f64; 2]>) -> Result<Self> {
        if vertices.len() < 3 {
            return Err(FootprintError::DegenerateGeometry(format!(
                "polygon needs at least 3 vertices, got {}",
                vertices.len()
            )));
        }
        if vertices.iter().any(|[x, y]| !x.is_finite() || !y.is_finite()) {
            return Err(FootprintError::DegenerateGeometry(
                "polygon has non-finite coordinates".to_string(),
            ));
        }
        Ok(Self { vertices })
    }

    pub fn vertices(&self) -> &[[f64; 2]] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.vertices.first() == self.vertices.last()
    }

    /// Vertices with the first one repeated at the end, unless already closed.
    pub fn closed_ring(&self) -> Vec<[f64; 2]> {
        let mut ring = self.vertices.clone();
        if !self.is_closed() {
            ring.push(self.vertices[0]);
        }
        ring
    }

    /// Convert to geo-types Polygon for geometric operations
    pub fn to_geo_polygon(&self) -> Polygon<f64> {
        let coords: Vec<Coord<f64>> = self
            .vertices
            .iter()
            .map(|&[x, y]| Coord { x, y })
            .collect();
        Polygon::new(LineString::new(coords), vec![])
    }

    /// Area-weighted centroid in pixel space.
    pub fn centroid(&self) -> Option<[f64; 2]> {
        use geo::Centroid;
        self.to_geo_polygon().centroid().map(|point| [point.x(), point.y()])
    }

    pub fn area(&self) -> f64 {
        use geo::Area;
        self.to_geo_polygon().unsigned_area()
    }
}

/// Extents of the minimum-area rotated rectangle, in metres. Unordered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Dimensions {
    pub width_m: f64,
    pub length_m: f64,
}

/// One detector output row: a pixel polygon on a tile.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub tile: TileId,
    pub polygon: PixelPolygon,
}

/// A measured detection, the unit of output.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionRecord {
    pub tile: TileId,
    pub polygon: PixelPolygon,
    /// Projected centroid, planar metres, rounded to 3 decimals.
    pub centroid: [f64; 2],
    pub dimensions: Dimensions,
}

impl DetectionRecord {
    pub fn width_m(&self) -> f64 {
        self.dimensions.width_m
    }

    pub fn length_m(&self) -> f64 {
        self.dimensions.length_m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_column_row_identifier() {
        let tile: TileId = "3700/4220".parse().expect("Should parse");
        assert_eq!(tile, TileId::new(3700, 4220));
        assert_eq!(tile.to_string(), "3700/4220");
    }

    #[test]
    fn parses_zoom_column_row_identifier() {
        let tile: TileId = "13_3700_4220".parse().expect("Should parse");
        assert_eq!(tile, TileId::with_zoom(13, 3700, 4220));
        assert_eq!(tile.to_string(), "13_3700_4220");
        assert_eq!(tile.file_stem(), "13_3700_4220");
    }

    #[test]
    fn negative_tiles_are_not_rejected() {
        let tile: TileId = "-1/-2".parse().expect("Should parse");
        assert_eq!(tile, TileId::new(-1, -2));
    }

    #[test]
    fn rejects_malformed_identifiers() {
        for input in ["", "3700", "a/b", "13_3700", "1_2_3_4", "3700/4220/1", "300_1_2"] {
            let result = input.parse::<TileId>();
            assert!(
                matches!(result, Err(FootprintError::TileIdentifierFormat(_))),
                "expected failure for {input:?}"
            );
        }
    }

    #[test]
    fn file_stem_without_zoom() {
        let tile = TileId::from_file_stem("3700_4220").expect("Should parse");
        assert_eq!(tile, TileId::new(3700, 4220));
        assert_eq!(tile.file_stem(), "3700_4220");
        assert!(TileId::from_file_stem("tile").is_err());
    }

    #[test]
    fn mask_uniformity() {
        assert!(RasterMask::new(4, 4).is_uniform());
        assert!(RasterMask::from_fn(4, 4, |_, _| true).is_uniform());

        let mut mask = RasterMask::new(4, 4);
        mask.set(1, 2, true);
        assert!(!mask.is_uniform());
        assert!(mask.get(1, 2));
        assert!(!mask.get(9, 9));
        assert_eq!(mask.foreground_count(), 1);
    }

    #[test]
    fn mask_from_gray_thresholds() {
        let mut image = GrayImage::new(3, 1);
        image.put_pixel(0, 0, image::Luma([10]));
        image.put_pixel(1, 0, image::Luma([128]));
        image.put_pixel(2, 0, image::Luma([255]));
        let mask = RasterMask::from_gray(&image, 127);
        assert!(!mask.get(0, 0));
        assert!(mask.get(1, 0));
        assert!(mask.get(2, 0));
    }

    #[test]
    fn polygon_requires_three_vertices() {
        let result = PixelPolygon::new(vec![[0.0, 0.0], [1.0, 1.0]]);
        assert!(matches!(result, Err(FootprintError::DegenerateGeometry(_))));
    }

    #[test]
    fn closed_ring_appends_first_vertex_once() {
        let open = PixelPolygon::new(vec![[0.0, 0.0], [4.0, 0.0], [4.0, 2.0]]).expect("valid");
        assert!(!open.is_closed());
        assert_eq!(open.closed_ring().len(), 4);

        let closed = PixelPolygon::new(open.closed_ring()).expect("valid");
        assert!(closed.is_closed());
        assert_eq!(closed.closed_ring().len(), 4);
    }

    #[test]
    fn centroid_of_rectangle() {
        let polygon =
            PixelPolygon::new(vec![[0.0, 0.0], [4.0, 0.0], [4.0, 2.0], [0.0, 2.0]]).expect("valid");
        let centroid = polygon.centroid().expect("centroid");
        assert!((centroid[0] - 2.0).abs() < 1e-9);
        assert!((centroid[1] - 1.0).abs() < 1e-9);
        assert!((polygon.area() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn round3_rounds_exact_value_ties_to_even() {
        assert_eq!(round3(1.23449), 1.234);
        assert_eq!(round3(-2.0004), -2.0);
        assert_eq!(round3(107.52), 107.52);
        assert_eq!(round3(112_422.08), 112_422.08);

        // Exactly representable ties.
        assert_eq!(round3(1.0625), 1.062);
        assert_eq!(round3(1.1875), 1.188);
        assert_eq!(round3(-0.0625), -0.062);

        // 1.0005 is stored just below the tie; a scaled round would give 1.001.
        assert_eq!(round3(1.0005), 1.0);
    }
}
