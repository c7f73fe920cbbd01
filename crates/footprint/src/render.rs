//! Rasterise detections back into per-tile binary masks for visual checks.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use image::{GrayImage, Luma};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use tracing::{debug, info};

use crate::error::Result;
use crate::types::{Detection, PixelPolygon, TileId};

const FOREGROUND: Luma<u8> = Luma([255]);

/// Integer outline suitable for `draw_polygon_mut`: open ring, no repeated
/// consecutive points. `None` when fewer than 3 points remain.
fn outline(polygon: &PixelPolygon) -> Option<Vec<Point<i32>>> {
    let mut points: Vec<Point<i32>> = Vec::with_capacity(polygon.len());
    for &[x, y] in polygon.vertices() {
        let point = Point::new(x.round() as i32, y.round() as i32);
        if points.last() != Some(&point) {
            points.push(point);
        }
    }
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    (points.len() >= 3).then_some(points)
}

/// Black `size`×`size` canvas with every polygon filled white.
pub fn render_mask<'a, I>(polygons: I, size: u32) -> GrayImage
where
    I: IntoIterator<Item = &'a PixelPolygon>,
{
    let mut canvas = GrayImage::new(size, size);
    for polygon in polygons {
        if let Some(points) = outline(polygon) {
            draw_polygon_mut(&mut canvas, &points, FOREGROUND);
        }
    }
    canvas
}

/// Group detections by tile, keeping tiles in ascending order.
pub fn group_by_tile(detections: &[Detection]) -> BTreeMap<TileId, Vec<&PixelPolygon>> {
    let mut grouped: BTreeMap<TileId, Vec<&PixelPolygon>> = BTreeMap::new();
    for detection in detections {
        grouped.entry(detection.tile).or_default().push(&detection.polygon);
    }
    grouped
}

/// Write one `<tile>.png` mask per tile into `output_dir`; returns the paths written.
pub fn render_tiles<P: AsRef<Path>>(
    detections: &[Detection],
    tile_size_px: u32,
    output_dir: P,
) -> Result<Vec<PathBuf>> {
    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir)?;

    let mut written = Vec::new();
    for (tile, polygons) in group_by_tile(detections) {
        let canvas = render_mask(polygons.iter().copied(), tile_size_px);
        let path = output_dir.join(format!("{}.png", tile.file_stem()));
        canvas.save(&path)?;
        debug!(%tile, polygons = polygons.len(), path = %path.display(), "rendered tile mask");
        written.push(path);
    }

    info!(tiles = written.len(), dir = %output_dir.display(), "rendered masks");
    Ok(written)
}
