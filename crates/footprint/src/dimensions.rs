//! Physical width/length from the minimum-area rotated bounding rectangle.

use geo::{Area, ConvexHull, MinimumRotatedRect};
use geo_types::{MultiPoint, Point};

use crate::error::{FootprintError, Result};
use crate::types::{round3, Dimensions, PixelPolygon};

/// Hull area (px²) below which the vertex set counts as collinear.
const MIN_HULL_AREA: f64 = 1e-9;

/// Side lengths of the minimum-area rotated rectangle around `polygon`,
/// multiplied by `meters_per_pixel` and rounded to 3 decimals.
///
/// The two values are unordered. Fails with
/// [`FootprintError::DegenerateGeometry`] for fewer than 3 distinct points or
/// collinear points.
pub fn estimate(polygon: &PixelPolygon, meters_per_pixel: f64) -> Result<Dimensions> {
    let [width_px, length_px] = rect_sides(polygon.vertices())?;
    Ok(Dimensions {
        width_m: round3(width_px * meters_per_pixel),
        length_m: round3(length_px * meters_per_pixel),
    })
}

/// Side lengths in pixels of the minimum-area rotated rectangle.
pub fn rect_sides(vertices: &[[f64; 2]]) -> Result<[f64; 2]> {
    let mut distinct: Vec<[f64; 2]> = Vec::with_capacity(vertices.len());
    for vertex in vertices {
        if !distinct.contains(vertex) {
            distinct.push(*vertex);
        }
    }
    if distinct.len() < 3 {
        return Err(FootprintError::DegenerateGeometry(format!(
            "{} distinct vertices, need at least 3",
            distinct.len()
        )));
    }

    let points: MultiPoint<f64> = distinct.iter().map(|&[x, y]| Point::new(x, y)).collect();
    if points.convex_hull().unsigned_area() <= MIN_HULL_AREA {
        return Err(FootprintError::DegenerateGeometry(
            "vertices are collinear".to_string(),
        ));
    }

    let rect = points.minimum_rotated_rect().ok_or_else(|| {
        FootprintError::DegenerateGeometry("no bounding rectangle".to_string())
    })?;

    let corners: Vec<[f64; 2]> = rect.exterior().coords().map(|c| [c.x, c.y]).collect();
    if corners.len() < 3 {
        return Err(FootprintError::DegenerateGeometry(
            "bounding rectangle has too few corners".to_string(),
        ));
    }

    let side = |a: [f64; 2], b: [f64; 2]| (b[0] - a[0]).hypot(b[1] - a[1]);
    Ok([side(corners[0], corners[1]), side(corners[1], corners[2])])
}
