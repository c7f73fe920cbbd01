use geo_types::{Coord, LineString, Point, Polygon};

use crate::traits::HoleDetector;

/// Containment-based hole detector.
///
/// A contour nested inside an odd number of other contours bounds a hole and is
/// dropped; islands inside holes count as exteriors again.
#[derive(Debug, Clone, Default)]
pub struct ContainmentHoleDetector;

impl HoleDetector for ContainmentHoleDetector {
    fn exterior_rings(&self, contours: Vec<Vec<[f64; 2]>>) -> Vec<Vec<[f64; 2]>> {
        use geo::Contains;

        let polygons: Vec<Polygon<f64>> = contours
            .iter()
            .map(|points| {
                let coords: Vec<Coord<f64>> = points.iter().map(|&[x, y]| Coord { x, y }).collect();
                Polygon::new(LineString::new(coords), vec![])
            })
            .collect();

        contours
            .iter()
            .enumerate()
            .filter(|(i, points)| {
                let Some(&[x, y]) = points.first() else { return false };
                let first_vertex = Point::new(x, y);
                let depth = polygons
                    .iter()
                    .enumerate()
                    .filter(|(j, polygon)| j != i && polygon.contains(&first_vertex))
                    .count();
                depth % 2 == 0
            })
            .map(|(_, points)| points.clone())
            .collect()
    }
}

/// Keeps every contour as an exterior.
#[derive(Debug, Clone, Default)]
pub struct NoHoleDetector;

impl HoleDetector for NoHoleDetector {
    fn exterior_rings(&self, contours: Vec<Vec<[f64; 2]>>) -> Vec<Vec<[f64; 2]>> {
        contours
    }
}
