//! Marching-squares iso-contour tracing at level 0.5.
//!
//! The mask is padded with one background pixel on every side so that every
//! contour closes, even for objects touching the tile border. Saddle cells
//! connect the background diagonals ("low" connectivity), which keeps
//! diagonally touching foreground pixels in separate contours.

use std::collections::{HashMap, VecDeque};

use crate::{traits::ContourExtractor, types::RasterMask};

const LEVEL: f64 = 0.5;
const PADDING: f64 = 1.0;

/// Marching-squares contour extractor.
#[derive(Debug, Clone, Default)]
pub struct MarchingSquares;

impl ContourExtractor for MarchingSquares {
    fn extract_contours(&self, mask: &RasterMask) -> Vec<Vec<[f64; 2]>> {
        let segments = contour_segments(mask);
        assemble_contours(segments)
            .into_iter()
            .filter(|contour| contour.len() >= 3)
            .map(|contour| {
                contour
                    .into_iter()
                    .map(|[row, col]| [col - PADDING, row - PADDING])
                    .collect()
            })
            .collect()
    }
}

/// Value of the padded grid at (row, col); the border ring is background.
fn padded_value(mask: &RasterMask, row: usize, col: usize) -> f64 {
    if row == 0 || col == 0 {
        return 0.0;
    }
    let (x, y) = (col - 1, row - 1);
    if x >= mask.width() as usize || y >= mask.height() as usize {
        return 0.0;
    }
    if mask.get(x as u32, y as u32) { 1.0 } else { 0.0 }
}

fn fraction(from: f64, to: f64) -> f64 {
    if to == from {
        0.0
    } else {
        (LEVEL - from) / (to - from)
    }
}

type Point = [f64; 2];

/// Directed boundary segments in padded (row, col) space, one or two per cell,
/// in row-major cell order.
fn contour_segments(mask: &RasterMask) -> Vec<(Point, Point)> {
    let rows = mask.height() as usize + 2;
    let cols = mask.width() as usize + 2;
    let mut segments = Vec::new();

    for r0 in 0..rows - 1 {
        for c0 in 0..cols - 1 {
            let (r1, c1) = (r0 + 1, c0 + 1);
            let ul = padded_value(mask, r0, c0);
            let ur = padded_value(mask, r0, c1);
            let ll = padded_value(mask, r1, c0);
            let lr = padded_value(mask, r1, c1);

            let case = u8::from(ul > LEVEL)
                | u8::from(ur > LEVEL) << 1
                | u8::from(ll > LEVEL) << 2
                | u8::from(lr > LEVEL) << 3;
            if case == 0 || case == 15 {
                continue;
            }

            let (r0f, c0f, r1f, c1f) = (r0 as f64, c0 as f64, r1 as f64, c1 as f64);
            let top = [r0f, c0f + fraction(ul, ur)];
            let bottom = [r1f, c0f + fraction(ll, lr)];
            let left = [r0f + fraction(ul, ll), c0f];
            let right = [r0f + fraction(ur, lr), c1f];

            match case {
                1 => segments.push((top, left)),
                2 => segments.push((right, top)),
                3 => segments.push((right, left)),
                4 => segments.push((left, bottom)),
                5 => segments.push((top, bottom)),
                6 => {
                    segments.push((right, top));
                    segments.push((left, bottom));
                }
                7 => segments.push((right, bottom)),
                8 => segments.push((bottom, right)),
                9 => {
                    segments.push((top, left));
                    segments.push((bottom, right));
                }
                10 => segments.push((bottom, top)),
                11 => segments.push((bottom, left)),
                12 => segments.push((left, right)),
                13 => segments.push((top, right)),
                14 => segments.push((left, top)),
                _ => {}
            }
        }
    }

    segments
}

type PointKey = (u64, u64);

fn key(point: &Point) -> PointKey {
    (point[0].to_bits(), point[1].to_bits())
}

/// Chain directed segments into contours, ordered by when each contour was started.
fn assemble_contours(segments: Vec<(Point, Point)>) -> Vec<Vec<Point>> {
    let mut contours: Vec<Option<VecDeque<Point>>> = Vec::new();
    let mut starts: HashMap<PointKey, usize> = HashMap::new();
    let mut ends: HashMap<PointKey, usize> = HashMap::new();

    for (from, to) in segments {
        if from == to {
            continue;
        }

        let tail = starts.remove(&key(&to));
        let head = ends.remove(&key(&from));

        match (tail, head) {
            (Some(tail), Some(head)) if tail == head => {
                // Closes the contour.
                if let Some(contour) = contours[head].as_mut() {
                    contour.push_back(to);
                }
            }
            (Some(tail), Some(head)) => {
                // Join the younger contour onto the older one.
                if tail > head {
                    let Some(tail_points) = contours[tail].take() else { continue };
                    if let Some(last) = tail_points.back() {
                        ends.remove(&key(last));
                    }
                    if let Some(contour) = contours[head].as_mut() {
                        contour.extend(tail_points);
                        register(&mut starts, &mut ends, contour, head);
                    }
                } else {
                    let Some(head_points) = contours[head].take() else { continue };
                    if let Some(first) = head_points.front() {
                        starts.remove(&key(first));
                    }
                    if let Some(contour) = contours[tail].as_mut() {
                        for point in head_points.into_iter().rev() {
                            contour.push_front(point);
                        }
                        register(&mut starts, &mut ends, contour, tail);
                    }
                }
            }
            (None, None) => {
                let index = contours.len();
                contours.push(Some(VecDeque::from([from, to])));
                starts.insert(key(&from), index);
                ends.insert(key(&to), index);
            }
            (Some(tail), None) => {
                if let Some(contour) = contours[tail].as_mut() {
                    contour.push_front(from);
                }
                starts.insert(key(&from), tail);
            }
            (None, Some(head)) => {
                if let Some(contour) = contours[head].as_mut() {
                    contour.push_back(to);
                }
                ends.insert(key(&to), head);
            }
        }
    }

    contours
        .into_iter()
        .flatten()
        .map(|contour| contour.into_iter().collect())
        .collect()
}

fn register(
    starts: &mut HashMap<PointKey, usize>,
    ends: &mut HashMap<PointKey, usize>,
    contour: &VecDeque<Point>,
    index: usize,
) {
    if let (Some(first), Some(last)) = (contour.front(), contour.back()) {
        starts.insert(key(first), index);
        ends.insert(key(last), index);
    }
}
