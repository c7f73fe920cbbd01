use tracing::debug;

use crate::config::EdgePolicy;

/// Douglas-Peucker simplification of a closed ring, without topology
/// preservation.
///
/// The ring keeps its closing vertex. Distances are measured to the segment
/// between the kept endpoints (to the endpoint itself when they coincide, as
/// they do for the full closed ring). On equal distances the first vertex
/// wins, and a ring may collapse entirely: `None` is returned when fewer than
/// 3 distinct vertices survive. `geo::Simplify` differs on both counts (it
/// keeps the last of tied vertices and never shrinks a polygon below 4
/// points), which changes the traced outlines.
pub fn simplify_ring(ring: &[[f64; 2]], tolerance: f64) -> Option<Vec<[f64; 2]>> {
    if ring.len() < 4 {
        return None;
    }

    let mut kept = vec![false; ring.len()];
    kept[0] = true;
    kept[ring.len() - 1] = true;
    rdp_recurse(ring, 0, ring.len() - 1, tolerance, &mut kept);

    let simplified: Vec<[f64; 2]> = ring
        .iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect();

    // A closed ring needs 3 distinct vertices plus the closing one.
    if simplified.len() < 4 {
        return None;
    }
    Some(simplified)
}

fn rdp_recurse(points: &[[f64; 2]], start: usize, end: usize, tolerance: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;
    for i in (start + 1)..end {
        let d = segment_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > tolerance {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, tolerance, kept);
        rdp_recurse(points, max_idx, end, tolerance, kept);
    }
}

/// Distance from `p` to the segment `a`-`b`.
fn segment_distance(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
    let length_sq = dx * dx + dy * dy;
    if length_sq == 0.0 {
        return (p[0] - a[0]).hypot(p[1] - a[1]);
    }

    let t = (((p[0] - a[0]) * dx + (p[1] - a[1]) * dy) / length_sq).clamp(0.0, 1.0);
    let (cx, cy) = (a[0] + t * dx, a[1] + t * dy);
    (p[0] - cx).hypot(p[1] - cy)
}

/// Apply the edge policy for a `width` x `height` mask.
///
/// Returns `None` when the policy rejects the ring.
pub fn apply_edge_policy(
    ring: Vec<[f64; 2]>,
    width: u32,
    height: u32,
    policy: EdgePolicy,
) -> Option<Vec<[f64; 2]>> {
    let (max_x, max_y) = (f64::from(width), f64::from(height));
    let outside = |&[x, y]: &[f64; 2]| x < 0.0 || y < 0.0 || x > max_x || y > max_y;
    let outside_count = ring.iter().filter(|p| outside(p)).count();

    if outside_count == 0 {
        return Some(ring);
    }

    match policy {
        EdgePolicy::Clip => {
            debug!(outside_count, "clipping ring vertices to mask bounds");
            Some(
                ring.into_iter()
                    .map(|[x, y]| [x.clamp(0.0, max_x), y.clamp(0.0, max_y)])
                    .collect(),
            )
        }
        EdgePolicy::Reject => {
            debug!(outside_count, "rejecting ring outside mask bounds");
            None
        }
    }
}
