// src/geometry.rs
//
// Point-in-polygon primitive. The membership classifier delegates here and
// layers no geometry of its own on top.

use crate::types::Point;

const EDGE_EPS: f32 = 1e-6;

/// Boundary-inclusive point-in-polygon test (even-odd ray casting).
///
/// A point exactly on an edge or vertex counts as inside, so membership is
/// deterministic for subjects standing on the zone border.
pub fn point_in_polygon(p: Point, polygon: &[Point]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    // Explicit boundary check first: ray casting alone is inconsistent for
    // points lying exactly on an edge.
    for i in 0..n {
        if on_segment(p, polygon[i], polygon[(i + 1) % n]) {
            return true;
        }
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// True when `p` lies on the closed segment a..b (within float tolerance)
fn on_segment(p: Point, a: Point, b: Point) -> bool {
    let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    if cross.abs() > EDGE_EPS * ((b.x - a.x).abs() + (b.y - a.y).abs()).max(1.0) {
        return false;
    }
    p.x >= a.x.min(b.x) - EDGE_EPS
        && p.x <= a.x.max(b.x) + EDGE_EPS
        && p.y >= a.y.min(b.y) - EDGE_EPS
        && p.y <= a.y.max(b.y) + EDGE_EPS
}
