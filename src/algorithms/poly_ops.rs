/*
This code is part of the crown_segmentation library.
Created: 19/10/2026
Last Modified: 19/10/2026
License: MIT
*/

use crate::structures::Point2D;

/// Tests if a point is Left|On|Right of an infinite line,
/// based on http://geomalgorithms.com/a03-_inclusion.html.
///
/// Input:  three points p0, p1, and p2
///
/// Return: > 0 for p2 left of the line through p0 and p1
///         = 0 for p2 on the line through p0 and p1
///         < 0 for p2 right of the line through p0 and p1
pub fn is_left(p0: &Point2D, p1: &Point2D, p2: &Point2D) -> f64 {
    (p1.x - p0.x) * (p2.y - p0.y) - (p2.x - p0.x) * (p1.y - p0.y)
}

/// Tests whether a point is within a polygon. Points lying on an edge or a
/// vertex of the polygon are deemed inside. The ring may be open or closed.
pub fn point_in_poly(p: &Point2D, poly: &[Point2D]) -> bool {
    if poly.is_empty() {
        return false;
    }
    if on_boundary(p, poly) {
        return true;
    }
    winding_number(p, poly) != 0i32
}

/// Calculates the winding number (wn) of a polygon around a point. The
/// point falls within the polygon if the winding number is non-zero. The
/// closing edge from the last vertex back to the first is implied when the
/// ring is open.
pub fn winding_number(p: &Point2D, poly: &[Point2D]) -> i32 {
    let n = poly.len();
    let mut wn = 0i32;
    // loop through all edges of the polygon
    for i in 0..n {
        let v0 = &poly[i];
        let v1 = &poly[(i + 1) % n];
        if v0.y <= p.y {
            // start y <= p.y
            if v1.y > p.y && is_left(v0, v1, p) > 0f64 {
                // an upward crossing, p left of edge
                wn += 1i32;
            }
        } else if v1.y <= p.y && is_left(v0, v1, p) < 0f64 {
            // a downward crossing, p right of edge
            wn -= 1i32;
        }
    }
    wn
}

fn on_boundary(p: &Point2D, poly: &[Point2D]) -> bool {
    let n = poly.len();
    for i in 0..n {
        let v0 = &poly[i];
        let v1 = &poly[(i + 1) % n];
        if is_left(v0, v1, p) == 0f64
            && p.x >= v0.x.min(v1.x)
            && p.x <= v0.x.max(v1.x)
            && p.y >= v0.y.min(v1.y)
            && p.y <= v0.y.max(v1.y)
        {
            return true;
        }
    }
    false
}
