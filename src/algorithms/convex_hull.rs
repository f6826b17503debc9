/*
This code is part of the crown_segmentation library.
Created: 19/10/2026
Last Modified: 19/10/2026
License: MIT
*/
use crate::structures::{Direction, Point2D};
use std::cmp::Ordering;

/// Returns the convex hull of a set of Point2D in counter-clockwise order,
/// starting from the lowest-leftmost vertex. The ring is open, i.e. the first
/// vertex is not repeated at the end. Duplicate and collinear points are
/// dropped, so fewer than three vertices are returned for degenerate inputs.
///
/// Uses Andrew's monotone chain.
pub fn convex_hull(points: &mut Vec<Point2D>) -> Vec<Point2D> {
    sort_points(points);
    points.dedup();
    if points.len() < 3 {
        return points.clone();
    }

    let mut lower: Vec<Point2D> = Vec::with_capacity(points.len());
    for p in points.iter() {
        while lower.len() >= 2
            && lower[lower.len() - 2].direction(&lower[lower.len() - 1], p) != Direction::Left
        {
            lower.pop();
        }
        lower.push(*p);
    }

    let mut upper: Vec<Point2D> = Vec::with_capacity(points.len());
    for p in points.iter().rev() {
        while upper.len() >= 2
            && upper[upper.len() - 2].direction(&upper[upper.len() - 1], p) != Direction::Left
        {
            upper.pop();
        }
        upper.push(*p);
    }

    // the last point of each chain is the first point of the other
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

// lexicographic by x then y
fn sort_points(points: &mut Vec<Point2D>) {
    points.sort_by(|a, b| match a.x.partial_cmp(&b.x) {
        Some(Ordering::Equal) | None => a.y.partial_cmp(&b.y).unwrap_or(Ordering::Equal),
        Some(ord) => ord,
    });
}
