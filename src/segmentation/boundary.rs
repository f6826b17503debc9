/*
This code is part of the crown_segmentation library.
Created: 19/10/2026
Last Modified: 19/10/2026
License: MIT
*/

use super::gap_detector::Extremity;
use super::parameters::HamrazParameters;
use crate::algorithms::{convex_hull, point_in_poly, polygon_area};
use crate::structures::Point2D;
use crate::utils::percentile_band;

/// A crown boundary polygon: a counter-clockwise convex hull, open ring.
/// A boundary with zero area is degenerate and contains nothing; the apex
/// alone is consumed in that case.
#[derive(Clone, Debug, Default)]
pub struct CrownBoundary {
    pub hull: Vec<Point2D>,
    pub area: f64,
}

impl CrownBoundary {
    pub fn degenerate() -> CrownBoundary {
        CrownBoundary {
            hull: vec![],
            area: 0f64,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.hull.len() < 3 || self.area <= 0f64
    }

    /// Boundary-inclusive containment test.
    pub fn contains(&self, p: &Point2D) -> bool {
        !self.is_degenerate() && point_in_poly(p, &self.hull)
    }

    /// Distance from a location to the farthest hull vertex. Every point the
    /// boundary contains lies within this distance.
    pub fn reach(&self, from: &Point2D) -> f64 {
        self.hull
            .iter()
            .map(|v| from.distance(v))
            .fold(0f64, f64::max)
    }
}

/// Selects the extremity points a boundary is built from. When profile
/// filtering is enabled, extremities closer to the apex than twice the point
/// spacing are dropped, as are those outside the 10th to 90th percentile
/// band of the remaining radii.
pub fn filter_extremities(extremities: &[Extremity], params: &HamrazParameters) -> Vec<Point2D> {
    if !params.filter_profiles {
        return extremities.iter().map(|e| e.point).collect();
    }
    let min_radius = 2f64 * params.nps;
    let kept: Vec<&Extremity> = extremities
        .iter()
        .filter(|e| e.radius >= min_radius)
        .collect();
    let radii: Vec<f64> = kept.iter().map(|e| e.radius).collect();
    match percentile_band(&radii, 10, 90) {
        Some((lower, upper)) => kept
            .iter()
            .filter(|e| e.radius >= lower && e.radius <= upper)
            .map(|e| e.point)
            .collect(),
        None => vec![],
    }
}

/// Builds the crown boundary from the per-sector extremities of an apex.
pub fn build_boundary(extremities: &[Extremity], params: &HamrazParameters) -> CrownBoundary {
    let mut points = filter_extremities(extremities, params);
    if points.len() < 4 {
        return CrownBoundary::degenerate();
    }
    let hull = convex_hull(&mut points);
    let area = polygon_area(&hull);
    if hull.len() < 3 || area <= 0f64 {
        return CrownBoundary::degenerate();
    }
    CrownBoundary { hull, area }
}
