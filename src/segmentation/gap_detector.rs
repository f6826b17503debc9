/*
This code is part of the crown_segmentation library.
Created: 19/10/2026
Last Modified: 19/10/2026
License: MIT
*/

use super::parameters::HamrazParameters;
use super::profile::Profile;
use crate::structures::Point2D;
use crate::utils::interquartile_range;

/// The rule that fixed the extremity of a profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// The sector held no points.
    Empty,
    /// The spacing between two consecutive samples exceeded the gap threshold.
    Gap,
    /// The profile climbed back out of a local minimum.
    HeightTrend,
    /// The profile ran beyond the plausible crown extent.
    CrownEnvelope,
    /// No transition was found within the search radius.
    Open,
}

/// The point at which a profile leaves the crown.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extremity {
    pub point: Point2D,
    pub radius: f64,
    pub bearing: f64,
    pub transition: Transition,
}

/// Plausible crown radius as a function of the height drop below the apex,
/// modelled by a narrow cone and by a sphere.
#[derive(Clone, Copy, Debug)]
pub struct CrownEnvelope {
    cone_length: f64,
    cone_factor: f64,
    sphere_diameter: f64,
    sphere_factor: f64,
}

impl CrownEnvelope {
    pub fn new(apex_height: f64, params: &HamrazParameters) -> CrownEnvelope {
        CrownEnvelope {
            cone_length: params.clc * apex_height,
            cone_factor: 1f64 + params.oc,
            sphere_diameter: params.cls * apex_height,
            sphere_factor: 1f64 + params.os,
        }
    }

    pub fn cone_radius(&self, height_drop: f64) -> f64 {
        self.cone_factor * height_drop.min(self.cone_length).max(0f64) / 2f64
    }

    pub fn sphere_radius(&self, height_drop: f64) -> f64 {
        let d = height_drop.min(self.sphere_diameter / 2f64).max(0f64);
        self.sphere_factor * (d * (self.sphere_diameter - d)).sqrt()
    }

    /// The tighter of the two envelopes.
    pub fn inner(&self, height_drop: f64) -> f64 {
        self.cone_radius(height_drop)
            .min(self.sphere_radius(height_drop))
    }

    /// The wider of the two envelopes.
    pub fn outer(&self, height_drop: f64) -> f64 {
        self.cone_radius(height_drop)
            .max(self.sphere_radius(height_drop))
    }
}

/// The spacing above which consecutive profile samples are separated by a
/// gap: `gap_sensitivity` times the interquartile range of the square-rooted
/// spacings, but never less than `2 * nps`, so that a regular profile (IQR
/// of zero) is not split at every sample.
pub fn gap_threshold(deltas: &[f64], params: &HamrazParameters) -> f64 {
    let roots: Vec<f64> = deltas.iter().map(|d| d.max(0f64).sqrt()).collect();
    let g = params.gap_sensitivity as f64 * interquartile_range(&roots);
    g.max(2f64 * params.nps)
}

/// Scans a profile outwards from the apex and returns the point where it
/// leaves the crown. The apex is the implicit first sample of every profile.
pub fn find_extremity(
    profile: &Profile,
    apex: &Point2D,
    apex_height: f64,
    params: &HamrazParameters,
) -> Extremity {
    let mut points = Vec::with_capacity(profile.samples.len() + 1);
    let mut radii = Vec::with_capacity(profile.samples.len() + 1);
    let mut heights = Vec::with_capacity(profile.samples.len() + 1);
    points.push(*apex);
    radii.push(0f64);
    heights.push(apex_height);
    for s in &profile.samples {
        points.push(s.point);
        radii.push(s.radius);
        heights.push(s.height);
    }

    let extremity = |i: usize, transition: Transition| -> Extremity {
        Extremity {
            point: points[i],
            radius: radii[i],
            bearing: if i == 0 {
                profile.bearing
            } else {
                apex.bearing(&points[i])
            },
            transition,
        }
    };

    let n = radii.len();
    if n == 1 {
        return extremity(0, Transition::Empty);
    }

    let deltas: Vec<f64> = (1..n).map(|i| radii[i] - radii[i - 1]).collect();
    let g = gap_threshold(&deltas, params);
    let envelope = CrownEnvelope::new(apex_height, params);
    let min_radius = params.min_crown_radius();
    let min_slope = params.epsilon.to_radians();

    // running minimum
    let mut m = 0usize;
    for i in 1..n {
        if deltas[i - 1] > g {
            return extremity(i - 1, Transition::Gap);
        }

        let drop = apex_height - heights[i];
        if heights[i] > heights[m]
            && (heights[i] - heights[m]).atan2(radii[i] - radii[m]) > min_slope
            && radii[m] >= min_radius
            && radii[i] > envelope.inner(drop)
        {
            return extremity(m, Transition::HeightTrend);
        }

        if radii[i] > envelope.outer(drop) && radii[i - 1] >= min_radius {
            return extremity(i - 1, Transition::CrownEnvelope);
        }

        if heights[i] < heights[m] {
            m = i;
        }
    }

    extremity(n - 1, Transition::Open)
}
