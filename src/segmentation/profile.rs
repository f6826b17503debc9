/*
This code is part of the crown_segmentation library.
Created: 19/10/2026
Last Modified: 19/10/2026
License: MIT
*/

use super::point_store::PointStore;
use crate::structures::Point2D;
use std::f64::consts::PI;

/// One working-set point seen from an apex.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProfileSample {
    pub slot: usize,
    pub point: Point2D,
    pub radius: f64,
    pub height: f64,
}

/// The samples of one angular sector, ordered by ascending radius.
#[derive(Clone, Debug)]
pub struct Profile {
    pub bin: usize,
    /// Bearing of the centre of the sector, in radians.
    pub bearing: f64,
    pub samples: Vec<ProfileSample>,
}

impl Profile {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Partitions the live working-set points within `search_radius` of an apex
/// into `num_bins` equal angular sectors. Points at the apex location itself
/// belong to no sector.
pub fn sample_profiles(
    store: &PointStore,
    apex_slot: usize,
    search_radius: f64,
    num_bins: usize,
) -> Vec<Profile> {
    let bin_width = 2f64 * PI / num_bins as f64;
    let mut profiles: Vec<Profile> = (0..num_bins)
        .map(|bin| Profile {
            bin,
            bearing: (bin as f64 + 0.5) * bin_width,
            samples: vec![],
        })
        .collect();

    let apex = store.surface_point(apex_slot).planar();
    for slot in store.live_within(&apex, search_radius) {
        let p = store.surface_point(slot);
        let point = p.planar();
        let radius = apex.distance(&point);
        if radius <= 0f64 {
            continue;
        }
        let bin = ((apex.bearing(&point) / bin_width).floor() as usize).min(num_bins - 1);
        profiles[bin].samples.push(ProfileSample {
            slot,
            point,
            radius,
            height: p.z,
        });
    }

    for profile in profiles.iter_mut() {
        profile
            .samples
            .sort_by(|a, b| a.radius.total_cmp(&b.radius).then(a.slot.cmp(&b.slot)));
    }

    profiles
}

#[cfg(test)]
mod test {
    use super::sample_profiles;
    use crate::configs::Configs;
    use crate::segmentation::point_store::PointStore;
    use crate::structures::Point3D;

    #[test]
    fn test_sample_profiles() {
        let points = vec![
            Point3D::new(0.0, 0.0, 20.0),
            Point3D::new(2.0, 0.0, 16.0),
            Point3D::new(1.0, 0.0, 18.0),
            Point3D::new(0.0, 1.0, 18.0),
            Point3D::new(-1.0, 0.0, 18.0),
            Point3D::new(0.5, -3.0, 12.0),
            Point3D::new(9.0, 0.0, 12.0),
        ];
        let mut store = PointStore::new(&points, 0.25, 1.0, &Configs::new()).unwrap();
        let apex = store.highest_live().unwrap();
        assert_eq!(store.surface_point(apex).index, 0);

        let profiles = sample_profiles(&store, apex, 5.0, 4);
        assert_eq!(profiles.len(), 4);
        let radii: Vec<f64> = profiles[0].samples.iter().map(|s| s.radius).collect();
        assert_eq!(radii, vec![1.0, 2.0]);
        assert_eq!(profiles[0].samples[0].height, 18.0);
        assert_eq!(profiles[1].samples.len(), 1);
        assert_eq!(profiles[2].samples.len(), 1);
        assert!((profiles[3].samples[0].radius - 9.25f64.sqrt()).abs() < 1e-12);
        assert!((profiles[1].bearing - 0.75 * std::f64::consts::PI).abs() < 1e-12);

        // consumed points are no longer profiled
        let slot = profiles[3].samples[0].slot;
        store.remove(slot);
        let profiles = sample_profiles(&store, apex, 5.0, 4);
        assert!(profiles[3].is_empty());
    }
}
