/*
This code is part of the crown_segmentation library.
Created: 19/10/2026
Last Modified: 19/10/2026
License: MIT
*/

//! Individual tree crown delineation from height-normalized LiDAR point
//! clouds using radial height profiles.
//!
//! The cloud is reduced to a working set of smoothed canopy surface points.
//! The tallest remaining point is repeatedly taken as a tree apex; the points
//! around it are split into angular sectors, each sector is scanned outwards
//! until it leaves the crown (a spacing gap, a rise towards a neighbouring
//! crown, or a radius implausible for the tree's height), and the convex hull
//! of the sector extremities becomes the crown boundary. Points inside the
//! boundary are consumed, and every input point inside an accepted boundary
//! takes the tree's id unless an earlier, taller tree already claimed it.

mod boundary;
mod engine;
mod gap_detector;
mod parameters;
mod point_store;
mod profile;

pub use self::boundary::{build_boundary, filter_extremities, CrownBoundary};
pub use self::engine::{
    claim, CrownSegmenter, IterationReport, SegmentationResult, TreeRecord,
};
pub use self::gap_detector::{find_extremity, gap_threshold, CrownEnvelope, Extremity, Transition};
pub use self::parameters::{parameter_descriptions, HamrazParameters};
pub use self::point_store::{PointSource, PointStore};
pub use self::profile::{sample_profiles, Profile, ProfileSample};

use crate::configs::get_configs;
use std::io::Error;

/// Segments a point cloud with the given parameters, using the environment
/// settings of the settings.json file in the working directory, if any.
pub fn segment_point_cloud<S: PointSource + ?Sized>(
    source: &S,
    params: &HamrazParameters,
) -> Result<SegmentationResult, Error> {
    let configurations = get_configs()?;
    CrownSegmenter::new(params.clone())
        .with_configs(configurations)
        .run(source)
}
