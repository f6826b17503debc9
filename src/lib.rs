pub mod algorithms;
pub mod configs;
pub mod segmentation;
pub mod structures;
pub mod utils;

pub use crate::configs::Configs;
pub use crate::segmentation::{
    segment_point_cloud, CrownSegmenter, HamrazParameters, PointSource, SegmentationResult,
    TreeRecord,
};
pub use crate::structures::Point3D;
