// private sub-module defined in other files
mod point2d;
mod point3d;

// exports identifiers from private sub-modules in the current module namespace
pub use self::point2d::Direction;
pub use self::point2d::Point2D;
pub use self::point3d::{LidarPoint, Point3D};
