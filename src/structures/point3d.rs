use super::Point2D;

/// A 3-D point, with x, y, and z fields.
#[derive(Default, Copy, Clone, Debug, PartialEq)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3D {
    /// Creates a new Point3D,
    pub fn new(x: f64, y: f64, z: f64) -> Point3D {
        Point3D { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// A point of the input cloud together with its position in that cloud.
/// The index is what lets results computed on a thinned subset be projected
/// back onto the full cloud.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LidarPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub index: usize,
}

impl LidarPoint {
    pub fn new(x: f64, y: f64, z: f64, index: usize) -> LidarPoint {
        LidarPoint { x, y, z, index }
    }

    pub fn planar(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}
