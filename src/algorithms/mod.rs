/*
This code is part of the crown_segmentation library.
Created: 19/10/2026
Last Modified: 19/10/2026
License: MIT
*/
// private sub-module defined in other files
mod convex_hull;
mod poly_area;
mod poly_ops;

// exports identifiers from private sub-modules in the current module namespace
pub use self::convex_hull::convex_hull;
pub use self::poly_area::polygon_area;
pub use self::poly_ops::{is_left, point_in_poly, winding_number};
