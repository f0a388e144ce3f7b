//! Geometry kernel: affine transforms, rectangles, quads and clipping

pub mod clip;
pub mod quad;
pub mod transform;

pub use clip::{clip_polygon, intersection_area};
pub use quad::{polygon_area, Point, Quad, Rect};
pub use transform::{SingularTransform, Transform};
