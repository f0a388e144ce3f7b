//! Points, axis-aligned rectangles and device-space quads

use serde::{Deserialize, Serialize};

use crate::config::GEOMETRY_EPSILON;

/// A point in PDF user-space coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle, normalized so `llx <= urx` and `lly <= ury`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub llx: f64,
    pub lly: f64,
    pub urx: f64,
    pub ury: f64,
}

impl Rect {
    pub fn new(llx: f64, lly: f64, urx: f64, ury: f64) -> Self {
        Self {
            llx: llx.min(urx),
            lly: lly.min(ury),
            urx: llx.max(urx),
            ury: lly.max(ury),
        }
    }

    pub fn width(&self) -> f64 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f64 {
        self.ury - self.lly
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Whether the rectangles overlap (shared edges count, within epsilon)
    pub fn intersects(&self, other: &Rect) -> bool {
        self.llx <= other.urx + GEOMETRY_EPSILON
            && other.llx <= self.urx + GEOMETRY_EPSILON
            && self.lly <= other.ury + GEOMETRY_EPSILON
            && other.lly <= self.ury + GEOMETRY_EPSILON
    }

    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.llx - GEOMETRY_EPSILON
            && p.x <= self.urx + GEOMETRY_EPSILON
            && p.y >= self.lly - GEOMETRY_EPSILON
            && p.y <= self.ury + GEOMETRY_EPSILON
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.llx >= self.llx - GEOMETRY_EPSILON
            && other.urx <= self.urx + GEOMETRY_EPSILON
            && other.lly >= self.lly - GEOMETRY_EPSILON
            && other.ury <= self.ury + GEOMETRY_EPSILON
    }

    /// Overlap of two rectangles, `None` when the overlap has no area
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let llx = self.llx.max(other.llx);
        let lly = self.lly.max(other.lly);
        let urx = self.urx.min(other.urx);
        let ury = self.ury.min(other.ury);
        if urx - llx > GEOMETRY_EPSILON && ury - lly > GEOMETRY_EPSILON {
            Some(Rect { llx, lly, urx, ury })
        } else {
            None
        }
    }

    /// Smallest rectangle covering both inputs
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            llx: self.llx.min(other.llx),
            lly: self.lly.min(other.lly),
            urx: self.urx.max(other.urx),
            ury: self.ury.max(other.ury),
        }
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.llx, self.lly),
            Point::new(self.urx, self.lly),
            Point::new(self.urx, self.ury),
            Point::new(self.llx, self.ury),
        ]
    }
}

/// Four device-space points; supports rotated and skewed regions.
/// Vertex order follows the source geometry (ll, lr, ur, ul for
/// upright text).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    pub points: [Point; 4],
}

impl Quad {
    pub fn new(points: [Point; 4]) -> Self {
        Self { points }
    }

    pub fn from_rect(r: &Rect) -> Self {
        Self { points: r.corners() }
    }

    /// The enclosing axis-aligned rectangle, derived on demand
    pub fn bounding_rect(&self) -> Rect {
        let xs = self.points.iter().map(|p| p.x);
        let ys = self.points.iter().map(|p| p.y);
        Rect {
            llx: xs.clone().fold(f64::INFINITY, f64::min),
            lly: ys.clone().fold(f64::INFINITY, f64::min),
            urx: xs.fold(f64::NEG_INFINITY, f64::max),
            ury: ys.fold(f64::NEG_INFINITY, f64::max),
        }
    }

    /// Signed-area magnitude via the shoelace formula
    pub fn area(&self) -> f64 {
        polygon_area(&self.points)
    }
}

/// Shoelace area of an arbitrary simple polygon
pub fn polygon_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..points.len() {
        let p = points[i];
        let q = points[(i + 1) % points.len()];
        sum += p.x * q.y - q.x * p.y;
    }
    sum.abs() / 2.0
}
