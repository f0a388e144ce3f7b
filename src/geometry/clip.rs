//! Sutherland–Hodgman polygon clipping against a rectangular window

use crate::config::{AREA_EPSILON, GEOMETRY_EPSILON};
use crate::geometry::quad::{polygon_area, Point, Rect};

/// The four half-planes of a rectangular clip window
#[derive(Clone, Copy)]
enum Edge {
    Left(f64),
    Right(f64),
    Bottom(f64),
    Top(f64),
}

impl Edge {
    fn inside(&self, p: Point) -> bool {
        match *self {
            Edge::Left(x) => p.x >= x - GEOMETRY_EPSILON,
            Edge::Right(x) => p.x <= x + GEOMETRY_EPSILON,
            Edge::Bottom(y) => p.y >= y - GEOMETRY_EPSILON,
            Edge::Top(y) => p.y <= y + GEOMETRY_EPSILON,
        }
    }

    /// Intersection of segment `a..b` with this edge line
    fn intersect(&self, a: Point, b: Point) -> Point {
        match *self {
            Edge::Left(x) | Edge::Right(x) => {
                let t = if (b.x - a.x).abs() < GEOMETRY_EPSILON {
                    0.0
                } else {
                    (x - a.x) / (b.x - a.x)
                };
                Point::new(x, a.y + t * (b.y - a.y))
            }
            Edge::Bottom(y) | Edge::Top(y) => {
                let t = if (b.y - a.y).abs() < GEOMETRY_EPSILON {
                    0.0
                } else {
                    (y - a.y) / (b.y - a.y)
                };
                Point::new(a.x + t * (b.x - a.x), y)
            }
        }
    }
}

/// Clip a simple polygon against an axis-aligned rectangle.
///
/// Returns the clipped polygon, or an empty vector when the inputs are
/// disjoint or the overlap degenerates to an edge or point. The clip
/// window is convex, so the result is at most one polygon.
pub fn clip_polygon(polygon: &[Point], window: &Rect) -> Vec<Point> {
    if polygon.len() < 3 {
        return Vec::new();
    }
    let edges = [
        Edge::Left(window.llx),
        Edge::Right(window.urx),
        Edge::Bottom(window.lly),
        Edge::Top(window.ury),
    ];

    let mut output: Vec<Point> = polygon.to_vec();
    for edge in edges {
        if output.is_empty() {
            break;
        }
        let input = std::mem::take(&mut output);
        let mut prev = *input.last().unwrap();
        for &current in &input {
            let current_in = edge.inside(current);
            let prev_in = edge.inside(prev);
            if current_in {
                if !prev_in {
                    output.push(edge.intersect(prev, current));
                }
                output.push(current);
            } else if prev_in {
                output.push(edge.intersect(prev, current));
            }
            prev = current;
        }
    }

    if polygon_area(&output) < AREA_EPSILON {
        Vec::new()
    } else {
        output
    }
}

/// Area of the overlap between a polygon and a rectangle
pub fn intersection_area(polygon: &[Point], window: &Rect) -> f64 {
    polygon_area(&clip_polygon(polygon, window))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::quad::Quad;

    fn square(llx: f64, lly: f64, side: f64) -> Quad {
        Quad::from_rect(&Rect::new(llx, lly, llx + side, lly + side))
    }

    #[test]
    fn test_fully_contained_polygon_is_unchanged() {
        let poly = square(2.0, 2.0, 4.0);
        let window = Rect::new(0.0, 0.0, 10.0, 10.0);
        let clipped = clip_polygon(&poly.points, &window);
        assert_eq!(clipped.len(), 4);
        assert!((polygon_area(&clipped) - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_polygon_clips_to_nothing() {
        let poly = square(20.0, 20.0, 5.0);
        let window = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(clip_polygon(&poly.points, &window).is_empty());
    }

    #[test]
    fn test_partial_overlap_halves_square() {
        let poly = square(5.0, 0.0, 10.0);
        let window = Rect::new(0.0, 0.0, 10.0, 10.0);
        let clipped = clip_polygon(&poly.points, &window);
        assert!((polygon_area(&clipped) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_edge_touching_polygon_has_no_area() {
        // Shares the window's right edge exactly
        let poly = square(10.0, 0.0, 5.0);
        let window = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(clip_polygon(&poly.points, &window).is_empty());
        assert_eq!(intersection_area(&poly.points, &window), 0.0);
    }

    #[test]
    fn test_rotated_convex_quad_against_rect() {
        // Diamond centered on the window corner
        let diamond = Quad::new([
            Point::new(0.0, -5.0),
            Point::new(5.0, 0.0),
            Point::new(0.0, 5.0),
            Point::new(-5.0, 0.0),
        ]);
        let window = Rect::new(0.0, 0.0, 10.0, 10.0);
        let clipped = clip_polygon(&diamond.points, &window);
        // One quadrant of the diamond survives
        assert!((polygon_area(&clipped) - 12.5).abs() < 1e-9);
    }

    #[test]
    fn test_window_inside_polygon_clips_to_window() {
        let poly = square(-100.0, -100.0, 300.0);
        let window = Rect::new(0.0, 0.0, 10.0, 10.0);
        let clipped = clip_polygon(&poly.points, &window);
        assert!((polygon_area(&clipped) - 100.0).abs() < 1e-9);
    }
}
