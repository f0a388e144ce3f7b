//! Affine transformation matrices for PDF coordinate spaces

use thiserror::Error;

use crate::config::SINGULARITY_EPSILON;
use crate::geometry::quad::Point;

/// Raised when a matrix cannot be inverted because its determinant is
/// numerically zero. Recoverable: callers report it through the warning
/// sink and skip geometric projection for the affected operator.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("transformation matrix is not invertible")]
pub struct SingularTransform;

/// A 2D affine map in the PDF convention:
///
/// ```text
/// [ x' y' 1 ] = [ x y 1 ] * | a b 0 |
///                           | c d 0 |
///                           | e f 1 |
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Compose `self` followed by `next` (chain rule: `self * next`).
    pub fn then(&self, next: &Transform) -> Transform {
        Transform {
            a: self.a * next.a + self.b * next.c,
            b: self.a * next.b + self.b * next.d,
            c: self.c * next.a + self.d * next.c,
            d: self.c * next.b + self.d * next.d,
            e: self.e * next.a + self.f * next.c + next.e,
            f: self.e * next.b + self.f * next.d + next.f,
        }
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// Whether the determinant is within epsilon of zero
    pub fn is_singular(&self) -> bool {
        self.determinant().abs() < SINGULARITY_EPSILON
    }

    /// Invert the map, failing when the determinant is numerically zero
    pub fn invert(&self) -> Result<Transform, SingularTransform> {
        let det = self.determinant();
        if det.abs() < SINGULARITY_EPSILON {
            return Err(SingularTransform);
        }
        let inv = 1.0 / det;
        Ok(Transform {
            a: self.d * inv,
            b: -self.b * inv,
            c: -self.c * inv,
            d: self.a * inv,
            e: (self.c * self.f - self.d * self.e) * inv,
            f: (self.b * self.e - self.a * self.f) * inv,
        })
    }

    pub fn apply(&self, p: Point) -> Point {
        Point {
            x: self.a * p.x + self.c * p.y + self.e,
            y: self.b * p.x + self.d * p.y + self.f,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Transform::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_roundtrip() {
        let p = Point { x: 3.5, y: -7.25 };
        assert_eq!(Transform::IDENTITY.apply(p), p);
    }

    #[test]
    fn test_compose_translation_then_scale() {
        let t = Transform::translation(10.0, 20.0).then(&Transform::scale(2.0, 3.0));
        let p = t.apply(Point { x: 1.0, y: 1.0 });
        assert_eq!(p, Point { x: 22.0, y: 63.0 });
    }

    #[test]
    fn test_invert_recovers_point() {
        let t = Transform::new(2.0, 0.0, 1.0, 3.0, 5.0, -4.0);
        let inv = t.invert().unwrap();
        let p = Point { x: 12.0, y: 9.0 };
        let q = inv.apply(t.apply(p));
        assert!((q.x - p.x).abs() < 1e-9);
        assert!((q.y - p.y).abs() < 1e-9);
    }

    #[test]
    fn test_singular_matrix_fails_inversion() {
        let degenerate = Transform::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        assert!(degenerate.is_singular());
        assert_eq!(degenerate.invert(), Err(SingularTransform));

        // Rank-deficient but nonzero
        let collapsed = Transform::new(1.0, 2.0, 2.0, 4.0, 5.0, 6.0);
        assert!(collapsed.invert().is_err());
    }

    #[test]
    fn test_composition_with_singular_stays_singular() {
        let degenerate = Transform::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        let composed = degenerate.then(&Transform::scale(4.0, 4.0));
        assert!(composed.is_singular());
    }
}
