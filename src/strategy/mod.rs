//! Cleanup strategies: decide WHERE to redact
//!
//! A strategy inspects one page at a time and produces cleanup locations
//! in page device space. The rewrite engine consumes those locations
//! without knowing how they were found.

use serde::Serialize;

use crate::color::Color;
use crate::config::SweepConfig;
use crate::content::PageContext;
use crate::error::Result;
use crate::geometry::{Point, Quad, Rect};
use crate::warnings::WarningLog;

pub mod composite;
pub mod regex;

pub use composite::CompositeCleanupStrategy;
pub use regex::RegexCleanupStrategy;

/// A redaction region in page device space
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Region {
    /// Axis-aligned rectangle
    Rect(Rect),
    /// Arbitrary (possibly rotated or skewed) quadrilateral
    Quad(Quad),
}

impl Region {
    pub fn bounding_rect(&self) -> Rect {
        match self {
            Region::Rect(r) => *r,
            Region::Quad(q) => q.bounding_rect(),
        }
    }

    /// Corner polygon in drawing order
    pub fn polygon(&self) -> [Point; 4] {
        match self {
            Region::Rect(r) => r.corners(),
            Region::Quad(q) => q.points,
        }
    }
}

/// One region to obscure, with an optional per-location fill color.
/// Immutable once produced; overlapping locations are legal.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupLocation {
    pub page: u32,
    pub region: Region,
    /// `None` falls back to [`SweepConfig::default_fill`]
    pub fill: Option<Color>,
}

impl CleanupLocation {
    pub fn new(page: u32, region: Region) -> Self {
        Self {
            page,
            region,
            fill: None,
        }
    }

    pub fn with_fill(mut self, color: Color) -> Self {
        self.fill = Some(color);
        self
    }
}

/// Computes cleanup locations for a page.
///
/// Implementations must build all matcher state locally per call: no
/// state leaks across pages or across composite siblings.
pub trait CleanupStrategy {
    fn compute_locations(
        &self,
        ctx: &PageContext<'_>,
        config: &SweepConfig,
        warnings: &mut WarningLog,
    ) -> Result<Vec<CleanupLocation>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_bounding_rect_of_rotated_quad() {
        let quad = Quad::new([
            Point::new(5.0, 0.0),
            Point::new(10.0, 5.0),
            Point::new(5.0, 10.0),
            Point::new(0.0, 5.0),
        ]);
        let bounds = Region::Quad(quad).bounding_rect();
        assert_eq!(bounds, Rect::new(0.0, 0.0, 10.0, 10.0));
    }
}
