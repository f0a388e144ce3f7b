//! Configuration types and tunable constants for the sweep engine

use serde::{Deserialize, Serialize};

use crate::color::Color;

/// Tolerance for numeric comparisons in PDF user-space units (points).
/// Coordinates below this distance apart are treated as coincident.
pub const GEOMETRY_EPSILON: f64 = 1e-6;

/// Minimum polygon area, in square points, that counts as a real
/// intersection. Glyphs whose quads merely share an edge with a cleanup
/// region fall below this and are left untouched.
pub const AREA_EPSILON: f64 = 1e-4;

/// Determinant magnitude below which a transformation matrix is treated
/// as singular (non-invertible).
pub const SINGULARITY_EPSILON: f64 = 1e-10;

/// How matched characters are merged into cleanup regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergePolicy {
    /// One region per baseline segment: consecutive characters merge while
    /// they share a baseline and the horizontal gap stays within tolerance.
    /// Matches spanning a line break split into multiple regions.
    PerLine,
    /// One region per matched character, no merging.
    PerGlyph,
}

/// Global sweep configuration
///
/// Read-only after initialization; the engine holds no other state
/// between calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Fill color used for committed redactions when the strategy does
    /// not supply one.
    pub default_fill: Color,

    /// Region merging policy for matched characters.
    pub merge_policy: MergePolicy,

    /// Maximum horizontal gap, in points, between consecutive matched
    /// characters that still merge into one region under `PerLine`.
    pub merge_gap_tolerance: f64,

    /// Constant alpha applied to highlight overlays.
    pub overlay_alpha: f64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            default_fill: Color::black(),
            merge_policy: MergePolicy::PerLine,
            merge_gap_tolerance: 3.0,
            overlay_alpha: 0.35,
        }
    }
}
