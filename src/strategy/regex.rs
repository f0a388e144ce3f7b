//! Regex-based text matching over extracted glyph positions

use regex::Regex;
use tracing::debug;

use crate::color::Color;
use crate::config::{MergePolicy, SweepConfig};
use crate::content::{GlyphStream, PageContext};
use crate::error::{Result, SweepError};
use crate::geometry::Quad;
use crate::strategy::{CleanupLocation, CleanupStrategy, Region};
use crate::warnings::WarningLog;

/// Matches a pattern against a page's logical text and redacts the
/// matched glyphs' device-space footprints.
#[derive(Debug)]
pub struct RegexCleanupStrategy {
    pattern: Regex,
    color: Option<Color>,
}

impl RegexCleanupStrategy {
    /// Compile the pattern, failing fast on malformed input
    pub fn new(pattern: &str) -> Result<Self> {
        let compiled =
            Regex::new(pattern).map_err(|e| SweepError::invalid_pattern(pattern, e))?;
        Ok(Self {
            pattern: compiled,
            color: None,
        })
    }

    /// Redaction color for every location this strategy produces
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }
}

/// One character of the page buffer with its source geometry
struct CharBox {
    /// Byte offset in the logical text buffer
    offset: usize,
    quad: Option<Quad>,
}

impl CleanupStrategy for RegexCleanupStrategy {
    fn compute_locations(
        &self,
        ctx: &PageContext<'_>,
        config: &SweepConfig,
        warnings: &mut WarningLog,
    ) -> Result<Vec<CleanupLocation>> {
        let mut buffer = String::new();
        let mut chars: Vec<CharBox> = Vec::new();
        for run in GlyphStream::new(ctx, warnings)? {
            for glyph in run.glyphs {
                chars.push(CharBox {
                    offset: buffer.len(),
                    quad: glyph.quad,
                });
                buffer.push(glyph.ch);
            }
        }

        let mut locations = Vec::new();
        for m in self.pattern.find_iter(&buffer) {
            // Matches anchor at the first non-discardable glyph: leading
            // and trailing whitespace contributes no geometry
            let (start, end) = trim_whitespace(&buffer, m.start(), m.end());
            if start >= end {
                continue;
            }
            let quads: Vec<Quad> = chars
                .iter()
                .filter(|c| c.offset >= start && c.offset < end)
                .filter_map(|c| c.quad)
                .collect();
            let regions = merge_quads(&quads, config);
            debug!(
                page = ctx.number,
                text = &buffer[start..end],
                regions = regions.len(),
                "pattern match"
            );
            for region in regions {
                locations.push(CleanupLocation {
                    page: ctx.number,
                    region,
                    fill: self.color,
                });
            }
        }
        Ok(locations)
    }
}

/// Shrink a match's byte range past leading and trailing whitespace
fn trim_whitespace(buffer: &str, start: usize, end: usize) -> (usize, usize) {
    let text = &buffer[start..end];
    let lead = text.len() - text.trim_start().len();
    let trail = text.len() - text.trim_end().len();
    (start + lead, end - trail)
}

/// Union adjacent character quads into regions per the merge policy.
///
/// `PerLine` groups quads that share a baseline band and sit within the
/// horizontal gap tolerance; a line break or a large gap starts a new
/// region, so a wrapped match yields one region per line segment.
fn merge_quads(quads: &[Quad], config: &SweepConfig) -> Vec<Region> {
    match config.merge_policy {
        MergePolicy::PerGlyph => quads.iter().map(|q| Region::Quad(*q)).collect(),
        MergePolicy::PerLine => {
            let mut regions = Vec::new();
            let mut current = None;
            for quad in quads {
                let r = quad.bounding_rect();
                current = match current {
                    None => Some(r),
                    Some(group) => {
                        let same_band = r.lly < group.ury && r.ury > group.lly;
                        let adjacent = r.llx - group.urx <= config.merge_gap_tolerance;
                        if same_band && adjacent {
                            Some(group.union(&r))
                        } else {
                            regions.push(Region::Rect(group));
                            Some(r)
                        }
                    }
                };
            }
            if let Some(group) = current {
                regions.push(Region::Rect(group));
            }
            regions
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    fn char_quad(x: f64, y: f64) -> Quad {
        Quad::from_rect(&Rect::new(x, y, x + 6.0, y + 10.0))
    }

    #[test]
    fn test_invalid_pattern_fails_construction() {
        let err = RegexCleanupStrategy::new("(unclosed").unwrap_err();
        assert!(matches!(err, SweepError::InvalidPattern { .. }));
    }

    #[test]
    fn test_trim_strips_leading_whitespace_only() {
        let buffer = "lorem Dolor sit";
        let (start, end) = trim_whitespace(buffer, 5, 11);
        assert_eq!(&buffer[start..end], "Dolor");
    }

    #[test]
    fn test_adjacent_quads_merge_into_one_line_region() {
        let quads: Vec<Quad> = (0..5).map(|i| char_quad(100.0 + 6.0 * i as f64, 700.0)).collect();
        let regions = merge_quads(&quads, &SweepConfig::default());
        assert_eq!(regions.len(), 1);
        assert_eq!(
            regions[0].bounding_rect(),
            Rect::new(100.0, 700.0, 130.0, 710.0)
        );
    }

    #[test]
    fn test_line_break_splits_region() {
        let mut quads: Vec<Quad> = (0..3).map(|i| char_quad(100.0 + 6.0 * i as f64, 700.0)).collect();
        quads.extend((0..3).map(|i| char_quad(72.0 + 6.0 * i as f64, 686.0)));
        let regions = merge_quads(&quads, &SweepConfig::default());
        assert_eq!(regions.len(), 2);
    }

    #[test]
    fn test_wide_gap_splits_region() {
        let quads = vec![char_quad(100.0, 700.0), char_quad(150.0, 700.0)];
        let regions = merge_quads(&quads, &SweepConfig::default());
        assert_eq!(regions.len(), 2);
    }

    #[test]
    fn test_per_glyph_policy_keeps_quads_distinct() {
        let config = SweepConfig {
            merge_policy: MergePolicy::PerGlyph,
            ..SweepConfig::default()
        };
        let quads = vec![char_quad(0.0, 0.0), char_quad(6.0, 0.0)];
        assert_eq!(merge_quads(&quads, &config).len(), 2);
    }
}
