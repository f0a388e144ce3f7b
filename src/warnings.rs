//! Warning sink for recoverable traversal conditions
//!
//! Recoverable conditions (non-invertible matrices, content constructs
//! that cannot be projected to device space) are reported here with a
//! stable message identity and an occurrence count, so callers and tests
//! can assert exact counts for audit purposes.

use std::collections::HashSet;

use serde::Serialize;
use tracing::warn;

/// Stable message for a transformation matrix that could not be processed
pub const FAILED_TO_PROCESS_TRANSFORMATION_MATRIX: &str =
    "Failed to process a transformation matrix which is noninvertible";

/// Stable message for a content construct that could not be projected
pub const UNSUPPORTED_CONTENT_CONSTRUCT: &str =
    "Skipped a content construct that could not be projected to device space";

/// Category of a recoverable condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WarningKind {
    /// A transform whose composition became singular; the affected
    /// operator's geometry is excluded from redaction.
    SingularTransform,
    /// A drawing construct the extraction adapter cannot project; it
    /// contributes no region and passes through unmodified.
    UnsupportedContent,
}

impl WarningKind {
    pub fn message(&self) -> &'static str {
        match self {
            WarningKind::SingularTransform => FAILED_TO_PROCESS_TRANSFORMATION_MATRIX,
            WarningKind::UnsupportedContent => UNSUPPORTED_CONTENT_CONSTRUCT,
        }
    }
}

/// One recorded occurrence
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub page: u32,
    /// Operator identity within the page: the operator index, prefixed by
    /// the indices of any enclosing form invocations (e.g. `"4/12"`).
    pub operator: String,
    pub message: &'static str,
}

/// Counted, operator-deduplicated collection of warnings for one sweep
/// operation.
///
/// The location-computation pass and the rewrite pass traverse the same
/// operators; deduplication by operator identity keeps each offending
/// operator counted exactly once across both.
#[derive(Debug, Default, Serialize)]
pub struct WarningLog {
    entries: Vec<Warning>,
    #[serde(skip)]
    seen: HashSet<(WarningKind, u32, String)>,
}

impl WarningLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence; returns false when the same operator was
    /// already reported for this kind.
    pub fn report(&mut self, kind: WarningKind, page: u32, operator: &str) -> bool {
        let key = (kind, page, operator.to_string());
        if !self.seen.insert(key) {
            return false;
        }
        warn!(page, operator, "{}", kind.message());
        self.entries.push(Warning {
            kind,
            page,
            operator: operator.to_string(),
            message: kind.message(),
        });
        true
    }

    pub fn count(&self, kind: WarningKind) -> usize {
        self.entries.iter().filter(|w| w.kind == kind).count()
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Warning] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_operator_counts_once() {
        let mut log = WarningLog::new();
        assert!(log.report(WarningKind::SingularTransform, 1, "3"));
        assert!(!log.report(WarningKind::SingularTransform, 1, "3"));
        assert!(log.report(WarningKind::SingularTransform, 1, "7"));
        assert_eq!(log.count(WarningKind::SingularTransform), 2);
    }

    #[test]
    fn test_kinds_and_pages_are_distinct_identities() {
        let mut log = WarningLog::new();
        log.report(WarningKind::SingularTransform, 1, "3");
        log.report(WarningKind::UnsupportedContent, 1, "3");
        log.report(WarningKind::SingularTransform, 2, "3");
        assert_eq!(log.total(), 3);
        assert_eq!(log.count(WarningKind::UnsupportedContent), 1);
    }
}
