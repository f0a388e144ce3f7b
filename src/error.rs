//! Error types for the content-stream redaction engine

use std::{io, result::Result as StdResult};

use thiserror::Error;

/// Custom result type for sweep operations
pub type Result<T> = StdResult<T, SweepError>;

/// Core error type for sweep operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SweepError {
    /// Malformed regular expression supplied to a cleanup strategy.
    /// Surfaced at construction time, never deferred to traversal.
    #[error("invalid cleanup pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: Box<regex::Error>,
    },

    /// A page index that is not present in the document.
    #[error("page {0} not found in document")]
    PageNotFound(u32),

    /// A content stream that cannot be tokenized or re-encoded.
    #[error("content stream error: {0}")]
    Content(String),

    /// Errors from the underlying PDF object model. These propagate
    /// unchanged through the facade rather than being swallowed.
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Report serialization failure (CLI JSON output).
    #[error("report serialization error: {0}")]
    Report(#[from] serde_json::Error),
}

impl SweepError {
    /// Helper for wrapping a pattern compilation failure
    pub fn invalid_pattern(pattern: &str, source: regex::Error) -> Self {
        SweepError::InvalidPattern {
            pattern: pattern.to_string(),
            source: Box::new(source),
        }
    }
}
