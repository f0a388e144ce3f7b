//! Content-stream redaction for PDF documents
//!
//! Locates regions of rendered page content matching caller-supplied
//! criteria (typically text patterns) and obscures them permanently or
//! provisionally, rewriting the page's content stream so the obscured
//! regions cannot be recovered by parsing or rendering.
//!
//! Three execution modes share one location-computation path:
//! commit ([`AutoSweep::clean_up`]), compute-only
//! ([`AutoSweep::tentative_clean_up`]) and highlight
//! ([`AutoSweep::highlight`]).

// Configuration and errors
pub mod config;
pub mod error;

// Geometry kernel
pub mod geometry;

// Content-stream traversal: state tracking, fonts, glyph extraction
pub mod content;

// Where to redact
pub mod color;
pub mod strategy;

// How to redact
pub mod rewrite;
pub mod warnings;

// Facade
pub mod sweep;

pub use color::Color;
pub use config::{MergePolicy, SweepConfig};
pub use error::{Result, SweepError};
pub use rewrite::{RewriteEngine, RewriteStats};
pub use strategy::{
    CleanupLocation, CleanupStrategy, CompositeCleanupStrategy, Region, RegexCleanupStrategy,
};
pub use sweep::{AutoSweep, SweepReport};
pub use warnings::{Warning, WarningKind, WarningLog};
