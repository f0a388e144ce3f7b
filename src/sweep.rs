//! AutoSweep facade: compute, preview, highlight or commit redactions
//! over whole documents or single pages.

use lopdf::{Document, ObjectId};
use serde::Serialize;
use tracing::info;

use crate::config::SweepConfig;
use crate::content::PageContext;
use crate::error::{Result, SweepError};
use crate::rewrite::{RewriteEngine, RewriteStats};
use crate::strategy::{CleanupLocation, CleanupStrategy};
use crate::warnings::WarningLog;

/// Outcome of one sweep operation: the locations that were (or would
/// be) redacted, the recoverable conditions met on the way, and the
/// commit-pass counters.
#[derive(Debug, Serialize)]
pub struct SweepReport {
    pub locations: Vec<CleanupLocation>,
    pub warnings: WarningLog,
    pub stats: RewriteStats,
}

impl SweepReport {
    /// Locations found on one page, in discovery order
    pub fn locations_on_page(&self, page: u32) -> Vec<&CleanupLocation> {
        self.locations.iter().filter(|l| l.page == page).collect()
    }
}

/// Drives a cleanup strategy across a document.
///
/// Compute-only operations take `&Document` and cannot touch the file;
/// commit and highlight take `&mut Document` and replace page content
/// streams atomically, one page at a time.
pub struct AutoSweep<S> {
    strategy: S,
    config: SweepConfig,
}

impl<S: CleanupStrategy> AutoSweep<S> {
    pub fn new(strategy: S) -> Self {
        Self {
            strategy,
            config: SweepConfig::default(),
        }
    }

    pub fn with_config(strategy: S, config: SweepConfig) -> Self {
        Self { strategy, config }
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Compute-only over one page
    pub fn get_cleanup_locations(&self, doc: &Document, page: u32) -> Result<SweepReport> {
        let id = page_id(doc, page)?;
        let mut warnings = WarningLog::new();
        let locations = self.compute(doc, &[(page, id)], &mut warnings)?;
        Ok(SweepReport {
            locations,
            warnings,
            stats: RewriteStats::default(),
        })
    }

    /// Compute-only over the whole document; the document is untouched
    pub fn tentative_clean_up(&self, doc: &Document) -> Result<SweepReport> {
        let pages = page_ids(doc);
        let mut warnings = WarningLog::new();
        let locations = self.compute(doc, &pages, &mut warnings)?;
        Ok(SweepReport {
            locations,
            warnings,
            stats: RewriteStats::default(),
        })
    }

    /// Compute-only over one page
    pub fn tentative_clean_up_page(&self, doc: &Document, page: u32) -> Result<SweepReport> {
        self.get_cleanup_locations(doc, page)
    }

    /// Commit mode over the whole document
    pub fn clean_up(&self, doc: &mut Document) -> Result<SweepReport> {
        let pages = page_ids(doc);
        self.clean_up_pages(doc, &pages)
    }

    /// Commit mode over one page
    pub fn clean_up_page(&self, doc: &mut Document, page: u32) -> Result<SweepReport> {
        let id = page_id(doc, page)?;
        self.clean_up_pages(doc, &[(page, id)])
    }

    /// Highlight mode over the whole document
    pub fn highlight(&self, doc: &mut Document) -> Result<SweepReport> {
        let pages = page_ids(doc);
        self.highlight_pages(doc, &pages)
    }

    /// Highlight mode over one page
    pub fn highlight_page(&self, doc: &mut Document, page: u32) -> Result<SweepReport> {
        let id = page_id(doc, page)?;
        self.highlight_pages(doc, &[(page, id)])
    }

    fn compute(
        &self,
        doc: &Document,
        pages: &[(u32, ObjectId)],
        warnings: &mut WarningLog,
    ) -> Result<Vec<CleanupLocation>> {
        let mut locations = Vec::new();
        for &(number, id) in pages {
            let ctx = PageContext { doc, number, id };
            locations.extend(self.strategy.compute_locations(&ctx, &self.config, warnings)?);
        }
        Ok(locations)
    }

    fn clean_up_pages(
        &self,
        doc: &mut Document,
        pages: &[(u32, ObjectId)],
    ) -> Result<SweepReport> {
        let mut warnings = WarningLog::new();
        let locations = self.compute(doc, pages, &mut warnings)?;
        let engine = RewriteEngine::new(&self.config);
        let mut stats = RewriteStats::default();
        for &(number, id) in pages {
            let page_stats = engine.redact_page(doc, number, id, &locations, &mut warnings)?;
            stats.merge(&page_stats);
        }
        info!(
            locations = locations.len(),
            warnings = warnings.total(),
            "cleanup committed"
        );
        Ok(SweepReport {
            locations,
            warnings,
            stats,
        })
    }

    fn highlight_pages(
        &self,
        doc: &mut Document,
        pages: &[(u32, ObjectId)],
    ) -> Result<SweepReport> {
        let mut warnings = WarningLog::new();
        let locations = self.compute(doc, pages, &mut warnings)?;
        let engine = RewriteEngine::new(&self.config);
        for &(number, id) in pages {
            engine.highlight_page(doc, number, id, &locations)?;
        }
        Ok(SweepReport {
            locations,
            warnings,
            stats: RewriteStats::default(),
        })
    }
}

/// Pages in document order, 1-based
fn page_ids(doc: &Document) -> Vec<(u32, ObjectId)> {
    doc.get_pages().into_iter().collect()
}

fn page_id(doc: &Document, page: u32) -> Result<ObjectId> {
    doc.get_pages()
        .get(&page)
        .copied()
        .ok_or(SweepError::PageNotFound(page))
}
