//! Result types returned by the OCR processor.

use crate::error::PageError;
use serde::Serialize;
use std::path::PathBuf;

/// What happened to one page during a run.
#[derive(Debug, Clone, Serialize)]
pub struct PageOutcome {
    /// 1-based page number.
    pub page: usize,
    pub disposition: PageDisposition,
}

/// The three ways a page leaves the loop.
#[derive(Debug, Clone, Serialize)]
pub enum PageDisposition {
    /// Extracted this run; result and progress record committed.
    Extracted,
    /// Already done on a previous run; result re-read and aggregated.
    Resumed,
    /// Left incomplete; the next run retries it.
    Skipped(PageError),
}

impl PageOutcome {
    /// Whether the page's text made it into the aggregate.
    pub fn is_complete(&self) -> bool {
        !matches!(self.disposition, PageDisposition::Skipped(_))
    }
}

/// Timing and page counters for one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    /// Pages in the document.
    pub total_pages: usize,
    /// Pages extracted (paid for) this run.
    pub extracted_pages: usize,
    /// Pages satisfied from a previous run's results.
    pub resumed_pages: usize,
    /// Pages left incomplete this run.
    pub skipped_pages: usize,
    /// Wall-clock for the whole run.
    pub total_duration_ms: u64,
    /// Time spent rasterising.
    pub render_duration_ms: u64,
    /// Time spent in the page loop (extraction calls and commits).
    pub extract_duration_ms: u64,
}

/// Everything a completed OCR run produced.
#[derive(Debug, Clone, Serialize)]
pub struct OcrOutput {
    /// Per-page outcomes in page order.
    pub pages: Vec<PageOutcome>,
    /// Where the aggregate was written.
    pub aggregate_path: PathBuf,
    pub stats: RunStats,
}

impl OcrOutput {
    /// Pages that are still incomplete after this run.
    pub fn incomplete_pages(&self) -> Vec<usize> {
        self.pages
            .iter()
            .filter(|p| !p.is_complete())
            .map(|p| p.page)
            .collect()
    }
}
