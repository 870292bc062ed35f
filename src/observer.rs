//! Run-observer trait for per-page processing events.
//!
//! Inject an `Arc<dyn RunObserver>` via
//! [`crate::config::OcrConfigBuilder::observer`] to receive events as the
//! processor visits each page. The CLI uses this for its progress bar; a
//! host application can forward events to a channel or UI without the
//! library knowing how.
//!
//! All methods have default no-op implementations so implementors only
//! override what they care about. The page loop is strictly sequential, so
//! events for one run never arrive concurrently.

use crate::output::RunStats;

/// Called by the processor as it visits each page.
pub trait RunObserver: Send + Sync {
    /// Called once, before the first page, with the document's page count.
    fn on_run_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Page was already done; its recorded result was re-read successfully.
    fn on_page_resumed(&self, page: usize, total_pages: usize) {
        let _ = (page, total_pages);
    }

    /// Page was extracted and committed (result + progress record written).
    fn on_page_extracted(&self, page: usize, total_pages: usize) {
        let _ = (page, total_pages);
    }

    /// Page failed or produced nothing; it stays incomplete for a later run.
    fn on_page_skipped(&self, page: usize, total_pages: usize, reason: &str) {
        let _ = (page, total_pages, reason);
    }

    /// Called once after the aggregate has been written.
    fn on_run_complete(&self, stats: &RunStats) {
        let _ = stats;
    }
}

/// No-op implementation for callers that don't need events.
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counting {
        resumed: AtomicUsize,
        extracted: AtomicUsize,
        skipped: AtomicUsize,
    }

    impl RunObserver for Counting {
        fn on_page_resumed(&self, _page: usize, _total: usize) {
            self.resumed.fetch_add(1, Ordering::SeqCst);
        }
        fn on_page_extracted(&self, _page: usize, _total: usize) {
            self.extracted.fetch_add(1, Ordering::SeqCst);
        }
        fn on_page_skipped(&self, _page: usize, _total: usize, _reason: &str) {
            self.skipped.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_observer_does_not_panic() {
        let obs = NoopObserver;
        obs.on_run_start(3);
        obs.on_page_resumed(1, 3);
        obs.on_page_extracted(2, 3);
        obs.on_page_skipped(3, 3, "extraction failed");
    }

    #[test]
    fn events_reach_an_arc_dyn_observer() {
        let counting = Arc::new(Counting::default());
        let obs: Arc<dyn RunObserver> = counting.clone();
        obs.on_page_resumed(1, 2);
        obs.on_page_extracted(2, 2);
        assert_eq!(counting.resumed.load(Ordering::SeqCst), 1);
        assert_eq!(counting.extracted.load(Ordering::SeqCst), 1);
        assert_eq!(counting.skipped.load(Ordering::SeqCst), 0);
    }
}
