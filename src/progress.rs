//! Progress-callback trait for pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::run::Pipeline::with_progress`] to receive an event for every page
//! the extractor visits and one event as each later stage finishes. Stage
//! events fire as soon as their stage is done, so a run that fails at the
//! API call has already reported its extraction and token estimate.
//!
//! The CLI renders these as a progress bar and step lines; library callers
//! can forward them anywhere. Progress is purely cosmetic: the pipeline
//! behaves identically with the [`NoopProgressCallback`].
//!
//! # Example
//!
//! ```rust
//! use invoice2xml::PipelineProgressCallback;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct EmptyPageCounter(AtomicUsize);
//!
//! impl PipelineProgressCallback for EmptyPageCounter {
//!     fn on_page_empty(&self, page_num: usize, total_pages: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page_num}/{total_pages} has no text");
//!     }
//! }
//! ```

use crate::pipeline::llm::TokenUsage;
use std::path::Path;
use std::sync::Arc;

/// Called by the pipeline as it walks the pages of the PDF and moves
/// through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once the page count is known, before the first page.
    fn on_extraction_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called for a page that produced text.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — total pages in the document
    /// * `chars`       — characters of text taken from the page
    fn on_page_extracted(&self, page_num: usize, total_pages: usize, chars: usize) {
        let _ = (page_num, total_pages, chars);
    }

    /// Called for a page with no text layer. The page is skipped, not fatal.
    fn on_page_empty(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called once after every page has been visited.
    ///
    /// # Arguments
    /// * `total_pages`     — total pages in the document
    /// * `pages_with_text` — pages that contributed text
    fn on_extraction_complete(&self, total_pages: usize, pages_with_text: usize) {
        let _ = (total_pages, pages_with_text);
    }

    // ── Stage events ─────────────────────────────────────────────────────

    /// The PDF text is ready: `chars` characters after the final trim.
    fn on_text_extracted(
        &self,
        chars: usize,
        pages_with_text: usize,
        total_pages: usize,
        elapsed_ms: u64,
    ) {
        let _ = (chars, pages_with_text, total_pages, elapsed_ms);
    }

    /// The prompt template was loaded.
    fn on_prompt_loaded(&self, elapsed_ms: u64) {
        let _ = elapsed_ms;
    }

    /// The token estimate fits the budget.
    fn on_tokens_estimated(&self, estimated_tokens: usize, token_limit: usize) {
        let _ = (estimated_tokens, token_limit);
    }

    /// The completion request is about to be sent.
    fn on_api_call_start(&self, model: &str) {
        let _ = model;
    }

    /// A usable reply arrived.
    fn on_api_call_complete(&self, elapsed_ms: u64, usage: Option<TokenUsage>) {
        let _ = (elapsed_ms, usage);
    }

    /// The reply was written to `path`.
    fn on_output_written(&self, path: &Path, chars: usize, elapsed_ms: u64) {
        let _ = (path, chars, elapsed_ms);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::run::Pipeline`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        started_total: AtomicUsize,
        extracted: AtomicUsize,
        empty: AtomicUsize,
        with_text: AtomicUsize,
    }

    impl PipelineProgressCallback for TrackingCallback {
        fn on_extraction_start(&self, total_pages: usize) {
            self.started_total.store(total_pages, Ordering::SeqCst);
        }

        fn on_page_extracted(&self, _page_num: usize, _total_pages: usize, _chars: usize) {
            self.extracted.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_empty(&self, _page_num: usize, _total_pages: usize) {
            self.empty.fetch_add(1, Ordering::SeqCst);
        }

        fn on_extraction_complete(&self, _total_pages: usize, pages_with_text: usize) {
            self.with_text.store(pages_with_text, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_extraction_start(2);
        cb.on_page_extracted(1, 2, 40);
        cb.on_page_empty(2, 2);
        cb.on_extraction_complete(2, 1);
        cb.on_text_extracted(40, 1, 2, 3);
        cb.on_prompt_loaded(1);
        cb.on_tokens_estimated(20, 8192);
        cb.on_api_call_start("deepseek-chat");
        cb.on_api_call_complete(900, None);
        cb.on_output_written(Path::new("factura_processed.xml"), 10, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_extraction_start(3);
        tracker.on_page_extracted(1, 3, 10);
        tracker.on_page_empty(2, 3);
        tracker.on_page_extracted(3, 3, 12);
        tracker.on_extraction_complete(3, 2);

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.extracted.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.empty.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.with_text.load(Ordering::SeqCst), 2);
    }
}
