//! Progress-callback trait for per-page extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to drive a
//! "processing page i of n" status line. Pages run strictly one after
//! another, so events arrive in page order and never overlap.
//!
//! # Example
//!
//! ```rust
//! use scan2data::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::Arc;
//!
//! struct StatusLine;
//!
//! impl ExtractionProgressCallback for StatusLine {
//!     fn on_page_start(&self, page_num: usize, total_pages: usize) {
//!         eprintln!("Processing {page_num} of {total_pages}");
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(StatusLine))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the extraction pipeline as it works through the pages.
///
/// All methods default to no-ops so implementors override only what they
/// need. `Send + Sync` lets the callback travel with the config into
/// spawned tasks.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once before the first page is sent.
    fn on_run_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before the vision request for a page (1-indexed).
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page has been extracted and parsed.
    ///
    /// `raw_len` is the byte length of the model's raw text.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, raw_len: usize) {
        let _ = (page_num, total_pages, raw_len);
    }

    /// Called when a page fails. The run stops after this event.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after every page succeeded and the merge is done.
    fn on_run_complete(&self, total_pages: usize) {
        let _ = total_pages;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
