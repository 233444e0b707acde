//! Progress-callback trait for per-company batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::TrackerConfigBuilder::progress_callback`] to receive
//! events as the batch runner works through each company.
//!
//! # Example
//!
//! ```rust
//! use tariff_tracker::{BatchProgressCallback, TrackerConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     failed: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_company_error(&self, key: &str, _index: usize, _total: usize, error: &str) {
//!         self.failed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{key}: {error}");
//!     }
//! }
//!
//! let config = TrackerConfig::builder()
//!     .fmp_api_key("fmp")
//!     .deepseek_api_key("sk")
//!     .progress_callback(Arc::new(CountingCallback { failed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch runner as it processes each company.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `index` is 1-based.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first company is processed.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called before a company's text is acquired.
    fn on_company_start(&self, key: &str, index: usize, total: usize) {
        let _ = (key, index, total);
    }

    /// Called when a company produced an analysis.
    fn on_company_complete(&self, key: &str, index: usize, total: usize) {
        let _ = (key, index, total);
    }

    /// Called when a company failed; the batch continues.
    ///
    /// `error` is the human-readable notice also stored on the entry.
    fn on_company_error(&self, key: &str, index: usize, total: usize, error: &str) {
        let _ = (key, index, total, error);
    }

    /// Called once after every company has been attempted.
    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::TrackerConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
