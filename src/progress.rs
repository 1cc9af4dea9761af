//! Progress-callback trait for per-item batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::ConvertConfigBuilder::progress_callback`] or
//! [`crate::config::CheckConfigBuilder::progress_callback`] to receive events
//! as each record is converted or each manifest is checked.
//!
//! Callers can forward events to a terminal progress bar, a log file or a
//! channel without the library knowing how the host application reports.
//!
//! # Example
//!
//! ```rust
//! use georef_iiif::{BatchProgressCallback, ConvertConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: Arc<AtomicUsize>,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_item_complete(&self, index: usize, total: usize, label: &str) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{index}/{total} {label}");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = ConvertConfig::builder()
//!     .base_uri("https://example.org/annotations")
//!     .progress_callback(counter as Arc<dyn BatchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch drivers as they process each item.
///
/// Items are processed sequentially, but implementations must still be
/// `Send + Sync` so configs can be shared across tasks. All methods have
/// default no-op implementations so callers only override what they need.
/// `index` is always 1-based.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first item.
    ///
    /// # Arguments
    /// * `total`: number of items in the batch, including any that will fail
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called before an item is processed.
    ///
    /// # Arguments
    /// * `index`: 1-based position in the batch
    /// * `total`: batch size
    /// * `label`: record id when converting, manifest URL when checking
    fn on_item_start(&self, index: usize, total: usize, label: &str) {
        let _ = (index, total, label);
    }

    /// Called when an item finished without error.
    ///
    /// # Arguments
    /// * `index`: 1-based position in the batch
    /// * `total`: batch size
    /// * `label`: same label passed to [`on_item_start`](Self::on_item_start)
    fn on_item_complete(&self, index: usize, total: usize, label: &str) {
        let _ = (index, total, label);
    }

    /// Called when an item failed; the batch carries on.
    ///
    /// # Arguments
    /// * `index`: 1-based position in the batch
    /// * `total`: batch size
    /// * `label`: same label passed to [`on_item_start`](Self::on_item_start)
    /// * `error`: human-readable reason, e.g. `missing field 'new_gcps'`
    fn on_item_error(&self, index: usize, total: usize, label: &str, error: &str) {
        let _ = (index, total, label, error);
    }

    /// Called once after every item has been attempted.
    ///
    /// # Arguments
    /// * `total`: batch size
    /// * `success_count`: items that completed without error
    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in the config structs.
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
