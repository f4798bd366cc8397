//! Progress-callback trait for per-file batch conversion events.
//!
//! Inject an `Arc<dyn ConvertProgress>` via
//! [`crate::config::ConvertConfigBuilder::progress`] to receive events as
//! the batch front-end processes each file.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers
//! can forward events to a terminal progress bar, a log, or a channel of
//! their own — without the library knowing anything about how the host
//! application communicates. The trait is `Send + Sync` because files are
//! converted concurrently on the worker pool.

use crate::task::Outcome;

/// Called by the batch front-end as it processes each file.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. When `max_workers > 1`, `on_file_done` may be
/// called concurrently from different tasks; implementations must guard
/// shared mutable state accordingly.
pub trait ConvertProgress: Send + Sync {
    /// Called once before any file is submitted.
    ///
    /// # Arguments
    /// * `total` — number of files that will be converted in this batch
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called as each file's outcome is recorded, in completion order
    /// (not submission order).
    fn on_file_done(&self, outcome: &Outcome) {
        let _ = outcome;
    }
}
