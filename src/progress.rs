//! Progress-callback trait for reduction-pass events.
//!
//! Inject an [`Arc<dyn SummaryProgressCallback>`] via
//! [`crate::config::SummarizeConfigBuilder::progress_callback`] to receive
//! events as the summarizer works through each pass and chunk.
//!
//! Chunks of one pass are summarised concurrently, so chunk events may arrive
//! from several tasks at once and in any order.
//!
//! # Example
//!
//! ```rust
//! use ocr_digest::{SummarizeConfig, SummaryProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl SummaryProgressCallback for CountingCallback {
//!     fn on_chunk_complete(&self, depth: u32, index: usize, total: usize, summary_len: usize) {
//!         let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("pass {depth}: chunk {index} done ({done}/{total}, {summary_len} chars)");
//!     }
//! }
//!
//! let config = SummarizeConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the summarizer as it processes each pass and chunk.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Chunk indices are 0-based; `depth` is the pass
/// depth (0 for the pass over the original transcript).
pub trait SummaryProgressCallback: Send + Sync {
    /// A reduction pass over `chunk_count` chunks is starting.
    fn on_pass_start(&self, depth: u32, chunk_count: usize) {
        let _ = (depth, chunk_count);
    }

    /// The model call for a chunk is about to be issued.
    fn on_chunk_start(&self, depth: u32, index: usize, total: usize) {
        let _ = (depth, index, total);
    }

    /// A transient failure occurred; the chunk will be retried.
    fn on_chunk_retry(&self, depth: u32, index: usize, attempt: u32, error: &str) {
        let _ = (depth, index, attempt, error);
    }

    /// A chunk was summarised.
    fn on_chunk_complete(&self, depth: u32, index: usize, total: usize, summary_len: usize) {
        let _ = (depth, index, total, summary_len);
    }

    /// A chunk failed permanently; the pass is being abandoned.
    fn on_chunk_error(&self, depth: u32, index: usize, total: usize, error: &str) {
        let _ = (depth, index, total, error);
    }

    /// A pass finished and produced a candidate of `candidate_tokens`.
    fn on_pass_complete(&self, depth: u32, candidate_tokens: usize, within_budget: bool) {
        let _ = (depth, candidate_tokens, within_budget);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SummaryProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SummarizeConfig`].
pub type ProgressCallback = Arc<dyn SummaryProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        passes: AtomicUsize,
        starts: AtomicUsize,
        retries: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
    }

    impl SummaryProgressCallback for TrackingCallback {
        fn on_pass_start(&self, _depth: u32, _chunk_count: usize) {
            self.passes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_chunk_start(&self, _depth: u32, _index: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_chunk_retry(&self, _depth: u32, _index: usize, _attempt: u32, _error: &str) {
            self.retries.fetch_add(1, Ordering::SeqCst);
        }

        fn on_chunk_complete(&self, _depth: u32, _index: usize, _total: usize, _len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_chunk_error(&self, _depth: u32, _index: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_pass_start(0, 3);
        cb.on_chunk_start(0, 0, 3);
        cb.on_chunk_retry(0, 0, 1, "rate limited");
        cb.on_chunk_complete(0, 0, 3, 42);
        cb.on_chunk_error(0, 1, 3, "rejected");
        cb.on_pass_complete(0, 120, true);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_pass_start(0, 2);
        tracker.on_chunk_start(0, 0, 2);
        tracker.on_chunk_retry(0, 0, 1, "timeout");
        tracker.on_chunk_complete(0, 0, 2, 100);
        tracker.on_chunk_start(0, 1, 2);
        tracker.on_chunk_error(0, 1, 2, "rejected");

        assert_eq!(tracker.passes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.retries.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_pass_start(1, 4);
        cb.on_chunk_complete(1, 3, 4, 512);
    }
}
