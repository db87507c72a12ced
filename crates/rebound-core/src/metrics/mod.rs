//! Metrics collection abstraction for retry runs.
//!
//! Backends (prometheus, statsd, etc) implement [`RetryMetrics`] and are injected via [`crate::BackoffScheduler::with_metrics`].
mod backend;
pub use backend::{MetricsHandle, RetryMetrics, RetryOutcome};

mod noop;
pub use noop::NoOpMetrics;

use std::sync::Arc;

/// Create a no-op metrics handle.
#[inline]
pub fn noop_metrics() -> MetricsHandle {
    Arc::new(NoOpMetrics)
}
