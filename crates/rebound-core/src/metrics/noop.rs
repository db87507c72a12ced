use std::time::Duration;

use crate::metrics::backend::{RetryMetrics, RetryOutcome};

/// No-op metrics backend that compiles to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl RetryMetrics for NoOpMetrics {
    #[inline(always)]
    fn record_attempt(&self, _: &str) {}

    #[inline(always)]
    fn record_retry_scheduled(&self, _: &str, _: Duration) {}

    #[inline(always)]
    fn record_finished(&self, _: &str, _: RetryOutcome, _: u32) {}
}
