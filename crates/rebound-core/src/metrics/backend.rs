use std::{sync::Arc, time::Duration};

/// How a retry run ended, for metrics classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// The operation reported success.
    Succeeded,
    /// The caller cancelled the run.
    Cancelled,
    /// The operation dropped its report without calling it.
    Abandoned,
}

impl RetryOutcome {
    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            RetryOutcome::Succeeded => "succeeded",
            RetryOutcome::Cancelled => "cancelled",
            RetryOutcome::Abandoned => "abandoned",
        }
    }
}

/// Metrics collection interface for retry runs.
///
/// Implementations are injected into [`crate::BackoffScheduler`] and shared by every run it starts.
/// All methods take the backoff policy name as a low-cardinality label.
pub trait RetryMetrics: Send + Sync + 'static {
    /// Record an invocation of the operation (first call and every retry).
    fn record_attempt(&self, policy: &str);
    /// Record a retry being scheduled after a failure.
    ///
    /// # Arguments
    /// - `policy`: Backoff policy name
    /// - `delay`: Jittered delay before the retry fires
    fn record_retry_scheduled(&self, policy: &str, delay: Duration);
    /// Record the end of a run.
    ///
    /// # Arguments
    /// - `policy`: Backoff policy name
    /// - `outcome`: How the run terminated
    /// - `attempts`: Number of times the operation was invoked
    fn record_finished(&self, policy: &str, outcome: RetryOutcome, attempts: u32);
}

/// Shared handle to metrics backend.
pub type MetricsHandle = Arc<dyn RetryMetrics>;
