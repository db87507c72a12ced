use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace};

use rebound_model::BackoffStrategy;

use crate::{
    backoff::{BackoffState, RandomSource, ThreadRandom},
    error::{CoreError, CoreResult},
    metrics::{NoOpMetrics, RetryMetrics, RetryOutcome},
};

use super::BackoffScheduler;

/// Await `op` until it resolves to `true`, sleeping between attempts according to `strategy`.
///
/// `op` receives the 1-based attempt number. Returns the number of attempts on success,
/// or [`CoreError::Cancelled`] once `cancel` fires (an in-flight attempt is dropped).
pub async fn retry_until_success<F, Fut>(
    strategy: &BackoffStrategy,
    cancel: &CancellationToken,
    op: F,
) -> CoreResult<u32>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = bool>,
{
    strategy.validate()?;
    retry_loop(strategy, &ThreadRandom, &NoOpMetrics, cancel, op).await
}

impl BackoffScheduler {
    /// Async counterpart of [`BackoffScheduler::run`].
    ///
    /// Uses this scheduler's strategy, random source and metrics. Sleeping happens on the current
    /// tokio runtime; the configured [`crate::Schedule`] implementation is not involved.
    pub async fn retry<F, Fut>(&self, cancel: &CancellationToken, op: F) -> CoreResult<u32>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = bool>,
    {
        retry_loop(
            self.strategy(),
            self.random().as_ref(),
            self.metrics().as_ref(),
            cancel,
            op,
        )
        .await
    }
}

#[instrument(level = "debug", skip_all, fields(policy = %strategy.policy))]
async fn retry_loop<F, Fut>(
    strategy: &BackoffStrategy,
    random: &dyn RandomSource,
    metrics: &dyn RetryMetrics,
    cancel: &CancellationToken,
    mut op: F,
) -> CoreResult<u32>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = bool>,
{
    let label = strategy.policy.as_str();
    let mut state: Option<BackoffState> = None;
    let mut attempt: u32 = 1;

    loop {
        if cancel.is_cancelled() {
            return Err(cancelled(metrics, label, attempt - 1));
        }
        metrics.record_attempt(label);
        trace!(attempt, "invoking operation");

        let ok = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled(metrics, label, attempt)),
            ok = op(attempt) => ok,
        };
        if ok {
            debug!(attempts = attempt, "operation succeeded");
            metrics.record_finished(label, RetryOutcome::Succeeded, attempt);
            return Ok(attempt);
        }

        let next = match &state {
            None => BackoffState::first(strategy, random),
            Some(prev) => prev.next(random),
        };
        let delay = next.delay();
        metrics.record_retry_scheduled(label, delay);
        debug!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            "attempt failed; retry scheduled"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled(metrics, label, attempt)),
            _ = tokio::time::sleep(delay) => {}
        }
        state = Some(next);
        attempt = attempt.saturating_add(1);
    }
}

fn cancelled(metrics: &dyn RetryMetrics, label: &str, attempts: u32) -> CoreError {
    debug!(attempts, "retry run cancelled");
    metrics.record_finished(label, RetryOutcome::Cancelled, attempts);
    CoreError::Cancelled { attempts }
}
