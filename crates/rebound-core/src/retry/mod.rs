//! Callback-driven retry loop.
//!
//! [`BackoffScheduler::run`] invokes the operation immediately on the caller's thread.
//! Every failed attempt schedules the next one through a [`crate::Schedule`] implementation,
//! with the delay taken from a fresh [`BackoffState`]. The loop ends on success or cancellation;
//! there is no attempt limit.
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
};

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use rebound_model::BackoffStrategy;

use crate::{
    backoff::{BackoffState, RandomHandle, thread_random},
    error::CoreResult,
    metrics::{MetricsHandle, RetryOutcome, noop_metrics},
    timer::{ScheduleHandle, TokioScheduler},
};

mod future;
pub use future::retry_until_success;

mod handle;
pub use handle::{BackoffHandle, RetryState};
use handle::StatusCell;

mod report;
pub use report::Report;

type Operation = dyn Fn(Report) + Send + Sync + 'static;

/// Retries an operation with growing, jittered, capped delays until it reports success.
///
/// Holds the validated strategy plus the collaborators every run uses:
/// - a scheduler for delayed execution (tokio by default);
/// - a random source for jitter;
/// - a metrics backend (no-op by default).
#[derive(Clone)]
pub struct BackoffScheduler {
    strategy: BackoffStrategy,
    scheduler: ScheduleHandle,
    random: RandomHandle,
    metrics: MetricsHandle,
}

impl BackoffScheduler {
    /// Create a scheduler with explicit delayed-execution primitive.
    ///
    /// Fails if `strategy` does not pass [`BackoffStrategy::validate`].
    pub fn new(strategy: BackoffStrategy, scheduler: ScheduleHandle) -> CoreResult<Self> {
        strategy.validate()?;
        Ok(Self {
            strategy,
            scheduler,
            random: thread_random(),
            metrics: noop_metrics(),
        })
    }

    /// Create a scheduler whose retries run on the current tokio runtime.
    pub fn on_current_runtime(strategy: BackoffStrategy) -> CoreResult<Self> {
        let scheduler = TokioScheduler::try_current()?;
        Self::new(strategy, Arc::new(scheduler))
    }

    /// Replace the jitter source and return updated scheduler.
    pub fn with_random(mut self, random: RandomHandle) -> Self {
        self.random = random;
        self
    }

    /// Replace the metrics backend and return updated scheduler.
    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn strategy(&self) -> &BackoffStrategy {
        &self.strategy
    }

    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }

    pub(crate) fn random(&self) -> &RandomHandle {
        &self.random
    }

    /// Start a run with a fresh cancellation token.
    pub fn run<F>(&self, operation: F) -> BackoffHandle
    where
        F: Fn(Report) + Send + Sync + 'static,
    {
        self.run_with_token(CancellationToken::new(), operation)
    }

    /// Start a run that stops when `token` is cancelled.
    ///
    /// The first attempt runs before this function returns.
    pub fn run_with_token<F>(&self, token: CancellationToken, operation: F) -> BackoffHandle
    where
        F: Fn(Report) + Send + Sync + 'static,
    {
        let status = Arc::new(StatusCell::new());
        let ctx = Arc::new(RunContext {
            operation: Box::new(operation),
            strategy: self.strategy.clone(),
            scheduler: Arc::clone(&self.scheduler),
            random: Arc::clone(&self.random),
            metrics: Arc::clone(&self.metrics),
            token: token.clone(),
            status: Arc::clone(&status),
            attempts: AtomicU32::new(0),
        });

        debug!(
            policy = %self.strategy.policy,
            first_ms = self.strategy.first_ms,
            max_ms = self.strategy.max_ms,
            "starting retry run"
        );
        RunContext::attempt(ctx, 1, None);
        BackoffHandle::new(status, token)
    }
}

impl fmt::Debug for BackoffScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackoffScheduler")
            .field("strategy", &self.strategy)
            .field("scheduler", &"<handle>")
            .field("metrics", &"<handle>")
            .finish()
    }
}

/// Run `operation` on the current tokio runtime, retrying with `strategy` until it reports success.
///
/// Convenience wrapper over [`BackoffScheduler::on_current_runtime`] and [`BackoffScheduler::run`].
pub fn run_with_backoff<F>(strategy: BackoffStrategy, operation: F) -> CoreResult<BackoffHandle>
where
    F: Fn(Report) + Send + Sync + 'static,
{
    Ok(BackoffScheduler::on_current_runtime(strategy)?.run(operation))
}

/// Everything one run needs, shared between its pending timer and the in-flight report.
///
/// The context is dropped once neither a timer nor a report refers to it, which is when the run is over.
pub(crate) struct RunContext {
    operation: Box<Operation>,
    strategy: BackoffStrategy,
    scheduler: ScheduleHandle,
    random: RandomHandle,
    metrics: MetricsHandle,
    token: CancellationToken,
    status: Arc<StatusCell>,
    attempts: AtomicU32,
}

impl RunContext {
    fn policy_label(&self) -> &'static str {
        self.strategy.policy.as_str()
    }

    fn attempt(ctx: Arc<Self>, attempt: u32, state: Option<BackoffState>) {
        if ctx.token.is_cancelled() {
            ctx.cancel();
            return;
        }
        ctx.attempts.store(attempt, Ordering::Relaxed);
        ctx.status.transition(RetryState::Running { attempt });
        ctx.metrics.record_attempt(ctx.policy_label());
        trace!(attempt, "invoking operation");

        let report = Report::new(Arc::clone(&ctx), attempt, state);
        (ctx.operation)(report);
    }

    fn succeed(&self, attempt: u32) {
        if self.status.transition(RetryState::Succeeded { attempts: attempt }) {
            debug!(attempts = attempt, "operation succeeded");
        }
    }

    fn retry(self: Arc<Self>, attempt: u32, state: Option<BackoffState>) {
        if self.token.is_cancelled() {
            self.cancel();
            return;
        }
        let next = match state {
            None => BackoffState::first(&self.strategy, self.random.as_ref()),
            Some(prev) => prev.next(self.random.as_ref()),
        };
        let delay = next.delay();

        let upcoming = attempt.saturating_add(1);
        self.status.transition(RetryState::Waiting {
            attempt: upcoming,
            delay,
        });
        self.metrics.record_retry_scheduled(self.policy_label(), delay);
        debug!(
            attempt,
            base_ms = next.base().as_millis() as u64,
            delay_ms = delay.as_millis() as u64,
            "attempt failed; retry scheduled"
        );

        let token = self.token.clone();
        let scheduler = Arc::clone(&self.scheduler);
        scheduler.schedule_once(
            delay,
            &token,
            Box::new(move || RunContext::attempt(self, upcoming, Some(next))),
        );
    }

    fn cancel(&self) {
        if self.status.transition(RetryState::Cancelled) {
            debug!(
                attempts = self.attempts.load(Ordering::Relaxed),
                "retry run cancelled"
            );
        }
    }

    fn abandon(&self) {
        self.status.transition(RetryState::Abandoned);
    }
}

impl Drop for RunContext {
    fn drop(&mut self) {
        // A pending retry dropped by a cancelled token never reaches `cancel`, so settle the state here.
        if self.token.is_cancelled() {
            self.cancel();
        }
        let outcome = match self.status.get() {
            RetryState::Succeeded { .. } => RetryOutcome::Succeeded,
            RetryState::Cancelled => RetryOutcome::Cancelled,
            _ => {
                self.abandon();
                RetryOutcome::Abandoned
            }
        };
        self.metrics.record_finished(
            self.policy_label(),
            outcome,
            self.attempts.load(Ordering::Relaxed),
        );
    }
}
