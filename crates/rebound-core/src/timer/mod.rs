//! Delayed and repeating execution on the tokio runtime.
//!
//! Every helper spawns a detached task and hands back a [`TimerHandle`].
//! Dropping the handle does not stop the timer; call [`TimerHandle::cancel`] for that.
//!
//! All functions here must be called from within a tokio runtime.
use std::time::Duration;

use tokio::{
    runtime::Handle,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::trace;

mod scheduler;
pub use scheduler::{Callback, ManualScheduler, Schedule, ScheduleHandle, TokioScheduler};

/// Cancellation handle for a scheduled timer.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    token: CancellationToken,
}

impl TimerHandle {
    fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Stop the timer. A callback that is already running is not interrupted.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Run `f` once after `delay`.
///
/// # Panics
/// Panics when called outside of a tokio runtime.
pub fn schedule_once<F>(delay: Duration, f: F) -> TimerHandle
where
    F: FnOnce() + Send + 'static,
{
    let token = CancellationToken::new();
    spawn_delayed(&Handle::current(), delay, token.clone(), f);
    TimerHandle::new(token)
}

/// Run `f` every `interval`; the first run happens one interval from now.
///
/// Ticks missed because `f` was slow are not replayed in a burst.
///
/// # Panics
/// Panics when called outside of a tokio runtime, or when `interval` is zero.
pub fn schedule_repeating<F>(interval: Duration, mut f: F) -> TimerHandle
where
    F: FnMut() + Send + 'static,
{
    let token = CancellationToken::new();
    let child = token.clone();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = child.cancelled() => {
                    trace!(?interval, "repeating timer cancelled");
                    break;
                }
                _ = ticker.tick() => f(),
            }
        }
    });
    TimerHandle::new(token)
}

/// Run `f` on the blocking thread pool as soon as possible.
///
/// # Panics
/// Panics when called outside of a tokio runtime.
pub fn run_async<F, R>(f: F) -> JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(f)
}

/// Run `f` on the blocking thread pool after at least `delay`.
///
/// # Panics
/// Panics when called outside of a tokio runtime.
pub fn run_async_after_delay<F>(delay: Duration, f: F) -> TimerHandle
where
    F: FnOnce() + Send + 'static,
{
    schedule_once(delay, move || {
        drop(tokio::task::spawn_blocking(f));
    })
}

/// Spawns a task on `rt` that sleeps for `delay` and then runs `f`, unless `token` fires first.
pub(crate) fn spawn_delayed<F>(rt: &Handle, delay: Duration, token: CancellationToken, f: F)
where
    F: FnOnce() + Send + 'static,
{
    rt.spawn(async move {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                trace!(?delay, "delayed callback cancelled");
            }
            _ = tokio::time::sleep(delay) => f(),
        }
    });
}
