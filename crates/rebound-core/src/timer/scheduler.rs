use std::{
    collections::VecDeque,
    fmt,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::error::{CoreError, CoreResult};

/// Deferred unit of work handed to a [`Schedule`] implementation.
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Delayed-execution primitive used by the retry scheduler.
///
/// Implementations run `callback` once, no earlier than `delay` from now.
/// If `token` is cancelled before that, the callback must be dropped without running.
pub trait Schedule: Send + Sync + 'static {
    fn schedule_once(&self, delay: Duration, token: &CancellationToken, callback: Callback);
}

/// Shared handle to a scheduler.
pub type ScheduleHandle = Arc<dyn Schedule>;

/// [`Schedule`] implementation that spawns a sleeping task on a tokio runtime.
#[derive(Clone)]
pub struct TokioScheduler {
    rt: Handle,
}

impl TokioScheduler {
    /// Schedule onto the given runtime.
    pub fn new(rt: Handle) -> Self {
        Self { rt }
    }

    /// Schedule onto the runtime the caller is currently running in.
    pub fn try_current() -> CoreResult<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| CoreError::NoRuntime(e.to_string()))
    }
}

impl Schedule for TokioScheduler {
    fn schedule_once(&self, delay: Duration, token: &CancellationToken, callback: Callback) {
        super::spawn_delayed(&self.rt, delay, token.clone(), callback);
    }
}

impl fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioScheduler")
            .field("runtime", &self.rt.runtime_flavor())
            .finish()
    }
}

struct Pending {
    delay: Duration,
    token: CancellationToken,
    callback: Callback,
}

/// [`Schedule`] implementation that only records callbacks.
///
/// Nothing runs until [`ManualScheduler::fire_next`] is called, which makes delay sequences observable without waiting.
#[derive(Default)]
pub struct ManualScheduler {
    pending: Mutex<VecDeque<Pending>>,
    history: Mutex<Vec<Duration>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the oldest pending callback.
    ///
    /// Returns `false` when nothing was pending. A callback whose token was cancelled is dropped without running
    /// (and still counts as fired).
    pub fn fire_next(&self) -> bool {
        // Release the lock before running: the callback may schedule again.
        let next = self.lock_pending().pop_front();
        match next {
            Some(p) => {
                if !p.token.is_cancelled() {
                    (p.callback)();
                }
                true
            }
            None => false,
        }
    }

    /// Run pending callbacks until none are left or `limit` callbacks have fired.
    ///
    /// Returns the number of callbacks fired.
    pub fn run_until_idle(&self, limit: usize) -> usize {
        let mut fired = 0;
        while fired < limit && self.fire_next() {
            fired += 1;
        }
        fired
    }

    /// Number of callbacks waiting to fire.
    pub fn pending(&self) -> usize {
        self.lock_pending().len()
    }

    /// Delay of the oldest pending callback.
    pub fn next_delay(&self) -> Option<Duration> {
        self.lock_pending().front().map(|p| p.delay)
    }

    /// Every delay ever passed to [`Schedule::schedule_once`], in call order.
    pub fn scheduled_delays(&self) -> Vec<Duration> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, VecDeque<Pending>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Schedule for ManualScheduler {
    fn schedule_once(&self, delay: Duration, token: &CancellationToken, callback: Callback) {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(delay);
        self.lock_pending().push_back(Pending {
            delay,
            token: token.clone(),
            callback,
        });
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn try_current_fails_outside_runtime() {
        assert!(matches!(
            TokioScheduler::try_current(),
            Err(CoreError::NoRuntime(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_scheduler_runs_callback_after_delay() {
        let sched = TokioScheduler::try_current().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();
        let token = CancellationToken::new();

        let started = tokio::time::Instant::now();
        sched.schedule_once(
            Duration::from_secs(2),
            &token,
            Box::new(move || {
                let _ = tx.send(tokio::time::Instant::now());
            }),
        );

        let fired_at = rx.await.unwrap();
        assert!(fired_at - started >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_scheduler_drops_cancelled_callback() {
        let sched = TokioScheduler::try_current().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let token = CancellationToken::new();

        sched.schedule_once(
            Duration::from_secs(2),
            &token,
            Box::new(move || {
                let _ = tx.send(());
            }),
        );
        token.cancel();

        // Sender dropped without sending.
        assert!(rx.await.is_err());
    }

    #[test]
    fn manual_scheduler_fires_in_order() {
        let sched = ManualScheduler::new();
        let token = CancellationToken::new();
        let hits = Arc::new(AtomicU32::new(0));

        for i in 1..=3u32 {
            let hits = hits.clone();
            sched.schedule_once(
                Duration::from_secs(i as u64),
                &token,
                Box::new(move || {
                    assert_eq!(hits.fetch_add(1, Ordering::SeqCst), i - 1);
                }),
            );
        }

        assert_eq!(sched.pending(), 3);
        assert_eq!(sched.next_delay(), Some(Duration::from_secs(1)));
        assert_eq!(sched.run_until_idle(10), 3);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert!(!sched.fire_next());
    }

    #[test]
    fn manual_scheduler_skips_cancelled() {
        let sched = ManualScheduler::new();
        let token = CancellationToken::new();
        let hits = Arc::new(AtomicU32::new(0));

        let h = hits.clone();
        sched.schedule_once(
            Duration::from_millis(5),
            &token,
            Box::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            }),
        );
        token.cancel();

        assert!(sched.fire_next());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(sched.scheduled_delays(), vec![Duration::from_millis(5)]);
    }
}
