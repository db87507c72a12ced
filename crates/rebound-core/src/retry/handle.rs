use std::{fmt, sync::Arc, time::Duration};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Observable status of a retry run.
///
/// Transitions: `Idle -> Running -> {Succeeded | Waiting -> Running -> ...}`.
/// `Cancelled` and `Abandoned` can interrupt `Running` or `Waiting`.
/// Terminal states are never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Run created, operation not invoked yet.
    Idle,
    /// Operation invoked for the `attempt`-th time, report pending.
    Running { attempt: u32 },
    /// Attempt `attempt` is scheduled to start after `delay`.
    Waiting { attempt: u32, delay: Duration },
    /// The operation reported success on attempt `attempts`.
    Succeeded { attempts: u32 },
    /// The run was cancelled through its handle or token.
    Cancelled,
    /// The operation dropped its report without calling it.
    Abandoned,
}

impl RetryState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RetryState::Succeeded { .. } | RetryState::Cancelled | RetryState::Abandoned
        )
    }
}

impl fmt::Display for RetryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryState::Idle => f.write_str("idle"),
            RetryState::Running { attempt } => write!(f, "running(attempt={attempt})"),
            RetryState::Waiting { attempt, delay } => {
                write!(f, "waiting(attempt={attempt}, delay={delay:?})")
            }
            RetryState::Succeeded { attempts } => write!(f, "succeeded(attempts={attempts})"),
            RetryState::Cancelled => f.write_str("cancelled"),
            RetryState::Abandoned => f.write_str("abandoned"),
        }
    }
}

/// Status cell shared between a run and its handle.
///
/// Writes that would leave a terminal state are ignored.
#[derive(Debug)]
pub(crate) struct StatusCell {
    tx: watch::Sender<RetryState>,
}

impl StatusCell {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(RetryState::Idle);
        Self { tx }
    }

    /// Apply `next` unless the run already finished. Returns `true` if the state changed.
    pub(crate) fn transition(&self, next: RetryState) -> bool {
        self.tx.send_if_modified(|cur| {
            if cur.is_terminal() {
                return false;
            }
            *cur = next;
            true
        })
    }

    pub(crate) fn get(&self) -> RetryState {
        *self.tx.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<RetryState> {
        self.tx.subscribe()
    }
}

/// Handle to a retry run started by [`crate::BackoffScheduler::run`].
///
/// Dropping the handle does not stop the run.
#[derive(Debug, Clone)]
pub struct BackoffHandle {
    status: Arc<StatusCell>,
    token: CancellationToken,
}

impl BackoffHandle {
    pub(crate) fn new(status: Arc<StatusCell>, token: CancellationToken) -> Self {
        Self { status, token }
    }

    /// Current status of the run.
    pub fn state(&self) -> RetryState {
        self.status.get()
    }

    /// Returns `true` once the run reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Stop retrying.
    ///
    /// A pending retry is dropped. An attempt that is already running is not interrupted,
    /// but its report no longer changes the outcome.
    pub fn cancel(&self) {
        self.token.cancel();
        self.status.transition(RetryState::Cancelled);
    }

    /// Token that cancels the run when fired.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Wait until the run reaches a terminal state and return it.
    pub async fn finished(&self) -> RetryState {
        let mut rx = self.status.subscribe();
        match rx.wait_for(RetryState::is_terminal).await {
            Ok(state) => *state,
            // The sender lives in `self.status`, so this branch is unreachable while `self` is alive.
            Err(_) => self.state(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!RetryState::Idle.is_terminal());
        assert!(!RetryState::Running { attempt: 1 }.is_terminal());
        assert!(
            !RetryState::Waiting {
                attempt: 2,
                delay: Duration::from_secs(1)
            }
            .is_terminal()
        );
        assert!(RetryState::Succeeded { attempts: 1 }.is_terminal());
        assert!(RetryState::Cancelled.is_terminal());
        assert!(RetryState::Abandoned.is_terminal());
    }

    #[test]
    fn terminal_state_is_never_left() {
        let cell = StatusCell::new();
        assert!(cell.transition(RetryState::Running { attempt: 1 }));
        assert!(cell.transition(RetryState::Succeeded { attempts: 1 }));

        assert!(!cell.transition(RetryState::Cancelled));
        assert!(!cell.transition(RetryState::Running { attempt: 2 }));
        assert_eq!(cell.get(), RetryState::Succeeded { attempts: 1 });
    }

    #[test]
    fn cancel_moves_handle_to_cancelled() {
        let handle = BackoffHandle::new(Arc::new(StatusCell::new()), CancellationToken::new());
        assert_eq!(handle.state(), RetryState::Idle);

        handle.cancel();
        assert_eq!(handle.state(), RetryState::Cancelled);
        assert!(handle.cancellation_token().is_cancelled());
        assert!(handle.is_finished());
    }

    #[test]
    fn display_is_compact() {
        assert_eq!(RetryState::Running { attempt: 3 }.to_string(), "running(attempt=3)");
        assert_eq!(
            RetryState::Succeeded { attempts: 6 }.to_string(),
            "succeeded(attempts=6)"
        );
    }
}
