use std::{fmt, sync::Arc};

use tracing::warn;

use crate::backoff::BackoffState;

use super::RunContext;

/// One-shot completion callback handed to the operation on every attempt.
///
/// Consuming [`Report::report`] (or [`Report::success`] / [`Report::failure`]) ends the attempt.
/// Because the value is move-only, an attempt can be reported at most once.
/// Dropping it without reporting abandons the whole run.
#[must_use = "an unreported attempt abandons the retry run"]
pub struct Report {
    ctx: Option<Arc<RunContext>>,
    attempt: u32,
    state: Option<BackoffState>,
}

impl Report {
    pub(super) fn new(ctx: Arc<RunContext>, attempt: u32, state: Option<BackoffState>) -> Self {
        Self {
            ctx: Some(ctx),
            attempt,
            state,
        }
    }

    /// 1-based number of the attempt this report belongs to.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Complete the attempt. `false` schedules a retry, `true` ends the run.
    pub fn report(mut self, success: bool) {
        if let Some(ctx) = self.ctx.take() {
            if success {
                ctx.succeed(self.attempt);
            } else {
                ctx.retry(self.attempt, self.state);
            }
        }
    }

    pub fn success(self) {
        self.report(true)
    }

    pub fn failure(self) {
        self.report(false)
    }
}

impl Drop for Report {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            warn!(attempt = self.attempt, "report dropped without a result; abandoning retries");
            ctx.abandon();
        }
    }
}

impl fmt::Debug for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Report")
            .field("attempt", &self.attempt)
            .field("pending", &self.ctx.is_some())
            .finish()
    }
}
