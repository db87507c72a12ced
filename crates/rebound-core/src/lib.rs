pub mod backoff;
pub mod error;
pub mod metrics;
pub mod retry;
pub mod timer;

pub use backoff::{
    BackoffSequence, BackoffState, FixedRandom, RandomHandle, RandomSource, ThreadRandom,
};
pub use error::{CoreError, CoreResult};
pub use metrics::{MetricsHandle, NoOpMetrics, RetryMetrics, RetryOutcome, noop_metrics};
pub use retry::{
    BackoffHandle, BackoffScheduler, Report, RetryState, retry_until_success, run_with_backoff,
};
pub use timer::{
    Callback, ManualScheduler, Schedule, ScheduleHandle, TimerHandle, TokioScheduler, run_async,
    run_async_after_delay, schedule_once, schedule_repeating,
};

pub mod prelude {
    pub use crate::error::CoreError;
    pub use crate::retry::{BackoffHandle, BackoffScheduler, Report, RetryState};
    pub use rebound_model::{BackoffPolicy, BackoffStrategy, JitterStrategy};
}
