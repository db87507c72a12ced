//! Periodic refresh of the cached local offset, so DST transitions show up
//! in `LoggerTimeZone::Local` timestamps without a restart.
//!
//! Runs on the `rebound-core` repeating timer. Detection usually fails once the
//! process is multi-threaded, in which case the refresh is skipped and the
//! offset captured by `init_local_offset()` stays in use.
use std::time::Duration;

use rebound_core::{TimerHandle, schedule_repeating};
use tracing::trace;

use crate::logger::object::timezone::sync_local_offset;

/// Interval between refreshes (in milliseconds).
pub const TZ_SYNC_INTERVAL_MS: u64 = 3_600_000;

/// Start the refresh timer on the current tokio runtime.
///
/// The first refresh happens one interval after the call. Cancel the returned
/// handle to stop it; dropping the handle leaves the timer running.
///
/// # Panics
/// Outside a tokio runtime.
pub fn timezone_sync() -> TimerHandle {
    refresh_every(Duration::from_millis(TZ_SYNC_INTERVAL_MS), sync_local_offset)
}

/// Runs `sync` every `interval`; it returns whether detection succeeded.
fn refresh_every<F>(interval: Duration, mut sync: F) -> TimerHandle
where
    F: FnMut() -> bool + Send + 'static,
{
    schedule_repeating(interval, move || {
        let refreshed = sync();
        trace!(refreshed, "timezone sync tick");
    })
}
