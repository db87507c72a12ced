mod timezone_sync;
pub use timezone_sync::{TZ_SYNC_INTERVAL_MS, timezone_sync};
