use std::{
    fmt,
    str::FromStr,
    sync::{Once, RwLock},
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::UtcOffset;
use tracing::debug;

use crate::logger::error::LoggerError;

/// Last known local offset. Starts at UTC until detection succeeds.
static LOCAL_OFFSET: RwLock<UtcOffset> = RwLock::new(UtcOffset::UTC);

/// Lazy detection runs at most once; later updates go through `sync_local_offset`.
static DETECT_ONCE: Once = Once::new();

/// Timezone used for log timestamps.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LoggerTimeZone {
    #[default]
    Utc,
    /// System timezone, cached. See [`init_local_offset`].
    Local,
}

impl LoggerTimeZone {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoggerTimeZone::Utc => "utc",
            LoggerTimeZone::Local => "local",
        }
    }

    /// Offset to apply to a UTC timestamp right now.
    pub fn offset(&self) -> UtcOffset {
        match self {
            LoggerTimeZone::Utc => UtcOffset::UTC,
            LoggerTimeZone::Local => local_offset(),
        }
    }
}

impl FromStr for LoggerTimeZone {
    type Err = LoggerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utc" | "z" => Ok(Self::Utc),
            "local" => Ok(Self::Local),
            _ => Err(LoggerError::InvalidTimeZone(s.to_string())),
        }
    }
}

impl fmt::Display for LoggerTimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for LoggerTimeZone {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LoggerTimeZone {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Detect and cache the local UTC offset.
///
/// Call from `main()` before the tokio runtime starts: on most Unix platforms
/// `time` refuses to read the offset once other threads exist.
/// Falls back to UTC if detection fails.
///
/// ```no_run
/// fn main() {
///     rebound_observe::init_local_offset();
///
///     tokio::runtime::Runtime::new()
///         .unwrap()
///         .block_on(async { /* ... */ });
/// }
/// ```
pub fn init_local_offset() {
    DETECT_ONCE.call_once(|| {});
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    store(offset);
}

/// Re-detect the local offset and replace the cached one when it changed.
///
/// Returns `false` when detection was not possible (multi-threaded process).
pub(crate) fn sync_local_offset() -> bool {
    let Ok(detected) = UtcOffset::current_local_offset() else {
        debug!("local offset sync skipped; detection unavailable");
        return false;
    };
    let previous = local_offset();
    if previous != detected {
        store(detected);
        debug!(
            from = %format_offset(previous),
            to = %format_offset(detected),
            "local offset updated"
        );
    }
    true
}

/// Cached local offset, detected lazily on first use.
pub(crate) fn local_offset() -> UtcOffset {
    DETECT_ONCE.call_once(|| match UtcOffset::current_local_offset() {
        Ok(detected) => store(detected),
        Err(_) => eprintln!(
            "rebound-observe: local timezone detection failed, timestamps use UTC; \
             call init_local_offset() before starting the runtime"
        ),
    });
    LOCAL_OFFSET
        .read()
        .map(|guard| *guard)
        .unwrap_or(UtcOffset::UTC)
}

fn store(offset: UtcOffset) {
    match LOCAL_OFFSET.write() {
        Ok(mut guard) => *guard = offset,
        Err(poisoned) => *poisoned.into_inner() = offset,
    }
}

/// `UTC±HH` or `UTC±HH:MM`.
fn format_offset(offset: UtcOffset) -> String {
    let hours = offset.whole_hours();
    let minutes = offset.minutes_past_hour();
    if minutes == 0 {
        format!("UTC{hours:+03}")
    } else {
        format!("UTC{hours:+03}:{:02}", minutes.abs())
    }
}
