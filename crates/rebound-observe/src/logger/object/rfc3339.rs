use std::fmt;

use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing_subscriber::fmt::{format::Writer, time::FormatTime};

use super::LoggerTimeZone;

/// RFC 3339 timestamps in the configured timezone.
///
/// The offset is looked up on every event, so an offset refreshed by the
/// `timezone-sync` task shows up without rebuilding the subscriber.
#[derive(Debug, Clone, Copy)]
pub struct LoggerRfc3339 {
    tz: LoggerTimeZone,
}

impl LoggerRfc3339 {
    pub fn new(tz: LoggerTimeZone) -> Self {
        Self { tz }
    }

    fn format_at(&self, now: OffsetDateTime) -> String {
        now.to_offset(self.tz.offset())
            .format(&Rfc3339)
            .unwrap_or_else(|_| "<invalid-time>".to_string())
    }
}

impl FormatTime for LoggerRfc3339 {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{} ", self.format_at(OffsetDateTime::now_utc()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utc_timestamps_end_with_z() {
        let at = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let ts = LoggerRfc3339::new(LoggerTimeZone::Utc).format_at(at);
        assert_eq!(ts, "2023-11-14T22:13:20Z");
    }

    #[test]
    fn local_timestamps_parse_back() {
        let at = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let ts = LoggerRfc3339::new(LoggerTimeZone::Local).format_at(at);
        let parsed = OffsetDateTime::parse(&ts, &Rfc3339).unwrap();
        assert_eq!(parsed, at);
    }
}
