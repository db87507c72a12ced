mod config;
mod error;
mod log;
mod object;
#[cfg(feature = "timezone-sync")]
mod tasks;

pub use config::{ENV_LOG_FORMAT, ENV_LOG_LEVEL, ENV_LOG_TZ, ENV_NO_COLOR, LoggerConfig};
pub use error::{LoggerError, LoggerResult};
pub use object::{LoggerFormat, LoggerLevel, LoggerRfc3339, LoggerTimeZone, init_local_offset};

#[cfg(feature = "timezone-sync")]
pub use tasks::{TZ_SYNC_INTERVAL_MS, timezone_sync};

/// Install the global tracing subscriber described by `cfg`.
///
/// Every `tracing` event in the process goes through it afterwards. Fails with
/// [`LoggerError::AlreadyInitialized`] if a global subscriber already exists.
///
/// With [`LoggerTimeZone::Local`], call [`init_local_offset`] first, before any
/// threads are spawned.
///
/// ```no_run
/// use rebound_observe::{LoggerConfig, init_logger};
///
/// let cfg = LoggerConfig::from_env().expect("valid REBOUND_LOG* variables");
/// init_logger(&cfg).expect("logger");
/// tracing::info!("ready");
/// ```
pub fn init_logger(cfg: &LoggerConfig) -> LoggerResult<()> {
    match cfg.format {
        LoggerFormat::Text => log::logger_text(cfg),
        LoggerFormat::Json => log::logger_json(cfg),
        LoggerFormat::Journald => log::logger_journald(cfg),
    }
}
