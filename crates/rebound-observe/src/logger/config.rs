use serde::{Deserialize, Serialize};
use std::io::IsTerminal;

use crate::logger::{
    error::{LoggerError, LoggerResult},
    object::{LoggerFormat, LoggerLevel, LoggerTimeZone},
};

/// Environment variable holding the filter expression (e.g. `rebound_core=debug,info`).
pub const ENV_LOG_LEVEL: &str = "REBOUND_LOG";
/// Environment variable selecting the output format (`text|json|journald`).
pub const ENV_LOG_FORMAT: &str = "REBOUND_LOG_FORMAT";
/// Environment variable selecting the timestamp timezone (`utc|local`).
pub const ENV_LOG_TZ: &str = "REBOUND_LOG_TZ";
/// Conventional switch that disables colored output when set to any non-empty value.
pub const ENV_NO_COLOR: &str = "NO_COLOR";

/// Logger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggerConfig {
    /// Output format.
    pub format: LoggerFormat,
    /// Filter expression.
    pub level: LoggerLevel,
    /// Timezone for timestamps.
    pub tz: LoggerTimeZone,
    /// Include the event target (module path) in each line.
    pub with_targets: bool,
    /// Request ANSI colors. Only honoured for text output on a terminal.
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::default(),
            level: LoggerLevel::default(),
            tz: LoggerTimeZone::default(),
            with_targets: true,
            use_color: true,
        }
    }
}

impl LoggerConfig {
    /// Build a config from `REBOUND_LOG*` and `NO_COLOR`, falling back to defaults for unset variables.
    pub fn from_env() -> LoggerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`LoggerConfig::from_env`] with a custom variable lookup.
    pub fn from_lookup<F>(lookup: F) -> LoggerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = lookup(ENV_LOG_LEVEL) {
            cfg.level = v.parse().map_err(|e: LoggerError| LoggerError::InvalidEnv {
                var: ENV_LOG_LEVEL,
                reason: e.to_string(),
            })?;
        }
        if let Some(v) = lookup(ENV_LOG_FORMAT) {
            cfg.format = v.parse().map_err(|e: LoggerError| LoggerError::InvalidEnv {
                var: ENV_LOG_FORMAT,
                reason: e.to_string(),
            })?;
        }
        if let Some(v) = lookup(ENV_LOG_TZ) {
            cfg.tz = v.parse().map_err(|e: LoggerError| LoggerError::InvalidEnv {
                var: ENV_LOG_TZ,
                reason: e.to_string(),
            })?;
        }
        if lookup(ENV_NO_COLOR).is_some_and(|v| !v.is_empty()) {
            cfg.use_color = false;
        }
        Ok(cfg)
    }

    /// Whether ANSI colors should actually be emitted.
    ///
    /// Requires `use_color` and a terminal on stdout. Call during logger initialization, not while parsing config.
    pub fn should_use_color(&self) -> bool {
        self.use_color && std::io::stdout().is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_values() {
        let config = LoggerConfig::default();

        assert_eq!(config.format, LoggerFormat::Text);
        assert_eq!(config.tz, LoggerTimeZone::Utc);
        assert_eq!(config.level.as_str(), "info");
        assert!(config.with_targets);
        assert!(config.use_color);
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = LoggerConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.format, LoggerFormat::default());
        assert_eq!(config.level.as_str(), "info");
        assert!(config.use_color);
    }

    #[test]
    fn environment_overrides_fields() {
        let config = LoggerConfig::from_lookup(lookup(&[
            (ENV_LOG_LEVEL, "rebound_core=trace,warn"),
            (ENV_LOG_FORMAT, "JSON"),
            (ENV_LOG_TZ, "local"),
            (ENV_NO_COLOR, "1"),
        ]))
        .unwrap();

        assert_eq!(config.level.as_str(), "rebound_core=trace,warn");
        assert_eq!(config.format, LoggerFormat::Json);
        assert_eq!(config.tz, LoggerTimeZone::Local);
        assert!(!config.use_color);
    }

    #[test]
    fn empty_no_color_keeps_colors() {
        let config = LoggerConfig::from_lookup(lookup(&[(ENV_NO_COLOR, "")])).unwrap();
        assert!(config.use_color);
    }

    #[test]
    fn bad_environment_value_names_the_variable() {
        let err = LoggerConfig::from_lookup(lookup(&[(ENV_LOG_FORMAT, "xml")])).unwrap_err();
        match err {
            LoggerError::InvalidEnv { var, .. } => assert_eq!(var, ENV_LOG_FORMAT),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn partial_json_uses_defaults() {
        let json = r#"{"format": "json", "withTargets": false}"#;
        let config: LoggerConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.format, LoggerFormat::Json);
        assert_eq!(config.level.as_str(), "info");
        assert!(!config.with_targets);
        assert!(config.use_color);
    }
}
