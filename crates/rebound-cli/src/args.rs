use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use rebound_model::{BackoffPolicy, BackoffStrategy, DelayMs, JitterStrategy};
use rebound_observe::{LoggerConfig, LoggerFormat, LoggerLevel};

/// Run a command until it exits successfully, waiting longer after every failure.
#[derive(Debug, Parser)]
#[command(name = "rebound", version, about)]
pub struct Args {
    /// JSON file with a backoff strategy; flags below override its fields.
    #[arg(long, value_name = "FILE")]
    pub strategy: Option<PathBuf>,

    /// Delay growth: exponential|fibonacci.
    #[arg(long)]
    pub policy: Option<BackoffPolicy>,

    /// Delay before the first retry, in milliseconds.
    #[arg(long, value_name = "MS")]
    pub first_ms: Option<DelayMs>,

    /// Upper bound for every delay, in milliseconds.
    #[arg(long, value_name = "MS")]
    pub max_ms: Option<DelayMs>,

    /// Jitter: none|additive.
    #[arg(long)]
    pub jitter: Option<JitterStrategy>,

    /// Additive jitter bound as a fraction of the base delay.
    #[arg(long, value_name = "RATIO")]
    pub jitter_ratio: Option<f64>,

    /// Print the first N delays of the resolved strategy and exit.
    #[arg(long, value_name = "N")]
    pub preview: Option<usize>,

    /// Print prometheus metrics to stderr before exiting.
    #[arg(long)]
    pub metrics: bool,

    /// Log filter, overrides REBOUND_LOG.
    #[arg(long, value_name = "FILTER")]
    pub log_level: Option<LoggerLevel>,

    /// Log format, overrides REBOUND_LOG_FORMAT.
    #[arg(long, value_name = "FORMAT")]
    pub log_format: Option<LoggerFormat>,

    /// Command to run, followed by its arguments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl Args {
    /// Strategy from `--strategy` (or defaults) with individual flags applied on top.
    pub fn backoff_strategy(&self) -> anyhow::Result<BackoffStrategy> {
        let mut strategy = match &self.strategy {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => BackoffStrategy::default(),
        };

        if let Some(policy) = self.policy {
            strategy.policy = policy;
        }
        if let Some(first_ms) = self.first_ms {
            strategy.first_ms = first_ms;
        }
        if let Some(max_ms) = self.max_ms {
            strategy.max_ms = max_ms;
        }
        if let Some(jitter) = self.jitter {
            strategy.jitter = jitter;
        }
        if let Some(ratio) = self.jitter_ratio {
            strategy.jitter_ratio = ratio;
        }
        strategy.validate()?;
        Ok(strategy)
    }

    /// Logger config from the environment with command-line overrides.
    pub fn logger_config(&self) -> anyhow::Result<LoggerConfig> {
        let mut cfg = LoggerConfig::from_env()?;
        if let Some(level) = &self.log_level {
            cfg.level = level.clone();
        }
        if let Some(format) = self.log_format {
            cfg.format = format;
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("rebound").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn command_keeps_its_own_flags() {
        let args = parse(&["--policy", "fib", "curl", "-fsS", "http://localhost/health"]);

        assert_eq!(args.policy, Some(BackoffPolicy::Fibonacci));
        assert_eq!(args.command, ["curl", "-fsS", "http://localhost/health"]);
    }

    #[test]
    fn defaults_apply_without_flags() {
        let strategy = parse(&["true"]).backoff_strategy().unwrap();
        assert_eq!(strategy, BackoffStrategy::default());
    }

    #[test]
    fn flags_override_defaults() {
        let strategy = parse(&["--first-ms", "250", "--max-ms", "5000", "--jitter", "none", "true"])
            .backoff_strategy()
            .unwrap();

        assert_eq!(strategy.first_ms, 250);
        assert_eq!(strategy.max_ms, 5_000);
        assert_eq!(strategy.jitter, JitterStrategy::None);
        assert_eq!(strategy.policy, BackoffPolicy::Exponential);
    }

    #[test]
    fn flags_override_strategy_file() {
        let path = std::env::temp_dir().join(format!("rebound-cli-{}.json", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{"policy": "fibonacci", "firstMs": 50, "maxMs": 800}}"#).unwrap();

        let args = parse(&["--strategy", path.to_str().unwrap(), "--max-ms", "400", "true"]);
        let strategy = args.backoff_strategy().unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(strategy.policy, BackoffPolicy::Fibonacci);
        assert_eq!(strategy.first_ms, 50);
        assert_eq!(strategy.max_ms, 400);
    }

    #[test]
    fn invalid_combination_is_rejected() {
        let args = parse(&["--first-ms", "1000", "--max-ms", "10", "true"]);
        assert!(args.backoff_strategy().is_err());
    }

    #[test]
    fn unknown_policy_fails_parsing() {
        let res = Args::try_parse_from(["rebound", "--policy", "linear", "true"]);
        assert!(res.is_err());
    }
}
