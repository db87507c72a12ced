use std::{io::Write, process::ExitCode, sync::Arc};

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use rebound_core::{BackoffScheduler, BackoffSequence, CoreError, ThreadRandom};
use rebound_model::BackoffStrategy;
use rebound_observe::{init_local_offset, init_logger, timezone_sync};
use rebound_prometheus::PrometheusMetrics;

mod args;
mod command;

use args::Args;
use command::CommandSpec;

/// Exit code used when the run is interrupted, as a shell would report SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

/// How a `rebound` invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Previewed,
    Succeeded { attempts: u32 },
    Interrupted { attempts: u32 },
}

impl Outcome {
    fn code(&self) -> u8 {
        match self {
            Outcome::Previewed | Outcome::Succeeded { .. } => 0,
            Outcome::Interrupted { .. } => EXIT_INTERRUPTED,
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    // Must happen before the runtime spawns worker threads.
    init_local_offset();

    let args = Args::parse();
    init_logger(&args.logger_config()?)?;

    let outcome = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?
        .block_on(async {
            let cancel = CancellationToken::new();
            tokio::spawn(cancel_on_ctrl_c(cancel.clone()));
            let tz_sync = timezone_sync();

            let outcome = run(
                &args,
                &cancel,
                &mut std::io::stdout(),
                &mut std::io::stderr(),
            )
            .await;
            tz_sync.cancel();
            outcome
        })?;
    Ok(ExitCode::from(outcome.code()))
}

/// Execute one invocation. Preview lines go to `out`, the metrics dump to `diag`.
async fn run(
    args: &Args,
    cancel: &CancellationToken,
    out: &mut dyn Write,
    diag: &mut dyn Write,
) -> anyhow::Result<Outcome> {
    let strategy = args.backoff_strategy()?;

    if let Some(count) = args.preview {
        print_preview(&strategy, count, out)?;
        return Ok(Outcome::Previewed);
    }
    let Some(cmd) = CommandSpec::from_argv(&args.command) else {
        anyhow::bail!("no command given; pass it after the options, e.g. `rebound -- curl -f URL`");
    };

    let metrics = PrometheusMetrics::new()?;
    let scheduler =
        BackoffScheduler::on_current_runtime(strategy)?.with_metrics(Arc::new(metrics.clone()));

    info!(
        program = cmd.program(),
        policy = %scheduler.strategy().policy,
        "running command until it succeeds"
    );
    let result = scheduler
        .retry(cancel, |attempt| {
            let cmd = cmd.clone();
            let cancel = cancel.clone();
            async move { cmd.attempt(attempt, &cancel).await }
        })
        .await;

    if args.metrics {
        diag.write_all(metrics.encode_text()?.as_bytes())?;
    }
    match result {
        Ok(attempts) => {
            info!(attempts, "done");
            Ok(Outcome::Succeeded { attempts })
        }
        Err(CoreError::Cancelled { attempts }) => {
            warn!(attempts, "interrupted before the command succeeded");
            Ok(Outcome::Interrupted { attempts })
        }
        Err(e) => Err(e.into()),
    }
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("interrupt received; stopping");
            cancel.cancel();
        }
        Err(e) => warn!("cannot listen for ctrl-c: {e}"),
    }
}

fn print_preview(
    strategy: &BackoffStrategy,
    count: usize,
    out: &mut dyn Write,
) -> std::io::Result<()> {
    let random = ThreadRandom;
    for (idx, state) in BackoffSequence::new(strategy, &random).take(count).enumerate() {
        writeln!(
            out,
            "retry {:>3}: base {:>8}ms  delay {:>8}ms",
            idx + 1,
            state.base().as_millis(),
            state.delay().as_millis()
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("rebound").chain(argv.iter().copied())).unwrap()
    }

    async fn run_captured(
        argv: &[&str],
        cancel: &CancellationToken,
    ) -> (anyhow::Result<Outcome>, String, String) {
        let args = parse(argv);
        let (mut out, mut diag) = (Vec::new(), Vec::new());
        let res = run(&args, cancel, &mut out, &mut diag).await;
        (
            res,
            String::from_utf8(out).unwrap(),
            String::from_utf8(diag).unwrap(),
        )
    }

    /// `(base_ms, delay_ms)` from one preview line.
    fn preview_delays(line: &str) -> (u64, u64) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let ms = |t: &str| t.trim_end_matches("ms").parse::<u64>().unwrap();
        (ms(tokens[3]), ms(tokens[5]))
    }

    #[tokio::test]
    async fn preview_prints_requested_delays_capped_at_max() {
        let cancel = CancellationToken::new();
        let (res, out, _) = run_captured(
            &["--preview", "6", "--first-ms", "100", "--max-ms", "500", "--jitter-ratio", "0.5"],
            &cancel,
        )
        .await;

        assert_eq!(res.unwrap(), Outcome::Previewed);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 6);

        let delays: Vec<(u64, u64)> = lines.iter().map(|l| preview_delays(l)).collect();
        assert_eq!(
            delays.iter().map(|(base, _)| *base).collect::<Vec<_>>(),
            vec![100, 200, 400, 500, 500, 500]
        );
        assert!(delays.iter().all(|(base, delay)| delay >= base && *delay <= 500));
    }

    #[tokio::test]
    async fn missing_command_is_an_error() {
        let cancel = CancellationToken::new();
        let (res, _, _) = run_captured(&[], &cancel).await;

        let err = res.unwrap_err();
        assert!(err.to_string().contains("no command given"), "{err}");
    }

    #[tokio::test]
    async fn cancelled_run_exits_with_interrupt_code() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let (res, _, _) = run_captured(&["sleep", "30"], &cancel).await;

        let outcome = res.unwrap();
        assert_eq!(outcome, Outcome::Interrupted { attempts: 0 });
        assert_eq!(outcome.code(), EXIT_INTERRUPTED);
    }

    #[test]
    fn success_and_preview_exit_zero() {
        assert_eq!(Outcome::Previewed.code(), 0);
        assert_eq!(Outcome::Succeeded { attempts: 3 }.code(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn metrics_flag_dumps_exposition() {
        let cancel = CancellationToken::new();
        let (res, out, diag) = run_captured(&["--metrics", "true"], &cancel).await;

        assert_eq!(res.unwrap(), Outcome::Succeeded { attempts: 1 });
        assert!(out.is_empty());
        assert!(diag.contains("rebound_attempts_total{policy=\"exponential\"} 1"), "{diag}");
    }
}
