use std::process::ExitStatus;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Program and arguments executed on every attempt.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
}

impl CommandSpec {
    /// Split `argv` into program and arguments. `None` when empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run the command once. `true` only for a zero exit status.
    ///
    /// The child is killed if `cancel` fires first. Spawn failures count as a
    /// failed attempt, so a command that is not installed yet is retried too.
    pub async fn attempt(&self, attempt: u32, cancel: &CancellationToken) -> bool {
        let mut child = match Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                warn!(attempt, program = %self.program, "spawn failed: {e}");
                return false;
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(attempt, "cancellation requested; killing child");
                if let Err(e) = child.kill().await {
                    debug!("failed to kill child: {e}");
                }
                false
            }
            res = child.wait() => match res {
                Ok(status) => log_status(attempt, status),
                Err(e) => {
                    warn!(attempt, "wait failed: {e}");
                    false
                }
            },
        }
    }
}

fn log_status(attempt: u32, status: ExitStatus) -> bool {
    if status.success() {
        info!(attempt, "command succeeded");
        return true;
    }
    match status.code() {
        Some(code) => info!(attempt, code, "command failed"),
        None => info!(attempt, "command terminated by signal"),
    }
    false
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn spec(argv: &[&str]) -> CommandSpec {
        let argv: Vec<String> = argv.iter().map(|s| s.to_string()).collect();
        CommandSpec::from_argv(&argv).unwrap()
    }

    #[test]
    fn empty_argv_has_no_command() {
        assert!(CommandSpec::from_argv(&[]).is_none());
    }

    #[tokio::test]
    async fn exit_status_decides_success() {
        let token = CancellationToken::new();
        assert!(spec(&["true"]).attempt(1, &token).await);
        assert!(!spec(&["false"]).attempt(1, &token).await);
    }

    #[tokio::test]
    async fn missing_program_is_a_failed_attempt() {
        let token = CancellationToken::new();
        assert!(!spec(&["rebound-no-such-program"]).attempt(1, &token).await);
    }

    #[tokio::test]
    async fn cancellation_kills_long_running_child() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(!spec(&["sleep", "30"]).attempt(1, &token).await);
    }
}
