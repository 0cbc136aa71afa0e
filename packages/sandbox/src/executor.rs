// ABOUTME: Bounded one-shot command execution inside a session
// ABOUTME: Enforces the deadline by killing and reaping the subprocess on overrun

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{SandboxError, SandboxResult};
use crate::session::Session;
use crate::types::{ExecOutcome, DEFAULT_COMMAND_TIMEOUT_MS, MAX_COMMAND_TIMEOUT_MS};

/// Runs short pre-processing commands (installing dependencies, compiling)
/// inside a session. Long-lived servers belong to the process supervisor,
/// which is why the deadline ceiling is deliberately low.
pub struct CommandExecutor {
    session: Arc<Session>,
}

impl CommandExecutor {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Execute `command` as a one-shot subprocess with piped output capture.
    ///
    /// The deadline defaults to 5000 ms and may be raised to at most
    /// 10000 ms; a request above the ceiling is rejected outright rather
    /// than clamped. On overrun the subprocess is killed and reaped before
    /// `CommandTimedOut` is reported, with no partial output. A command that
    /// completes with a non-zero status is a `succeeded: false` outcome with
    /// whatever output it produced.
    pub async fn run(&self, command: &str, timeout_ms: Option<u64>) -> SandboxResult<ExecOutcome> {
        self.session.ensure_live()?;
        if command.trim().is_empty() {
            return Err(SandboxError::Validation {
                reason: "command must not be empty".to_string(),
            });
        }
        let timeout_ms = timeout_ms.unwrap_or(DEFAULT_COMMAND_TIMEOUT_MS);
        if timeout_ms == 0 {
            return Err(SandboxError::Validation {
                reason: "timeoutMs must be positive".to_string(),
            });
        }
        if timeout_ms > MAX_COMMAND_TIMEOUT_MS {
            return Err(SandboxError::Validation {
                reason: format!(
                    "timeoutMs {} exceeds the {}ms ceiling",
                    timeout_ms, MAX_COMMAND_TIMEOUT_MS
                ),
            });
        }

        let mut running = self
            .session
            .handle()
            .exec(command)
            .await
            .map_err(|e| SandboxError::Provider {
                reason: e.to_string(),
            })?;

        match tokio::time::timeout(Duration::from_millis(timeout_ms), running.wait()).await {
            Ok(Ok(output)) => {
                let succeeded = output.exit_code == Some(0);
                info!(
                    "Session {} command finished (exit {:?})",
                    self.session.id(),
                    output.exit_code
                );
                Ok(ExecOutcome {
                    succeeded,
                    exit_code: output.exit_code,
                    stdout: output.stdout,
                    stderr: output.stderr,
                })
            }
            Ok(Err(e)) => Err(SandboxError::Provider {
                reason: e.to_string(),
            }),
            Err(_elapsed) => {
                warn!(
                    "Session {} command exceeded {}ms, terminating",
                    self.session.id(),
                    timeout_ms
                );
                running.kill().await.map_err(|e| SandboxError::Provider {
                    reason: format!("failed to terminate timed-out command: {}", e),
                })?;
                Err(SandboxError::CommandTimedOut { timeout_ms })
            }
        }
    }
}
