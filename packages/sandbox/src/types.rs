use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default deadline for one-shot shell commands.
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 5_000;

/// Hard ceiling for caller-supplied command deadlines. Requests above the
/// ceiling are rejected, never clamped.
pub const MAX_COMMAND_TIMEOUT_MS: u64 = 10_000;

/// Fixed deadline for a spawned process to signal HTTP readiness.
pub const HTTP_READINESS_TIMEOUT_MS: u64 = 5_000;

/// Maximum buffered log lines kept per output stream of a process.
pub const PROCESS_LOG_CAP: usize = 1_000;

/// Lifecycle state of a tracked process.
///
/// Transitions are linear: `Spawned -> HttpReady -> Exposed`, with `Killed`
/// terminal from any live state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessState {
    Spawned,
    HttpReady,
    Exposed,
    Killed,
}

impl ProcessState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessState::Spawned => "spawned",
            ProcessState::HttpReady => "http-ready",
            ProcessState::Exposed => "exposed",
            ProcessState::Killed => "killed",
        }
    }
}

/// Which stream a buffered log line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStream {
    Stdout,
    Stderr,
}

/// One buffered line of process output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessLog {
    pub timestamp: DateTime<Utc>,
    pub stream: LogStream,
    pub line: String,
}

/// Full captured output of a process, drained for diagnostics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Point-in-time view of a tracked process. Snapshots never hold live
/// provider handles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSnapshot {
    pub pid: u32,
    pub entrypoint: String,
    pub state: ProcessState,
    pub public_url: Option<String>,
    pub spawned_at: DateTime<Utc>,
}

/// Result of a completed one-shot command.
///
/// A command that ran to completion with a non-zero exit status is a
/// `succeeded: false` outcome with its output, distinct from a timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecOutcome {
    pub succeeded: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Summary of a live session for diagnostics listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub process_count: usize,
}
