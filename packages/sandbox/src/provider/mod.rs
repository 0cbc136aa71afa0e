// ABOUTME: Provider traits for sandbox isolation backends
// ABOUTME: Defines the abstract interface for environment, command, and process primitives

use async_trait::async_trait;
use thiserror::Error;

use crate::types::ProcessOutput;

pub mod local;

pub use local::LocalProvider;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provisioning error: {0}")]
    Provision(String),

    #[error("File error: {0}")]
    File(String),

    #[error("Exec error: {0}")]
    Exec(String),

    #[error("Spawn error: {0}")]
    Spawn(String),

    #[error("Kill error: {0}")]
    Kill(String),

    #[error("Expose error: {0}")]
    Expose(String),

    #[error("Sandbox is closed")]
    Closed,
}

type Result<T> = std::result::Result<T, ProviderError>;

/// Why a readiness wait resolved negatively.
///
/// Distinct from a deadline elapsing: a fault means the environment has
/// confirmed the process will never serve HTTP (it exited, or it told the
/// provider it is not a server).
#[derive(Debug, Clone)]
pub struct ReadinessFault {
    pub reason: String,
}

/// Output of a completed one-shot command, as reported by the backend.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Backend capable of provisioning isolated environments.
#[async_trait]
pub trait SandboxProvider: Send + Sync {
    /// Provision a fresh isolated environment. A real, potentially slow call.
    async fn provision(&self) -> Result<Box<dyn SandboxHandle>>;
}

/// Handle to one isolated environment.
///
/// All paths are interpreted relative to the environment's root; the handle
/// is responsible for refusing escapes.
#[async_trait]
pub trait SandboxHandle: Send + Sync {
    async fn write_file(&self, path: &str, content: &str) -> Result<()>;

    async fn read_file(&self, path: &str) -> Result<String>;

    /// Start a one-shot subprocess with piped output capture. Deadline
    /// enforcement belongs to the caller.
    async fn exec(&self, command: &str) -> Result<Box<dyn RunningCommand>>;

    /// Start a long-lived process at the given entrypoint.
    async fn spawn(&self, entrypoint: &str) -> Result<Box<dyn RemoteProcess>>;

    /// Tear down the environment. Idempotent.
    async fn close(&self) -> Result<()>;
}

/// An in-flight one-shot command.
#[async_trait]
pub trait RunningCommand: Send {
    /// Wait for completion and collect output.
    async fn wait(&mut self) -> Result<CommandOutput>;

    /// Forcibly terminate the subprocess and reap it. Returns once
    /// termination is confirmed.
    async fn kill(&mut self) -> Result<()>;
}

/// A long-lived process tracked inside an environment.
#[async_trait]
pub trait RemoteProcess: Send + Sync {
    /// Identifier assigned by the environment, unique within it.
    fn pid(&self) -> u32;

    /// Resolve when the process is accepting HTTP connections, or with a
    /// fault once the environment knows it never will. No internal deadline.
    async fn wait_http_ready(&self) -> std::result::Result<(), ReadinessFault>;

    /// Attach a routable endpoint to the process and return its URL.
    async fn expose(&self) -> Result<String>;

    /// Terminate the process. Returns once termination is confirmed.
    /// Killing an already-dead process is a successful no-op.
    async fn kill(&self) -> Result<()>;

    /// Drain everything the process has written to its output streams.
    async fn output(&self) -> ProcessOutput;
}
