//! Forgebox sandbox orchestration.
//!
//! Tracks live sandbox sessions and the processes running inside each one,
//! executes bounded shell commands against them, and arbitrates HTTP
//! exposure. The isolation backend is abstracted behind the provider traits;
//! [`provider::LocalProvider`] is the built-in tempdir/tokio::process
//! implementation.

pub mod error;
pub mod executor;
pub mod exposure;
pub mod process;
pub mod provider;
pub mod session;
pub mod types;
pub mod validation;

// Re-export key types for easier use
pub use error::{SandboxError, SandboxResult, WireError};
pub use executor::CommandExecutor;
pub use exposure::{Exposure, ExposureCoordinator};
pub use process::{ProcessRegistry, ProcessSupervisor};
pub use provider::{
    CommandOutput, LocalProvider, ProviderError, ReadinessFault, RemoteProcess, RunningCommand,
    SandboxHandle, SandboxProvider,
};
pub use session::{Session, SessionRegistry};
pub use types::{
    ExecOutcome, LogStream, ProcessLog, ProcessOutput, ProcessSnapshot, ProcessState,
    SessionSummary, DEFAULT_COMMAND_TIMEOUT_MS, HTTP_READINESS_TIMEOUT_MS,
    MAX_COMMAND_TIMEOUT_MS, PROCESS_LOG_CAP,
};

/// Version information for the sandbox crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
