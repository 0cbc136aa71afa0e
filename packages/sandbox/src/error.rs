use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by sandbox orchestration operations.
///
/// Callers branch on the variant (or its wire [`kind`](SandboxError::kind)
/// tag), never on message text. Variants that carry diagnostics keep them as
/// structured fields so they survive serialization intact.
#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("Process not found: {pid}")]
    ProcessNotFound { pid: u32 },

    #[error("Command timed out after {timeout_ms}ms and was terminated")]
    CommandTimedOut { timeout_ms: u64 },

    #[error("Process {pid} did not signal HTTP readiness before the deadline")]
    ReadinessTimeout { pid: u32 },

    #[error("Process is not a usable HTTP server and has been terminated")]
    HttpNotReady { stdout: String, stderr: String },

    #[error("Invalid input: {reason}")]
    Validation { reason: String },

    #[error("Failed to spawn process '{entrypoint}': {reason}")]
    SpawnFailed { entrypoint: String, reason: String },

    #[error("Sandbox provider error: {reason}")]
    Provider { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SandboxError {
    /// Stable wire tag for this error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            SandboxError::SessionNotFound { .. } => "SessionNotFound",
            SandboxError::ProcessNotFound { .. } => "ProcessNotFound",
            SandboxError::CommandTimedOut { .. } => "CommandTimedOut",
            SandboxError::ReadinessTimeout { .. } => "ReadinessTimeout",
            SandboxError::HttpNotReady { .. } => "HttpNotReady",
            SandboxError::Validation { .. } => "ValidationError",
            SandboxError::SpawnFailed { .. } => "SpawnFailed",
            SandboxError::Provider { .. } => "ProviderError",
            SandboxError::Io(_) => "IoError",
        }
    }

    /// Structured form forwarded to the agent loop as a tool failure.
    pub fn to_wire(&self) -> WireError {
        let (stdout, stderr) = match self {
            SandboxError::HttpNotReady { stdout, stderr } => {
                (Some(stdout.clone()), Some(stderr.clone()))
            }
            _ => (None, None),
        };
        WireError {
            kind: self.kind(),
            message: self.to_string(),
            stdout,
            stderr,
        }
    }
}

/// Serialized error payload embedded in tool outcomes.
#[derive(Debug, Clone, Serialize)]
pub struct WireError {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

/// Result type for sandbox orchestration operations.
pub type SandboxResult<T> = Result<T, SandboxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_not_ready_carries_output() {
        let err = SandboxError::HttpNotReady {
            stdout: "booting".to_string(),
            stderr: "bind: address in use".to_string(),
        };
        let wire = err.to_wire();
        assert_eq!(wire.kind, "HttpNotReady");
        assert_eq!(wire.stdout.as_deref(), Some("booting"));
        assert_eq!(wire.stderr.as_deref(), Some("bind: address in use"));
    }

    #[test]
    fn test_kind_tags_are_distinct() {
        let errors = [
            SandboxError::SessionNotFound {
                session_id: "s".to_string(),
            },
            SandboxError::ProcessNotFound { pid: 1 },
            SandboxError::CommandTimedOut { timeout_ms: 200 },
            SandboxError::ReadinessTimeout { pid: 1 },
            SandboxError::HttpNotReady {
                stdout: String::new(),
                stderr: String::new(),
            },
            SandboxError::Validation {
                reason: "bad".to_string(),
            },
        ];
        let mut kinds: Vec<&str> = errors.iter().map(|e| e.kind()).collect();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
    }
}
