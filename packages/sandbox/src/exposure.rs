// ABOUTME: HTTP exposure coordinator racing process readiness against a fixed deadline
// ABOUTME: Recoverable timeout leaves the process alone; a readiness fault tears it down

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{SandboxError, SandboxResult};
use crate::process::ProcessSupervisor;
use crate::session::Session;
use crate::types::{ProcessState, HTTP_READINESS_TIMEOUT_MS};

/// Outcome of a successful exposure.
#[derive(Debug, Clone)]
pub struct Exposure {
    pub pid: u32,
    pub public_url: String,
}

/// Attaches a public endpoint to a process once it is ready to serve HTTP.
///
/// Per-process state machine: `Spawned -> HttpReady -> Exposed`, or
/// `Spawned -> Killed` when the readiness wait faults.
pub struct ExposureCoordinator {
    session: Arc<Session>,
}

impl ExposureCoordinator {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Race the process's readiness signal against the fixed deadline.
    ///
    /// A deadline win is recoverable: the process keeps running and the
    /// caller may retry (`ReadinessTimeout`). A readiness fault is not: the
    /// process is killed and dropped from the registry, its buffered output
    /// is drained in full, and `HttpNotReady` carries both streams so the
    /// caller can see why the process was not a server.
    pub async fn expose(&self, pid: u32) -> SandboxResult<Exposure> {
        self.session.ensure_live()?;
        let entry = self
            .session
            .processes()
            .get(pid)
            .await
            .ok_or(SandboxError::ProcessNotFound { pid })?;
        if entry.is_killed().await {
            return Err(SandboxError::ProcessNotFound { pid });
        }

        let deadline = Duration::from_millis(HTTP_READINESS_TIMEOUT_MS);
        match tokio::time::timeout(deadline, entry.remote.wait_http_ready()).await {
            Err(_elapsed) => {
                info!(
                    "Process {} not HTTP-ready within {}ms, leaving it running",
                    pid, HTTP_READINESS_TIMEOUT_MS
                );
                Err(SandboxError::ReadinessTimeout { pid })
            }
            Ok(Err(fault)) => {
                warn!("Process {} cannot serve HTTP: {}", pid, fault.reason);
                let supervisor = ProcessSupervisor::new(self.session.clone());
                if !supervisor.reap_failed(&entry).await {
                    // A concurrent kill confirmed its remote action first.
                    return Err(SandboxError::ProcessNotFound { pid });
                }
                let output = entry.remote.output().await;
                Err(SandboxError::HttpNotReady {
                    stdout: output.stdout,
                    stderr: output.stderr,
                })
            }
            Ok(Ok(())) => {
                {
                    let mut state = entry.state.write().await;
                    if *state == ProcessState::Spawned {
                        *state = ProcessState::HttpReady;
                    }
                }

                // Terminal remote action: serialize against a racing kill.
                // Whichever confirmed its remote action first wins.
                let _lifecycle = entry.lifecycle.lock().await;
                if entry.is_killed().await {
                    return Err(SandboxError::ProcessNotFound { pid });
                }

                let public_url =
                    entry
                        .remote
                        .expose()
                        .await
                        .map_err(|e| SandboxError::Provider {
                            reason: e.to_string(),
                        })?;
                *entry.public_url.write().await = Some(public_url.clone());
                *entry.state.write().await = ProcessState::Exposed;
                info!("Process {} exposed at {}", pid, public_url);
                Ok(Exposure { pid, public_url })
            }
        }
    }
}
