// ABOUTME: Per-session process registry and lifecycle supervisor
// ABOUTME: Spawn/kill with remote-kill-first removal and per-entry race arbitration

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::error::{SandboxError, SandboxResult};
use crate::provider::RemoteProcess;
use crate::session::Session;
use crate::types::{ProcessOutput, ProcessSnapshot, ProcessState};

/// One tracked process inside a session.
///
/// The lifecycle mutex serializes terminal remote actions (kill, expose) on
/// this entry only; operations on other processes in the same session never
/// wait on it.
pub(crate) struct ProcessEntry {
    pub(crate) pid: u32,
    pub(crate) entrypoint: String,
    pub(crate) spawned_at: DateTime<Utc>,
    pub(crate) remote: Box<dyn RemoteProcess>,
    pub(crate) state: RwLock<ProcessState>,
    pub(crate) public_url: RwLock<Option<String>>,
    pub(crate) lifecycle: Mutex<()>,
}

impl ProcessEntry {
    pub(crate) async fn snapshot(&self) -> ProcessSnapshot {
        ProcessSnapshot {
            pid: self.pid,
            entrypoint: self.entrypoint.clone(),
            state: *self.state.read().await,
            public_url: self.public_url.read().await.clone(),
            spawned_at: self.spawned_at,
        }
    }

    pub(crate) async fn is_killed(&self) -> bool {
        *self.state.read().await == ProcessState::Killed
    }
}

/// Map of pid to live process entry for one session.
pub struct ProcessRegistry {
    entries: RwLock<HashMap<u32, Arc<ProcessEntry>>>,
}

impl ProcessRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) async fn insert(&self, entry: Arc<ProcessEntry>) {
        let mut entries = self.entries.write().await;
        entries.insert(entry.pid, entry);
    }

    pub(crate) async fn get(&self, pid: u32) -> Option<Arc<ProcessEntry>> {
        let entries = self.entries.read().await;
        entries.get(&pid).cloned()
    }

    pub(crate) async fn remove(&self, pid: u32) {
        let mut entries = self.entries.write().await;
        entries.remove(&pid);
    }

    pub(crate) async fn all(&self) -> Vec<Arc<ProcessEntry>> {
        let entries = self.entries.read().await;
        entries.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Spawns, tracks, and kills long-lived processes inside one session.
pub struct ProcessSupervisor {
    session: Arc<Session>,
}

impl ProcessSupervisor {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Start a process at the given entrypoint and register it as `Spawned`.
    pub async fn spawn(&self, entrypoint: &str) -> SandboxResult<ProcessSnapshot> {
        self.session.ensure_live()?;
        if entrypoint.trim().is_empty() {
            return Err(SandboxError::Validation {
                reason: "entrypoint must not be empty".to_string(),
            });
        }

        let remote = self
            .session
            .handle()
            .spawn(entrypoint)
            .await
            .map_err(|e| SandboxError::SpawnFailed {
                entrypoint: entrypoint.to_string(),
                reason: e.to_string(),
            })?;

        let entry = Arc::new(ProcessEntry {
            pid: remote.pid(),
            entrypoint: entrypoint.to_string(),
            spawned_at: Utc::now(),
            remote,
            state: RwLock::new(ProcessState::Spawned),
            public_url: RwLock::new(None),
            lifecycle: Mutex::new(()),
        });
        let snapshot = entry.snapshot().await;
        self.session.processes().insert(entry).await;
        info!(
            "Session {} spawned process {} ('{}')",
            self.session.id(),
            snapshot.pid,
            entrypoint
        );
        Ok(snapshot)
    }

    /// Terminate a tracked process and drop it from the registry.
    ///
    /// Remote kill first, removal strictly after the kill confirms; a
    /// duplicate kill observes `ProcessNotFound` and performs no remote
    /// action.
    pub async fn kill(&self, pid: u32) -> SandboxResult<()> {
        self.session.ensure_live()?;
        let entry = self
            .session
            .processes()
            .get(pid)
            .await
            .ok_or(SandboxError::ProcessNotFound { pid })?;

        let _lifecycle = entry.lifecycle.lock().await;
        if entry.is_killed().await {
            return Err(SandboxError::ProcessNotFound { pid });
        }

        entry
            .remote
            .kill()
            .await
            .map_err(|e| SandboxError::Provider {
                reason: e.to_string(),
            })?;

        *entry.state.write().await = ProcessState::Killed;
        self.session.processes().remove(pid).await;
        info!("Session {} killed process {}", self.session.id(), pid);
        Ok(())
    }

    /// Diagnostics listing of the session's tracked processes.
    pub async fn list(&self) -> SandboxResult<Vec<ProcessSnapshot>> {
        self.session.ensure_live()?;
        let entries = self.session.processes().all().await;
        let mut snapshots = Vec::with_capacity(entries.len());
        for entry in entries {
            snapshots.push(entry.snapshot().await);
        }
        snapshots.sort_by_key(|s| s.spawned_at);
        Ok(snapshots)
    }

    /// Buffered output of a tracked process.
    pub async fn output(&self, pid: u32) -> SandboxResult<ProcessOutput> {
        self.session.ensure_live()?;
        let entry = self
            .session
            .processes()
            .get(pid)
            .await
            .ok_or(SandboxError::ProcessNotFound { pid })?;
        Ok(entry.remote.output().await)
    }

    /// Best-effort termination of every tracked process, used when the
    /// owning session closes.
    pub(crate) async fn kill_all(&self) {
        let entries = self.session.processes().all().await;
        let reaps = entries.iter().map(|entry| async {
            let _lifecycle = entry.lifecycle.lock().await;
            if entry.is_killed().await {
                return;
            }
            if let Err(e) = entry.remote.kill().await {
                warn!(
                    "Session {} close: kill of process {} failed: {}",
                    self.session.id(),
                    entry.pid,
                    e
                );
            }
            *entry.state.write().await = ProcessState::Killed;
            self.session.processes().remove(entry.pid).await;
        });
        join_all(reaps).await;
    }

    /// Tear down an entry whose readiness wait faulted. Best-effort: the
    /// process usually exited on its own already, and cleanup must converge
    /// even when the remote kill errors. Returns whether this caller did the
    /// teardown (a concurrent kill may have won).
    pub(crate) async fn reap_failed(&self, entry: &Arc<ProcessEntry>) -> bool {
        let _lifecycle = entry.lifecycle.lock().await;
        if entry.is_killed().await {
            return false;
        }
        if let Err(e) = entry.remote.kill().await {
            warn!("Reaping failed process {}: kill error: {}", entry.pid, e);
        }
        *entry.state.write().await = ProcessState::Killed;
        self.session.processes().remove(entry.pid).await;
        true
    }
}
