// ABOUTME: Session registry mapping opaque identifiers to live sandbox handles
// ABOUTME: Owns provisioning and idempotent teardown of isolated environments

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{SandboxError, SandboxResult};
use crate::process::{ProcessRegistry, ProcessSupervisor};
use crate::provider::{SandboxHandle, SandboxProvider};
use crate::types::SessionSummary;

/// One live sandbox session: the exclusively-owned environment handle plus
/// the registry of processes running inside it.
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    handle: Box<dyn SandboxHandle>,
    processes: ProcessRegistry,
    closed: AtomicBool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl Session {
    fn new(handle: Box<dyn SandboxHandle>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            handle,
            processes: ProcessRegistry::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn handle(&self) -> &dyn SandboxHandle {
        self.handle.as_ref()
    }

    pub fn processes(&self) -> &ProcessRegistry {
        &self.processes
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Fails with `SessionNotFound` once the session has been closed, so a
    /// caller racing a delete never operates on a torn-down environment.
    pub fn ensure_live(&self) -> SandboxResult<()> {
        if self.is_closed() {
            return Err(SandboxError::SessionNotFound {
                session_id: self.id.clone(),
            });
        }
        Ok(())
    }
}

/// Registry of live sessions.
///
/// An explicitly constructed service instance: callers build one around a
/// provider and inject it wherever requests are served. There is no global
/// registry.
pub struct SessionRegistry {
    provider: Arc<dyn SandboxProvider>,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new(provider: Arc<dyn SandboxProvider>) -> Self {
        Self {
            provider,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Provision a fresh environment and register it under a new opaque id.
    ///
    /// Provisioning is a real call against the provider and happens outside
    /// the registry lock, so concurrent sessions never wait on each other.
    pub async fn create(&self) -> SandboxResult<Arc<Session>> {
        let handle = self
            .provider
            .provision()
            .await
            .map_err(|e| SandboxError::Provider {
                reason: e.to_string(),
            })?;

        let session = Arc::new(Session::new(handle));
        {
            let mut sessions = self.sessions.write().await;
            sessions.insert(session.id.clone(), session.clone());
        }
        info!("Created session {}", session.id);
        Ok(session)
    }

    /// Resolve a live session. Absent and closed ids are indistinguishable.
    pub async fn get(&self, id: &str) -> SandboxResult<Arc<Session>> {
        let sessions = self.sessions.read().await;
        match sessions.get(id) {
            Some(session) if !session.is_closed() => Ok(session.clone()),
            _ => Err(SandboxError::SessionNotFound {
                session_id: id.to_string(),
            }),
        }
    }

    /// Diagnostics listing of live sessions.
    pub async fn list(&self) -> Vec<SessionSummary> {
        let sessions = self.sessions.read().await;
        let mut summaries = Vec::with_capacity(sessions.len());
        for session in sessions.values() {
            if session.is_closed() {
                continue;
            }
            summaries.push(SessionSummary {
                id: session.id.clone(),
                created_at: session.created_at,
                process_count: session.processes.len().await,
            });
        }
        summaries
    }

    /// Close a session: kill its tracked processes, release the remote
    /// handle, drop the entry. Deleting an absent or already-closed id is a
    /// no-op success so duplicate cleanup calls are harmless.
    pub async fn delete(&self, id: &str) -> SandboxResult<()> {
        let session = {
            let sessions = self.sessions.read().await;
            sessions.get(id).cloned()
        };
        let Some(session) = session else {
            return Ok(());
        };

        // First close wins; lookups see the session as gone from here on.
        if session.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        ProcessSupervisor::new(session.clone()).kill_all().await;

        let close_result = session.handle.close().await;

        {
            let mut sessions = self.sessions.write().await;
            sessions.remove(id);
        }

        match close_result {
            Ok(()) => {
                info!("Deleted session {}", id);
                Ok(())
            }
            Err(e) => {
                warn!("Session {} handle close failed: {}", id, e);
                Err(SandboxError::Provider {
                    reason: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::LocalProvider;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(Arc::new(LocalProvider::new()))
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let registry = registry();
        let session = registry.create().await.unwrap();
        let fetched = registry.get(session.id()).await.unwrap();
        assert_eq!(fetched.id(), session.id());
    }

    #[tokio::test]
    async fn test_concurrent_sessions_get_distinct_ids() {
        let registry = Arc::new(registry());
        let (a, b) = tokio::join!(registry.create(), registry.create());
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a.id(), b.id());
        assert_eq!(registry.list().await.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let registry = registry();
        let err = registry.get("no-such-session").await.unwrap_err();
        assert!(matches!(err, SandboxError::SessionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let registry = registry();
        let session = registry.create().await.unwrap();
        let id = session.id().to_string();
        registry.delete(&id).await.unwrap();
        // Second delete tolerates the absent entry.
        registry.delete(&id).await.unwrap();
        assert!(registry.get(&id).await.is_err());
    }

    #[tokio::test]
    async fn test_closed_session_rejects_lookup() {
        let registry = registry();
        let session = registry.create().await.unwrap();
        let id = session.id().to_string();
        registry.delete(&id).await.unwrap();
        let err = registry.get(&id).await.unwrap_err();
        assert!(matches!(err, SandboxError::SessionNotFound { .. }));
    }
}
