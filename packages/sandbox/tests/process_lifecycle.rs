// ABOUTME: Integration tests for process spawn/kill and HTTP exposure races
// ABOUTME: Uses sh entrypoints and python3 -m http.server as a real HTTP server

use std::sync::Arc;

use forgebox_sandbox::{
    ExposureCoordinator, LocalProvider, ProcessState, ProcessSupervisor, SandboxError, Session,
    SessionRegistry,
};

async fn setup_session() -> (SessionRegistry, Arc<Session>) {
    let registry = SessionRegistry::new(Arc::new(LocalProvider::new()));
    let session = registry.create().await.expect("Failed to create session");
    (registry, session)
}

/// Check if python3 is available for HTTP server tests.
fn python3_available() -> bool {
    std::process::Command::new("python3")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[tokio::test]
async fn test_spawn_registers_process() {
    let (registry, session) = setup_session().await;
    let supervisor = ProcessSupervisor::new(session.clone());

    let snapshot = supervisor.spawn("sleep 30").await.unwrap();
    assert_eq!(snapshot.state, ProcessState::Spawned);
    assert!(snapshot.public_url.is_none());

    let listed = supervisor.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].pid, snapshot.pid);

    registry.delete(session.id()).await.unwrap();
}

#[tokio::test]
async fn test_kill_is_idempotent() {
    let (registry, session) = setup_session().await;
    let supervisor = ProcessSupervisor::new(session.clone());

    let snapshot = supervisor.spawn("sleep 30").await.unwrap();
    supervisor.kill(snapshot.pid).await.unwrap();

    let err = supervisor.kill(snapshot.pid).await.unwrap_err();
    assert!(matches!(
        err,
        SandboxError::ProcessNotFound { pid } if pid == snapshot.pid
    ));
    assert!(session.processes().is_empty().await);

    registry.delete(session.id()).await.unwrap();
}

#[tokio::test]
async fn test_kill_unknown_pid_performs_no_action() {
    let (registry, session) = setup_session().await;
    let supervisor = ProcessSupervisor::new(session.clone());

    let err = supervisor.kill(424242).await.unwrap_err();
    assert!(matches!(err, SandboxError::ProcessNotFound { pid: 424242 }));

    registry.delete(session.id()).await.unwrap();
}

#[tokio::test]
async fn test_expose_http_server_returns_url() {
    if !python3_available() {
        println!("Skipping test: python3 not available");
        return;
    }
    let (registry, session) = setup_session().await;
    let supervisor = ProcessSupervisor::new(session.clone());
    let coordinator = ExposureCoordinator::new(session.clone());

    let snapshot = supervisor
        .spawn("python3 -m http.server \"$PORT\"")
        .await
        .unwrap();
    let exposure = coordinator.expose(snapshot.pid).await.unwrap();

    assert!(exposure.public_url.starts_with("http://"));

    // The process stays registered and reachable after exposure.
    let listed = supervisor.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].state, ProcessState::Exposed);
    assert_eq!(listed[0].public_url.as_deref(), Some(exposure.public_url.as_str()));

    let body = reachable(&exposure.public_url).await;
    assert!(body, "exposed URL {} not reachable", exposure.public_url);

    supervisor.kill(snapshot.pid).await.unwrap();
    registry.delete(session.id()).await.unwrap();
}

/// Minimal readiness probe against the exposed URL.
async fn reachable(url: &str) -> bool {
    let authority = url.trim_start_matches("http://");
    let addr = authority.replace("localhost", "127.0.0.1");
    tokio::net::TcpStream::connect(addr).await.is_ok()
}

#[tokio::test]
async fn test_expose_non_server_fails_with_diagnostics() {
    let (registry, session) = setup_session().await;
    let supervisor = ProcessSupervisor::new(session.clone());
    let coordinator = ExposureCoordinator::new(session.clone());

    let snapshot = supervisor
        .spawn("echo starting up; echo no port for me >&2; exit 1")
        .await
        .unwrap();

    let err = coordinator.expose(snapshot.pid).await.unwrap_err();
    match err {
        SandboxError::HttpNotReady { stdout, stderr } => {
            assert!(stdout.contains("starting up"), "stdout was: {:?}", stdout);
            assert!(stderr.contains("no port for me"), "stderr was: {:?}", stderr);
        }
        other => panic!("expected HttpNotReady, got {:?}", other.kind()),
    }

    // The failed process was torn down as part of raising the error.
    let err = supervisor.kill(snapshot.pid).await.unwrap_err();
    assert!(matches!(err, SandboxError::ProcessNotFound { .. }));

    registry.delete(session.id()).await.unwrap();
}

#[tokio::test]
async fn test_expose_slow_starter_times_out_without_killing() {
    let (registry, session) = setup_session().await;
    let supervisor = ProcessSupervisor::new(session.clone());
    let coordinator = ExposureCoordinator::new(session.clone());

    // Alive but never listens: the deadline elapses and the process is left
    // running so the caller can retry or investigate.
    let snapshot = supervisor.spawn("sleep 30").await.unwrap();
    let err = coordinator.expose(snapshot.pid).await.unwrap_err();
    assert!(matches!(
        err,
        SandboxError::ReadinessTimeout { pid } if pid == snapshot.pid
    ));

    // Still registered; an explicit kill succeeds.
    assert_eq!(supervisor.list().await.unwrap().len(), 1);
    supervisor.kill(snapshot.pid).await.unwrap();

    registry.delete(session.id()).await.unwrap();
}

#[tokio::test]
async fn test_expose_unknown_pid() {
    let (registry, session) = setup_session().await;
    let coordinator = ExposureCoordinator::new(session.clone());

    let err = coordinator.expose(999_999).await.unwrap_err();
    assert!(matches!(err, SandboxError::ProcessNotFound { .. }));

    registry.delete(session.id()).await.unwrap();
}

#[tokio::test]
async fn test_session_delete_reaps_processes() {
    let (registry, session) = setup_session().await;
    let supervisor = ProcessSupervisor::new(session.clone());

    supervisor.spawn("sleep 30").await.unwrap();
    supervisor.spawn("sleep 30").await.unwrap();
    assert_eq!(session.processes().len().await, 2);

    registry.delete(session.id()).await.unwrap();
    assert!(session.processes().is_empty().await);
}
