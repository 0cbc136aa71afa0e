// ABOUTME: Integration tests for the tool contract over a live local session
// ABOUTME: Asserts wire shapes of success payloads and typed failures

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use forgebox_sandbox::{LocalProvider, Session, SessionRegistry};
use forgebox_tools::{dispatch, run_turn, ToolCall, MAX_TOOL_CALLS_PER_TURN};

async fn setup_session() -> (SessionRegistry, Arc<Session>) {
    let registry = SessionRegistry::new(Arc::new(LocalProvider::new()));
    let session = registry.create().await.expect("Failed to create session");
    (registry, session)
}

fn call(name: &str, arguments: Value) -> ToolCall {
    ToolCall {
        name: name.to_string(),
        arguments,
    }
}

fn as_json(outcome: &forgebox_tools::ToolOutcome) -> Value {
    serde_json::to_value(outcome).unwrap()
}

#[tokio::test]
async fn test_write_then_read_through_tools() {
    let (registry, session) = setup_session().await;

    let write = dispatch(
        session.clone(),
        call(
            "writeTextFile",
            json!({"path": "app/index.js", "content": "console.log(1)"}),
        ),
    )
    .await;
    assert_eq!(as_json(&write), json!({"success": true}));

    let read = dispatch(
        session.clone(),
        call("readTextFile", json!({"path": "app/index.js"})),
    )
    .await;
    assert_eq!(
        as_json(&read),
        json!({"success": true, "content": "console.log(1)"})
    );

    registry.delete(session.id()).await.unwrap();
}

#[tokio::test]
async fn test_escaping_path_is_a_validation_error() {
    let (registry, session) = setup_session().await;

    let outcome = dispatch(
        session.clone(),
        call("writeTextFile", json!({"path": "../oops", "content": "x"})),
    )
    .await;
    let wire = as_json(&outcome);
    assert_eq!(wire["success"], json!(false));
    assert_eq!(wire["error"]["kind"], json!("ValidationError"));

    registry.delete(session.id()).await.unwrap();
}

#[tokio::test]
async fn test_exec_reports_command_output() {
    let (registry, session) = setup_session().await;

    let outcome = dispatch(
        session.clone(),
        call("execShellCommand", json!({"command": "echo hello"})),
    )
    .await;
    let wire = as_json(&outcome);
    assert_eq!(wire["success"], json!(true));
    assert_eq!(wire["stdout"], json!("hello\n"));
    assert_eq!(wire["exitCode"], json!(0));

    // Non-zero exit: an unsuccessful command, not a tool failure.
    let outcome = dispatch(
        session.clone(),
        call("execShellCommand", json!({"command": "exit 7"})),
    )
    .await;
    let wire = as_json(&outcome);
    assert_eq!(wire["success"], json!(false));
    assert_eq!(wire["exitCode"], json!(7));
    assert!(wire.get("error").is_none());

    registry.delete(session.id()).await.unwrap();
}

#[tokio::test]
async fn test_exec_timeout_failure_shape() {
    let (registry, session) = setup_session().await;

    let outcome = dispatch(
        session.clone(),
        call(
            "execShellCommand",
            json!({"command": "sleep 10", "timeoutMs": 200}),
        ),
    )
    .await;
    let wire = as_json(&outcome);
    assert_eq!(wire["success"], json!(false));
    assert_eq!(wire["error"]["kind"], json!("CommandTimedOut"));

    registry.delete(session.id()).await.unwrap();
}

#[tokio::test]
async fn test_timeout_over_ceiling_is_rejected() {
    let (registry, session) = setup_session().await;

    let outcome = dispatch(
        session.clone(),
        call(
            "execShellCommand",
            json!({"command": "echo hi", "timeoutMs": 10001}),
        ),
    )
    .await;
    let wire = as_json(&outcome);
    assert_eq!(wire["error"]["kind"], json!("ValidationError"));

    registry.delete(session.id()).await.unwrap();
}

#[tokio::test]
async fn test_spawn_and_double_kill() {
    let (registry, session) = setup_session().await;

    let spawned = dispatch(
        session.clone(),
        call("spawnProcess", json!({"entrypoint": "sleep 30"})),
    )
    .await;
    let wire = as_json(&spawned);
    assert_eq!(wire["success"], json!(true));
    let pid = wire["pid"].as_u64().expect("pid missing") as u32;

    let first = dispatch(session.clone(), call("killProcess", json!({"pid": pid}))).await;
    assert_eq!(as_json(&first), json!({"success": true}));

    let second = dispatch(session.clone(), call("killProcess", json!({"pid": pid}))).await;
    let wire = as_json(&second);
    assert_eq!(wire["success"], json!(false));
    assert_eq!(wire["error"]["kind"], json!("ProcessNotFound"));

    registry.delete(session.id()).await.unwrap();
}

#[tokio::test]
async fn test_expose_failure_carries_diagnostics() {
    let (registry, session) = setup_session().await;

    let spawned = dispatch(
        session.clone(),
        call(
            "spawnProcess",
            json!({"entrypoint": "echo not a server; exit 1"}),
        ),
    )
    .await;
    let pid = as_json(&spawned)["pid"].as_u64().unwrap();

    let outcome = dispatch(session.clone(), call("exposeHttp", json!({"pid": pid}))).await;
    let wire = as_json(&outcome);
    assert_eq!(wire["error"]["kind"], json!("HttpNotReady"));
    assert!(
        wire["error"]["stdout"]
            .as_str()
            .unwrap()
            .contains("not a server"),
        "diagnostics were: {}",
        wire["error"]
    );

    registry.delete(session.id()).await.unwrap();
}

#[tokio::test]
async fn test_unknown_tool_and_malformed_arguments() {
    let (registry, session) = setup_session().await;

    let outcome = dispatch(session.clone(), call("formatDisk", json!({}))).await;
    assert_eq!(as_json(&outcome)["error"]["kind"], json!("ValidationError"));

    let outcome = dispatch(
        session.clone(),
        call("killProcess", json!({"pid": "not-a-number"})),
    )
    .await;
    assert_eq!(as_json(&outcome)["error"]["kind"], json!("ValidationError"));

    registry.delete(session.id()).await.unwrap();
}

#[tokio::test]
async fn test_turn_budget_caps_invocations() {
    let (registry, session) = setup_session().await;

    let calls: Vec<ToolCall> = (0..MAX_TOOL_CALLS_PER_TURN + 1)
        .map(|i| {
            call(
                "writeTextFile",
                json!({"path": format!("file-{}.txt", i), "content": "x"}),
            )
        })
        .collect();

    let outcomes = run_turn(session.clone(), calls).await;
    assert_eq!(outcomes.len(), MAX_TOOL_CALLS_PER_TURN + 1);
    for outcome in &outcomes[..MAX_TOOL_CALLS_PER_TURN] {
        assert!(!outcome.is_failure());
    }
    let refused = as_json(&outcomes[MAX_TOOL_CALLS_PER_TURN]);
    assert_eq!(refused["error"]["kind"], json!("TurnBudgetExceeded"));

    registry.delete(session.id()).await.unwrap();
}
