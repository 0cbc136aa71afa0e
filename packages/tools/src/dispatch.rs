use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use forgebox_sandbox::{
    validation::validate_relative_path, CommandExecutor, ExposureCoordinator, ProcessSupervisor,
    SandboxError, Session, WireError,
};

/// One tool invocation from the agent loop: operation name plus JSON
/// arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Structured result forwarded back into the agent loop.
///
/// Always one of two shapes: a success payload, or a typed failure carrying
/// the error kind and its fields. Raw provider faults never appear here.
#[derive(Debug, Clone, Serialize)]
pub struct ToolOutcome {
    pub success: bool,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
}

impl ToolOutcome {
    fn ok(payload: Map<String, Value>) -> Self {
        Self {
            success: true,
            payload,
            error: None,
        }
    }

    fn completed(success: bool, payload: Map<String, Value>) -> Self {
        Self {
            success,
            payload,
            error: None,
        }
    }

    pub fn failure(error: WireError) -> Self {
        Self {
            success: false,
            payload: Map::new(),
            error: Some(error),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

impl From<&SandboxError> for ToolOutcome {
    fn from(err: &SandboxError) -> Self {
        ToolOutcome::failure(err.to_wire())
    }
}

#[derive(Debug, Deserialize)]
struct WriteTextFileArgs {
    path: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ReadTextFileArgs {
    path: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecShellCommandArgs {
    command: String,
    #[serde(default)]
    timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SpawnProcessArgs {
    entrypoint: String,
}

#[derive(Debug, Deserialize)]
struct KillProcessArgs {
    pid: u32,
}

#[derive(Debug, Deserialize)]
struct ExposeHttpArgs {
    pid: u32,
}

fn parse_args<T: serde::de::DeserializeOwned>(arguments: Value) -> Result<T, SandboxError> {
    serde_json::from_value(arguments).map_err(|e| SandboxError::Validation {
        reason: format!("invalid arguments: {}", e),
    })
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Execute one tool call against a resolved session.
///
/// Every capability failure comes back as a structured outcome; the only
/// panics possible here are bugs, not inputs.
pub async fn dispatch(session: Arc<Session>, call: ToolCall) -> ToolOutcome {
    debug!("Dispatching tool call '{}'", call.name);
    match execute(session, &call).await {
        Ok(outcome) => outcome,
        Err(err) => ToolOutcome::from(&err),
    }
}

async fn execute(session: Arc<Session>, call: &ToolCall) -> Result<ToolOutcome, SandboxError> {
    session.ensure_live()?;
    match call.name.as_str() {
        "writeTextFile" => {
            let args: WriteTextFileArgs = parse_args(call.arguments.clone())?;
            validate_relative_path(&args.path)
                .map_err(|reason| SandboxError::Validation { reason })?;
            session
                .handle()
                .write_file(&args.path, &args.content)
                .await
                .map_err(|e| SandboxError::Provider {
                    reason: e.to_string(),
                })?;
            Ok(ToolOutcome::ok(Map::new()))
        }
        "readTextFile" => {
            let args: ReadTextFileArgs = parse_args(call.arguments.clone())?;
            validate_relative_path(&args.path)
                .map_err(|reason| SandboxError::Validation { reason })?;
            let content = session
                .handle()
                .read_file(&args.path)
                .await
                .map_err(|e| SandboxError::Provider {
                    reason: e.to_string(),
                })?;
            Ok(ToolOutcome::ok(object(json!({ "content": content }))))
        }
        "execShellCommand" => {
            let args: ExecShellCommandArgs = parse_args(call.arguments.clone())?;
            let outcome = CommandExecutor::new(session)
                .run(&args.command, args.timeout_ms)
                .await?;
            Ok(ToolOutcome::completed(
                outcome.succeeded,
                object(json!({
                    "stdout": outcome.stdout,
                    "stderr": outcome.stderr,
                    "exitCode": outcome.exit_code,
                })),
            ))
        }
        "spawnProcess" => {
            let args: SpawnProcessArgs = parse_args(call.arguments.clone())?;
            let snapshot = ProcessSupervisor::new(session).spawn(&args.entrypoint).await?;
            Ok(ToolOutcome::ok(object(json!({ "pid": snapshot.pid }))))
        }
        "killProcess" => {
            let args: KillProcessArgs = parse_args(call.arguments.clone())?;
            ProcessSupervisor::new(session).kill(args.pid).await?;
            Ok(ToolOutcome::ok(Map::new()))
        }
        "exposeHttp" => {
            let args: ExposeHttpArgs = parse_args(call.arguments.clone())?;
            let exposure = ExposureCoordinator::new(session).expose(args.pid).await?;
            Ok(ToolOutcome::ok(object(
                json!({ "publicUrl": exposure.public_url }),
            )))
        }
        other => Err(SandboxError::Validation {
            reason: format!("unknown tool: {}", other),
        }),
    }
}
