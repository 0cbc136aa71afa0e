use serde_json::Map;

use crate::schema::{property, Tool, ToolInputSchema};
use forgebox_sandbox::MAX_COMMAND_TIMEOUT_MS;

/// The six capabilities the agent loop may invoke against a session.
///
/// Names and field shapes are part of the contract; handlers reject calls
/// whose name is not listed here.
pub fn tool_catalog() -> Vec<Tool> {
    let mut write_props = Map::new();
    write_props.insert(
        "path".to_string(),
        property("string", "Path relative to the sandbox root"),
    );
    write_props.insert(
        "content".to_string(),
        property("string", "Full file content to write"),
    );

    let mut read_props = Map::new();
    read_props.insert(
        "path".to_string(),
        property("string", "Path relative to the sandbox root"),
    );

    let mut exec_props = Map::new();
    exec_props.insert(
        "command".to_string(),
        property("string", "Shell command to run inside the sandbox"),
    );
    exec_props.insert(
        "timeoutMs".to_string(),
        property(
            "integer",
            &format!(
                "Deadline in milliseconds, at most {}. Defaults to 5000",
                MAX_COMMAND_TIMEOUT_MS
            ),
        ),
    );

    let mut spawn_props = Map::new();
    spawn_props.insert(
        "entrypoint".to_string(),
        property(
            "string",
            "Command line that starts the long-lived process; $PORT holds its assigned port",
        ),
    );

    let mut kill_props = Map::new();
    kill_props.insert(
        "pid".to_string(),
        property("integer", "Identifier returned by spawnProcess"),
    );

    let mut expose_props = Map::new();
    expose_props.insert(
        "pid".to_string(),
        property("integer", "Identifier of the process to expose over HTTP"),
    );

    vec![
        Tool {
            name: "writeTextFile".to_string(),
            description: Some(
                "Write a text file into the sandbox, creating parent directories as needed"
                    .to_string(),
            ),
            input_schema: ToolInputSchema::object(write_props, &["path", "content"]),
        },
        Tool {
            name: "readTextFile".to_string(),
            description: Some("Read a text file from the sandbox".to_string()),
            input_schema: ToolInputSchema::object(read_props, &["path"]),
        },
        Tool {
            name: "execShellCommand".to_string(),
            description: Some(
                "Run a short one-shot shell command with captured output. Not for servers; \
                 use spawnProcess for anything long-lived"
                    .to_string(),
            ),
            input_schema: ToolInputSchema::object(exec_props, &["command"]),
        },
        Tool {
            name: "spawnProcess".to_string(),
            description: Some("Start a long-lived process inside the sandbox".to_string()),
            input_schema: ToolInputSchema::object(spawn_props, &["entrypoint"]),
        },
        Tool {
            name: "killProcess".to_string(),
            description: Some("Terminate a spawned process".to_string()),
            input_schema: ToolInputSchema::object(kill_props, &["pid"]),
        },
        Tool {
            name: "exposeHttp".to_string(),
            description: Some(
                "Wait for a spawned process to accept HTTP connections and attach a public URL \
                 to it"
                    .to_string(),
            ),
            input_schema: ToolInputSchema::object(expose_props, &["pid"]),
        },
    ]
}
