// ABOUTME: HTTP request handlers for the tool capability contract
// ABOUTME: Resolves the session from request metadata before any operation runs

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::response::ApiResponse;
use crate::AppState;
use forgebox_sandbox::Session;
use forgebox_tools::{dispatch, run_turn, tool_catalog, Tool, ToolCall, ToolOutcome};

/// Request header carrying the session identifier for tool routes.
pub const SANDBOX_ID_HEADER: &str = "x-sandbox-id";

/// Resolve the session named by the `x-sandbox-id` header.
///
/// An absent or unknown identifier terminates the request with a client
/// error before any operation is attempted; it is not one of the structured
/// capability failures.
async fn resolve_session(
    sessions: &AppState,
    headers: &HeaderMap,
) -> Result<Arc<Session>, StatusCode> {
    let id = headers
        .get(SANDBOX_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or(StatusCode::BAD_REQUEST)?;

    sessions.get(id).await.map_err(|_| {
        warn!("Rejected request for unknown sandbox: {}", id);
        StatusCode::NOT_FOUND
    })
}

/// List the capability catalog the agent loop may invoke.
pub async fn list_tools() -> Json<ApiResponse<Vec<Tool>>> {
    Json(ApiResponse::success(tool_catalog()))
}

/// Invoke a single tool call against the session in the request metadata.
///
/// The response body is the structured tool outcome itself (success payload
/// or typed failure), exactly what gets forwarded into the agent loop.
pub async fn call_tool(
    State(sessions): State<AppState>,
    headers: HeaderMap,
    Json(call): Json<ToolCall>,
) -> Result<Json<ToolOutcome>, StatusCode> {
    let session = resolve_session(&sessions, &headers).await?;
    debug!("Session {} tool call: {}", session.id(), call.name);
    Ok(Json(dispatch(session, call).await))
}

#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    pub calls: Vec<ToolCall>,
}

/// Run one conversational turn's tool calls under the invocation budget.
pub async fn run_tool_turn(
    State(sessions): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<TurnRequest>,
) -> Result<Json<Vec<ToolOutcome>>, StatusCode> {
    let session = resolve_session(&sessions, &headers).await?;
    Ok(Json(run_turn(session, request.calls).await))
}
