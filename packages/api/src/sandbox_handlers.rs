// ABOUTME: HTTP request handlers for sandbox session lifecycle operations
// ABOUTME: Provisioning, diagnostics listings, and idempotent teardown

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::response::ApiResponse;
use crate::AppState;
use forgebox_sandbox::{ProcessOutput, ProcessSnapshot, ProcessSupervisor, SessionSummary};

#[derive(Debug, Serialize)]
pub struct CreateSandboxResponse {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// Provision a new sandbox session and return its opaque identifier.
pub async fn create_sandbox(
    State(sessions): State<AppState>,
) -> Result<Json<ApiResponse<CreateSandboxResponse>>, StatusCode> {
    match sessions.create().await {
        Ok(session) => {
            info!("Created sandbox session: {}", session.id());
            Ok(Json(ApiResponse::success(CreateSandboxResponse {
                id: session.id().to_string(),
                created_at: session.created_at(),
            })))
        }
        Err(e) => {
            error!("Failed to provision sandbox: {}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

/// List live sessions (diagnostics only).
pub async fn list_sandboxes(
    State(sessions): State<AppState>,
) -> Json<ApiResponse<Vec<SessionSummary>>> {
    Json(ApiResponse::success(sessions.list().await))
}

/// Close a sandbox session. Deleting an unknown id is a no-op success so
/// duplicate cleanup calls are harmless.
pub async fn delete_sandbox(
    State(sessions): State<AppState>,
    Path(id): Path<String>,
) -> Json<ApiResponse<()>> {
    match sessions.delete(&id).await {
        Ok(()) => {
            info!("Deleted sandbox session: {}", id);
            Json(ApiResponse::success(()))
        }
        Err(e) => {
            error!("Failed to delete sandbox {}: {}", id, e);
            Json(ApiResponse::error(e))
        }
    }
}

/// List the processes tracked inside a session (diagnostics only).
pub async fn list_session_processes(
    State(sessions): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<ProcessSnapshot>>>, StatusCode> {
    let session = sessions.get(&id).await.map_err(|_| StatusCode::NOT_FOUND)?;
    let supervisor = ProcessSupervisor::new(session);
    match supervisor.list().await {
        Ok(processes) => Ok(Json(ApiResponse::success(processes))),
        Err(_) => Err(StatusCode::NOT_FOUND),
    }
}

/// Buffered output of one tracked process (diagnostics only).
pub async fn get_process_output(
    State(sessions): State<AppState>,
    Path((id, pid)): Path<(String, u32)>,
) -> Result<Json<ApiResponse<ProcessOutput>>, StatusCode> {
    let session = sessions.get(&id).await.map_err(|_| StatusCode::NOT_FOUND)?;
    let supervisor = ProcessSupervisor::new(session);
    match supervisor.output(pid).await {
        Ok(output) => Ok(Json(ApiResponse::success(output))),
        Err(_) => Err(StatusCode::NOT_FOUND),
    }
}

/// Health check endpoint for the orchestration service.
pub async fn health_check() -> Json<ApiResponse<String>> {
    Json(ApiResponse::success("Forgebox is healthy".to_string()))
}
