// ABOUTME: HTTP API layer for Forgebox providing REST endpoints and routing
// ABOUTME: Thin plumbing over the session registry and the tool contract

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};

use forgebox_sandbox::SessionRegistry;

pub mod response;
pub mod sandbox_handlers;
pub mod tool_handlers;

pub use response::ApiResponse;
pub use tool_handlers::SANDBOX_ID_HEADER;

/// Shared application state: the injected session registry.
pub type AppState = Arc<SessionRegistry>;

/// Creates the sandbox session router.
pub fn create_sandboxes_router() -> Router<AppState> {
    Router::new()
        .route("/", post(sandbox_handlers::create_sandbox))
        .route("/", get(sandbox_handlers::list_sandboxes))
        .route("/{id}", delete(sandbox_handlers::delete_sandbox))
        .route(
            "/{id}/processes",
            get(sandbox_handlers::list_session_processes),
        )
        .route(
            "/{id}/processes/{pid}/output",
            get(sandbox_handlers::get_process_output),
        )
}

/// Creates the tool contract router.
pub fn create_tools_router() -> Router<AppState> {
    Router::new()
        .route("/", get(tool_handlers::list_tools))
        .route("/call", post(tool_handlers::call_tool))
        .route("/turn", post(tool_handlers::run_tool_turn))
}

/// Creates the full application router over the given registry.
pub fn create_router(sessions: AppState) -> Router {
    Router::new()
        .route("/api/health", get(sandbox_handlers::health_check))
        .nest("/api/sandboxes", create_sandboxes_router())
        .nest("/api/tools", create_tools_router())
        .with_state(sessions)
}
