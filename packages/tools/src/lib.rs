//! Forgebox tool contract.
//!
//! The only interface the driving agent loop sees: a JSON-schema catalog of
//! named capabilities, typed dispatch of individual calls into the sandbox
//! orchestration layer, and the per-turn invocation budget.

pub mod catalog;
pub mod dispatch;
pub mod schema;
pub mod turn;

pub use catalog::tool_catalog;
pub use dispatch::{dispatch, ToolCall, ToolOutcome};
pub use schema::{Tool, ToolInputSchema};
pub use turn::{run_turn, TurnBudget, MAX_TOOL_CALLS_PER_TURN};

/// Version information for the tools crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
