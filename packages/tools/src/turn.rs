use std::sync::Arc;

use tracing::warn;

use forgebox_sandbox::{Session, WireError};

use crate::dispatch::{dispatch, ToolCall, ToolOutcome};

/// Maximum tool invocations a single conversational turn may perform.
///
/// The cap belongs to whatever drives repeated tool calls, not to any single
/// capability; it exists to stop runaway agent loops.
pub const MAX_TOOL_CALLS_PER_TURN: usize = 10;

/// Counts down the invocations remaining in one turn.
#[derive(Debug, Clone)]
pub struct TurnBudget {
    limit: usize,
    used: usize,
}

impl TurnBudget {
    pub fn new(limit: usize) -> Self {
        Self { limit, used: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.used)
    }

    /// Account for one invocation; refuses once the limit is spent.
    pub fn try_consume(&mut self) -> Result<(), WireError> {
        if self.used >= self.limit {
            return Err(WireError {
                kind: "TurnBudgetExceeded",
                message: format!(
                    "tool call budget of {} per turn exhausted",
                    self.limit
                ),
                stdout: None,
                stderr: None,
            });
        }
        self.used += 1;
        Ok(())
    }
}

impl Default for TurnBudget {
    fn default() -> Self {
        Self::new(MAX_TOOL_CALLS_PER_TURN)
    }
}

/// Run one turn's tool calls in order under the invocation budget.
///
/// Every submitted call gets an outcome: calls past the budget are refused
/// with a `TurnBudgetExceeded` failure instead of being silently dropped.
pub async fn run_turn(session: Arc<Session>, calls: Vec<ToolCall>) -> Vec<ToolOutcome> {
    let mut budget = TurnBudget::default();
    let mut outcomes = Vec::with_capacity(calls.len());
    for call in calls {
        match budget.try_consume() {
            Ok(()) => outcomes.push(dispatch(session.clone(), call).await),
            Err(refusal) => {
                warn!(
                    "Refusing tool call '{}': {}",
                    call.name, refusal.message
                );
                outcomes.push(ToolOutcome::failure(refusal));
            }
        }
    }
    outcomes
}
