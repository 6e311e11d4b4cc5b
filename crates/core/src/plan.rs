// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Planner responses.

use serde::{Deserialize, Serialize};

/// What the planner wants the agent loop to do next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanStep {
    /// Invoke a tool with the given parameters.
    Call {
        tool: String,
        params: serde_json::Value,
    },
    /// Terminate with success, recording the answer.
    Answer { text: String },
    /// Pause for human input.
    Escalate { reason: String },
}

impl PlanStep {
    pub fn call(tool: impl Into<String>, params: serde_json::Value) -> Self {
        PlanStep::Call {
            tool: tool.into(),
            params,
        }
    }

    pub fn answer(text: impl Into<String>) -> Self {
        PlanStep::Answer { text: text.into() }
    }

    pub fn escalate(reason: impl Into<String>) -> Self {
        PlanStep::Escalate {
            reason: reason.into(),
        }
    }
}
