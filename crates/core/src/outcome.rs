// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent loop outcomes.
//!
//! The loop never unwinds with an error; every way it can end is a variant
//! here, and the worker is the only place that translates an outcome into
//! a terminal status.

use crate::budget::ExhaustReason;

/// Terminal signal returned by one agent-loop run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The planner answered; the job succeeded.
    Success,
    /// The job failed for the given reason.
    Failed(FailReason),
    /// A cancel request was observed and the loop unwound.
    Cancelled,
    /// The agent asked for human help.
    Escalated(String),
}

/// Why an agent-loop run failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailReason {
    /// A budget cap ran out.
    Budget(ExhaustReason),
    /// A tool returned a non-recoverable error.
    Tool(String),
    /// The planner failed permanently.
    Planner(String),
    /// Programmer error caught at the worker boundary.
    Internal(String),
}

impl std::fmt::Display for FailReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailReason::Budget(reason) => write!(f, "budget_{reason}"),
            FailReason::Tool(msg) => write!(f, "tool_error: {msg}"),
            FailReason::Planner(msg) => write!(f, "planner_error: {msg}"),
            FailReason::Internal(msg) => write!(f, "internal_error: {msg}"),
        }
    }
}

#[cfg(test)]
#[path = "outcome_tests.rs"]
mod tests;
