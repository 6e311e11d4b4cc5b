// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-level errors.
//!
//! Everything the control plane surfaces to callers wraps the layer that
//! produced it; raw storage errors never cross the service or agent-loop
//! boundary.

use crate::planner::PlannerError;
use drudge_core::ToolError;
use drudge_storage::StoreError;
use thiserror::Error;

/// Failure surfaced by the engine's public operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("planner: {0}")]
    Planner(#[from] PlannerError),
    #[error("tool: {0}")]
    Tool(#[from] ToolError),
}

impl EngineError {
    /// Whether this is a missing-row error, the common caller branch.
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::Store(StoreError::NotFound(_)))
    }

    /// Whether the underlying operation may be retried with backoff.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Store(err) => err.is_retryable(),
            EngineError::Planner(PlannerError::Transient(_)) => true,
            EngineError::Planner(PlannerError::Fatal(_)) => false,
            EngineError::Tool(ToolError::Recoverable(_)) => true,
            EngineError::Tool(ToolError::Fatal(_)) => false,
        }
    }
}
