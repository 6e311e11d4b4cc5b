// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool interface types.
//!
//! Tools themselves live outside the backbone; the agent loop consults only
//! the declared attributes here and never interprets tool semantics.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Whether a tool observes or mutates the working copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    ReadOnly,
    Mutating,
}

crate::simple_display! {
    ToolCategory {
        ReadOnly => "read_only",
        Mutating => "mutating",
    }
}

/// Rough cost of invoking the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostHint {
    Cheap,
    Moderate,
    Expensive,
}

/// Risk classification for mutating tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskHint {
    Safe,
    Reversible,
    Destructive,
}

/// The change surface a mutating tool would touch, reported pre-flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footprint {
    pub files: u32,
    pub lines: u32,
}

/// Static description of a tool, surfaced to planners as the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub category: ToolCategory,
    pub cost_hint: CostHint,
    pub risk_hint: RiskHint,
    /// JSON schema for parameters.
    pub params_schema: serde_json::Value,
    /// JSON schema for results.
    pub result_schema: serde_json::Value,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, category: ToolCategory) -> Self {
        Self {
            name: name.into(),
            category,
            cost_hint: CostHint::Cheap,
            risk_hint: RiskHint::Safe,
            params_schema: serde_json::Value::Null,
            result_schema: serde_json::Value::Null,
        }
    }

    crate::setters! {
        set {
            cost_hint: CostHint,
            risk_hint: RiskHint,
            params_schema: serde_json::Value,
            result_schema: serde_json::Value,
        }
    }
}

/// Tool invocation failure, split by whether the loop may continue.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolError {
    /// The planner sees the error on its next step and the loop continues.
    #[error("recoverable: {0}")]
    Recoverable(String),
    /// The job fails.
    #[error("fatal: {0}")]
    Fatal(String),
}

/// Successful tool invocation: opaque value plus usage attribution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub value: serde_json::Value,
    #[serde(default)]
    pub tokens_used: u64,
    #[serde(default)]
    pub cost_cents: u64,
}

impl ToolOutput {
    pub fn new(value: serde_json::Value) -> Self {
        Self {
            value,
            tokens_used: 0,
            cost_cents: 0,
        }
    }

    crate::setters! {
        set {
            tokens_used: u64,
            cost_cents: u64,
        }
    }
}

#[cfg(test)]
#[path = "tool_tests.rs"]
mod tests;
