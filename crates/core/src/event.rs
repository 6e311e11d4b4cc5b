// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ledger event records.
//!
//! Events are append-only facts: never mutated, never deleted. The store
//! assigns each event a per-job monotone sequence number; subscribers see
//! events in exactly that order.

use crate::id::{EventId, JobId, TraceId};
use serde::{Deserialize, Serialize};

/// Kind of a ledger event.
///
/// The set is closed for producers; consumers must pass unknown kinds
/// through rather than reject them, so deserialization folds anything
/// unrecognized into [`EventKind::Other`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Info,
    Plan,
    Decision,
    ToolCall,
    ToolResult,
    Error,
    Escalation,
    Evaluation,
    Completion,
    /// Forward-compatibility passthrough for kinds this build doesn't know.
    Other(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Info => "info",
            EventKind::Plan => "plan",
            EventKind::Decision => "decision",
            EventKind::ToolCall => "tool_call",
            EventKind::ToolResult => "tool_result",
            EventKind::Error => "error",
            EventKind::Escalation => "escalation",
            EventKind::Evaluation => "evaluation",
            EventKind::Completion => "completion",
            EventKind::Other(s) => s,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for EventKind {
    fn from(s: &str) -> Self {
        match s {
            "info" => EventKind::Info,
            "plan" => EventKind::Plan,
            "decision" => EventKind::Decision,
            "tool_call" => EventKind::ToolCall,
            "tool_result" => EventKind::ToolResult,
            "error" => EventKind::Error,
            "escalation" => EventKind::Escalation,
            "evaluation" => EventKind::Evaluation,
            "completion" => EventKind::Completion,
            other => EventKind::Other(other.to_string()),
        }
    }
}

impl Serialize for EventKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(EventKind::from(s.as_str()))
    }
}

/// One row in the append-only ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: EventId,
    pub job_id: JobId,
    /// Correlates every event one agent-loop run emits.
    pub trace_id: TraceId,
    /// Per-job monotone sequence, assigned by the store at append.
    #[serde(default)]
    pub seq: u64,
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Short human-readable description.
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_cents: Option<u64>,
    pub created_at_ms: u64,
}

impl EventRecord {
    /// Base constructor; emission helpers below keep call sites uniform.
    pub fn new(job_id: JobId, trace_id: TraceId, kind: EventKind, summary: impl Into<String>) -> Self {
        Self {
            id: EventId::new(),
            job_id,
            trace_id,
            seq: 0,
            kind,
            tool_name: None,
            params: None,
            result: None,
            summary: summary.into(),
            tokens_used: None,
            cost_cents: None,
            created_at_ms: 0,
        }
    }

    pub fn tool_call(
        job_id: JobId,
        trace_id: TraceId,
        tool_name: impl Into<String>,
        params: serde_json::Value,
    ) -> Self {
        let tool_name = tool_name.into();
        let mut event = Self::new(
            job_id,
            trace_id,
            EventKind::ToolCall,
            format!("calling {tool_name}"),
        );
        event.tool_name = Some(tool_name);
        event.params = Some(params);
        event
    }

    pub fn tool_result(
        job_id: JobId,
        trace_id: TraceId,
        tool_name: impl Into<String>,
        result: serde_json::Value,
        summary: impl Into<String>,
    ) -> Self {
        let mut event = Self::new(job_id, trace_id, EventKind::ToolResult, summary);
        event.tool_name = Some(tool_name.into());
        event.result = Some(result);
        event
    }

    pub fn error(job_id: JobId, trace_id: TraceId, summary: impl Into<String>) -> Self {
        Self::new(job_id, trace_id, EventKind::Error, summary)
    }

    pub fn escalation(job_id: JobId, trace_id: TraceId, reason: impl Into<String>) -> Self {
        Self::new(job_id, trace_id, EventKind::Escalation, reason)
    }

    pub fn completion(job_id: JobId, trace_id: TraceId, answer: impl Into<String>) -> Self {
        Self::new(job_id, trace_id, EventKind::Completion, answer)
    }

    crate::setters! {
        option {
            tokens_used: u64,
            cost_cents: u64,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
