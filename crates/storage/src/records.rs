// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log records.
//!
//! Every mutation the store performs is one of these facts. Replaying the
//! record stream in sequence order rebuilds the tables exactly; recovery is
//! snapshot + tail replay.

use drudge_core::{ConversationId, EventRecord, Job, JobId, JobStatus, WorkerId};
use serde::{Deserialize, Serialize};

/// Partial update for `update_job_fields`. Only populated fields change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_action: Option<String>,
}

impl JobDelta {
    pub fn is_empty(&self) -> bool {
        self.goal.is_none() && self.agent_type.is_none() && self.current_action.is_none()
    }

    drudge_core::setters! {
        option {
            goal: String,
            agent_type: String,
            current_action: String,
        }
    }
}

/// A persisted mutation.
///
/// Serializes with `{"op": "name", ...fields}` so log lines stay greppable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StoreRecord {
    JobInserted {
        job: Job,
    },
    JobClaimed {
        id: JobId,
        claimant: WorkerId,
        at_ms: u64,
    },
    HeartbeatSet {
        id: JobId,
        at_ms: u64,
    },
    BudgetCharged {
        id: JobId,
        steps: u32,
        tokens: u64,
        cost_cents: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        current_action: Option<String>,
    },
    FieldsUpdated {
        id: JobId,
        delta: JobDelta,
    },
    CancelRequested {
        id: JobId,
        at_ms: u64,
    },
    Finished {
        id: JobId,
        status: JobStatus,
        at_ms: u64,
    },
    Escalated {
        id: JobId,
    },
    Requeued {
        id: JobId,
    },
    Resumed {
        id: JobId,
    },
    EventAppended {
        event: EventRecord,
    },
    ConversationCreated {
        id: ConversationId,
        created_at_ms: u64,
    },
}

impl StoreRecord {
    /// Short operation name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            StoreRecord::JobInserted { .. } => "job_inserted",
            StoreRecord::JobClaimed { .. } => "job_claimed",
            StoreRecord::HeartbeatSet { .. } => "heartbeat_set",
            StoreRecord::BudgetCharged { .. } => "budget_charged",
            StoreRecord::FieldsUpdated { .. } => "fields_updated",
            StoreRecord::CancelRequested { .. } => "cancel_requested",
            StoreRecord::Finished { .. } => "finished",
            StoreRecord::Escalated { .. } => "escalated",
            StoreRecord::Requeued { .. } => "requeued",
            StoreRecord::Resumed { .. } => "resumed",
            StoreRecord::EventAppended { .. } => "event_appended",
            StoreRecord::ConversationCreated { .. } => "conversation_created",
        }
    }
}
