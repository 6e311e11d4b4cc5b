// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job row: unit of work, budget counters, and claim bookkeeping.

use crate::id::{ConversationId, JobId};
use crate::mode::Mode;
use crate::status::JobStatus;
use crate::worker::WorkerId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Hard upper bounds on a job's budget counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCaps {
    pub step_cap: u32,
    pub token_cap: u64,
    pub cost_cap_cents: u64,
}

/// Monotone non-decreasing usage counters.
///
/// Preserved across requeue and resume; only terminal jobs stop moving.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetUsed {
    pub steps_used: u32,
    pub tokens_used: u64,
    pub cost_used_cents: u64,
}

/// A job instance.
///
/// All timestamps are epoch milliseconds. Option fields follow the claim
/// invariants: `claimant` and `last_heartbeat_at_ms` are populated only
/// while the status holds a claim, `finished_at_ms` only once terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub goal: String,
    pub mode: Mode,
    /// Agent role to instantiate (coordinator, planner, builder, ...).
    /// Opaque to the backbone; passed through to the agent loop.
    pub agent_type: String,
    pub status: JobStatus,
    /// Working copy the agent is allowed to touch.
    pub repo_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_job_id: Option<JobId>,
    pub caps: JobCaps,
    #[serde(default)]
    pub used: BudgetUsed,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimant: Option<WorkerId>,
    /// Short human-readable description of what the agent is doing now.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_action: Option<String>,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_heartbeat_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_requested_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at_ms: Option<u64>,
}

impl Job {
    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// A running job is stale when its heartbeat is missing or older than
    /// `stale_after` milliseconds. Only running jobs are ever stale; a
    /// cancelling job is left to its worker (or the wall clock).
    pub fn is_stale(&self, now_ms: u64, stale_after_ms: u64) -> bool {
        if self.status != JobStatus::Running {
            return false;
        }
        match self.last_heartbeat_at_ms {
            None => true,
            Some(hb) => hb + stale_after_ms < now_ms,
        }
    }
}

/// Validation failures for producer inputs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("goal must not be empty")]
    EmptyGoal,
    #[error("agent_type must not be empty")]
    EmptyAgentType,
    #[error("repo_path must not be empty")]
    EmptyRepoPath,
}

/// Producer payload for creating a job.
///
/// Caps left unset default per mode at insert time.
#[derive(Debug, Clone)]
pub struct CreateJob {
    pub goal: String,
    pub mode: Mode,
    pub agent_type: String,
    pub repo_path: PathBuf,
    pub conversation_id: Option<ConversationId>,
    pub parent_job_id: Option<JobId>,
    pub caps: Option<JobCaps>,
}

impl CreateJob {
    pub fn new(goal: impl Into<String>, mode: Mode, agent_type: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            mode,
            agent_type: agent_type.into(),
            repo_path: PathBuf::new(),
            conversation_id: None,
            parent_job_id: None,
            caps: None,
        }
    }

    crate::setters! {
        into {
            repo_path: PathBuf,
        }
        option {
            conversation_id: ConversationId,
            parent_job_id: JobId,
            caps: JobCaps,
        }
    }

    /// Check required fields before insert.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.goal.trim().is_empty() {
            return Err(ValidationError::EmptyGoal);
        }
        if self.agent_type.trim().is_empty() {
            return Err(ValidationError::EmptyAgentType);
        }
        if self.repo_path.as_os_str().is_empty() {
            return Err(ValidationError::EmptyRepoPath);
        }
        Ok(())
    }

    /// Materialize a queued job row with the given id, caps, and timestamp.
    pub fn into_job(self, id: JobId, caps: JobCaps, created_at_ms: u64) -> Job {
        Job {
            id,
            goal: self.goal,
            mode: self.mode,
            agent_type: self.agent_type,
            status: JobStatus::Queued,
            repo_path: self.repo_path,
            conversation_id: self.conversation_id,
            parent_job_id: self.parent_job_id,
            caps,
            used: BudgetUsed::default(),
            claimant: None,
            current_action: None,
            created_at_ms,
            started_at_ms: None,
            last_heartbeat_at_ms: None,
            cancel_requested_at_ms: None,
            finished_at_ms: None,
        }
    }
}

crate::builder! {
    pub struct JobBuilder => Job {
        into {
            id: JobId = "job-test-1",
            goal: String = "fix the bug",
            agent_type: String = "builder",
            repo_path: PathBuf = "/tmp/repo",
        }
        set {
            mode: Mode = Mode::Mechanic,
            status: JobStatus = JobStatus::Queued,
            caps: JobCaps = JobCaps { step_cap: 20, token_cap: 50_000, cost_cap_cents: 500 },
            used: BudgetUsed = BudgetUsed::default(),
            created_at_ms: u64 = 1_000_000,
        }
        option {
            conversation_id: ConversationId = None,
            parent_job_id: JobId = None,
            claimant: WorkerId = None,
            current_action: String = None,
            started_at_ms: u64 = None,
            last_heartbeat_at_ms: u64 = None,
            cancel_requested_at_ms: u64 = None,
            finished_at_ms: u64 = None,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
