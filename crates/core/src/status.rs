// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job status: the closed set of states a job moves through.

use serde::{Deserialize, Serialize};

/// Status of a job.
///
/// The allowed edges between statuses live in [`crate::transition`]; any
/// write path that changes a status goes through those transition functions
/// rather than assigning a variant directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting in the queue for a worker of the job's mode.
    Queued,
    /// Claimed and executing under a worker.
    Running,
    /// Cancel requested; waiting for the agent loop to unwind.
    Cancelling,
    /// Paused awaiting human input (non-terminal).
    WaitingHuman,
    /// Finished successfully (terminal).
    Succeeded,
    /// Finished with a failure (terminal).
    Failed,
    /// Cancelled and unwound (terminal).
    Aborted,
}

crate::simple_display! {
    JobStatus {
        Queued => "queued",
        Running => "running",
        Cancelling => "cancelling",
        WaitingHuman => "waiting_human",
        Succeeded => "succeeded",
        Failed => "failed",
        Aborted => "aborted",
    }
}

impl JobStatus {
    /// Terminal statuses never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Aborted
        )
    }

    /// Statuses during which a worker holds the claim (and heartbeats).
    pub fn holds_claim(&self) -> bool {
        matches!(self, JobStatus::Running | JobStatus::Cancelling)
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
