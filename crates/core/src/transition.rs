// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job status transitions.
//!
//! Every status change in the system goes through [`apply`], which validates
//! the edge and performs the timestamp side-effects in the same step. There
//! is no other write path for `status`, so an invalid transition can never
//! be persisted.

use crate::job::Job;
use crate::status::JobStatus;
use crate::worker::WorkerId;
use thiserror::Error;

/// A requested status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// queued → running, under the claiming worker.
    Claim { claimant: WorkerId },
    /// running → succeeded.
    Complete,
    /// running → failed.
    Fail,
    /// running → waiting_human (non-terminal pause).
    Escalate,
    /// running → queued, reaper-only; preserves budget.
    Requeue,
    /// queued|running → cancelling.
    CancelRequest,
    /// cancelling → aborted.
    FinishCancel,
    /// waiting_human → queued (external resume; preserves budget).
    Resume,
}

crate::simple_display! {
    Transition {
        Claim { .. } => "claim",
        Complete => "complete",
        Fail => "fail",
        Escalate => "escalate",
        Requeue => "requeue",
        CancelRequest => "cancel_req",
        FinishCancel => "finish_cancel",
        Resume => "resume",
    }
}

/// Rejected status change.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid transition: {transition} from {from}")]
pub struct TransitionError {
    pub from: JobStatus,
    pub transition: String,
}

fn invalid(job: &Job, transition: &Transition) -> TransitionError {
    TransitionError {
        from: job.status,
        transition: transition.to_string(),
    }
}

/// Validate and execute a transition, applying timestamp side-effects.
///
/// Budget counters, caps, `conversation_id`, and `parent_job_id` are never
/// touched here; requeue/resume preservation falls out of that.
pub fn apply(job: &mut Job, transition: Transition, now_ms: u64) -> Result<(), TransitionError> {
    match (&transition, job.status) {
        (Transition::Claim { claimant }, JobStatus::Queued) => {
            job.status = JobStatus::Running;
            job.claimant = Some(claimant.clone());
            if job.started_at_ms.is_none() {
                job.started_at_ms = Some(now_ms);
            }
            job.last_heartbeat_at_ms = Some(now_ms);
        }

        (Transition::Complete, JobStatus::Running) => {
            finish(job, JobStatus::Succeeded, now_ms);
        }

        (Transition::Fail, JobStatus::Running) => {
            finish(job, JobStatus::Failed, now_ms);
        }

        (Transition::Escalate, JobStatus::Running) => {
            job.status = JobStatus::WaitingHuman;
            job.claimant = None;
            job.last_heartbeat_at_ms = None;
        }

        (Transition::Requeue, JobStatus::Running) => {
            job.status = JobStatus::Queued;
            job.claimant = None;
            job.started_at_ms = None;
            job.last_heartbeat_at_ms = None;
        }

        (Transition::CancelRequest, JobStatus::Queued | JobStatus::Running) => {
            job.status = JobStatus::Cancelling;
            job.cancel_requested_at_ms = Some(now_ms);
        }

        (Transition::FinishCancel, JobStatus::Cancelling) => {
            finish(job, JobStatus::Aborted, now_ms);
        }

        (Transition::Resume, JobStatus::WaitingHuman) => {
            job.status = JobStatus::Queued;
            job.claimant = None;
            job.started_at_ms = None;
            job.last_heartbeat_at_ms = None;
        }

        _ => return Err(invalid(job, &transition)),
    }
    Ok(())
}

/// Terminal entry: set `finished_at` once and release the claim.
fn finish(job: &mut Job, status: JobStatus, now_ms: u64) {
    job.status = status;
    job.claimant = None;
    job.last_heartbeat_at_ms = None;
    if job.finished_at_ms.is_none() {
        job.finished_at_ms = Some(now_ms);
    }
}

#[cfg(test)]
#[path = "transition_tests.rs"]
mod tests;
