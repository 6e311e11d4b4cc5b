// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized tables rebuilt from the record log.
//!
//! All status changes funnel through the core transition functions, so a
//! replayed log can never materialize a state the live system could not
//! have reached.

use crate::records::StoreRecord;
use drudge_core::{
    transition, ConversationId, EventRecord, Job, JobId, JobStatus, Mode, Transition,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Conversation row: lightweight grouping for multi-job user threads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub created_at_ms: u64,
}

/// The persisted state: jobs, per-job event logs, conversations.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Tables {
    pub jobs: HashMap<JobId, Job>,
    /// Events per job, ordered by their per-job sequence.
    pub events: HashMap<JobId, Vec<EventRecord>>,
    pub conversations: HashMap<ConversationId, Conversation>,
}

impl Tables {
    /// Per-job sequence already assigned; the next event gets `+ 1`.
    pub fn last_event_seq(&self, job_id: &JobId) -> u64 {
        self.events
            .get(job_id)
            .and_then(|events| events.last())
            .map(|event| event.seq)
            .unwrap_or(0)
    }

    /// Jobs in `queued` for the given mode, oldest first, ties broken by id.
    pub fn queued_fifo(&self, mode: Mode) -> Vec<&Job> {
        let mut queued: Vec<&Job> = self
            .jobs
            .values()
            .filter(|job| job.mode == mode && job.status == JobStatus::Queued)
            .collect();
        queued.sort_by(|a, b| {
            a.created_at_ms
                .cmp(&b.created_at_ms)
                .then_with(|| a.id.cmp(&b.id))
        });
        queued
    }

    /// Count of jobs in a status for a mode (queue-depth observability).
    pub fn count_in_status(&self, mode: Mode, status: JobStatus) -> usize {
        self.jobs
            .values()
            .filter(|job| job.mode == mode && job.status == status)
            .count()
    }

    /// Apply one record. Used for live mutation and for replay; replay
    /// applies each record exactly once in sequence order. A record that no
    /// longer applies (e.g. a transition replayed onto a snapshot that
    /// already contains its outcome) is skipped with a warning rather than
    /// corrupting the tables.
    pub fn apply(&mut self, record: &StoreRecord) {
        match record {
            StoreRecord::JobInserted { job } => {
                self.jobs.entry(job.id.clone()).or_insert_with(|| job.clone());
            }

            StoreRecord::JobClaimed { id, claimant, at_ms } => {
                self.transition(id, Transition::Claim { claimant: claimant.clone() }, *at_ms);
            }

            StoreRecord::HeartbeatSet { id, at_ms } => {
                if let Some(job) = self.jobs.get_mut(id) {
                    if job.status.holds_claim() {
                        job.last_heartbeat_at_ms = Some(*at_ms);
                    }
                }
            }

            StoreRecord::BudgetCharged {
                id,
                steps,
                tokens,
                cost_cents,
                current_action,
            } => {
                if let Some(job) = self.jobs.get_mut(id) {
                    job.used.steps_used = job
                        .used
                        .steps_used
                        .saturating_add(*steps)
                        .min(job.caps.step_cap);
                    job.used.tokens_used = job
                        .used
                        .tokens_used
                        .saturating_add(*tokens)
                        .min(job.caps.token_cap);
                    job.used.cost_used_cents = job
                        .used
                        .cost_used_cents
                        .saturating_add(*cost_cents)
                        .min(job.caps.cost_cap_cents);
                    if let Some(action) = current_action {
                        job.current_action = Some(action.clone());
                    }
                }
            }

            StoreRecord::FieldsUpdated { id, delta } => {
                if let Some(job) = self.jobs.get_mut(id) {
                    if let Some(goal) = &delta.goal {
                        job.goal = goal.clone();
                    }
                    if let Some(agent_type) = &delta.agent_type {
                        job.agent_type = agent_type.clone();
                    }
                    if let Some(action) = &delta.current_action {
                        job.current_action = Some(action.clone());
                    }
                }
            }

            StoreRecord::CancelRequested { id, at_ms } => {
                self.transition(id, Transition::CancelRequest, *at_ms);
            }

            StoreRecord::Finished { id, status, at_ms } => {
                let transition = match status {
                    JobStatus::Succeeded => Transition::Complete,
                    JobStatus::Failed => Transition::Fail,
                    JobStatus::Aborted => Transition::FinishCancel,
                    _ => {
                        tracing::warn!(job = %id, status = %status, "finished record with non-terminal status");
                        return;
                    }
                };
                self.transition(id, transition, *at_ms);
            }

            StoreRecord::Escalated { id } => {
                self.transition(id, Transition::Escalate, 0);
            }

            StoreRecord::Requeued { id } => {
                self.transition(id, Transition::Requeue, 0);
            }

            StoreRecord::Resumed { id } => {
                self.transition(id, Transition::Resume, 0);
            }

            StoreRecord::EventAppended { event } => {
                let events = self.events.entry(event.job_id.clone()).or_default();
                // Skip if already present (replay over a snapshot tail)
                if events.last().map(|last| last.seq) < Some(event.seq) {
                    events.push(event.clone());
                }
            }

            StoreRecord::ConversationCreated { id, created_at_ms } => {
                self.conversations
                    .entry(id.clone())
                    .or_insert_with(|| Conversation {
                        id: id.clone(),
                        created_at_ms: *created_at_ms,
                    });
            }
        }
    }

    fn transition(&mut self, id: &JobId, transition: Transition, at_ms: u64) {
        match self.jobs.get_mut(id) {
            Some(job) => {
                if let Err(err) = transition::apply(job, transition, at_ms) {
                    tracing::warn!(job = %id, error = %err, "skipping stale transition record");
                }
            }
            None => tracing::warn!(job = %id, "transition record for unknown job"),
        }
    }
}

#[cfg(test)]
#[path = "tables_tests.rs"]
mod tests;
