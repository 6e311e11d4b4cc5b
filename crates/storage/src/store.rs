// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The store: serializable operations over WAL-durable tables.
//!
//! Every public operation takes the writer lock, validates against the
//! current tables, appends the mutation record, flushes, and only then
//! applies it. Two operations can never interleave, which is what makes
//! `claim_one` an exactly-once reservation across competing workers.

use crate::error::StoreError;
use crate::records::{JobDelta, StoreRecord};
use crate::snapshot::Snapshot;
use crate::tables::{Conversation, Tables};
use crate::wal::Wal;
use drudge_core::{
    transition, ConversationId, CreateJob, EventRecord, Job, JobCaps, JobId, JobStatus, Mode,
    Transition, WorkerId,
};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

const WAL_FILE: &str = "store.wal";
const SNAPSHOT_FILE: &str = "store.snap";

struct Inner {
    tables: Tables,
    wal: Wal,
    snapshot_path: PathBuf,
}

/// Transactional persistence for jobs, events, and conversations.
pub struct Store {
    inner: Mutex<Inner>,
}

impl Store {
    /// Open (or create) a store rooted at `dir`.
    ///
    /// Recovery = latest snapshot + replay of the WAL tail past it.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir).map_err(|err| StoreError::Fatal(err.to_string()))?;
        let snapshot_path = dir.join(SNAPSHOT_FILE);
        let wal_path = dir.join(WAL_FILE);

        let (mut tables, snapshot_seq) = match Snapshot::load(&snapshot_path)? {
            Some(snapshot) => (snapshot.tables, snapshot.seq),
            None => (Tables::default(), 0),
        };

        let wal = Wal::open(&wal_path)?;
        let tail = wal.entries_after(snapshot_seq)?;
        let replayed = tail.len();
        for entry in tail {
            tables.apply(&entry.record);
        }

        tracing::info!(
            dir = %dir.display(),
            jobs = tables.jobs.len(),
            conversations = tables.conversations.len(),
            snapshot_seq,
            replayed,
            "store opened"
        );

        Ok(Self {
            inner: Mutex::new(Inner {
                tables,
                wal,
                snapshot_path,
            }),
        })
    }

    // ── Jobs ────────────────────────────────────────────────────────────

    /// Insert a new job in `queued`.
    pub fn insert_job(
        &self,
        create: CreateJob,
        id: JobId,
        caps: JobCaps,
        now_ms: u64,
    ) -> Result<Job, StoreError> {
        create.validate()?;
        let mut inner = self.inner.lock();

        if inner.tables.jobs.contains_key(&id) {
            return Err(StoreError::Conflict(format!("job {id} already exists")));
        }
        if let Some(conversation_id) = &create.conversation_id {
            if !inner.tables.conversations.contains_key(conversation_id) {
                return Err(StoreError::Validation(format!(
                    "conversation {conversation_id} does not exist"
                )));
            }
        }
        if let Some(parent_id) = &create.parent_job_id {
            if !inner.tables.jobs.contains_key(parent_id) {
                return Err(StoreError::Validation(format!(
                    "parent job {parent_id} does not exist"
                )));
            }
        }

        let job = create.into_job(id.clone(), caps, now_ms);
        commit(&mut inner, StoreRecord::JobInserted { job: job.clone() })?;
        tracing::debug!(job = %id, mode = %job.mode, "job inserted");
        Ok(job)
    }

    /// Snapshot read of a job row. Advisory: the row may change the moment
    /// the lock is released.
    pub fn get_job(&self, id: &JobId) -> Option<Job> {
        self.inner.lock().tables.jobs.get(id).cloned()
    }

    /// Partial update of mutable job fields.
    pub fn update_job_fields(&self, id: &JobId, delta: JobDelta) -> Result<Job, StoreError> {
        let mut inner = self.inner.lock();
        require_job(&inner.tables, id)?;
        if !delta.is_empty() {
            commit(
                &mut inner,
                StoreRecord::FieldsUpdated {
                    id: id.clone(),
                    delta,
                },
            )?;
        }
        Ok(cloned(&inner.tables, id))
    }

    /// Atomically advance budget counters (Δ ≥ 0, clamped at the caps) and
    /// optionally the live `current_action` string.
    pub fn update_budget(
        &self,
        id: &JobId,
        steps: u32,
        tokens: u64,
        cost_cents: u64,
        current_action: Option<String>,
    ) -> Result<Job, StoreError> {
        let mut inner = self.inner.lock();
        let job = require_job(&inner.tables, id)?;
        if job.is_terminal() {
            return Err(StoreError::Conflict(format!(
                "job {id} is terminal; budget is frozen"
            )));
        }
        commit(
            &mut inner,
            StoreRecord::BudgetCharged {
                id: id.clone(),
                steps,
                tokens,
                cost_cents,
                current_action,
            },
        )?;
        Ok(cloned(&inner.tables, id))
    }

    // ── Claim protocol ──────────────────────────────────────────────────

    /// Claim the oldest eligible job of `mode` for `claimant`.
    ///
    /// FIFO by `created_at`, ties broken by job id. An unclaimed
    /// `cancelling` row at the head (a cancel that raced the enqueue) is
    /// finalized to `aborted` in the same critical section and the call
    /// returns `None` for this poll.
    pub fn claim_one(
        &self,
        mode: Mode,
        claimant: &WorkerId,
        now_ms: u64,
    ) -> Result<Option<Job>, StoreError> {
        let mut inner = self.inner.lock();

        let head = inner
            .tables
            .jobs
            .values()
            .filter(|job| {
                job.mode == mode
                    && (job.status == JobStatus::Queued
                        || (job.status == JobStatus::Cancelling && job.claimant.is_none()))
            })
            .min_by(|a, b| {
                a.created_at_ms
                    .cmp(&b.created_at_ms)
                    .then_with(|| a.id.cmp(&b.id))
            })
            .map(|job| (job.id.clone(), job.status));

        let Some((id, status)) = head else {
            return Ok(None);
        };

        if status == JobStatus::Cancelling {
            commit(
                &mut inner,
                StoreRecord::Finished {
                    id: id.clone(),
                    status: JobStatus::Aborted,
                    at_ms: now_ms,
                },
            )?;
            tracing::info!(job = %id, "cancelled before claim; finalized as aborted");
            return Ok(None);
        }

        commit(
            &mut inner,
            StoreRecord::JobClaimed {
                id: id.clone(),
                claimant: claimant.clone(),
                at_ms: now_ms,
            },
        )?;
        tracing::info!(job = %id, worker = %claimant, mode = %mode, "job claimed");
        Ok(Some(cloned(&inner.tables, &id)))
    }

    /// Refresh the heartbeat. No-op unless the job currently holds a claim.
    pub fn set_heartbeat(&self, id: &JobId, now_ms: u64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let job = require_job(&inner.tables, id)?;
        if !job.status.holds_claim() {
            return Ok(());
        }
        commit(
            &mut inner,
            StoreRecord::HeartbeatSet {
                id: id.clone(),
                at_ms: now_ms,
            },
        )
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Request cancellation. Queued and running jobs move to `cancelling`;
    /// a repeat request is a no-op.
    pub fn request_cancel(&self, id: &JobId, now_ms: u64) -> Result<Job, StoreError> {
        let mut inner = self.inner.lock();
        let job = require_job(&inner.tables, id)?;
        match job.status {
            JobStatus::Queued | JobStatus::Running => {
                commit(
                    &mut inner,
                    StoreRecord::CancelRequested {
                        id: id.clone(),
                        at_ms: now_ms,
                    },
                )?;
                tracing::info!(job = %id, "cancel requested");
            }
            JobStatus::Cancelling => {}
            other => {
                return Err(StoreError::Conflict(format!(
                    "cannot cancel job {id} in status {other}"
                )))
            }
        }
        Ok(cloned(&inner.tables, id))
    }

    /// Move a job to a terminal status.
    pub fn mark_terminal(
        &self,
        id: &JobId,
        status: JobStatus,
        now_ms: u64,
    ) -> Result<Job, StoreError> {
        let transition = match status {
            JobStatus::Succeeded => Transition::Complete,
            JobStatus::Failed => Transition::Fail,
            JobStatus::Aborted => Transition::FinishCancel,
            other => {
                return Err(StoreError::Validation(format!(
                    "{other} is not a terminal status"
                )))
            }
        };
        let mut inner = self.inner.lock();
        check_transition(&inner.tables, id, transition, now_ms)?;
        commit(
            &mut inner,
            StoreRecord::Finished {
                id: id.clone(),
                status,
                at_ms: now_ms,
            },
        )?;
        tracing::info!(job = %id, status = %status, "job finished");
        Ok(cloned(&inner.tables, id))
    }

    /// Pause a running job for human input (`waiting_human`).
    pub fn escalate(&self, id: &JobId) -> Result<Job, StoreError> {
        let mut inner = self.inner.lock();
        check_transition(&inner.tables, id, Transition::Escalate, 0)?;
        commit(&mut inner, StoreRecord::Escalated { id: id.clone() })?;
        tracing::info!(job = %id, "job escalated to waiting_human");
        Ok(cloned(&inner.tables, id))
    }

    /// Return a running job to the queue, preserving budget. Reaper-only.
    pub fn requeue(&self, id: &JobId) -> Result<Job, StoreError> {
        let mut inner = self.inner.lock();
        check_transition(&inner.tables, id, Transition::Requeue, 0)?;
        commit(&mut inner, StoreRecord::Requeued { id: id.clone() })?;
        Ok(cloned(&inner.tables, id))
    }

    /// Resume a `waiting_human` job back into the queue.
    pub fn resume(&self, id: &JobId) -> Result<Job, StoreError> {
        let mut inner = self.inner.lock();
        check_transition(&inner.tables, id, Transition::Resume, 0)?;
        commit(&mut inner, StoreRecord::Resumed { id: id.clone() })?;
        tracing::info!(job = %id, "job resumed from waiting_human");
        Ok(cloned(&inner.tables, id))
    }

    /// Requeue every running job whose heartbeat is missing or older than
    /// `stale_after_ms`. Returns how many were requeued. One critical
    /// section, so two concurrent sweeps can never double-requeue.
    pub fn sweep_stale(&self, stale_after_ms: u64, now_ms: u64) -> Result<usize, StoreError> {
        let mut inner = self.inner.lock();
        let stale: Vec<JobId> = inner
            .tables
            .jobs
            .values()
            .filter(|job| job.is_stale(now_ms, stale_after_ms))
            .map(|job| job.id.clone())
            .collect();

        for id in &stale {
            commit(&mut inner, StoreRecord::Requeued { id: id.clone() })?;
            tracing::info!(job = %id, "stale heartbeat; job requeued");
        }
        Ok(stale.len())
    }

    // ── Events ──────────────────────────────────────────────────────────

    /// Append one event row; assigns the per-job sequence and timestamp.
    pub fn append_event(
        &self,
        mut event: EventRecord,
        now_ms: u64,
    ) -> Result<EventRecord, StoreError> {
        let mut inner = self.inner.lock();
        require_job(&inner.tables, &event.job_id)?;
        event.seq = inner.tables.last_event_seq(&event.job_id) + 1;
        event.created_at_ms = now_ms;
        commit(
            &mut inner,
            StoreRecord::EventAppended {
                event: event.clone(),
            },
        )?;
        Ok(event)
    }

    /// Events for a job with `seq > after_seq`, in sequence order.
    pub fn list_events(&self, job_id: &JobId, after_seq: u64) -> Vec<EventRecord> {
        let inner = self.inner.lock();
        inner
            .tables
            .events
            .get(job_id)
            .map(|events| {
                events
                    .iter()
                    .filter(|event| event.seq > after_seq)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Highest event sequence assigned for a job (0 if none).
    pub fn last_event_seq(&self, job_id: &JobId) -> u64 {
        self.inner.lock().tables.last_event_seq(job_id)
    }

    // ── Conversations ───────────────────────────────────────────────────

    pub fn create_conversation(&self, now_ms: u64) -> Result<Conversation, StoreError> {
        let mut inner = self.inner.lock();
        let conversation = Conversation {
            id: ConversationId::new(),
            created_at_ms: now_ms,
        };
        commit(
            &mut inner,
            StoreRecord::ConversationCreated {
                id: conversation.id.clone(),
                created_at_ms: now_ms,
            },
        )?;
        Ok(conversation)
    }

    pub fn get_conversation(&self, id: &ConversationId) -> Option<Conversation> {
        self.inner.lock().tables.conversations.get(id).cloned()
    }

    // ── Observability ───────────────────────────────────────────────────

    /// Number of queued jobs for a mode.
    pub fn queue_depth(&self, mode: Mode) -> usize {
        self.inner
            .lock()
            .tables
            .count_in_status(mode, JobStatus::Queued)
    }

    /// Number of jobs in a status for a mode.
    pub fn count_in_status(&self, mode: Mode, status: JobStatus) -> usize {
        self.inner.lock().tables.count_in_status(mode, status)
    }

    // ── Maintenance ─────────────────────────────────────────────────────

    /// Write a snapshot of the tables and drop the WAL prefix it covers.
    pub fn checkpoint(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let seq = inner.wal.write_seq();
        let snapshot = Snapshot::new(seq, inner.tables.clone());
        snapshot.save(&inner.snapshot_path)?;
        inner.wal.truncate_before(seq + 1)?;
        tracing::info!(seq, "checkpoint written");
        Ok(())
    }
}

/// Log, flush, then apply. The mutation is durable before it is visible.
fn commit(inner: &mut Inner, record: StoreRecord) -> Result<(), StoreError> {
    inner.wal.append(&record)?;
    inner.wal.flush()?;
    inner.tables.apply(&record);
    Ok(())
}

fn require_job<'t>(tables: &'t Tables, id: &JobId) -> Result<&'t Job, StoreError> {
    tables.jobs.get(id).ok_or_else(|| StoreError::not_found(id))
}

/// Validate a transition against a clone so rejection leaves no trace.
fn check_transition(
    tables: &Tables,
    id: &JobId,
    transition_kind: Transition,
    now_ms: u64,
) -> Result<(), StoreError> {
    let mut probe = require_job(tables, id)?.clone();
    transition::apply(&mut probe, transition_kind, now_ms)?;
    Ok(())
}

fn cloned(tables: &Tables, id: &JobId) -> Job {
    // Caller just committed a record for this id; the row exists.
    tables
        .jobs
        .get(id)
        .cloned()
        .unwrap_or_else(|| unreachable!("job row vanished inside the store lock"))
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
