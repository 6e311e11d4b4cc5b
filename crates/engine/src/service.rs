// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Producer/consumer surface.
//!
//! The backbone is a library; transports (HTTP, CLI, whatever) wire onto
//! this. Producers create, cancel, and resume jobs; consumers read and
//! subscribe. Every operation reports [`EngineError`]; the storage error
//! taxonomy stays behind it.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::hub::EventStream;
use crate::ledger::Ledger;
use drudge_core::{Clock, CreateJob, EventRecord, Job, JobId};
use drudge_storage::{Conversation, Store, StoreError};
use std::sync::Arc;

/// The external interface for callers that never touch workers directly.
pub struct JobService<C: Clock> {
    store: Arc<Store>,
    ledger: Arc<Ledger<C>>,
    config: Arc<EngineConfig>,
    clock: C,
}

impl<C: Clock> JobService<C> {
    pub fn new(store: Arc<Store>, ledger: Arc<Ledger<C>>, config: Arc<EngineConfig>, clock: C) -> Self {
        Self {
            store,
            ledger,
            config,
            clock,
        }
    }

    // ── Producer interface ──────────────────────────────────────────────

    /// Create a job in `queued`. Caps left unset default per mode.
    pub fn create_job(&self, create: CreateJob) -> Result<JobId, EngineError> {
        let caps = create
            .caps
            .unwrap_or(self.config.defaults_for(create.mode).caps);
        let id = JobId::new();
        let job = self
            .store
            .insert_job(create, id, caps, self.clock.epoch_ms())?;
        tracing::info!(job = %job.id, mode = %job.mode, "job created");
        Ok(job.id)
    }

    /// Request cooperative cancellation.
    pub fn request_cancel(&self, job_id: &JobId) -> Result<(), EngineError> {
        self.store.request_cancel(job_id, self.clock.epoch_ms())?;
        Ok(())
    }

    /// Return a `waiting_human` job to the queue, budget intact.
    pub fn resume_from_waiting_human(&self, job_id: &JobId) -> Result<(), EngineError> {
        self.store.resume(job_id)?;
        Ok(())
    }

    /// Create a conversation grouping for multi-job threads.
    pub fn create_conversation(&self) -> Result<Conversation, EngineError> {
        Ok(self.store.create_conversation(self.clock.epoch_ms())?)
    }

    // ── Consumer interface ──────────────────────────────────────────────

    pub fn get_job(&self, job_id: &JobId) -> Result<Job, EngineError> {
        self.store
            .get_job(job_id)
            .ok_or_else(|| EngineError::Store(StoreError::NotFound(job_id.to_string())))
    }

    /// Events after `cursor` (0 = from the beginning) plus the next cursor.
    pub fn list_events(
        &self,
        job_id: &JobId,
        cursor: u64,
    ) -> Result<(Vec<EventRecord>, u64), EngineError> {
        self.get_job(job_id)?;
        let events = self.store.list_events(job_id, cursor);
        let next_cursor = events.last().map(|event| event.seq).unwrap_or(cursor);
        Ok((events, next_cursor))
    }

    /// Live event stream for a job; `backfill` prepends history. The
    /// subscription lives until the stream is dropped or the ledger signals
    /// overflow.
    pub fn subscribe_events(
        &self,
        job_id: &JobId,
        backfill: bool,
    ) -> Result<EventStream, EngineError> {
        self.get_job(job_id)?;
        Ok(self.ledger.subscribe(job_id, backfill))
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
