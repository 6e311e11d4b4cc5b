// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker: claim, heartbeat, run the agent loop, report, repeat.
//!
//! Each worker sweeps the reaper inline every poll cycle, so a fleet
//! self-heals without a dedicated reaper deployment. The worker boundary
//! is the only place unexpected errors (including panics in the agent
//! loop) are translated into a `failed` job; the worker itself survives.

use crate::agent_loop::{AgentLoop, CancelCheck};
use crate::queue::Queue;
use crate::reaper::Reaper;
use crate::EngineDeps;
use drudge_core::{
    Clock, EventRecord, FailReason, Job, JobId, JobStatus, Mode, Outcome, TraceId, WorkerId,
};
use drudge_storage::Store;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};

struct WorkerShared {
    draining: AtomicBool,
    current_job: Mutex<Option<JobId>>,
    wake: Notify,
}

/// A long-running claim-and-process loop for one mode.
pub struct Worker<C: Clock> {
    id: WorkerId,
    mode: Mode,
    deps: EngineDeps<C>,
    queue: Queue<C>,
    reaper: Reaper<C>,
    shared: Arc<WorkerShared>,
}

impl<C: Clock> Worker<C> {
    pub fn new(id: impl Into<WorkerId>, mode: Mode, deps: EngineDeps<C>) -> Self {
        let queue = Queue::new(Arc::clone(&deps.store), deps.clock.clone());
        let reaper = Reaper::new(
            Arc::clone(&deps.store),
            deps.clock.clone(),
            deps.config.stale_after,
        );
        Self {
            id: id.into(),
            mode,
            deps,
            queue,
            reaper,
            shared: Arc::new(WorkerShared {
                draining: AtomicBool::new(false),
                current_job: Mutex::new(None),
                wake: Notify::new(),
            }),
        }
    }

    /// Start the main loop as a background task.
    pub fn spawn(self) -> WorkerHandle<C> {
        let shared = Arc::clone(&self.shared);
        let store = Arc::clone(&self.deps.store);
        let clock = self.deps.clock.clone();
        let join = tokio::spawn(self.run());
        WorkerHandle {
            shared,
            store,
            clock,
            join,
        }
    }

    /// The main loop: sweep, drain check, claim, process.
    pub async fn run(self) {
        tracing::info!(worker = %self.id, mode = %self.mode, "worker started");
        loop {
            if let Err(err) = self.reaper.sweep() {
                tracing::warn!(worker = %self.id, error = %err, "inline reaper sweep failed");
            }

            if self.shared.draining.load(Ordering::Acquire) {
                break;
            }

            match self.queue.claim_one(self.mode, &self.id) {
                Ok(Some(job)) => self.process(job).await,
                Ok(None) => {
                    tracing::debug!(
                        worker = %self.id,
                        depth = self.queue.depth(self.mode),
                        "queue empty"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(self.deps.config.poll_interval) => {}
                        _ = self.shared.wake.notified() => {}
                    }
                }
                Err(err) => {
                    tracing::warn!(worker = %self.id, error = %err, "claim failed");
                    tokio::time::sleep(self.deps.config.poll_interval).await;
                }
            }
        }
        tracing::info!(worker = %self.id, "worker stopped");
    }

    async fn process(&self, job: Job) {
        let job_id = job.id.clone();
        tracing::info!(worker = %self.id, job = %job_id, agent = %job.agent_type, "processing job");
        *self.shared.current_job.lock() = Some(job_id.clone());

        let heartbeat_stop = spawn_heartbeat(
            Arc::clone(&self.deps.store),
            job_id.clone(),
            self.deps.clock.clone(),
            self.deps.config.heartbeat_interval,
        );

        let cancelled: CancelCheck = {
            let store = Arc::clone(&self.deps.store);
            let id = job_id.clone();
            Arc::new(move || {
                store
                    .get_job(&id)
                    .map(|job| job.status == JobStatus::Cancelling)
                    .unwrap_or(false)
            })
        };

        // The loop runs in its own task so a panic is caught here, at the
        // worker boundary, instead of killing the worker.
        let agent_loop = AgentLoop::new(job, &self.deps, cancelled);
        let outcome = match tokio::spawn(agent_loop.run()).await {
            Ok(outcome) => outcome,
            Err(join_err) => {
                tracing::error!(worker = %self.id, job = %job_id, error = %join_err, "agent loop panicked");
                Outcome::Failed(FailReason::Internal(format!(
                    "agent loop panicked: {join_err}"
                )))
            }
        };

        drop(heartbeat_stop);
        self.finish(&job_id, outcome);
        *self.shared.current_job.lock() = None;
    }

    /// Translate the outcome into a status transition. A cancel request
    /// observed here wins over whatever the loop produced; the cancelling
    /// state has exactly one exit.
    fn finish(&self, job_id: &JobId, outcome: Outcome) {
        let now_ms = self.deps.clock.epoch_ms();
        let status = self.deps.store.get_job(job_id).map(|job| job.status);

        let result = if status == Some(JobStatus::Cancelling) {
            let notice = EventRecord::new(
                job_id.clone(),
                TraceId::new(),
                drudge_core::EventKind::Info,
                "cancel request honored; job aborted",
            );
            if let Err(err) = self.deps.ledger.append(notice) {
                tracing::warn!(job = %job_id, error = %err, "failed to append cancel notice");
            }
            self.deps
                .store
                .mark_terminal(job_id, JobStatus::Aborted, now_ms)
        } else {
            match &outcome {
                Outcome::Success => {
                    self.deps
                        .store
                        .mark_terminal(job_id, JobStatus::Succeeded, now_ms)
                }
                Outcome::Failed(reason) => {
                    if let FailReason::Internal(msg) = reason {
                        let event = EventRecord::error(
                            job_id.clone(),
                            TraceId::new(),
                            format!("unexpected worker error: {msg}"),
                        );
                        if let Err(err) = self.deps.ledger.append(event) {
                            tracing::warn!(job = %job_id, error = %err, "failed to append error event");
                        }
                    }
                    self.deps
                        .store
                        .mark_terminal(job_id, JobStatus::Failed, now_ms)
                }
                // Cancelled without a surviving cancelling status: the row
                // was already requeued or finalized; nothing to write.
                Outcome::Cancelled => {
                    tracing::warn!(job = %job_id, "loop cancelled but job no longer cancelling");
                    return;
                }
                Outcome::Escalated(_) => self.deps.store.escalate(job_id),
            }
        };

        match result {
            Ok(job) => {
                tracing::info!(worker = %self.id, job = %job_id, status = %job.status, "job finished")
            }
            // A conflict here usually means the reaper requeued the job
            // out from under a stalled loop; the next claim re-runs it.
            Err(err) => {
                tracing::warn!(worker = %self.id, job = %job_id, error = %err, "terminal transition rejected")
            }
        }
    }
}

/// Control handle for a spawned worker.
pub struct WorkerHandle<C: Clock> {
    shared: Arc<WorkerShared>,
    store: Arc<Store>,
    clock: C,
    join: tokio::task::JoinHandle<()>,
}

impl<C: Clock> WorkerHandle<C> {
    /// Finish the current job (if any), then exit. No new claims.
    pub fn drain(&self) {
        self.shared.draining.store(true, Ordering::Release);
        self.shared.wake.notify_waiters();
    }

    /// Drain, and additionally request cancellation of the current job.
    pub fn shutdown(&self) {
        self.drain();
        let current = self.shared.current_job.lock().clone();
        if let Some(job_id) = current {
            if let Err(err) = self.store.request_cancel(&job_id, self.clock.epoch_ms()) {
                tracing::warn!(job = %job_id, error = %err, "shutdown cancel request failed");
            }
        }
    }

    /// Job the worker is processing right now, if any.
    pub fn current_job(&self) -> Option<JobId> {
        self.shared.current_job.lock().clone()
    }

    /// Wait for the main loop to exit.
    pub async fn join(self) {
        let _ = self.join.await;
    }
}

/// Heartbeat side-task: refreshes `last_heartbeat_at` every interval until
/// the returned sender is dropped. Failures are logged, never fatal; a
/// persistently failing heartbeat just hands the job to the reaper.
fn spawn_heartbeat<C: Clock>(
    store: Arc<Store>,
    job_id: JobId,
    clock: C,
    interval: Duration,
) -> watch::Sender<()> {
    let (stop_tx, mut stop_rx) = watch::channel(());

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match store.set_heartbeat(&job_id, clock.epoch_ms()) {
                        Ok(()) => tracing::debug!(job = %job_id, "heartbeat sent"),
                        Err(err) => tracing::warn!(job = %job_id, error = %err, "heartbeat failed"),
                    }
                }
                _ = stop_rx.changed() => {
                    tracing::debug!(job = %job_id, "heartbeat stopped");
                    break;
                }
            }
        }
    });

    stop_tx
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
