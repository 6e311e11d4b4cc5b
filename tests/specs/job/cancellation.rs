// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellation: cooperative unwind mid-run, and the claim-time race for
//! jobs cancelled while still queued.

use crate::specs::common::{harness, mech_request, wait_until};
use drudge_core::{Clock, EventKind, EventRecord, JobStatus, Mode, PlanStep, ToolSpec, WorkerId};
use drudge_engine::{Planner, PlannerError, Proposal, ScriptedPlanner, ToolRegistry, Worker};
use std::sync::Arc;
use std::time::Duration;

/// Proposes slowly so cancellation lands between iterations.
struct SlowPlanner;

#[async_trait::async_trait]
impl Planner for SlowPlanner {
    async fn propose(
        &self,
        _goal: &str,
        _history: &[EventRecord],
        _catalog: &[ToolSpec],
    ) -> Result<Proposal, PlannerError> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(Proposal::new(PlanStep::call("noop", serde_json::json!({}))))
    }
}

#[tokio::test(start_paused = true)]
async fn cancel_mid_run_unwinds_to_aborted() {
    let hx = harness(Arc::new(SlowPlanner), ToolRegistry::new());
    let id = hx.service.create_job(mech_request("long slog", 10_000)).unwrap();

    let handle = Worker::new("mech-1", Mode::Mechanic, hx.deps.clone()).spawn();
    wait_until(&hx, &id, |job| job.status == JobStatus::Running).await;

    hx.service.request_cancel(&id).unwrap();
    let job = wait_until(&hx, &id, |job| job.is_terminal()).await;
    handle.drain();
    handle.join().await;

    assert_eq!(job.status, JobStatus::Aborted);
    assert!(job.finished_at_ms.is_some());
    assert!(job.cancel_requested_at_ms.is_some());

    // Nothing follows the cancellation notice
    let (events, _) = hx.service.list_events(&id, 0).unwrap();
    let notice_seq = events
        .iter()
        .find(|event| event.kind == EventKind::Info && event.summary.contains("cancel"))
        .map(|event| event.seq)
        .unwrap();
    assert!(events.iter().all(|event| event.seq <= notice_seq));
}

#[tokio::test]
async fn job_cancelled_while_queued_is_never_claimed() {
    let planner = Arc::new(ScriptedPlanner::repeating(PlanStep::answer("unused")));
    let hx = harness(planner, ToolRegistry::new());

    let id = hx.service.create_job(mech_request("doomed", 10)).unwrap();
    hx.service.request_cancel(&id).unwrap();

    let claimed = hx
        .deps
        .store
        .claim_one(Mode::Mechanic, &WorkerId::new("mech-1"), hx.clock.epoch_ms())
        .unwrap();
    assert!(claimed.is_none());

    let job = hx.service.get_job(&id).unwrap();
    assert_eq!(job.status, JobStatus::Aborted);
    assert!(job.finished_at_ms.is_some());
    assert!(job.started_at_ms.is_none(), "the job never ran");
}
