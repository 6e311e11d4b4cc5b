// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash and recovery: a worker dies mid-job, the reaper rescues the
//! claim, and the next worker picks up with budget preserved.

use crate::specs::common::{harness, mech_request};
use drudge_core::test_support::info_event;
use drudge_core::{Clock, EventRecord, JobStatus, Mode, PlanStep, TraceId, WorkerId};
use drudge_engine::{Reaper, ScriptedPlanner, ToolRegistry};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn stale_claim_is_rescued_with_budget_preserved() {
    let planner = Arc::new(ScriptedPlanner::repeating(PlanStep::answer("unused")));
    let hx = harness(planner, ToolRegistry::new());

    let id = hx.service.create_job(mech_request("crashy work", 20)).unwrap();

    // Worker A claims, does one tool call's worth of work, then dies
    // (simulated by never heartbeating again)
    let claimed = hx
        .deps
        .store
        .claim_one(Mode::Mechanic, &WorkerId::new("w-a"), hx.clock.epoch_ms())
        .unwrap()
        .unwrap();
    assert_eq!(claimed.claimant, Some(WorkerId::new("w-a")));

    hx.deps
        .ledger
        .append(EventRecord::tool_call(
            id.clone(),
            TraceId::new(),
            "apply_patch",
            json!({"path": "a.ts"}),
        ))
        .unwrap();
    hx.deps
        .store
        .update_budget(&id, 1, 250, 3, Some("ran apply_patch".to_string()))
        .unwrap();

    // Past the staleness threshold, the sweep requeues it
    hx.clock.advance(Duration::from_secs(31));
    let reaper = Reaper::new(
        Arc::clone(&hx.deps.store),
        hx.clock.clone(),
        Duration::from_secs(30),
    );
    assert_eq!(reaper.sweep().unwrap(), 1);

    let requeued = hx.service.get_job(&id).unwrap();
    assert_eq!(requeued.status, JobStatus::Queued);
    assert!(requeued.claimant.is_none());
    assert!(requeued.started_at_ms.is_none());
    assert!(requeued.last_heartbeat_at_ms.is_none());
    assert_eq!(requeued.used.steps_used, 1);
    assert_eq!(requeued.used.tokens_used, 250);
    assert_eq!(requeued.used.cost_used_cents, 3);

    // Worker B gets the same job back
    let reclaimed = hx
        .deps
        .store
        .claim_one(Mode::Mechanic, &WorkerId::new("w-b"), hx.clock.epoch_ms())
        .unwrap()
        .unwrap();
    assert_eq!(reclaimed.id, id);
    assert_eq!(reclaimed.claimant, Some(WorkerId::new("w-b")));
    assert_eq!(reclaimed.used.steps_used, 1, "budget survived the crash");

    // And can finish it
    hx.deps
        .store
        .mark_terminal(&id, JobStatus::Succeeded, hx.clock.epoch_ms())
        .unwrap();
    let done = hx.service.get_job(&id).unwrap();
    assert!(done.finished_at_ms.is_some());
}

#[tokio::test]
async fn recovery_survives_a_process_restart() {
    let planner = Arc::new(ScriptedPlanner::repeating(PlanStep::answer("unused")));
    let hx = harness(planner, ToolRegistry::new());

    let id = hx.service.create_job(mech_request("durable work", 20)).unwrap();
    hx.deps
        .store
        .claim_one(Mode::Mechanic, &WorkerId::new("w-a"), hx.clock.epoch_ms())
        .unwrap();
    hx.deps.store.update_budget(&id, 2, 100, 1, None).unwrap();
    hx.deps.ledger.append(info_event(id.as_str(), "progress")).unwrap();

    // Reopen the same directory, as a restarted process would
    let store = drudge_storage::Store::open(hx._dir.path()).unwrap();
    let job = store.get_job(&id).unwrap();
    assert_eq!(job.status, JobStatus::Running);
    assert_eq!(job.used.steps_used, 2);
    assert_eq!(store.list_events(&id, 0).len(), 1);

    // The restarted reaper rescues the orphaned claim
    let swept = store
        .sweep_stale(30_000, hx.clock.epoch_ms() + 31_000)
        .unwrap();
    assert_eq!(swept, 1);
    assert_eq!(store.get_job(&id).unwrap().status, JobStatus::Queued);
}
