// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Escalation: the agent asks for a human, the job parks non-terminally,
//! and a resume puts it back through the queue with budget intact.

use crate::specs::common::{harness, mech_request, wait_until};
use drudge_core::{EventKind, JobStatus, Mode, PlanStep};
use drudge_engine::{ScriptedPlanner, ToolRegistry, Worker};
use std::sync::Arc;

#[tokio::test(start_paused = true)]
async fn first_step_escalation_parks_the_job() {
    let planner = Arc::new(ScriptedPlanner::sequence([PlanStep::escalate("ambiguous goal")]));
    let hx = harness(planner, ToolRegistry::new());

    let id = hx.service.create_job(mech_request("do something?", 20)).unwrap();

    let handle = Worker::new("mech-1", Mode::Mechanic, hx.deps.clone()).spawn();
    let job = wait_until(&hx, &id, |job| job.status == JobStatus::WaitingHuman).await;
    handle.drain();
    handle.join().await;

    assert!(job.finished_at_ms.is_none(), "waiting_human is not terminal");
    assert!(job.claimant.is_none());

    let (events, _) = hx.service.list_events(&id, 0).unwrap();
    let escalations = events
        .iter()
        .filter(|event| event.kind == EventKind::Escalation)
        .count();
    assert_eq!(escalations, 1);
    let tool_calls = events
        .iter()
        .filter(|event| event.kind == EventKind::ToolCall)
        .count();
    assert_eq!(tool_calls, 0, "no tools ran before the escalation");
}

#[tokio::test(start_paused = true)]
async fn resumed_job_runs_again_with_budget_preserved() {
    // First claim escalates, the run after the resume answers
    let planner = Arc::new(ScriptedPlanner::sequence([
        PlanStep::escalate("need a decision"),
        PlanStep::answer("resolved after guidance"),
    ]));
    let hx = harness(planner, ToolRegistry::new());

    let id = hx.service.create_job(mech_request("tricky refactor", 20)).unwrap();

    let handle = Worker::new("mech-1", Mode::Mechanic, hx.deps.clone()).spawn();
    let parked = wait_until(&hx, &id, |job| job.status == JobStatus::WaitingHuman).await;
    let steps_after_first_run = parked.used.steps_used;
    assert_eq!(steps_after_first_run, 1);

    hx.service.resume_from_waiting_human(&id).unwrap();
    let job = wait_until(&hx, &id, |job| job.is_terminal()).await;
    handle.drain();
    handle.join().await;

    assert_eq!(job.status, JobStatus::Succeeded);
    assert_eq!(job.used.steps_used, steps_after_first_run + 1);
}
