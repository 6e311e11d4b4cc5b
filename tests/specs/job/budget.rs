// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Budget exhaustion: caps bound the loop and the failure is explained
//! in the ledger.

use crate::specs::common::{harness, mech_request, wait_until};
use drudge_core::{EventKind, JobStatus, Mode, PlanStep};
use drudge_engine::tool_support::StubTool;
use drudge_engine::{ScriptedPlanner, ToolRegistry, Worker};
use serde_json::json;
use std::sync::Arc;

#[tokio::test(start_paused = true)]
async fn step_cap_exhaustion_fails_with_reason() {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(StubTool::read_only("read_file")));
    let planner = Arc::new(ScriptedPlanner::repeating(PlanStep::call(
        "read_file",
        json!({"path": "a.ts"}),
    )));
    let hx = harness(planner, registry);

    let id = hx.service.create_job(mech_request("read forever", 3)).unwrap();

    let handle = Worker::new("mech-1", Mode::Mechanic, hx.deps.clone()).spawn();
    let job = wait_until(&hx, &id, |job| job.is_terminal()).await;
    handle.drain();
    handle.join().await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.finished_at_ms.is_some());
    assert_eq!(job.used.steps_used, 3);

    let (events, _) = hx.service.list_events(&id, 0).unwrap();
    let tool_calls = events
        .iter()
        .filter(|event| event.kind == EventKind::ToolCall)
        .count();
    assert_eq!(tool_calls, 3);

    let errors: Vec<_> = events
        .iter()
        .filter(|event| event.kind == EventKind::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].summary.contains("steps"));
}

#[tokio::test(start_paused = true)]
async fn zero_step_cap_fails_on_the_first_iteration() {
    let planner = Arc::new(ScriptedPlanner::repeating(PlanStep::answer("never asked")));
    let hx = harness(planner, ToolRegistry::new());

    let id = hx.service.create_job(mech_request("impossible", 0)).unwrap();

    let handle = Worker::new("mech-1", Mode::Mechanic, hx.deps.clone()).spawn();
    let job = wait_until(&hx, &id, |job| job.is_terminal()).await;
    handle.drain();
    handle.join().await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.used.steps_used, 0);

    let (events, _) = hx.service.list_events(&id, 0).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Error);
    assert!(events[0].summary.contains("steps"));
}
