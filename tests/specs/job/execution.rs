// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The happy path: a scripted bug fix runs its tools in order and
//! succeeds, and producer-visible fields round-trip.

use crate::specs::common::{harness, mech_request, wait_until, Harness};
use drudge_core::{EventKind, JobStatus, Mode, PlanStep};
use drudge_engine::tool_support::{StubBehavior, StubTool};
use drudge_engine::{ScriptedPlanner, ToolRegistry, Worker};
use serde_json::json;
use std::sync::Arc;

fn bug_fix_harness() -> Harness {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(StubTool::read_only("read_file")));
    registry.register(Arc::new(StubTool::mutating("apply_patch")));
    registry.register(Arc::new(
        StubTool::read_only("run_tests").behavior(StubBehavior::Ok(json!({"status": "pass"}))),
    ));
    registry.register(Arc::new(StubTool::mutating("commit")));

    let planner = Arc::new(ScriptedPlanner::sequence([
        PlanStep::call("read_file", json!({"path": "a.ts"})),
        PlanStep::call(
            "apply_patch",
            json!({"path": "a.ts", "footprint": {"files": 1, "lines": 3}}),
        ),
        PlanStep::call("run_tests", json!({})),
        PlanStep::call("commit", json!({"msg": "fix"})),
        PlanStep::answer("done"),
    ]));
    harness(planner, registry)
}

#[tokio::test(start_paused = true)]
async fn scripted_bug_fix_succeeds_with_tools_in_order() {
    let hx = bug_fix_harness();
    let id = hx
        .service
        .create_job(mech_request("fix the off-by-one in a.ts", 20))
        .unwrap();

    let handle = Worker::new("mech-1", Mode::Mechanic, hx.deps.clone()).spawn();
    let job = wait_until(&hx, &id, |job| job.is_terminal()).await;
    handle.drain();
    handle.join().await;

    assert_eq!(job.status, JobStatus::Succeeded);
    assert!(job.finished_at_ms.is_some());
    assert_eq!(job.used.steps_used, 5);

    let (events, _) = hx.service.list_events(&id, 0).unwrap();
    let calls: Vec<&str> = events
        .iter()
        .filter(|event| event.kind == EventKind::ToolCall)
        .filter_map(|event| event.tool_name.as_deref())
        .collect();
    assert_eq!(calls, vec!["read_file", "apply_patch", "run_tests", "commit"]);

    // Every call has a matching result, then the completion
    let results = events
        .iter()
        .filter(|event| event.kind == EventKind::ToolResult)
        .count();
    assert_eq!(results, 4);
    assert_eq!(events.last().unwrap().kind, EventKind::Completion);

    // The run_tests result carried the pass status through
    let test_result = events
        .iter()
        .find(|event| {
            event.kind == EventKind::ToolResult && event.tool_name.as_deref() == Some("run_tests")
        })
        .unwrap();
    assert_eq!(test_result.result.as_ref().unwrap()["status"], "pass");
}

#[tokio::test]
async fn created_job_round_trips_producer_fields() {
    let hx = bug_fix_harness();
    let request = mech_request("rename the config flag", 20);
    let id = hx.service.create_job(request.clone()).unwrap();

    let job = hx.service.get_job(&id).unwrap();
    assert_eq!(job.goal, request.goal);
    assert_eq!(job.mode, request.mode);
    assert_eq!(job.agent_type, request.agent_type);
    assert_eq!(job.repo_path, request.repo_path);
    assert_eq!(Some(job.caps), request.caps);
    assert_eq!(job.status, JobStatus::Queued);
    assert!(job.claimant.is_none());
    assert!(job.finished_at_ms.is_none());
}
