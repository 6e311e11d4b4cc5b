// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live event streaming: a subscriber attached before the run sees every
//! event exactly once, in sequence order, through to completion.

use crate::specs::common::{harness, mech_request};
use drudge_core::{EventKind, JobStatus, Mode, PlanStep};
use drudge_engine::tool_support::StubTool;
use drudge_engine::{LedgerItem, ScriptedPlanner, ToolRegistry, Worker};
use serde_json::json;
use std::sync::Arc;

#[tokio::test(start_paused = true)]
async fn subscriber_sees_the_whole_run_in_order() {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(StubTool::read_only("read_file")));
    let planner = Arc::new(ScriptedPlanner::sequence([
        PlanStep::call("read_file", json!({"path": "a.ts"})),
        PlanStep::call("read_file", json!({"path": "b.ts"})),
        PlanStep::answer("all read"),
    ]));
    let hx = harness(planner, registry);

    let id = hx.service.create_job(mech_request("read the files", 20)).unwrap();
    let mut stream = hx.service.subscribe_events(&id, true).unwrap();

    let handle = Worker::new("mech-1", Mode::Mechanic, hx.deps.clone()).spawn();

    // Drain the stream until the completion event arrives
    let mut seqs = Vec::new();
    let mut kinds = Vec::new();
    loop {
        match stream.next().await {
            Some(LedgerItem::Event(event)) => {
                seqs.push(event.seq);
                let done = event.kind == EventKind::Completion;
                kinds.push(event.kind);
                if done {
                    break;
                }
            }
            other => panic!("stream ended early: {other:?}"),
        }
    }

    handle.drain();
    handle.join().await;

    // Strictly sequential, no gaps, no duplicates
    let expected: Vec<u64> = (1..=seqs.len() as u64).collect();
    assert_eq!(seqs, expected);

    // call/result pairs then the completion
    assert_eq!(
        kinds,
        vec![
            EventKind::ToolCall,
            EventKind::ToolResult,
            EventKind::ToolCall,
            EventKind::ToolResult,
            EventKind::Completion,
        ]
    );

    let job = hx.service.get_job(&id).unwrap();
    assert_eq!(job.status, JobStatus::Succeeded);
}

#[tokio::test(start_paused = true)]
async fn late_subscriber_backfills_then_tails() {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(StubTool::read_only("read_file")));
    let planner = Arc::new(ScriptedPlanner::sequence([
        PlanStep::call("read_file", json!({"path": "a.ts"})),
        PlanStep::answer("read it"),
    ]));
    let hx = harness(planner, registry);

    let id = hx.service.create_job(mech_request("read one file", 20)).unwrap();

    let handle = Worker::new("mech-1", Mode::Mechanic, hx.deps.clone()).spawn();
    crate::specs::common::wait_until(&hx, &id, |job| job.is_terminal()).await;
    handle.drain();
    handle.join().await;

    // Everything already happened; the backfill replays it in order
    let mut stream = hx.service.subscribe_events(&id, true).unwrap();
    let mut seqs = Vec::new();
    while let Some(LedgerItem::Event(event)) = stream.next().await {
        let done = event.kind == EventKind::Completion;
        seqs.push(event.seq);
        if done {
            break;
        }
    }
    let expected: Vec<u64> = (1..=seqs.len() as u64).collect();
    assert_eq!(seqs, expected);
}
