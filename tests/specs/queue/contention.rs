// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The claim protocol under contention: FIFO, exactly-once, mode-local.

use crate::specs::common::{harness, mech_request, wait_until};
use drudge_core::{Clock, CreateJob, JobCaps, JobId, JobStatus, Mode, PlanStep, WorkerId};
use drudge_engine::{ScriptedPlanner, ToolRegistry, Worker};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn two_workers_claim_fifo_and_exactly_once() {
    let planner = Arc::new(ScriptedPlanner::repeating(PlanStep::answer("done")));
    let hx = harness(planner, ToolRegistry::new());

    let job_a = hx.service.create_job(mech_request("first in", 20)).unwrap();
    hx.clock.advance(Duration::from_millis(5));
    let job_b = hx.service.create_job(mech_request("second in", 20)).unwrap();

    let first = Worker::new("mech-1", Mode::Mechanic, hx.deps.clone()).spawn();
    let second = Worker::new("mech-2", Mode::Mechanic, hx.deps.clone()).spawn();

    let done_a = wait_until(&hx, &job_a, |job| job.is_terminal()).await;
    let done_b = wait_until(&hx, &job_b, |job| job.is_terminal()).await;

    first.drain();
    second.drain();
    first.join().await;
    second.join().await;

    assert_eq!(done_a.status, JobStatus::Succeeded);
    assert_eq!(done_b.status, JobStatus::Succeeded);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_claims_return_distinct_oldest_jobs() {
    let planner = Arc::new(ScriptedPlanner::repeating(PlanStep::answer("unused")));
    let hx = harness(planner, ToolRegistry::new());

    let mut expected = Vec::new();
    for n in 0..10 {
        let id = hx.service.create_job(mech_request(&format!("job {n}"), 20)).unwrap();
        expected.push(id);
        hx.clock.advance(Duration::from_millis(1));
    }

    // Two claimants race over the same queue
    let store_a = Arc::clone(&hx.deps.store);
    let store_b = Arc::clone(&hx.deps.store);
    let now = hx.clock.epoch_ms();

    let race_a = tokio::spawn(async move {
        let mut claimed = Vec::new();
        while let Ok(Some(job)) = store_a.claim_one(Mode::Mechanic, &WorkerId::new("w-a"), now) {
            claimed.push(job.id);
        }
        claimed
    });
    let race_b = tokio::spawn(async move {
        let mut claimed = Vec::new();
        while let Ok(Some(job)) = store_b.claim_one(Mode::Mechanic, &WorkerId::new("w-b"), now) {
            claimed.push(job.id);
        }
        claimed
    });

    let claimed_a = race_a.await.unwrap();
    let claimed_b = race_b.await.unwrap();

    // No double-claim, and together they drained exactly the queue
    let mut all: Vec<JobId> = claimed_a.iter().chain(claimed_b.iter()).cloned().collect();
    let distinct: HashSet<JobId> = all.iter().cloned().collect();
    assert_eq!(distinct.len(), 10);
    all.sort();
    let mut expected_sorted = expected.clone();
    expected_sorted.sort();
    assert_eq!(all, expected_sorted);

    // Each claimant saw its own share in FIFO order
    for claimed in [&claimed_a, &claimed_b] {
        let positions: Vec<usize> = claimed
            .iter()
            .map(|id| expected.iter().position(|e| e == id).unwrap())
            .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted, "claims must respect creation order");
    }
}

#[tokio::test]
async fn workers_never_cross_modes() {
    let planner = Arc::new(ScriptedPlanner::repeating(PlanStep::answer("unused")));
    let hx = harness(planner, ToolRegistry::new());

    let mech_id = hx.service.create_job(mech_request("small fix", 20)).unwrap();
    let genius_id = hx
        .service
        .create_job(
            CreateJob::new("big refactor", Mode::Genius, "planner")
                .repo_path("/tmp/repo")
                .caps(JobCaps {
                    step_cap: 20,
                    token_cap: 200_000,
                    cost_cap_cents: 5_000,
                }),
        )
        .unwrap();

    let now = hx.clock.epoch_ms();
    let genius_claim = hx
        .deps
        .store
        .claim_one(Mode::Genius, &WorkerId::new("gen-1"), now)
        .unwrap()
        .unwrap();
    assert_eq!(genius_claim.id, genius_id);

    let mech_claim = hx
        .deps
        .store
        .claim_one(Mode::Mechanic, &WorkerId::new("mech-1"), now)
        .unwrap()
        .unwrap();
    assert_eq!(mech_claim.id, mech_id);

    // Queues are both empty now; neither mode sees the other's work
    assert!(hx.deps.store.claim_one(Mode::Genius, &WorkerId::new("gen-1"), now).unwrap().is_none());
    assert!(hx
        .deps
        .store
        .claim_one(Mode::Mechanic, &WorkerId::new("mech-1"), now)
        .unwrap()
        .is_none());
}
