// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for the integration specs.

use drudge_core::{CreateJob, FakeClock, Job, JobCaps, JobId, Mode};
use drudge_engine::{EngineConfig, EngineDeps, JobService, Ledger, Planner, ToolRegistry};
use drudge_storage::Store;
use std::sync::Arc;
use std::time::Duration;

pub struct Harness {
    // Held so the store directory outlives the test
    pub _dir: tempfile::TempDir,
    pub deps: EngineDeps<FakeClock>,
    pub service: JobService<FakeClock>,
    pub clock: FakeClock,
}

pub fn harness(planner: Arc<dyn Planner>, registry: ToolRegistry) -> Harness {
    harness_with_config(planner, registry, EngineConfig::default())
}

pub fn harness_with_config(
    planner: Arc<dyn Planner>,
    registry: ToolRegistry,
    config: EngineConfig,
) -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(Store::open(dir.path()).expect("open store"));
    let clock = FakeClock::new();
    let config = Arc::new(config);
    let ledger = Arc::new(Ledger::new(
        Arc::clone(&store),
        clock.clone(),
        config.subscriber_buffer,
    ));
    let deps = EngineDeps {
        store: Arc::clone(&store),
        ledger: Arc::clone(&ledger),
        registry: Arc::new(registry),
        planner,
        config: Arc::clone(&config),
        clock: clock.clone(),
    };
    let service = JobService::new(store, ledger, config, clock.clone());
    Harness {
        _dir: dir,
        deps,
        service,
        clock,
    }
}

/// A mechanic-mode create request with an explicit step cap.
pub fn mech_request(goal: &str, step_cap: u32) -> CreateJob {
    CreateJob::new(goal, Mode::Mechanic, "builder")
        .repo_path("/tmp/repo")
        .caps(JobCaps {
            step_cap,
            token_cap: 50_000,
            cost_cap_cents: 500,
        })
}

/// Poll the store until the predicate holds (virtual time advances fast
/// under `start_paused`).
pub async fn wait_until<F: Fn(&Job) -> bool>(harness: &Harness, id: &JobId, pred: F) -> Job {
    for _ in 0..5_000 {
        if let Some(job) = harness.deps.store.get_job(id) {
            if pred(&job) {
                return job;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached for {id}");
}
