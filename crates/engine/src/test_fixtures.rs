// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.

use crate::config::EngineConfig;
use crate::ledger::Ledger;
use crate::planner::Planner;
use crate::tools::ToolRegistry;
use crate::EngineDeps;
use drudge_core::{Clock, CreateJob, FakeClock, Job, JobCaps, JobId, Mode, WorkerId};
use drudge_storage::Store;
use std::sync::Arc;

pub struct Fixture {
    // Held so the store directory outlives the test
    pub _dir: tempfile::TempDir,
    pub deps: EngineDeps<FakeClock>,
    pub clock: FakeClock,
}

pub fn fixture(planner: Arc<dyn Planner>, registry: ToolRegistry) -> Fixture {
    fixture_with_config(planner, registry, EngineConfig::default())
}

pub fn fixture_with_config(
    planner: Arc<dyn Planner>,
    registry: ToolRegistry,
    config: EngineConfig,
) -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(Store::open(dir.path()).expect("open store"));
    let clock = FakeClock::new();
    let config = Arc::new(config);
    let ledger = Arc::new(Ledger::new(
        Arc::clone(&store),
        clock.clone(),
        config.subscriber_buffer,
    ));
    Fixture {
        _dir: dir,
        deps: EngineDeps {
            store,
            ledger,
            registry: Arc::new(registry),
            planner,
            config,
            clock: clock.clone(),
        },
        clock,
    }
}

/// Insert a queued mechanic job with the given step cap.
pub fn insert_job(fixture: &Fixture, id: &str, step_cap: u32) -> Job {
    let create =
        CreateJob::new("fix the flaky test", Mode::Mechanic, "builder").repo_path("/tmp/repo");
    fixture
        .deps
        .store
        .insert_job(
            create,
            JobId::from_string(id),
            JobCaps {
                step_cap,
                token_cap: 50_000,
                cost_cap_cents: 500,
            },
            fixture.clock.epoch_ms(),
        )
        .expect("insert job")
}

/// Insert and claim, returning the running job.
pub fn claim_job(fixture: &Fixture, id: &str, step_cap: u32) -> Job {
    insert_job(fixture, id, step_cap);
    fixture
        .deps
        .store
        .claim_one(Mode::Mechanic, &WorkerId::new("w-test"), fixture.clock.epoch_ms())
        .expect("claim")
        .expect("job available")
}
