// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use drudge_core::test_support::info_event;
use drudge_core::{Job, JobCaps, WorkerId};

fn insert(tables: &mut Tables, id: &str, created_at_ms: u64) {
    let job = Job::builder().id(id).created_at_ms(created_at_ms).build();
    tables.apply(&StoreRecord::JobInserted { job });
}

fn claim(tables: &mut Tables, id: &str, worker: &str, at_ms: u64) {
    tables.apply(&StoreRecord::JobClaimed {
        id: JobId::from_string(id),
        claimant: WorkerId::new(worker),
        at_ms,
    });
}

#[test]
fn insert_is_idempotent() {
    let mut tables = Tables::default();
    insert(&mut tables, "job-1", 100);
    claim(&mut tables, "job-1", "w-1", 200);

    // Replaying the insert must not reset the claimed row
    insert(&mut tables, "job-1", 100);
    assert_eq!(tables.jobs["job-1"].status, JobStatus::Running);
}

#[test]
fn claim_record_runs_the_transition() {
    let mut tables = Tables::default();
    insert(&mut tables, "job-1", 100);
    claim(&mut tables, "job-1", "w-1", 200);

    let job = &tables.jobs["job-1"];
    assert_eq!(job.status, JobStatus::Running);
    assert_eq!(job.claimant.as_ref().unwrap().as_str(), "w-1");
    assert_eq!(job.started_at_ms, Some(200));
}

#[test]
fn heartbeat_ignored_without_claim() {
    let mut tables = Tables::default();
    insert(&mut tables, "job-1", 100);

    tables.apply(&StoreRecord::HeartbeatSet {
        id: JobId::from_string("job-1"),
        at_ms: 500,
    });

    assert!(tables.jobs["job-1"].last_heartbeat_at_ms.is_none());
}

#[test]
fn budget_charge_clamps_at_caps() {
    let mut tables = Tables::default();
    let job = Job::builder()
        .id("job-1")
        .caps(JobCaps {
            step_cap: 2,
            token_cap: 100,
            cost_cap_cents: 10,
        })
        .build();
    tables.apply(&StoreRecord::JobInserted { job });

    tables.apply(&StoreRecord::BudgetCharged {
        id: JobId::from_string("job-1"),
        steps: 5,
        tokens: 1_000,
        cost_cents: 99,
        current_action: Some("looping".to_string()),
    });

    let job = &tables.jobs["job-1"];
    assert_eq!(job.used.steps_used, 2);
    assert_eq!(job.used.tokens_used, 100);
    assert_eq!(job.used.cost_used_cents, 10);
    assert_eq!(job.current_action.as_deref(), Some("looping"));
}

#[test]
fn stale_transition_record_is_skipped() {
    let mut tables = Tables::default();
    insert(&mut tables, "job-1", 100);
    claim(&mut tables, "job-1", "w-1", 200);
    tables.apply(&StoreRecord::Finished {
        id: JobId::from_string("job-1"),
        status: JobStatus::Succeeded,
        at_ms: 300,
    });

    // A requeue replayed after the job finished must not resurrect it
    tables.apply(&StoreRecord::Requeued {
        id: JobId::from_string("job-1"),
    });
    assert_eq!(tables.jobs["job-1"].status, JobStatus::Succeeded);
}

#[test]
fn finished_with_non_terminal_status_is_ignored() {
    let mut tables = Tables::default();
    insert(&mut tables, "job-1", 100);
    claim(&mut tables, "job-1", "w-1", 200);

    tables.apply(&StoreRecord::Finished {
        id: JobId::from_string("job-1"),
        status: JobStatus::Queued,
        at_ms: 300,
    });
    assert_eq!(tables.jobs["job-1"].status, JobStatus::Running);
}

#[test]
fn queued_fifo_orders_by_created_then_id() {
    let mut tables = Tables::default();
    insert(&mut tables, "job-b", 200);
    insert(&mut tables, "job-a", 100);
    insert(&mut tables, "job-d", 200);
    insert(&mut tables, "job-c", 300);

    let order: Vec<&str> = tables
        .queued_fifo(drudge_core::Mode::Mechanic)
        .iter()
        .map(|job| job.id.as_str())
        .collect();
    assert_eq!(order, vec!["job-a", "job-b", "job-d", "job-c"]);
}

#[test]
fn event_append_dedupes_by_seq() {
    let mut tables = Tables::default();
    insert(&mut tables, "job-1", 100);

    let mut event = info_event("job-1", "first");
    event.seq = 1;
    tables.apply(&StoreRecord::EventAppended { event: event.clone() });
    tables.apply(&StoreRecord::EventAppended { event });

    assert_eq!(tables.events["job-1"].len(), 1);
    assert_eq!(tables.last_event_seq(&JobId::from_string("job-1")), 1);
}

#[test]
fn conversation_created_is_idempotent() {
    let mut tables = Tables::default();
    let record = StoreRecord::ConversationCreated {
        id: ConversationId::from_string("conv-1"),
        created_at_ms: 100,
    };
    tables.apply(&record);
    tables.apply(&record);
    assert_eq!(tables.conversations.len(), 1);
}
