// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::event::{EventKind, EventRecord};
use crate::id::{JobId, TraceId};
use crate::job::{CreateJob, JobCaps};
use crate::mode::Mode;

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core state machine types.
pub mod strategies {
    use crate::status::JobStatus;
    use crate::transition::Transition;
    use crate::worker::WorkerId;
    use crate::EventKind;
    use proptest::prelude::*;

    pub fn arb_status() -> impl Strategy<Value = JobStatus> {
        prop_oneof![
            Just(JobStatus::Queued),
            Just(JobStatus::Running),
            Just(JobStatus::Cancelling),
            Just(JobStatus::WaitingHuman),
            Just(JobStatus::Succeeded),
            Just(JobStatus::Failed),
            Just(JobStatus::Aborted),
        ]
    }

    pub fn arb_transition() -> impl Strategy<Value = Transition> {
        prop_oneof![
            Just(Transition::Claim { claimant: WorkerId::new("w-prop") }),
            Just(Transition::Complete),
            Just(Transition::Fail),
            Just(Transition::Escalate),
            Just(Transition::Requeue),
            Just(Transition::CancelRequest),
            Just(Transition::FinishCancel),
            Just(Transition::Resume),
        ]
    }

    pub fn arb_transitions(max: usize) -> impl Strategy<Value = Vec<Transition>> {
        proptest::collection::vec(arb_transition(), 0..max)
    }

    pub fn arb_event_kind() -> impl Strategy<Value = EventKind> {
        prop_oneof![
            Just(EventKind::Info),
            Just(EventKind::Plan),
            Just(EventKind::Decision),
            Just(EventKind::ToolCall),
            Just(EventKind::ToolResult),
            Just(EventKind::Error),
            Just(EventKind::Escalation),
            Just(EventKind::Evaluation),
            Just(EventKind::Completion),
            "[a-z_]{1,12}".prop_map(EventKind::Other),
        ]
    }
}

// ── Factory functions ───────────────────────────────────────────────────

/// A valid mechanic-mode create payload.
pub fn create_request(goal: &str) -> CreateJob {
    CreateJob::new(goal, Mode::Mechanic, "builder").repo_path("/tmp/repo")
}

/// A valid create payload with explicit caps.
pub fn create_request_with_caps(goal: &str, step_cap: u32) -> CreateJob {
    create_request(goal).caps(JobCaps {
        step_cap,
        token_cap: 50_000,
        cost_cap_cents: 500,
    })
}

/// An info event for the given job.
pub fn info_event(job_id: &str, summary: &str) -> EventRecord {
    EventRecord::new(
        JobId::from_string(job_id),
        TraceId::from_string("trc-test"),
        EventKind::Info,
        summary,
    )
}
