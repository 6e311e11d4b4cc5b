// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job budget accounting.
//!
//! `Budget` is the in-memory reservation; the durable counters live on the
//! job row and are advanced through the store. The agent loop charges here
//! first, then durably, before acting on the result, so the two views never
//! diverge by more than the step in flight.

use crate::job::{BudgetUsed, Job, JobCaps};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which cap ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExhaustReason {
    Steps,
    Tokens,
    Cost,
    Time,
}

crate::simple_display! {
    ExhaustReason {
        Steps => "steps",
        Tokens => "tokens",
        Cost => "cost",
        Time => "time",
    }
}

/// In-memory budget view for one claimed job.
#[derive(Debug, Clone)]
pub struct Budget {
    caps: JobCaps,
    used: BudgetUsed,
    started_at_ms: Option<u64>,
    wall_clock: Duration,
}

impl Budget {
    /// Snapshot the budget off a claimed job row.
    pub fn from_job(job: &Job, wall_clock: Duration) -> Self {
        Self {
            caps: job.caps,
            used: job.used,
            started_at_ms: job.started_at_ms,
            wall_clock,
        }
    }

    /// Reserve usage in memory. Counters saturate at their caps so the
    /// `used ≤ cap` invariant holds at every snapshot; exhaustion reports
    /// once a counter reaches its cap.
    pub fn charge(&mut self, steps: u32, tokens: u64, cost_cents: u64) {
        self.used.steps_used = self
            .used
            .steps_used
            .saturating_add(steps)
            .min(self.caps.step_cap);
        self.used.tokens_used = self
            .used
            .tokens_used
            .saturating_add(tokens)
            .min(self.caps.token_cap);
        self.used.cost_used_cents = self
            .used
            .cost_used_cents
            .saturating_add(cost_cents)
            .min(self.caps.cost_cap_cents);
    }

    /// First cap that ran out, checked in order: steps, tokens, cost, time.
    pub fn exhausted(&self, now_ms: u64) -> Option<ExhaustReason> {
        if self.used.steps_used >= self.caps.step_cap {
            return Some(ExhaustReason::Steps);
        }
        if self.used.tokens_used >= self.caps.token_cap {
            return Some(ExhaustReason::Tokens);
        }
        if self.used.cost_used_cents >= self.caps.cost_cap_cents {
            return Some(ExhaustReason::Cost);
        }
        if let Some(started) = self.started_at_ms {
            if now_ms.saturating_sub(started) > self.wall_clock.as_millis() as u64 {
                return Some(ExhaustReason::Time);
            }
        }
        None
    }

    pub fn used(&self) -> &BudgetUsed {
        &self.used
    }

    pub fn caps(&self) -> &JobCaps {
        &self.caps
    }
}

#[cfg(test)]
#[path = "budget_tests.rs"]
mod tests;
