// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution modes and their per-mode defaults.
//!
//! A job's mode selects which worker pool may claim it, the default budget
//! caps it starts with, its wall clock, and the mutation footprint it is
//! allowed per tool call. Every number here is a default; deployments
//! override them through [`ModeDefaults`].

use crate::job::JobCaps;
use crate::tool::Footprint;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Worker-pool tier selector.
///
/// `mechanic` is the lightweight tier for small, well-scoped changes;
/// `genius` is the heavy tier with larger budgets and footprint allowances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Mechanic,
    Genius,
}

crate::simple_display! {
    Mode {
        Mechanic => "mechanic",
        Genius => "genius",
    }
}

impl Mode {
    /// All modes, in claim-pool order.
    pub const ALL: [Mode; 2] = [Mode::Mechanic, Mode::Genius];
}

/// Per-call mutation limits enforced before a MUTATING tool executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FootprintLimits {
    pub max_files: u32,
    pub max_lines: u32,
}

impl FootprintLimits {
    /// Whether a declared footprint fits within these limits.
    pub fn permits(&self, footprint: &Footprint) -> bool {
        footprint.files <= self.max_files && footprint.lines <= self.max_lines
    }
}

/// Defaults a mode applies to jobs that do not specify their own caps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeDefaults {
    pub caps: JobCaps,
    /// Hard wall clock measured from `started_at`.
    pub wall_clock: Duration,
    pub footprint: FootprintLimits,
}

impl ModeDefaults {
    /// Built-in defaults for a mode. Deployments may replace any field.
    pub fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::Mechanic => Self {
                caps: JobCaps {
                    step_cap: 50,
                    token_cap: 50_000,
                    cost_cap_cents: 500,
                },
                wall_clock: Duration::from_secs(60),
                footprint: FootprintLimits {
                    max_files: 5,
                    max_lines: 200,
                },
            },
            Mode::Genius => Self {
                caps: JobCaps {
                    step_cap: 200,
                    token_cap: 200_000,
                    cost_cap_cents: 5_000,
                },
                wall_clock: Duration::from_secs(300),
                footprint: FootprintLimits {
                    max_files: 20,
                    max_lines: 1_000,
                },
            },
        }
    }
}

#[cfg(test)]
#[path = "mode_tests.rs"]
mod tests;
