// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration.
//!
//! Every knob is an explicit field with a sensible default; deployments
//! build one `EngineConfig` and inject it into workers and services.

use drudge_core::{Mode, ModeDefaults};
use std::time::Duration;

/// Tunables for workers, the agent loop, the reaper, and the ledger.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Per-mode caps, wall clock, and footprint limits.
    pub mechanic: ModeDefaults,
    pub genius: ModeDefaults,
    /// Sleep between empty polls.
    pub poll_interval: Duration,
    /// Heartbeat cadence while a job is held.
    pub heartbeat_interval: Duration,
    /// Heartbeats older than this mark a running job stale.
    pub stale_after: Duration,
    /// Cadence for a dedicated reaper task.
    pub reap_interval: Duration,
    /// Upper bound on one planner proposal.
    pub planner_timeout: Duration,
    /// Upper bound on one tool invocation.
    pub tool_timeout: Duration,
    /// Bounded buffer per ledger subscriber.
    pub subscriber_buffer: usize,
    /// How many recent events the planner sees as history.
    pub history_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mechanic: ModeDefaults::for_mode(Mode::Mechanic),
            genius: ModeDefaults::for_mode(Mode::Genius),
            poll_interval: Duration::from_millis(500),
            heartbeat_interval: Duration::from_secs(5),
            stale_after: Duration::from_secs(30),
            reap_interval: Duration::from_secs(10),
            planner_timeout: Duration::from_secs(120),
            tool_timeout: Duration::from_secs(60),
            subscriber_buffer: 256,
            history_limit: 50,
        }
    }
}

impl EngineConfig {
    drudge_core::setters! {
        set {
            mechanic: ModeDefaults,
            genius: ModeDefaults,
            poll_interval: Duration,
            heartbeat_interval: Duration,
            stale_after: Duration,
            reap_interval: Duration,
            planner_timeout: Duration,
            tool_timeout: Duration,
            subscriber_buffer: usize,
            history_limit: usize,
        }
    }

    /// Defaults for the given mode.
    pub fn defaults_for(&self, mode: Mode) -> &ModeDefaults {
        match mode {
            Mode::Mechanic => &self.mechanic,
            Mode::Genius => &self.genius,
        }
    }
}
