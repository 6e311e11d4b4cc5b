// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reaper: requeues running jobs whose heartbeats went stale.
//!
//! Runs inline on every worker poll cycle, and optionally as a dedicated
//! interval task. Both paths call the same single-transaction sweep, so
//! concurrent reapers can never double-requeue.

use drudge_core::Clock;
use drudge_storage::{Store, StoreError};
use std::sync::Arc;
use std::time::Duration;

/// Periodic stale-claim sweep.
pub struct Reaper<C: Clock> {
    store: Arc<Store>,
    clock: C,
    stale_after: Duration,
}

impl<C: Clock> Reaper<C> {
    pub fn new(store: Arc<Store>, clock: C, stale_after: Duration) -> Self {
        Self {
            store,
            clock,
            stale_after,
        }
    }

    /// One sweep. Returns how many jobs were requeued.
    pub fn sweep(&self) -> Result<usize, StoreError> {
        let requeued = self
            .store
            .sweep_stale(self.stale_after.as_millis() as u64, self.clock.epoch_ms())?;
        if requeued > 0 {
            tracing::info!(requeued, "reaper requeued stale jobs");
        }
        Ok(requeued)
    }

    /// Spawn the sweep as a background tokio task on an interval.
    pub fn spawn_interval(self, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if let Err(err) = self.sweep() {
                    tracing::warn!(error = %err, "reaper sweep failed");
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "reaper_tests.rs"]
mod tests;
