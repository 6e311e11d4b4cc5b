// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Claim facade over the store.

use drudge_core::{Clock, Job, Mode, WorkerId};
use drudge_storage::{Store, StoreError};
use std::sync::Arc;

/// The worker-facing queue: exactly-once claims plus depth observability.
pub struct Queue<C: Clock> {
    store: Arc<Store>,
    clock: C,
}

impl<C: Clock> Queue<C> {
    pub fn new(store: Arc<Store>, clock: C) -> Self {
        Self { store, clock }
    }

    /// Claim the oldest eligible job of `mode` for `claimant`, if any.
    pub fn claim_one(&self, mode: Mode, claimant: &WorkerId) -> Result<Option<Job>, StoreError> {
        self.store.claim_one(mode, claimant, self.clock.epoch_ms())
    }

    /// Jobs currently queued for a mode.
    pub fn depth(&self, mode: Mode) -> usize {
        self.store.queue_depth(mode)
    }
}
