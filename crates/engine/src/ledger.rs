// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The append-only event ledger with live fan-out.
//!
//! Persist first, notify second: an event reaches subscribers only after
//! the store has assigned its sequence and made it durable.

use crate::hub::{EventStream, SubscriberHub};
use drudge_core::{Clock, EventRecord, JobId};
use drudge_storage::{Store, StoreError};
use std::sync::Arc;

/// Appends events and delivers them to in-process subscribers.
pub struct Ledger<C: Clock> {
    store: Arc<Store>,
    hub: SubscriberHub,
    clock: C,
}

impl<C: Clock> Ledger<C> {
    pub fn new(store: Arc<Store>, clock: C, subscriber_buffer: usize) -> Self {
        Self {
            store,
            hub: SubscriberHub::new(subscriber_buffer),
            clock,
        }
    }

    /// Persist an event, then notify subscribers. Returns the stored event
    /// with its assigned sequence.
    pub fn append(&self, event: EventRecord) -> Result<EventRecord, StoreError> {
        let stored = self.store.append_event(event, self.clock.epoch_ms())?;
        self.hub.publish(&stored);
        Ok(stored)
    }

    /// Attach a subscriber for a job's future events.
    ///
    /// With `backfill`, the stream is prefixed with every already-persisted
    /// event; either way the live tail joins at a known cursor with no gaps
    /// and no duplicates. Dropping the stream unsubscribes.
    pub fn subscribe(&self, job_id: &JobId, backfill: bool) -> EventStream {
        self.hub.subscribe(job_id, || {
            if backfill {
                let events = self.store.list_events(job_id, 0);
                let next_seq = events.last().map(|event| event.seq).unwrap_or(0) + 1;
                (events, next_seq)
            } else {
                (Vec::new(), self.store.last_event_seq(job_id) + 1)
            }
        })
    }

    /// Live subscriber count for a job.
    pub fn subscriber_count(&self, job_id: &JobId) -> usize {
        self.hub.subscriber_count(job_id)
    }
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;
