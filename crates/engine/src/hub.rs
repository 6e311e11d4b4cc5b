// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process fan-out of ledger events to live subscribers.
//!
//! Each subscriber owns a bounded channel. Delivery is best-effort and
//! non-blocking: a slow subscriber can never block an append. When a
//! buffer fills, the subscription is dropped and the subscriber receives
//! [`LedgerItem::Overflow`] as its final item; persisted events are
//! unaffected.

use drudge_core::{EventRecord, JobId};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// One item of a subscription stream.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerItem {
    Event(EventRecord),
    /// The subscriber fell behind and was dropped; always the final item.
    Overflow,
}

struct Slot {
    id: u64,
    /// Next per-job sequence this subscriber expects. Events below it are
    /// already covered by backfill and are skipped, which is what makes the
    /// backfill + live-tail join gap-free and duplicate-free.
    next_seq: u64,
    tx: mpsc::Sender<EventRecord>,
    overflowed: Arc<AtomicBool>,
}

/// Per-job subscriber lists behind one mutex; subscribe/unsubscribe and
/// publish are all O(subscribers-of-job) under the lock.
pub(crate) struct SubscriberHub {
    buffer: usize,
    slots: Mutex<HashMap<JobId, Vec<Slot>>>,
    next_slot_id: AtomicU64,
}

impl SubscriberHub {
    pub(crate) fn new(buffer: usize) -> Self {
        Self {
            buffer: buffer.max(1),
            slots: Mutex::new(HashMap::new()),
            next_slot_id: AtomicU64::new(1),
        }
    }

    /// Register a subscriber. `fetch` runs under the hub lock and returns
    /// the backfill plus the next expected sequence; holding the lock while
    /// reading the store is what closes the gap between backfill and tail.
    pub(crate) fn subscribe(
        &self,
        job_id: &JobId,
        fetch: impl FnOnce() -> (Vec<EventRecord>, u64),
    ) -> EventStream {
        let mut slots = self.slots.lock();
        let (backfill, next_seq) = fetch();
        let (tx, rx) = mpsc::channel(self.buffer);
        let overflowed = Arc::new(AtomicBool::new(false));
        let slot = Slot {
            id: self.next_slot_id.fetch_add(1, Ordering::Relaxed),
            next_seq,
            tx,
            overflowed: Arc::clone(&overflowed),
        };
        tracing::debug!(job = %job_id, slot = slot.id, backfill = backfill.len(), "subscriber attached");
        slots.entry(job_id.clone()).or_default().push(slot);

        EventStream {
            backfill: backfill.into(),
            rx,
            overflowed,
            overflow_delivered: false,
        }
    }

    /// Deliver one persisted event to every live subscriber of its job.
    pub(crate) fn publish(&self, event: &EventRecord) {
        let mut slots = self.slots.lock();
        let Some(list) = slots.get_mut(&event.job_id) else {
            return;
        };
        list.retain_mut(|slot| {
            if event.seq < slot.next_seq {
                return true;
            }
            match slot.tx.try_send(event.clone()) {
                Ok(()) => {
                    slot.next_seq = event.seq + 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    slot.overflowed.store(true, Ordering::Release);
                    tracing::warn!(job = %event.job_id, slot = slot.id, "subscriber overflow; dropping subscription");
                    false
                }
                Err(TrySendError::Closed(_)) => false,
            }
        });
        if list.is_empty() {
            slots.remove(&event.job_id);
        }
    }

    /// Live subscribers for a job (observability).
    pub(crate) fn subscriber_count(&self, job_id: &JobId) -> usize {
        self.slots
            .lock()
            .get(job_id)
            .map(|list| list.len())
            .unwrap_or(0)
    }
}

/// A lazy, in-order stream of one job's events.
///
/// Ends when the subscriber drops it, the hub drops it on overflow (after
/// [`LedgerItem::Overflow`]), or the ledger shuts down. Dropping the stream
/// is unsubscribe; the hub reaps the closed slot on the next publish.
#[derive(Debug)]
pub struct EventStream {
    backfill: VecDeque<EventRecord>,
    rx: mpsc::Receiver<EventRecord>,
    overflowed: Arc<AtomicBool>,
    overflow_delivered: bool,
}

impl EventStream {
    /// Next item, `None` once the stream is finished.
    pub async fn next(&mut self) -> Option<LedgerItem> {
        if let Some(event) = self.backfill.pop_front() {
            return Some(LedgerItem::Event(event));
        }
        match self.rx.recv().await {
            Some(event) => Some(LedgerItem::Event(event)),
            None => {
                if self.overflowed.load(Ordering::Acquire) && !self.overflow_delivered {
                    self.overflow_delivered = true;
                    Some(LedgerItem::Overflow)
                } else {
                    None
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;
