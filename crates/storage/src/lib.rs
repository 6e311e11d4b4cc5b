// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! drudge-storage: durable job, event, and conversation persistence.
//!
//! The store is an embedded transactional state machine: materialized
//! tables behind a single writer lock, every mutation logged to a
//! write-ahead log before the call returns, zstd snapshots for log
//! compaction. A single-row operation under the writer lock is
//! serializable, and `claim_one` under that lock gives the same guarantee
//! as a `select … for update skip locked` reservation.

mod error;
mod records;
mod snapshot;
mod store;
mod tables;
mod wal;

pub use error::StoreError;
pub use records::{JobDelta, StoreRecord};
pub use snapshot::{Snapshot, SnapshotError, CURRENT_SNAPSHOT_VERSION};
pub use store::Store;
pub use tables::{Conversation, Tables};
pub use wal::{Wal, WalEntry, WalError};
