// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store failure taxonomy.

use crate::snapshot::SnapshotError;
use crate::wal::WalError;
use drudge_core::{CoreError, TransitionError, ValidationError};
use thiserror::Error;

/// Errors surfaced by the store.
///
/// `Conflict` covers both duplicate ids and invalid status transitions;
/// `Retryable` is reserved for transient backend trouble and is what the
/// engine's bounded-backoff retry keys on.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("retryable: {0}")]
    Retryable(String),
    #[error("fatal: {0}")]
    Fatal(String),
}

impl StoreError {
    /// Whether a caller may retry the operation with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Retryable(_))
    }

    pub(crate) fn not_found(id: impl std::fmt::Display) -> Self {
        StoreError::NotFound(id.to_string())
    }
}

impl From<CoreError> for StoreError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(msg) => StoreError::Validation(msg),
            CoreError::Conflict(msg) => StoreError::Conflict(msg),
            CoreError::NotFound(msg) => StoreError::NotFound(msg),
        }
    }
}

impl From<TransitionError> for StoreError {
    fn from(err: TransitionError) -> Self {
        CoreError::from(err).into()
    }
}

impl From<ValidationError> for StoreError {
    fn from(err: ValidationError) -> Self {
        CoreError::from(err).into()
    }
}

impl From<WalError> for StoreError {
    fn from(err: WalError) -> Self {
        StoreError::Fatal(err.to_string())
    }
}

impl From<SnapshotError> for StoreError {
    fn from(err: SnapshotError) -> Self {
        StoreError::Fatal(err.to_string())
    }
}
