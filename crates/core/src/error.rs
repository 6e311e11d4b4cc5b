// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared error kinds.
//!
//! The storage and engine layers each carry their own error enums; the
//! kinds that originate here (bad producer input, rejected transitions,
//! missing rows) funnel through [`CoreError`] so the mapping to the outer
//! taxonomies lives in one place.

use crate::job::ValidationError;
use crate::transition::TransitionError;
use thiserror::Error;

/// Core failure taxonomy shared upward.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("validation: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<ValidationError> for CoreError {
    fn from(err: ValidationError) -> Self {
        CoreError::Validation(err.to_string())
    }
}

impl From<TransitionError> for CoreError {
    fn from(err: TransitionError) -> Self {
        CoreError::Conflict(err.to_string())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
