// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine services

use skein_adapters::SchedulerError;
use skein_core::{Error, ErrorKind, MultiError};
use thiserror::Error;

/// Errors returned by engine entrypoints
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Domain(#[from] Error),
    #[error(transparent)]
    Multi(#[from] MultiError),
    #[error("operation cancelled")]
    Cancelled,
    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<SchedulerError> for EngineError {
    fn from(err: SchedulerError) -> Self {
        EngineError::Domain(err.into())
    }
}

impl EngineError {
    /// Kind reported to callers; aggregates and timeouts are internal.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Domain(e) => e.kind(),
            EngineError::Cancelled => ErrorKind::FailedPrecondition,
            EngineError::Multi(_) | EngineError::Timeout { .. } => ErrorKind::Internal,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, EngineError::Cancelled)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
