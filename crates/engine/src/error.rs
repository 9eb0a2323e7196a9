// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::config::ConfigError;
use pj_core::{JobId, JobState, RequestError};
use pj_runner::RunnerError;
use pj_storage::{LockError, StoreError};
use thiserror::Error;

/// Errors returned by the query/control API.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job {id} is {state}; no result yet")]
    NotReady { id: JobId, state: JobState },
    #[error("job {id} failed: {error}")]
    JobFailed { id: JobId, error: String },
    #[error("job {id} was {error}")]
    JobCancelled { id: JobId, error: String },
    #[error("timed out waiting for job {id} (still {state})")]
    WaitTimeout { id: JobId, state: JobState },
    #[error("scheduler is shutting down")]
    ShuttingDown,
    #[error("store error: {0}")]
    Store(StoreError),
    #[error("runner error: {0}")]
    Runner(#[from] RunnerError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to lock state directory: {0}")]
    LockFailed(#[from] LockError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => EngineError::NotFound(id),
            other => EngineError::Store(other),
        }
    }
}

impl From<RequestError> for EngineError {
    fn from(e: RequestError) -> Self {
        EngineError::InvalidRequest(e.to_string())
    }
}
