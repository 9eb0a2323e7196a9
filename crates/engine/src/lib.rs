// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pj-engine: job scheduler and the query/control API over it

pub mod config;
pub mod env;
mod error;
pub mod logging;
pub mod scheduler;
mod service;
mod validate;

pub use config::{ConfigError, EngineConfig};
pub use error::EngineError;
pub use scheduler::{CancelDisposition, ProgressHint, Scheduler};
pub use service::{CancelAck, JobResult, JobService, JobStatus, JobSummary};
pub use validate::{AcceptAll, ProteinAlphabet, RequestValidator};

pub use pj_storage::{LogChunk, LogTail as JobLog};
