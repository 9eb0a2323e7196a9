// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pj-core: data model for prediction jobs (ids, requests, job state machine)

pub mod macros;

pub mod clock;
pub mod id;
pub mod job;
pub mod request;
pub mod time_fmt;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
#[cfg(any(test, feature = "test-support"))]
pub use id::SequentialIdGen;
pub use id::{short, IdGen, RandomIdGen};
#[cfg(any(test, feature = "test-support"))]
pub use job::JobBuilder;
pub use job::{
    FailureKind, Job, JobConfig, JobConfigBuilder, JobId, JobKind, JobState, StateChange,
    TransitionError, UnknownState,
};
pub use request::{
    AffinityRequest, BatchStructureRequest, OutputFormat, PredictionOptions, PredictionRequest,
    RequestError, StructureRequest,
};
pub use time_fmt::{format_elapsed_ms, format_utc_ms, format_utc_now};
