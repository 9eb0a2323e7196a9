// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pj-runner: spawns and supervises one worker process per job

mod artifacts;
mod command;
mod config;
mod descriptor;
mod error;
mod process;

pub use artifacts::{ArtifactKind, Artifacts};
pub use command::{prepare, WorkerCommand};
pub use config::WorkerConfig;
pub use descriptor::Descriptor;
pub use error::RunnerError;
pub use process::{ProcessRunner, RunHandle, WorkerExit, WorkerOutcome};
