// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identifier and state machine.

use crate::clock::Clock;
use crate::request::PredictionRequest;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

crate::define_id! {
    /// Unique identifier for a prediction job.
    ///
    /// Generated at submission and never reused; it names the job's
    /// directory in the store and is the handle for every query.
    pub struct JobId("job-");
}

/// Lifecycle state of a job.
///
/// `Pending -> Running -> {Completed, Failed}`, plus `Pending -> Cancelled`
/// and `Running -> Cancelled`. The last three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub const ALL: [JobState; 5] = [
        JobState::Pending,
        JobState::Running,
        JobState::Completed,
        JobState::Failed,
        JobState::Cancelled,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed | JobState::Cancelled)
    }

    pub fn can_transition_to(self, to: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, to),
            (Pending, Running)
                | (Pending, Cancelled)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Cancelled)
        )
    }
}

crate::simple_display! {
    JobState {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown job state: {0}")]
pub struct UnknownState(pub String);

impl FromStr for JobState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobState::ALL
            .into_iter()
            .find(|state| state.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownState(s.to_string()))
    }
}

/// What the job computes; decides which artifacts a successful run must leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Structure,
    Affinity,
    BatchStructure,
}

crate::simple_display! {
    JobKind {
        Structure => "structure",
        Affinity => "affinity",
        BatchStructure => "batch_structure",
    }
}

/// Machine-readable reason a job ended FAILED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The worker process could not be started.
    SpawnFailure,
    /// The worker exited non-zero or was killed by a signal.
    NonZeroExit,
    /// The worker exited 0 but the expected artifacts are missing.
    IncompleteOutput,
    /// The job was RUNNING when the previous scheduler went away.
    InterruptedByRestart,
    /// The scheduler shut down while the job was RUNNING.
    Interrupted,
}

crate::simple_display! {
    FailureKind {
        SpawnFailure => "spawn_failure",
        NonZeroExit => "non_zero_exit",
        IncompleteOutput => "incomplete_output",
        InterruptedByRestart => "interrupted_by_restart",
        Interrupted => "interrupted",
    }
}

/// A state entered by the job, in the order it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    pub state: JobState,
    pub at_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("job {id}: invalid transition {from} -> {to}")]
pub struct TransitionError {
    pub id: JobId,
    pub from: JobState,
    pub to: JobState,
}

/// Configuration for creating a new job
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub id: JobId,
    pub name: String,
    pub request: PredictionRequest,
    pub output_dir: PathBuf,
    pub log_path: PathBuf,
}

impl JobConfig {
    pub fn builder(id: impl Into<JobId>, request: PredictionRequest) -> JobConfigBuilder {
        JobConfigBuilder {
            id: id.into(),
            name: None,
            request,
            output_dir: PathBuf::new(),
            log_path: PathBuf::new(),
        }
    }
}

pub struct JobConfigBuilder {
    id: JobId,
    name: Option<String>,
    request: PredictionRequest,
    output_dir: PathBuf,
    log_path: PathBuf,
}

impl JobConfigBuilder {
    crate::setters! {
        into {
            output_dir: PathBuf,
            log_path: PathBuf,
        }
        option {
            name: String,
        }
    }

    pub fn build(self) -> JobConfig {
        let name = self.name.unwrap_or_else(|| self.request.job_name());
        JobConfig {
            id: self.id,
            name,
            request: self.request,
            output_dir: self.output_dir,
            log_path: self.log_path,
        }
    }
}

/// A prediction job record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    pub name: String,
    pub request: PredictionRequest,
    pub state: JobState,
    /// Creation order, assigned by the store.
    #[serde(default)]
    pub seq: u64,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at_ms: Option<u64>,
    /// Worker pid while RUNNING (diagnostics only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub output_dir: PathBuf,
    pub log_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    #[serde(default)]
    pub history: Vec<StateChange>,
}

impl Job {
    pub fn new(config: JobConfig, clock: &impl Clock) -> Self {
        Self::new_with_epoch_ms(config, clock.epoch_ms())
    }

    pub fn new_with_epoch_ms(config: JobConfig, epoch_ms: u64) -> Self {
        Self {
            id: config.id,
            kind: config.request.kind(),
            name: config.name,
            request: config.request,
            state: JobState::Pending,
            seq: 0,
            created_at_ms: epoch_ms,
            started_at_ms: None,
            finished_at_ms: None,
            pid: None,
            exit_code: None,
            output_dir: config.output_dir,
            log_path: config.log_path,
            error: None,
            failure: None,
            history: vec![StateChange { state: JobState::Pending, at_ms: epoch_ms }],
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Move to `to`, recording it in the history. Rejects moves the state
    /// machine does not allow, leaving the job untouched.
    pub fn transition(&mut self, to: JobState, at_ms: u64) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(to) {
            return Err(TransitionError { id: self.id.clone(), from: self.state, to });
        }
        self.state = to;
        self.history.push(StateChange { state: to, at_ms });
        match to {
            JobState::Running => self.started_at_ms = Some(at_ms),
            s if s.is_terminal() => {
                self.finished_at_ms = Some(at_ms);
                self.pid = None;
            }
            _ => {}
        }
        Ok(())
    }

    pub fn mark_running(&mut self, pid: Option<u32>, at_ms: u64) -> Result<(), TransitionError> {
        self.transition(JobState::Running, at_ms)?;
        self.pid = pid;
        Ok(())
    }

    pub fn mark_completed(&mut self, exit_code: i32, at_ms: u64) -> Result<(), TransitionError> {
        self.transition(JobState::Completed, at_ms)?;
        self.exit_code = Some(exit_code);
        Ok(())
    }

    pub fn mark_failed(
        &mut self,
        failure: FailureKind,
        error: impl Into<String>,
        exit_code: Option<i32>,
        at_ms: u64,
    ) -> Result<(), TransitionError> {
        self.transition(JobState::Failed, at_ms)?;
        self.failure = Some(failure);
        self.error = Some(error.into());
        self.exit_code = exit_code;
        Ok(())
    }

    pub fn mark_cancelled(
        &mut self,
        exit_code: Option<i32>,
        at_ms: u64,
    ) -> Result<(), TransitionError> {
        let was_running = self.state == JobState::Running;
        self.transition(JobState::Cancelled, at_ms)?;
        self.exit_code = exit_code;
        self.error = Some(if was_running {
            "cancelled while running".to_string()
        } else {
            "cancelled before start".to_string()
        });
        Ok(())
    }

    /// Time spent running so far, or in total once finished.
    pub fn elapsed_ms(&self, now_ms: u64) -> Option<u64> {
        let started = self.started_at_ms?;
        Some(self.finished_at_ms.unwrap_or(now_ms).saturating_sub(started))
    }

    /// States entered, oldest first.
    pub fn states(&self) -> Vec<JobState> {
        self.history.iter().map(|c| c.state).collect()
    }
}

crate::builder! {
    pub struct JobBuilder => Job {
        into {
            id: JobId = "job-test-1",
            name: String = "structure_prediction",
            output_dir: PathBuf = "/tmp/pj/job-test-1/output",
            log_path: PathBuf = "/tmp/pj/job-test-1/job.log",
        }
        set {
            kind: JobKind = JobKind::Structure,
            request: PredictionRequest = PredictionRequest::structure_sequence("MKTAYIAKQR"),
            state: JobState = JobState::Pending,
            seq: u64 = 0,
            created_at_ms: u64 = 1_000_000,
            history: Vec<StateChange> = Vec::new(),
        }
        option {
            started_at_ms: u64 = None,
            finished_at_ms: u64 = None,
            pid: u32 = None,
            exit_code: i32 = None,
            error: String = None,
            failure: FailureKind = None,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
