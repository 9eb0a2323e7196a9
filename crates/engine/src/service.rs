// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Query/control API.
//!
//! [`JobService`] is what callers hold. Writes go through the scheduler;
//! status, result and log reads go straight to the store.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::scheduler::{CancelDisposition, ProgressHint, Scheduler};
use crate::validate::{AcceptAll, RequestValidator};
use pj_core::{
    Clock, FailureKind, IdGen, Job, JobId, JobKind, JobState, PredictionRequest, RandomIdGen,
    StateChange, SystemClock,
};
use pj_runner::Artifacts;
use pj_storage::{JobStore, LogChunk, LogTail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Point-in-time view of one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub id: JobId,
    pub name: String,
    pub kind: JobKind,
    pub state: JobState,
    pub progress: ProgressHint,
    pub created_at_ms: u64,
    pub started_at_ms: Option<u64>,
    pub finished_at_ms: Option<u64>,
    pub elapsed_ms: Option<u64>,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
    pub failure: Option<FailureKind>,
    pub output_dir: PathBuf,
    pub log_path: PathBuf,
    pub history: Vec<StateChange>,
}

impl JobStatus {
    fn new(job: Job, progress: ProgressHint, now_ms: u64) -> Self {
        let elapsed_ms = job.elapsed_ms(now_ms);
        Self {
            id: job.id,
            name: job.name,
            kind: job.kind,
            state: job.state,
            progress,
            created_at_ms: job.created_at_ms,
            started_at_ms: job.started_at_ms,
            finished_at_ms: job.finished_at_ms,
            elapsed_ms,
            exit_code: job.exit_code,
            error: job.error,
            failure: job.failure,
            output_dir: job.output_dir,
            log_path: job.log_path,
            history: job.history,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Artifacts of a COMPLETED job. Paths are relative to `output_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub id: JobId,
    pub name: String,
    pub kind: JobKind,
    pub output_dir: PathBuf,
    pub artifacts: Artifacts,
    /// Numeric values from affinity outputs, e.g. `affinity_pred_value`
    pub affinity: BTreeMap<String, f64>,
}

impl JobResult {
    /// Absolute paths of the predicted structure files.
    pub fn structure_paths(&self) -> Vec<PathBuf> {
        self.artifacts.structures.iter().map(|p| self.output_dir.join(p)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelAck {
    pub id: JobId,
    /// State at the time of the request
    pub state: JobState,
    pub disposition: CancelDisposition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: JobId,
    pub name: String,
    pub kind: JobKind,
    pub state: JobState,
    pub created_at_ms: u64,
    pub finished_at_ms: Option<u64>,
    pub exit_code: Option<i32>,
}

impl From<Job> for JobSummary {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            name: job.name,
            kind: job.kind,
            state: job.state,
            created_at_ms: job.created_at_ms,
            finished_at_ms: job.finished_at_ms,
            exit_code: job.exit_code,
        }
    }
}

pub struct JobService<C: Clock = SystemClock> {
    config: EngineConfig,
    scheduler: Scheduler<C>,
    validator: Arc<dyn RequestValidator>,
}

impl JobService<SystemClock> {
    /// Start a scheduler on `config.state_dir` with random job ids and no
    /// domain validation.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: EngineConfig) -> Result<Self, EngineError> {
        Self::start_with(config, SystemClock, Arc::new(RandomIdGen), Arc::new(AcceptAll))
    }
}

impl<C: Clock> JobService<C> {
    pub fn start_with(
        config: EngineConfig,
        clock: C,
        id_gen: Arc<dyn IdGen>,
        validator: Arc<dyn RequestValidator>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let scheduler = Scheduler::start(&config, clock, id_gen)?;
        Ok(Self { config, scheduler, validator })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &Scheduler<C> {
        &self.scheduler
    }

    fn store(&self) -> &JobStore {
        self.scheduler.store()
    }

    /// Validate and enqueue a request. Returns once the PENDING record is
    /// durable; never waits on the worker.
    ///
    /// Relative paths in the request resolve against the current directory.
    pub fn submit(&self, request: PredictionRequest) -> Result<JobId, EngineError> {
        request.validate_shape()?;
        self.validator.validate(&request).map_err(EngineError::InvalidRequest)?;
        let request = absolutize(request, &std::env::current_dir()?);
        Ok(self.scheduler.submit(request)?.id)
    }

    pub fn status(&self, id: &JobId) -> Result<JobStatus, EngineError> {
        let job = self.store().read(id)?;
        let progress = self.scheduler.progress(&job);
        Ok(JobStatus::new(job, progress, self.scheduler.clock().epoch_ms()))
    }

    /// Artifacts of a COMPLETED job; otherwise explains why there are none.
    pub fn result(&self, id: &JobId) -> Result<JobResult, EngineError> {
        let job = self.store().read(id)?;
        match job.state {
            JobState::Completed => {
                let artifacts = Artifacts::scan(&job.output_dir)?;
                let affinity = artifacts.affinity_values(&job.output_dir);
                Ok(JobResult {
                    id: job.id,
                    name: job.name,
                    kind: job.kind,
                    output_dir: job.output_dir,
                    artifacts,
                    affinity,
                })
            }
            JobState::Failed => Err(EngineError::JobFailed {
                id: job.id,
                error: job.error.unwrap_or_else(|| "unknown error".to_string()),
            }),
            JobState::Cancelled => Err(EngineError::JobCancelled {
                id: job.id,
                error: job.error.unwrap_or_else(|| "cancelled".to_string()),
            }),
            state => Err(EngineError::NotReady { id: job.id, state }),
        }
    }

    /// Job log, or its last `tail` lines (`None` or `Some(0)`: everything).
    pub fn log(&self, id: &JobId, tail: Option<usize>) -> Result<LogTail, EngineError> {
        Ok(self.store().read_log(id, tail)?)
    }

    /// Last `log_tail_default` lines of the job log.
    pub fn tail(&self, id: &JobId) -> Result<LogTail, EngineError> {
        self.log(id, Some(self.config.log_tail_default))
    }

    /// Log output after byte `offset`; pass the returned offset back to follow.
    pub fn log_since(&self, id: &JobId, offset: u64) -> Result<LogChunk, EngineError> {
        Ok(self.store().read_log_from(id, offset)?)
    }

    pub fn cancel(&self, id: &JobId) -> Result<CancelAck, EngineError> {
        let (job, disposition) = self.scheduler.cancel(id)?;
        Ok(CancelAck { id: job.id, state: job.state, disposition })
    }

    /// Jobs in creation order, optionally only those in `state`.
    pub fn list(&self, state: Option<JobState>) -> Result<Vec<JobSummary>, EngineError> {
        Ok(self.store().list(state)?.into_iter().map(JobSummary::from).collect())
    }

    /// Poll until the job is terminal, or until `timeout` elapses.
    pub async fn wait(
        &self,
        id: &JobId,
        timeout: Option<Duration>,
    ) -> Result<JobStatus, EngineError> {
        let deadline = timeout.map(|t| tokio::time::Instant::now() + t);
        loop {
            let status = self.status(id)?;
            if status.is_terminal() {
                return Ok(status);
            }
            if deadline.is_some_and(|d| tokio::time::Instant::now() >= d) {
                return Err(EngineError::WaitTimeout { id: status.id, state: status.state });
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Submit, wait for a terminal state and return the result.
    pub async fn run(
        &self,
        request: PredictionRequest,
        timeout: Option<Duration>,
    ) -> Result<JobResult, EngineError> {
        let id = self.submit(request)?;
        self.wait(&id, timeout).await?;
        self.result(&id)
    }

    /// Delete terminal jobs that finished more than `older_than` ago.
    ///
    /// Output directories outside the store are kept.
    pub fn prune(&self, older_than: Duration) -> Result<Vec<JobId>, EngineError> {
        let age_ms = u64::try_from(older_than.as_millis()).unwrap_or(u64::MAX);
        let cutoff = self.scheduler.clock().epoch_ms().saturating_sub(age_ms);
        let mut removed = Vec::new();
        for job in self.store().list(None)? {
            let expired = job.is_terminal() && job.finished_at_ms.is_some_and(|at| at <= cutoff);
            if expired {
                self.store().remove(&job.id)?;
                removed.push(job.id);
            }
        }
        if !removed.is_empty() {
            tracing::info!(count = removed.len(), "pruned finished jobs");
        }
        Ok(removed)
    }

    /// Stop accepting work and terminate running workers. Those jobs end
    /// FAILED (`interrupted`); pending jobs are kept for the next start.
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }
}

fn absolutize(mut request: PredictionRequest, cwd: &Path) -> PredictionRequest {
    let fix = |path: &mut Option<PathBuf>| {
        if let Some(p) = path.as_mut().filter(|p| p.is_relative()) {
            *p = cwd.join(&*p);
        }
    };
    match &mut request {
        PredictionRequest::Structure(r) => {
            fix(&mut r.input_file);
            fix(&mut r.options.output_dir);
        }
        PredictionRequest::Affinity(r) => {
            fix(&mut r.input_file);
            fix(&mut r.options.output_dir);
        }
        PredictionRequest::BatchStructure(r) => fix(&mut r.options.output_dir),
    }
    request
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
