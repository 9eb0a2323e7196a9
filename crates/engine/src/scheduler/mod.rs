// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job scheduler.
//!
//! Owns the dispatch queue and the running set (one [`registry::Registry`]
//! behind one mutex) and drives every state transition after submission.
//! A single event-loop task reacts to worker exits and wake-ups; each
//! reaction ends with a dispatch pass, which is the only place jobs start.
//!
//! Lock order is registry, then the store's write lock.

mod reconcile;
mod registry;

use crate::config::EngineConfig;
use crate::error::EngineError;
use parking_lot::Mutex;
use pj_core::{
    Clock, FailureKind, IdGen, Job, JobConfig, JobId, JobState, PredictionRequest,
    TransitionError,
};
use pj_runner::{Artifacts, ProcessRunner, WorkerExit, WorkerOutcome};
use pj_storage::{JobStore, StateLock, StoreError};
use registry::{Registry, StopReason};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Lines of worker output quoted in a non-zero exit error.
const ERROR_TAIL_LINES: usize = 10;
const EXIT_CHANNEL_CAPACITY: usize = 256;
const COMMIT_ATTEMPTS: u32 = 3;
const COMMIT_BACKOFF: Duration = Duration::from_millis(50);
/// Delay before retrying outcomes the store refused.
const SETTLE_RETRY: Duration = Duration::from_millis(500);
/// Extra time past the cancel grace for workers to be reaped on shutdown.
const SHUTDOWN_SLACK: Duration = Duration::from_secs(5);
const SHUTDOWN_POLL: Duration = Duration::from_millis(20);

const SHUTDOWN_ERROR: &str = "interrupted by scheduler shutdown";

/// What the scheduler knows about a job beyond its stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ProgressHint {
    /// Waiting for a slot; position 0 dispatches next
    Queued { position: usize },
    Running { elapsed_ms: u64 },
    /// Stop requested, worker not yet reaped
    Cancelling,
    /// Worker exited; its outcome is not yet recorded
    Finishing,
    Finished,
}

/// Outcome of a cancel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelDisposition {
    /// Was pending; now CANCELLED
    Cancelled,
    /// Running; termination started, poll until CANCELLED
    Requested,
    /// Worker already exited; its own outcome is being recorded
    Finishing,
    /// Terminal already; nothing changed
    AlreadyTerminal,
}

pj_core::simple_display! {
    CancelDisposition {
        Cancelled => "cancelled",
        Requested => "requested",
        Finishing => "finishing",
        AlreadyTerminal => "already_terminal",
    }
}

pub struct Scheduler<C: Clock> {
    shared: Arc<Shared<C>>,
    event_loop: Mutex<Option<JoinHandle<()>>>,
}

struct Shared<C: Clock> {
    store: JobStore,
    runner: ProcessRunner,
    clock: C,
    id_gen: Arc<dyn IdGen>,
    registry: Mutex<Registry>,
    max_running: usize,
    cancel_grace: Duration,
    wake: Notify,
    exits_tx: mpsc::Sender<WorkerExit>,
    shutdown: CancellationToken,
    _lock: StateLock,
}

/// Terminal state decided for an exited worker.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Verdict {
    Completed { code: i32 },
    Failed { failure: FailureKind, error: String, code: Option<i32> },
    Cancelled { code: Option<i32> },
}

impl Verdict {
    fn apply(&self, job: &mut Job, at_ms: u64) -> Result<(), TransitionError> {
        match self {
            Verdict::Completed { code } => job.mark_completed(*code, at_ms),
            Verdict::Failed { failure, error, code } => {
                job.mark_failed(*failure, error.clone(), *code, at_ms)
            }
            Verdict::Cancelled { code } => job.mark_cancelled(*code, at_ms),
        }
    }
}

impl<C: Clock> Scheduler<C> {
    /// Lock the state directory, recover the store and start the event loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: &EngineConfig,
        clock: C,
        id_gen: Arc<dyn IdGen>,
    ) -> Result<Self, EngineError> {
        let lock = StateLock::acquire(&config.lock_path())?;
        let store = JobStore::open(&config.state_dir)?;
        let pending = reconcile::reconcile(&store, &clock)?;
        let runner = ProcessRunner::new(config.worker.clone(), store.clone(), config.cancel_grace);
        let (exits_tx, exits_rx) = mpsc::channel(EXIT_CHANNEL_CAPACITY);

        let shared = Arc::new(Shared {
            store,
            runner,
            clock,
            id_gen,
            registry: Mutex::new(Registry::new(pending)),
            max_running: config.max_running.max(1),
            cancel_grace: config.cancel_grace,
            wake: Notify::new(),
            exits_tx,
            shutdown: CancellationToken::new(),
            _lock: lock,
        });

        let event_loop = tokio::spawn(Arc::clone(&shared).run(exits_rx));
        shared.wake.notify_one();
        tracing::info!(
            state_dir = %config.state_dir.display(),
            max_running = shared.max_running,
            worker = %config.worker.program,
            "scheduler started"
        );
        Ok(Self { shared, event_loop: Mutex::new(Some(event_loop)) })
    }

    pub fn store(&self) -> &JobStore {
        &self.shared.store
    }

    pub fn clock(&self) -> &C {
        &self.shared.clock
    }

    pub fn max_running(&self) -> usize {
        self.shared.max_running
    }

    pub fn running_count(&self) -> usize {
        self.shared.registry.lock().running_len()
    }

    pub fn queued_count(&self) -> usize {
        self.shared.registry.lock().queued_len()
    }

    /// Persist a PENDING job for `request` and wake the dispatcher.
    ///
    /// The request must already be validated. Its output directory, when
    /// given, is a parent: the job writes to `<parent>/<job id>`.
    pub fn submit(&self, request: PredictionRequest) -> Result<Job, EngineError> {
        let shared = &self.shared;
        let mut registry = shared.registry.lock();
        if !registry.is_accepting() {
            return Err(EngineError::ShuttingDown);
        }

        let id = shared.id_gen.next_job_id();
        let output_dir = match &request.options().output_dir {
            Some(parent) => parent.join(id.as_str()),
            None => shared.store.default_output_dir(&id),
        };
        let config = JobConfig::builder(id.clone(), request)
            .output_dir(output_dir)
            .log_path(shared.store.log_path(&id))
            .build();
        let job = shared.store.create(Job::new(config, &shared.clock))?;
        registry.enqueue(job.id.clone());
        drop(registry);

        tracing::info!(job_id = %job.id, kind = %job.kind, name = %job.name, "job submitted");
        shared.wake.notify_one();
        Ok(job)
    }

    /// Cancel a job in any state. See [`CancelDisposition`].
    pub fn cancel(&self, id: &JobId) -> Result<(Job, CancelDisposition), EngineError> {
        let shared = &self.shared;
        let mut registry = shared.registry.lock();

        if registry.remove_queued(id) {
            let at = shared.clock.epoch_ms();
            return match shared.store.update(id, |j| j.mark_cancelled(None, at)) {
                Ok(job) => {
                    tracing::info!(job_id = %id, "cancelled pending job");
                    Ok((job, CancelDisposition::Cancelled))
                }
                Err(e) => {
                    registry.enqueue_front(id.clone());
                    Err(e.into())
                }
            };
        }

        if let Some(running) = registry.running_mut(id) {
            let job = shared.store.read(id)?;
            if running.exit.is_some() {
                return Ok((job, CancelDisposition::Finishing));
            }
            if running.stop.is_none() {
                running.stop = Some(StopReason::Cancel);
            }
            running.handle.cancel();
            tracing::info!(job_id = %id, pid = ?running.handle.pid(), "cancel requested");
            return Ok((job, CancelDisposition::Requested));
        }

        let job = shared.store.read(id)?;
        match job.state {
            state if state.is_terminal() => Ok((job, CancelDisposition::AlreadyTerminal)),
            JobState::Pending => {
                // Not queued: left behind by a shutdown
                let at = shared.clock.epoch_ms();
                let job = shared.store.update(id, |j| j.mark_cancelled(None, at))?;
                Ok((job, CancelDisposition::Cancelled))
            }
            _ => Ok((job, CancelDisposition::Finishing)),
        }
    }

    /// Progress for a job read from the store.
    pub fn progress(&self, job: &Job) -> ProgressHint {
        if job.is_terminal() {
            return ProgressHint::Finished;
        }
        let registry = self.shared.registry.lock();
        if let Some(position) = registry.position(&job.id) {
            return ProgressHint::Queued { position };
        }
        let now = self.shared.clock.epoch_ms();
        match registry.running(&job.id) {
            Some(running) if running.exit.is_some() => ProgressHint::Finishing,
            Some(running) if running.stop.is_some() => ProgressHint::Cancelling,
            Some(_) => ProgressHint::Running { elapsed_ms: job.elapsed_ms(now).unwrap_or(0) },
            None if job.state == JobState::Running => {
                ProgressHint::Running { elapsed_ms: job.elapsed_ms(now).unwrap_or(0) }
            }
            None => ProgressHint::Queued { position: registry.queued_len() },
        }
    }

    /// Stop dispatching, terminate running workers and stop the event loop.
    ///
    /// Interrupted jobs end FAILED; queued jobs stay PENDING for the next
    /// start. Idempotent.
    pub async fn shutdown(&self) {
        let shared = &self.shared;
        let running = {
            let mut registry = shared.registry.lock();
            registry.stop_accepting();
            for entry in registry.running_entries_mut() {
                if entry.stop.is_none() && entry.exit.is_none() {
                    entry.stop = Some(StopReason::Shutdown);
                }
                entry.handle.cancel();
            }
            registry.running_len()
        };
        tracing::info!(running, "scheduler shutting down");

        let drained = tokio::time::timeout(shared.cancel_grace + SHUTDOWN_SLACK, async {
            while self.running_count() > 0 {
                tokio::time::sleep(SHUTDOWN_POLL).await;
            }
        })
        .await;
        if drained.is_err() {
            tracing::warn!(remaining = self.running_count(), "workers still running at shutdown");
        }

        shared.shutdown.cancel();
        let event_loop = self.event_loop.lock().take();
        if let Some(task) = event_loop {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "scheduler event loop failed");
            }
        }
    }
}

impl<C: Clock> Drop for Scheduler<C> {
    fn drop(&mut self) {
        self.shared.registry.lock().stop_accepting();
        self.shared.shutdown.cancel();
    }
}

impl<C: Clock> Shared<C> {
    async fn run(self: Arc<Self>, mut exits: mpsc::Receiver<WorkerExit>) {
        loop {
            let unsettled = self.registry.lock().unsettled();
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                Some(exit) = exits.recv() => self.handle_exit(exit).await,
                _ = self.wake.notified() => {}
                _ = tokio::time::sleep(SETTLE_RETRY), if !unsettled.is_empty() => {
                    for id in &unsettled {
                        self.settle(id).await;
                    }
                }
            }
            self.dispatch();
        }
        tracing::debug!("scheduler event loop stopped");
    }

    /// Start queued jobs while slots are free.
    fn dispatch(&self) {
        let mut registry = self.registry.lock();
        while let Some(id) = registry.next_dispatchable(self.max_running) {
            let job = match self.store.read(&id) {
                Ok(job) => job,
                Err(e) => {
                    tracing::error!(job_id = %id, error = %e, "dropping unreadable queued job");
                    continue;
                }
            };
            if job.state != JobState::Pending {
                tracing::debug!(
                    job_id = %id,
                    state = %job.state,
                    "skipping non-pending queued job"
                );
                continue;
            }

            match self.runner.start(&job, self.exits_tx.clone()) {
                Ok(handle) => {
                    let pid = handle.pid();
                    let at = self.clock.epoch_ms();
                    match self.store.update(&id, |j| j.mark_running(pid, at)) {
                        Ok(_) => {
                            tracing::info!(job_id = %id, pid, "job running");
                            registry.insert_running(id, handle, None);
                        }
                        Err(e) => {
                            tracing::error!(
                                job_id = %id,
                                error = %e,
                                "failed to record start, stopping worker"
                            );
                            handle.cancel();
                            registry.insert_running(id, handle, Some(StopReason::Cancel));
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(job_id = %id, error = %e, "failed to start worker");
                    let at = self.clock.epoch_ms();
                    let error = e.to_string();
                    let committed = self.store.update(&id, |j| {
                        j.mark_running(None, at)?;
                        j.mark_failed(FailureKind::SpawnFailure, error, None, at)
                    });
                    if let Err(e) = committed {
                        tracing::error!(job_id = %id, error = %e, "failed to record spawn failure");
                    }
                }
            }
        }
    }

    async fn handle_exit(&self, exit: WorkerExit) {
        let id = exit.job_id;
        {
            let mut registry = self.registry.lock();
            let Some(running) = registry.running_mut(&id) else {
                tracing::warn!(job_id = %id, "exit for untracked job");
                return;
            };
            running.exit = Some(exit.outcome);
        }
        self.settle(&id).await;
    }

    /// Commit the terminal state of an exited worker and free its slot.
    ///
    /// When the store refuses, the job keeps its slot and stays RUNNING; the
    /// event loop settles it again after [`SETTLE_RETRY`].
    async fn settle(&self, id: &JobId) {
        let exited = {
            let registry = self.registry.lock();
            registry.running(id).and_then(|r| Some((r.exit.clone()?, r.stop)))
        };
        let Some((outcome, stop)) = exited else { return };

        let settled = match self.store.read(id) {
            Ok(job) => {
                let verdict = self.decide(&job, &outcome, stop);
                self.commit(id, &verdict).await
            }
            Err(e) => {
                tracing::error!(job_id = %id, error = %e, "cannot read exited job, will retry");
                false
            }
        };
        if settled {
            self.registry.lock().finish(id);
        }
    }

    fn decide(&self, job: &Job, outcome: &WorkerOutcome, stop: Option<StopReason>) -> Verdict {
        let code = outcome.exit_code();
        match stop {
            Some(StopReason::Cancel) => return Verdict::Cancelled { code },
            Some(StopReason::Shutdown) => {
                return Verdict::Failed {
                    failure: FailureKind::Interrupted,
                    error: SHUTDOWN_ERROR.to_string(),
                    code,
                };
            }
            None => {}
        }

        match outcome {
            WorkerOutcome::Exited { code: 0, .. } => match Artifacts::scan(&job.output_dir) {
                Ok(artifacts) => match artifacts.missing_for(&job.request) {
                    None => Verdict::Completed { code: 0 },
                    Some(missing) => Verdict::Failed {
                        failure: FailureKind::IncompleteOutput,
                        error: format!("worker exited with code 0 but {missing}"),
                        code: Some(0),
                    },
                },
                Err(e) => Verdict::Failed {
                    failure: FailureKind::IncompleteOutput,
                    error: format!("failed to scan {}: {e}", job.output_dir.display()),
                    code: Some(0),
                },
            },
            WorkerOutcome::Exited { code, signal } => {
                let head = match signal {
                    Some(sig) => format!("worker killed by signal {sig} (exit code {code})"),
                    None => format!("worker exited with code {code}"),
                };
                Verdict::Failed {
                    failure: FailureKind::NonZeroExit,
                    error: self.with_log_tail(&job.id, head),
                    code: Some(*code),
                }
            }
            // Only reachable after a stop request
            WorkerOutcome::Terminated { code, .. } => Verdict::Failed {
                failure: FailureKind::NonZeroExit,
                error: format!("worker terminated (exit code {code})"),
                code: Some(*code),
            },
            WorkerOutcome::WaitFailed { error } => Verdict::Failed {
                failure: FailureKind::NonZeroExit,
                error: format!("lost track of worker: {error}"),
                code: None,
            },
        }
    }

    fn with_log_tail(&self, id: &JobId, head: String) -> String {
        match self.store.read_log(id, Some(ERROR_TAIL_LINES)) {
            Ok(tail) if !tail.content.trim().is_empty() => {
                format!("{head}; last log lines:\n{}", tail.content.trim_end())
            }
            Ok(_) => head,
            Err(e) => {
                tracing::warn!(job_id = %id, error = %e, "failed to read log tail");
                head
            }
        }
    }

    /// Commit a terminal state, retrying store failures with backoff.
    /// Returns `false` if the store still refused after the last attempt.
    async fn commit(&self, id: &JobId, verdict: &Verdict) -> bool {
        for attempt in 1..=COMMIT_ATTEMPTS {
            let at = self.clock.epoch_ms();
            match self.store.update(id, |job| verdict.apply(job, at)) {
                Ok(job) => {
                    tracing::info!(
                        job_id = %id,
                        state = %job.state,
                        exit_code = ?job.exit_code,
                        failure = ?job.failure,
                        "job finished"
                    );
                    return true;
                }
                Err(StoreError::Transition(e)) => {
                    tracing::warn!(job_id = %id, error = %e, "job already left running");
                    return true;
                }
                Err(e) if attempt < COMMIT_ATTEMPTS => {
                    tracing::warn!(job_id = %id, attempt, error = %e, "commit failed, retrying");
                    tokio::time::sleep(COMMIT_BACKOFF * attempt).await;
                }
                Err(e) => {
                    tracing::error!(job_id = %id, error = %e, "commit failed, will retry later");
                }
            }
        }
        false
    }
}
