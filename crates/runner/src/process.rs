// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker process supervision.
//!
//! Each started job gets one supervisor task that owns the child process.
//! The task waits for the child to exit, or for a cancel request, and then
//! reports a [`WorkerExit`] on the scheduler's channel. Workers run in their
//! own process group so that cancellation reaches anything they spawned.

use crate::command::{prepare, WorkerCommand};
use crate::config::WorkerConfig;
use crate::error::RunnerError;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use pj_core::{format_elapsed_ms, format_utc_now, Job, JobId};
use pj_storage::JobStore;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// How a worker process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// Exited on its own. `code` is `128 + signal` when killed by a signal.
    Exited { code: i32, signal: Option<i32> },
    /// Ended after a cancel request; `forced` when SIGKILL was needed.
    Terminated { code: i32, forced: bool },
    /// Waiting on the child failed; its fate is unknown.
    WaitFailed { error: String },
}

impl WorkerOutcome {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            WorkerOutcome::Exited { code, .. } | WorkerOutcome::Terminated { code, .. } => {
                Some(*code)
            }
            WorkerOutcome::WaitFailed { .. } => None,
        }
    }
}

/// Sent to the scheduler once per started job.
#[derive(Debug, Clone)]
pub struct WorkerExit {
    pub job_id: JobId,
    pub outcome: WorkerOutcome,
}

/// The scheduler's handle on one running worker.
#[derive(Debug)]
pub struct RunHandle {
    job_id: JobId,
    pid: Option<u32>,
    cancel: CancellationToken,
}

impl RunHandle {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Worker pid, for diagnostics.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Ask the supervisor to terminate the worker. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[derive(Clone)]
pub struct ProcessRunner {
    config: WorkerConfig,
    store: JobStore,
    cancel_grace: Duration,
}

impl ProcessRunner {
    pub fn new(config: WorkerConfig, store: JobStore, cancel_grace: Duration) -> Self {
        Self { config, store, cancel_grace }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Write the job's inputs, spawn its worker, and hand the child to a
    /// supervisor task. Returns as soon as the process exists.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        &self,
        job: &Job,
        exits: mpsc::Sender<WorkerExit>,
    ) -> Result<RunHandle, RunnerError> {
        let command = prepare(
            &self.config,
            job,
            &self.store.inputs_dir(&job.id),
            &self.store.job_dir(&job.id),
        )?;
        std::fs::create_dir_all(&job.output_dir).map_err(RunnerError::Inputs)?;

        // Must precede any worker output in the log
        self.note(&job.id, &format!("starting worker: {}", command.display()));
        let child = match self.spawn(job, &command) {
            Ok(child) => child,
            Err(e) => {
                self.note(&job.id, &format!("failed to start worker: {e}"));
                return Err(e);
            }
        };
        let pid = child.id();
        tracing::info!(job_id = %job.id, pid, command = %command.display(), "worker started");

        let cancel = CancellationToken::new();
        let supervisor = Supervisor {
            job_id: job.id.clone(),
            store: self.store.clone(),
            grace: self.cancel_grace,
            cancel: cancel.clone(),
            started: Instant::now(),
        };
        tokio::spawn(supervisor.run(child, exits));

        Ok(RunHandle { job_id: job.id.clone(), pid, cancel })
    }

    fn spawn(&self, job: &Job, command: &WorkerCommand) -> Result<Child, RunnerError> {
        let stdout = self.store.log_writer(&job.id)?;
        let stderr = stdout.try_clone().map_err(RunnerError::Inputs)?;

        let mut cmd = command.to_command();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .process_group(0)
            .kill_on_drop(true);
        cmd.spawn()
            .map_err(|source| RunnerError::Spawn { program: command.program.clone(), source })
    }

    fn note(&self, id: &JobId, message: &str) {
        append_note(&self.store, id, message);
    }
}

/// Append a timestamped runner line to the job log. Failures are only traced.
fn append_note(store: &JobStore, id: &JobId, message: &str) {
    let line = format!("[pj {}] {}\n", format_utc_now(), message);
    if let Err(e) = store.append_log(id, line.as_bytes()) {
        tracing::warn!(job_id = %id, error = %e, "failed to append runner note");
    }
}

fn exit_code(status: ExitStatus) -> (i32, Option<i32>) {
    match (status.code(), status.signal()) {
        (Some(code), _) => (code, None),
        (None, Some(sig)) => (128 + sig, Some(sig)),
        (None, None) => (-1, None),
    }
}

fn signal_group(pgid: Option<u32>, signal: Signal) {
    let Some(pgid) = pgid else { return };
    // ESRCH just means the group is already gone
    if let Err(e) = killpg(Pid::from_raw(pgid as i32), signal) {
        if e != nix::errno::Errno::ESRCH {
            tracing::warn!(pgid, ?signal, error = %e, "failed to signal worker group");
        }
    }
}

struct Supervisor {
    job_id: JobId,
    store: JobStore,
    grace: Duration,
    cancel: CancellationToken,
    started: Instant,
}

impl Supervisor {
    async fn run(self, mut child: Child, exits: mpsc::Sender<WorkerExit>) {
        let pgid = child.id();
        let outcome = tokio::select! {
            status = child.wait() => match status {
                Ok(status) => {
                    let (code, signal) = exit_code(status);
                    WorkerOutcome::Exited { code, signal }
                }
                Err(e) => WorkerOutcome::WaitFailed { error: e.to_string() },
            },
            _ = self.cancel.cancelled() => self.terminate(&mut child, pgid).await,
        };
        // Nothing the worker forked may outlive it
        signal_group(pgid, Signal::SIGKILL);

        let ran = format_elapsed_ms(self.started.elapsed().as_millis() as u64);
        let note = match &outcome {
            WorkerOutcome::Exited { code, signal: Some(sig) } => {
                format!("worker killed by signal {sig} after {ran} (exit code {code})")
            }
            WorkerOutcome::Exited { code, signal: None } => {
                format!("worker exited with code {code} after {ran}")
            }
            WorkerOutcome::Terminated { code, forced: false } => {
                format!("worker terminated on cancel after {ran} (exit code {code})")
            }
            WorkerOutcome::Terminated { code, forced: true } => format!(
                "worker killed after {}ms grace period, {ran} in total (exit code {code})",
                self.grace.as_millis()
            ),
            WorkerOutcome::WaitFailed { error } => format!("lost track of worker: {error}"),
        };
        append_note(&self.store, &self.job_id, &note);
        tracing::info!(job_id = %self.job_id, exit_code = ?outcome.exit_code(), "worker finished");

        let exit = WorkerExit { job_id: self.job_id.clone(), outcome };
        if let Err(e) = exits.send(exit).await {
            tracing::error!(job_id = %self.job_id, "failed to report worker exit: {}", e);
        }
    }

    /// SIGTERM the group, wait out the grace period, then SIGKILL.
    async fn terminate(&self, child: &mut Child, pgid: Option<u32>) -> WorkerOutcome {
        tracing::info!(job_id = %self.job_id, pgid, "terminating worker");
        signal_group(pgid, Signal::SIGTERM);

        match tokio::time::timeout(self.grace, child.wait()).await {
            Ok(Ok(status)) => {
                WorkerOutcome::Terminated { code: exit_code(status).0, forced: false }
            }
            Ok(Err(e)) => WorkerOutcome::WaitFailed { error: e.to_string() },
            Err(_) => {
                tracing::warn!(job_id = %self.job_id, pgid, "grace period elapsed, killing worker");
                signal_group(pgid, Signal::SIGKILL);
                let _ = child.start_kill();
                match child.wait().await {
                    Ok(status) => {
                        WorkerOutcome::Terminated { code: exit_code(status).0, forced: true }
                    }
                    Err(e) => WorkerOutcome::WaitFailed { error: e.to_string() },
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
