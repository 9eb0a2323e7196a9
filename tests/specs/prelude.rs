// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the specs.

#![allow(dead_code)]

use pj_core::{SequentialIdGen, SystemClock};
use pj_engine::{AcceptAll, EngineConfig, JobService, JobStatus};
use pj_runner::WorkerConfig;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub use pj_core::test_support::{affinity_request, batch_request, structure_request};
pub use pj_core::{FailureKind, JobId, JobState, PredictionRequest};
pub use pj_engine::{CancelDisposition, EngineError, ProgressHint};

pub const WAIT: Option<Duration> = Some(Duration::from_secs(30));

/// Worker script that leaves one structure prediction under the out dir.
///
/// Workers run as `sh -c <script> worker <input> --out_dir <dir> ...`, so
/// `$1` is the input and `$3` the output directory.
pub const PREDICT_OK: &str = r#"mkdir -p "$3/predictions/input"
echo "ATOM      1  N   MET A   1" > "$3/predictions/input/input_model_0.pdb"
echo '{"confidence_score": 0.9}' > "$3/predictions/input/confidence_input_model_0.json""#;

pub fn sh_worker(script: &str) -> WorkerConfig {
    WorkerConfig::new("sh").arg("-c").arg(script).arg("worker")
}

/// A temporary state directory for one scheduler at a time.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn empty() -> Self {
        Self { dir: tempfile::tempdir().unwrap() }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn state_dir(&self) -> PathBuf {
        self.dir.path().join("state")
    }

    pub fn config(&self, script: &str) -> EngineConfig {
        EngineConfig::new(self.state_dir())
            .worker(sh_worker(script))
            .poll_interval(Duration::from_millis(20))
            .cancel_grace(Duration::from_secs(2))
    }

    /// Start a scheduler with ids `job-1`, `job-2`, ...
    pub fn start(&self, config: EngineConfig) -> JobService {
        JobService::start_with(
            config,
            SystemClock,
            Arc::new(SequentialIdGen::new("job")),
            Arc::new(AcceptAll),
        )
        .unwrap()
    }

    pub fn service(&self, script: &str) -> JobService {
        self.start(self.config(script))
    }
}

pub fn states(status: &JobStatus) -> Vec<JobState> {
    status.history.iter().map(|c| c.state).collect()
}

/// Poll `check` every 10ms until it holds or `timeout_ms` passes.
pub async fn wait_for<F, Fut>(timeout_ms: u64, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub async fn wait_running(service: &JobService, id: &JobId) {
    let started = wait_for(5000, || async move {
        service.status(id).unwrap().state == JobState::Running
    })
    .await;
    assert!(started, "job {id} never started");
}
