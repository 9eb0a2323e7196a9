// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration.
//!
//! Resolved in layers: built-in defaults, then `<state_dir>/config.toml`,
//! then `PJ_*` environment overrides (see [`crate::env`]).

use crate::env;
use pj_runner::WorkerConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_FILE: &str = "config.toml";
pub const LOCK_FILE: &str = "scheduler.lock";
pub const ENGINE_LOG_FILE: &str = "engine.log";

pub const DEFAULT_MAX_RUNNING: usize = 2;
pub const DEFAULT_CANCEL_GRACE: Duration = Duration::from_secs(10);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_LOG_TAIL: usize = 50;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine state directory (set PJ_STATE_DIR or HOME)")]
    NoStateDir,
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {var}: {value:?}")]
    Env { var: &'static str, value: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Root of the job store, lock file and engine log
    pub state_dir: PathBuf,
    /// Upper bound on concurrently RUNNING jobs (at least 1)
    pub max_running: usize,
    /// Time between SIGTERM and SIGKILL when cancelling
    pub cancel_grace: Duration,
    /// Status polling interval for `wait`
    pub poll_interval: Duration,
    /// Lines returned by a log tail when the caller gives no count
    pub log_tail_default: usize,
    pub worker: WorkerConfig,
}

/// `config.toml` contents. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    max_running: Option<usize>,
    cancel_grace_ms: Option<u64>,
    poll_interval_ms: Option<u64>,
    log_tail_default: Option<usize>,
    worker: Option<WorkerConfig>,
}

impl EngineConfig {
    /// Built-in defaults rooted at `state_dir`.
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            max_running: DEFAULT_MAX_RUNNING,
            cancel_grace: DEFAULT_CANCEL_GRACE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            log_tail_default: DEFAULT_LOG_TAIL,
            worker: WorkerConfig::default(),
        }
    }

    pj_core::setters! {
        set {
            max_running: usize,
            cancel_grace: Duration,
            poll_interval: Duration,
            log_tail_default: usize,
            worker: WorkerConfig,
        }
    }

    /// Resolve the state directory from the environment and load all layers.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(env::state_dir()?)
    }

    /// Load all layers for a known state directory.
    pub fn load_from(state_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::new(state_dir);
        let path = config.config_path();
        match std::fs::read_to_string(&path) {
            Ok(text) => config.apply_toml(&text, &path)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => return Err(ConfigError::Read { path, source }),
        }
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_toml(&mut self, text: &str, path: &Path) -> Result<(), ConfigError> {
        let file: FileConfig = toml::from_str(text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        if let Some(n) = file.max_running {
            self.max_running = n;
        }
        if let Some(ms) = file.cancel_grace_ms {
            self.cancel_grace = Duration::from_millis(ms);
        }
        if let Some(ms) = file.poll_interval_ms {
            self.poll_interval = Duration::from_millis(ms);
        }
        if let Some(n) = file.log_tail_default {
            self.log_tail_default = n;
        }
        if let Some(worker) = file.worker {
            self.worker = worker;
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(n) = env::max_running()? {
            self.max_running = n;
        }
        if let Some(ms) = env::cancel_grace_ms()? {
            self.cancel_grace = Duration::from_millis(ms);
        }
        if let Some(ms) = env::poll_interval_ms()? {
            self.poll_interval = Duration::from_millis(ms);
        }
        if let Some(program) = env::worker_program() {
            self.worker.program = program;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_running == 0 {
            return Err(ConfigError::Invalid("max_running must be at least 1".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Invalid("poll_interval_ms must be positive".into()));
        }
        if self.worker.program.trim().is_empty() {
            return Err(ConfigError::Invalid("worker.program must not be empty".into()));
        }
        Ok(())
    }

    pub fn config_path(&self) -> PathBuf {
        self.state_dir.join(CONFIG_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.state_dir.join(LOCK_FILE)
    }

    pub fn engine_log_path(&self) -> PathBuf {
        self.state_dir.join(ENGINE_LOG_FILE)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
