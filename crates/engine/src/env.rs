// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the engine crate.

use crate::config::ConfigError;
use std::path::PathBuf;
use std::str::FromStr;

/// Filter directive variable for engine logging (`tracing_subscriber` syntax).
pub const LOG_FILTER_VAR: &str = "PJ_LOG";

/// Resolve state directory:
/// PJ_STATE_DIR > XDG_STATE_HOME/pj > platform state dir > ~/.local/state/pj
pub fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Some(dir) = non_empty("PJ_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Some(xdg) = non_empty("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("pj"));
    }
    if let Some(dir) = dirs::state_dir() {
        return Ok(dir.join("pj"));
    }
    let home = non_empty("HOME").ok_or(ConfigError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/pj"))
}

/// Concurrent worker bound override
pub fn max_running() -> Result<Option<usize>, ConfigError> {
    parse_var("PJ_MAX_RUNNING")
}

/// SIGTERM-to-SIGKILL grace period override, in milliseconds
pub fn cancel_grace_ms() -> Result<Option<u64>, ConfigError> {
    parse_var("PJ_CANCEL_GRACE_MS")
}

/// Status polling interval used by `wait`, in milliseconds
pub fn poll_interval_ms() -> Result<Option<u64>, ConfigError> {
    parse_var("PJ_POLL_INTERVAL_MS")
}

/// Worker program override (e.g. a wrapper script or absolute path)
pub fn worker_program() -> Option<String> {
    non_empty("PJ_WORKER_PROGRAM")
}

fn non_empty(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|s| !s.trim().is_empty())
}

fn parse_var<T: FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match non_empty(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env { var, value }),
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
