// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine diagnostics: a non-blocking file writer under the state directory.
//!
//! Worker output never goes here; each job has its own log in the store.

use crate::config::ENGINE_LOG_FILE;
use crate::env::LOG_FILTER_VAR;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber writing to `<state_dir>/engine.log`.
///
/// The returned guard flushes buffered lines on drop; keep it alive for the
/// life of the process. If a subscriber is already installed (tests, an
/// embedding application) the existing one is kept.
pub fn init(state_dir: &Path) -> std::io::Result<WorkerGuard> {
    std::fs::create_dir_all(state_dir)?;
    let appender = tracing_appender::rolling::never(state_dir, ENGINE_LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter =
        EnvFilter::try_from_env(LOG_FILTER_VAR).unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .try_init();
    if installed.is_err() {
        tracing::debug!("global subscriber already set; engine log not installed");
    }
    Ok(guard)
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
