// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup recovery.
//!
//! After a restart there are no live run handles, so a RUNNING record can't
//! be trusted: its worker may have died with the old scheduler or may still
//! be writing output nobody will collect. Such jobs are failed rather than
//! resumed. Orphaned worker processes are left alone.

use pj_core::{format_utc_ms, Clock, FailureKind, JobId, JobState};
use pj_storage::{JobStore, StoreError};

pub(crate) const RESTART_ERROR: &str = "interrupted by scheduler restart";

/// Fail every RUNNING job and return the PENDING ones in creation order.
pub(crate) fn reconcile(store: &JobStore, clock: &impl Clock) -> Result<Vec<JobId>, StoreError> {
    let mut pending = Vec::new();
    let mut interrupted = 0usize;

    for job in store.list(None)? {
        match job.state {
            JobState::Running => {
                let at = clock.epoch_ms();
                store.update(&job.id, |j| {
                    j.mark_failed(FailureKind::InterruptedByRestart, RESTART_ERROR, None, at)
                })?;
                let pid = job.pid.map(|p| format!(" (pid {p})")).unwrap_or_default();
                let note = format!(
                    "[pj {}] scheduler restarted while the worker{pid} was running; marked failed\n",
                    format_utc_ms(at)
                );
                if let Err(e) = store.append_log(&job.id, note.as_bytes()) {
                    tracing::warn!(
                        job_id = %job.id,
                        error = %e,
                        "failed to note restart in job log"
                    );
                }
                tracing::warn!(
                    job_id = %job.id,
                    pid = ?job.pid,
                    "job was running at restart, marked failed"
                );
                interrupted += 1;
            }
            JobState::Pending => pending.push(job.id),
            _ => {}
        }
    }

    if interrupted > 0 || !pending.is_empty() {
        tracing::info!(interrupted, requeued = pending.len(), "reconciled job store");
    }
    Ok(pending)
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
