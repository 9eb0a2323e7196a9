// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed job store.
//!
//! Layout under the store root:
//!
//! ```text
//! jobs/<id>/job.json    durable record (atomically replaced)
//! jobs/<id>/job.log     append-only worker output and runner notes
//! jobs/<id>/inputs/     worker input descriptors
//! jobs/<id>/output/     default output directory
//! ```
//!
//! Writers are serialized by one store-wide lock so that read-modify-write
//! updates never interleave. Readers go straight to the record file.

use crate::log::{self, LogChunk, LogTail};
use crate::record::{self, ReadError, CURRENT_RECORD_VERSION};
use parking_lot::Mutex;
use pj_core::{Job, JobId, JobState, TransitionError};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

const RECORD_FILE: &str = "job.json";
const LOG_FILE: &str = "job.log";
const INPUTS_DIR: &str = "inputs";
const OUTPUT_DIR: &str = "output";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job already exists: {0}")]
    DuplicateId(JobId),
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job {id} is still {state}")]
    Active { id: JobId, state: JobState },
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("job {id}: unsupported record version {found}")]
    Version { id: JobId, found: u32 },
    #[error("job {id}: corrupt record: {source}")]
    Corrupt {
        id: JobId,
        #[source]
        source: serde_json::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone)]
pub struct JobStore {
    inner: Arc<Inner>,
}

struct Inner {
    root: PathBuf,
    jobs_dir: PathBuf,
    /// Held for every write; guards the next sequence number.
    write_lock: Mutex<u64>,
}

/// Job ids name directories, so anything that could escape `jobs/` is
/// treated as unknown.
fn is_safe_id(id: &JobId) -> bool {
    let s = id.as_str();
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

impl JobStore {
    /// Open (or create) a store rooted at `root`.
    ///
    /// Scans existing records to continue the creation sequence and removes
    /// temp files left by an interrupted write.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        let jobs_dir = root.join("jobs");
        std::fs::create_dir_all(&jobs_dir)?;

        let store = Self {
            inner: Arc::new(Inner { root, jobs_dir, write_lock: Mutex::new(1) }),
        };

        let mut max_seq = 0;
        let mut count = 0usize;
        for dir in store.job_dirs()? {
            let stale_tmp = record::tmp_path(&dir.join(RECORD_FILE));
            if stale_tmp.exists() {
                tracing::warn!(path = %stale_tmp.display(), "removing interrupted record write");
                let removed = if stale_tmp.is_dir() {
                    std::fs::remove_dir_all(&stale_tmp)
                } else {
                    std::fs::remove_file(&stale_tmp)
                };
                if let Err(e) = removed {
                    tracing::error!(
                        path = %stale_tmp.display(),
                        error = %e,
                        "cannot remove stale record temp file; writes to this job will fail"
                    );
                }
            }
            if let Some(job) = store.read_dir_record(&dir) {
                max_seq = max_seq.max(job.seq);
                count += 1;
            }
        }
        *store.inner.write_lock.lock() = max_seq + 1;
        tracing::info!(root = %store.inner.root.display(), jobs = count, "opened job store");
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    pub fn job_dir(&self, id: &JobId) -> PathBuf {
        self.inner.jobs_dir.join(id.as_str())
    }

    pub fn log_path(&self, id: &JobId) -> PathBuf {
        self.job_dir(id).join(LOG_FILE)
    }

    pub fn inputs_dir(&self, id: &JobId) -> PathBuf {
        self.job_dir(id).join(INPUTS_DIR)
    }

    pub fn default_output_dir(&self, id: &JobId) -> PathBuf {
        self.job_dir(id).join(OUTPUT_DIR)
    }

    fn record_path(&self, id: &JobId) -> PathBuf {
        self.job_dir(id).join(RECORD_FILE)
    }

    /// Persist a new PENDING job. Assigns its creation sequence number and
    /// creates its directory, output directory and empty log.
    pub fn create(&self, mut job: Job) -> Result<Job, StoreError> {
        if !is_safe_id(&job.id) {
            return Err(StoreError::NotFound(job.id));
        }
        let mut next_seq = self.inner.write_lock.lock();
        let dir = self.job_dir(&job.id);
        if dir.exists() {
            return Err(StoreError::DuplicateId(job.id));
        }
        std::fs::create_dir_all(dir.join(INPUTS_DIR))?;
        std::fs::create_dir_all(&job.output_dir)?;
        OpenOptions::new().create(true).append(true).open(&job.log_path)?;

        job.seq = *next_seq;
        record::write_atomic(&self.record_path(&job.id), &job)?;
        *next_seq += 1;
        tracing::debug!(job_id = %job.id, seq = job.seq, "created job record");
        Ok(job)
    }

    /// Apply `mutation` to the stored job and commit the result atomically.
    ///
    /// Nothing is written if the mutation fails.
    pub fn update<F>(&self, id: &JobId, mutation: F) -> Result<Job, StoreError>
    where
        F: FnOnce(&mut Job) -> Result<(), TransitionError>,
    {
        let _guard = self.inner.write_lock.lock();
        let mut job = self.read(id)?;
        mutation(&mut job)?;
        record::write_atomic(&self.record_path(id), &job)?;
        Ok(job)
    }

    pub fn read(&self, id: &JobId) -> Result<Job, StoreError> {
        if !is_safe_id(id) {
            return Err(StoreError::NotFound(id.clone()));
        }
        match record::read(&self.record_path(id)) {
            Ok(Some(rec)) if rec.version == CURRENT_RECORD_VERSION => Ok(rec.job),
            Ok(Some(rec)) => Err(StoreError::Version { id: id.clone(), found: rec.version }),
            Ok(None) => Err(StoreError::NotFound(id.clone())),
            Err(ReadError::Json(source)) => Err(StoreError::Corrupt { id: id.clone(), source }),
            Err(ReadError::Io(e)) => Err(e.into()),
        }
    }

    /// All jobs in creation order, optionally only those in `state`.
    ///
    /// Unreadable records are skipped with a warning.
    pub fn list(&self, state: Option<JobState>) -> Result<Vec<Job>, StoreError> {
        let mut jobs: Vec<Job> = self
            .job_dirs()?
            .iter()
            .filter_map(|dir| self.read_dir_record(dir))
            .filter(|job| state.is_none_or(|s| job.state == s))
            .collect();
        jobs.sort_by_key(|job| job.seq);
        Ok(jobs)
    }

    pub fn append_log(&self, id: &JobId, bytes: &[u8]) -> Result<(), StoreError> {
        let mut file = self.log_writer(id)?;
        file.write_all(bytes)?;
        Ok(())
    }

    /// Append-mode handle on the job log (for redirecting worker output).
    pub fn log_writer(&self, id: &JobId) -> Result<File, StoreError> {
        if !is_safe_id(id) || !self.job_dir(id).is_dir() {
            return Err(StoreError::NotFound(id.clone()));
        }
        Ok(OpenOptions::new().create(true).append(true).open(self.log_path(id))?)
    }

    /// Last `tail` lines of the log (`None` or `Some(0)`: whole log).
    pub fn read_log(&self, id: &JobId, tail: Option<usize>) -> Result<LogTail, StoreError> {
        let job = self.read(id)?;
        Ok(log::read_tail(&job.log_path, tail.unwrap_or(0))?)
    }

    /// Log content appended after byte `offset`.
    pub fn read_log_from(&self, id: &JobId, offset: u64) -> Result<LogChunk, StoreError> {
        let job = self.read(id)?;
        Ok(log::read_from(&job.log_path, offset)?)
    }

    /// Delete a terminal job's directory. Output directories outside the
    /// store are left in place.
    pub fn remove(&self, id: &JobId) -> Result<Job, StoreError> {
        let _guard = self.inner.write_lock.lock();
        let job = self.read(id)?;
        if !job.is_terminal() {
            return Err(StoreError::Active { id: job.id, state: job.state });
        }
        std::fs::remove_dir_all(self.job_dir(id))?;
        tracing::info!(job_id = %id, state = %job.state, "removed job");
        Ok(job)
    }

    fn job_dirs(&self) -> Result<Vec<PathBuf>, StoreError> {
        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(&self.inner.jobs_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                dirs.push(entry.path());
            }
        }
        Ok(dirs)
    }

    fn read_dir_record(&self, dir: &Path) -> Option<Job> {
        let name = dir.file_name()?.to_string_lossy();
        let id = JobId::from_string(name.as_ref());
        match self.read(&id) {
            Ok(job) => Some(job),
            Err(StoreError::NotFound(_)) => None,
            Err(e) => {
                tracing::warn!(job_id = %id, error = %e, "skipping unreadable job record");
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
