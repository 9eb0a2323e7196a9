// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk job record (`jobs/<id>/job.json`).
//!
//! Records are replaced atomically: the new content is written to
//! `job.json.tmp`, fsynced, then renamed over the old file. A reader sees
//! either the previous record or the new one, never a partial write.

use chrono::{DateTime, Utc};
use pj_core::Job;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Current record schema version
pub const CURRENT_RECORD_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(rename = "v")]
    pub version: u32,
    /// Wall-clock time of the last write
    pub updated_at: DateTime<Utc>,
    pub job: Job,
}

impl JobRecord {
    pub fn new(job: Job) -> Self {
        Self { version: CURRENT_RECORD_VERSION, updated_at: Utc::now(), job }
    }
}

pub(crate) fn tmp_path(path: &Path) -> std::path::PathBuf {
    path.with_extension("json.tmp")
}

pub(crate) fn write_atomic(path: &Path, job: &Job) -> std::io::Result<()> {
    let record = JobRecord::new(job.clone());
    let json = serde_json::to_vec_pretty(&record).map_err(std::io::Error::other)?;
    let tmp = tmp_path(path);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(&json)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)
}

/// `Ok(None)` when no record file exists.
pub(crate) fn read(path: &Path) -> Result<Option<JobRecord>, ReadError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum ReadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
