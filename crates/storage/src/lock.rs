// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exclusive ownership of a state directory.
//!
//! Only one scheduler may supervise the jobs under a state directory. The
//! lock is an advisory `flock` held for the lifetime of [`StateLock`] and
//! released by the OS when the holder exits, crash included.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("state directory is locked by another scheduler ({}): {source}", path.display())]
    Held {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug)]
pub struct StateLock {
    _file: File,
    path: PathBuf,
}

impl StateLock {
    /// Take the lock at `path` and record our pid in it.
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Open without truncating so a failed attempt keeps the holder's pid.
        let file = OpenOptions::new().write(true).create(true).truncate(false).open(path)?;
        file.try_lock_exclusive()
            .map_err(|source| LockError::Held { path: path.to_path_buf(), source })?;

        let mut file = file;
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        Ok(Self { _file: file, path: path.to_path_buf() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
