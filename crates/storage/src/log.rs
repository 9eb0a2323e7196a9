// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job log reads: whole-file or tail, and incremental reads from a byte offset.
//!
//! Worker output is not guaranteed to be UTF-8, so bytes are decoded lossily.

use serde::{Deserialize, Serialize};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// The end of a job log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogTail {
    pub content: String,
    /// Lines in the whole log, not just in `content`
    pub total_lines: usize,
}

/// Log bytes appended since a previous read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogChunk {
    pub content: String,
    /// Offset to pass to the next read
    pub offset: u64,
}

fn read_lossy(path: &Path) -> std::io::Result<String> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e),
    }
}

/// Last `lines` lines of the log in their original order. `0` means all.
pub(crate) fn read_tail(path: &Path, lines: usize) -> std::io::Result<LogTail> {
    let text = read_lossy(path)?;
    let all_lines: Vec<&str> = text.lines().collect();
    let total_lines = all_lines.len();
    if lines == 0 || lines >= total_lines {
        return Ok(LogTail { content: text, total_lines });
    }
    let mut content = all_lines[total_lines - lines..].join("\n");
    if text.ends_with('\n') {
        content.push('\n');
    }
    Ok(LogTail { content, total_lines })
}

pub(crate) fn read_from(path: &Path, offset: u64) -> std::io::Result<LogChunk> {
    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(LogChunk { content: String::new(), offset })
        }
        Err(e) => return Err(e),
    };
    let file_len = file.metadata()?.len();
    if file_len <= offset {
        return Ok(LogChunk { content: String::new(), offset });
    }
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = Vec::with_capacity((file_len - offset) as usize);
    file.read_to_end(&mut buf)?;
    let offset = offset + buf.len() as u64;
    Ok(LogChunk { content: String::from_utf8_lossy(&buf).into_owned(), offset })
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
