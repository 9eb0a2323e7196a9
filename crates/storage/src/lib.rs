// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pj-storage: durable, file-backed job records and append-only job logs

mod lock;
mod log;
mod record;
mod store;

pub use lock::{LockError, StateLock};
pub use log::{LogChunk, LogTail};
pub use record::{JobRecord, CURRENT_RECORD_VERSION};
pub use store::{JobStore, StoreError};
