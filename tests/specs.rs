// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end specs: a real scheduler driving `sh` stand-in workers.

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/job/mod.rs"]
mod job;
