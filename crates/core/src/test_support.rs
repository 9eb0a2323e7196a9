// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::request::{PredictionOptions, PredictionRequest};
use std::path::Path;

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core model types.
pub mod strategies {
    use crate::job::JobState;
    use proptest::prelude::*;

    pub fn arb_job_state() -> impl Strategy<Value = JobState> {
        prop_oneof![
            Just(JobState::Pending),
            Just(JobState::Running),
            Just(JobState::Completed),
            Just(JobState::Failed),
            Just(JobState::Cancelled),
        ]
    }

    /// Printable log lines without embedded newlines.
    pub fn arb_log_line() -> impl Strategy<Value = String> {
        "[ -~]{0,40}"
    }
}

// ── Request fixtures ────────────────────────────────────────────────────────

pub const LYSOZYME: &str = "KVFGRCELAAAMKRHGLDNYRGYSLGNWVCAAKFESNFNTQATNRNTDGSTDYGILQINSRWWCNDG";

/// Structure request from an inline sequence, MSA server disabled.
pub fn structure_request() -> PredictionRequest {
    PredictionRequest::structure_sequence(LYSOZYME)
        .with_options(PredictionOptions::default().use_msa_server(false))
}

pub fn affinity_request() -> PredictionRequest {
    PredictionRequest::affinity_smiles(LYSOZYME, "CC(=O)OC1=CC=CC=C1C(=O)O")
}

pub fn batch_request(n: usize) -> PredictionRequest {
    PredictionRequest::batch((0..n).map(|i| format!("{}{}", &LYSOZYME[..20], "G".repeat(i + 1))))
}

/// Same request, writing results under `parent/<job-id>`.
pub fn with_output_parent(request: PredictionRequest, parent: &Path) -> PredictionRequest {
    let options = request.options().clone().output_dir(parent);
    request.with_options(options)
}
