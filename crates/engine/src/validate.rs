// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Domain checks applied to requests after shape validation.

use pj_core::PredictionRequest;

/// Accept or reject a well-formed request before it becomes a job.
///
/// Returns a human-readable reason on rejection.
pub trait RequestValidator: Send + Sync + 'static {
    fn validate(&self, request: &PredictionRequest) -> Result<(), String>;
}

/// Accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl RequestValidator for AcceptAll {
    fn validate(&self, _request: &PredictionRequest) -> Result<(), String> {
        Ok(())
    }
}

/// Canonical one-letter amino acid codes.
const AMINO_ACIDS: &[u8] = b"ACDEFGHIKLMNPQRSTVWY";

/// Rejects inline protein sequences with anything but the 20 canonical
/// amino acids. Case and whitespace are ignored.
///
/// Input files are not inspected.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProteinAlphabet;

impl ProteinAlphabet {
    fn check(label: &str, sequence: &str) -> Result<(), String> {
        let invalid = sequence
            .chars()
            .filter(|c| !c.is_whitespace())
            .enumerate()
            .find(|(_, c)| !c.is_ascii() || !AMINO_ACIDS.contains(&(c.to_ascii_uppercase() as u8)));
        match invalid {
            Some((pos, c)) => {
                Err(format!("{label}: invalid residue {c:?} at position {}", pos + 1))
            }
            None => Ok(()),
        }
    }
}

impl RequestValidator for ProteinAlphabet {
    fn validate(&self, request: &PredictionRequest) -> Result<(), String> {
        match request {
            PredictionRequest::Structure(r) => match &r.sequence {
                Some(seq) => Self::check("sequence", seq),
                None => Ok(()),
            },
            PredictionRequest::Affinity(r) => match &r.protein_sequence {
                Some(seq) => Self::check("protein_sequence", seq),
                None => Ok(()),
            },
            PredictionRequest::BatchStructure(r) => r
                .sequences
                .iter()
                .enumerate()
                .try_for_each(|(i, seq)| Self::check(&format!("sequences[{i}]"), seq)),
        }
    }
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
