// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pj_core::test_support::{affinity_request, batch_request, LYSOZYME};

#[yare::parameterized(
    plain     = { "MKTAYIAKQR", true },
    lowercase = { "mktayiakqr", true },
    padded    = { "  MKTAYIAKQR \n", true },
    digit     = { "MKT4YIAKQR", false },
    gap       = { "MKT-YIAKQR", false },
    spaced    = { "MKTAY IAKQR\nGHV", true },
    unknown_x = { "MKTAYXAKQR", false },
    selenocys = { "MKTAUIAKQR", false },
    ambiguous = { "MKTABIAKQR", false },
)]
fn protein_alphabet_on_structure(sequence: &str, ok: bool) {
    let request = PredictionRequest::structure_sequence(sequence);
    assert_eq!(ProteinAlphabet.validate(&request).is_ok(), ok);
}

#[test]
fn error_names_position() {
    let request = PredictionRequest::structure_sequence("MKT4");
    let err = ProteinAlphabet.validate(&request).unwrap_err();
    assert_eq!(err, "sequence: invalid residue '4' at position 4");
}

#[test]
fn positions_skip_whitespace() {
    let request = PredictionRequest::structure_sequence("MK TZ");
    let err = ProteinAlphabet.validate(&request).unwrap_err();
    assert_eq!(err, "sequence: invalid residue 'Z' at position 4");
}

#[test]
fn checks_affinity_protein_and_batch_entries() {
    assert!(ProteinAlphabet.validate(&affinity_request()).is_ok());
    assert!(ProteinAlphabet.validate(&batch_request(3)).is_ok());

    let bad = PredictionRequest::batch([LYSOZYME, "MK*"]);
    let err = ProteinAlphabet.validate(&bad).unwrap_err();
    assert!(err.starts_with("sequences[1]"), "got {err}");

    let bad = PredictionRequest::affinity_smiles("MK1", "CCO");
    assert!(ProteinAlphabet.validate(&bad).unwrap_err().starts_with("protein_sequence"));
}

#[test]
fn input_files_are_not_inspected() {
    let request = PredictionRequest::structure_file("/nonexistent/input.yaml");
    assert!(ProteinAlphabet.validate(&request).is_ok());
    assert!(AcceptAll.validate(&request).is_ok());
}
