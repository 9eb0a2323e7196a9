// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prediction request payloads and shape validation.
//!
//! A request is frozen into the job record at submission. Only its shape is
//! checked here (which inputs are present and mutually consistent); domain
//! checks such as sequence alphabets belong to a `RequestValidator` upstream.

use crate::job::JobKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Structure file format written by the worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Pdb,
    Cif,
}

impl OutputFormat {
    /// File extension of structures in this format (also the CLI value).
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Pdb => "pdb",
            OutputFormat::Cif => "cif",
        }
    }
}

crate::simple_display! {
    OutputFormat {
        Pdb => "pdb",
        Cif => "cif",
    }
}

fn default_true() -> bool {
    true
}

/// Options shared by every request kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionOptions {
    #[serde(default = "default_true")]
    pub use_msa_server: bool,
    #[serde(default)]
    pub use_potentials: bool,
    #[serde(default)]
    pub output_format: OutputFormat,
    /// Parent directory for results. The job writes into `<output_dir>/<job-id>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_name: Option<String>,
}

impl Default for PredictionOptions {
    fn default() -> Self {
        Self {
            use_msa_server: true,
            use_potentials: false,
            output_format: OutputFormat::default(),
            output_dir: None,
            job_name: None,
        }
    }
}

impl PredictionOptions {
    crate::setters! {
        set {
            use_msa_server: bool,
            use_potentials: bool,
            output_format: OutputFormat,
        }
        option {
            output_dir: PathBuf,
            job_name: String,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<String>,
    #[serde(default)]
    pub options: PredictionOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffinityRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein_sequence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ligand_smiles: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ligand_ccd: Option<String>,
    #[serde(default)]
    pub options: PredictionOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStructureRequest {
    pub sequences: Vec<String>,
    #[serde(default)]
    pub options: PredictionOptions,
}

/// The frozen input payload of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictionRequest {
    Structure(StructureRequest),
    Affinity(AffinityRequest),
    BatchStructure(BatchStructureRequest),
}

/// Why a request was rejected before any job existed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("either input_file or {0} must be provided")]
    MissingInput(&'static str),
    #[error("provide either input_file or {0}, not both")]
    ConflictingInputs(&'static str),
    #[error("{0} must not be empty")]
    EmptySequence(&'static str),
    #[error("a ligand is required: provide ligand_smiles or ligand_ccd")]
    MissingLigand,
    #[error("provide either ligand_smiles or ligand_ccd, not both")]
    ConflictingLigands,
    #[error("batch request has no sequences")]
    NoSequences,
    #[error("batch sequence {index} is empty")]
    EmptyBatchSequence { index: usize },
    #[error("input file not found: {}", .0.display())]
    InputFileNotFound(PathBuf),
}

fn is_blank(s: &Option<String>) -> bool {
    s.as_deref().is_none_or(|s| s.trim().is_empty())
}

fn check_input_file(path: &Option<PathBuf>) -> Result<(), RequestError> {
    match path {
        Some(p) if !p.is_file() => Err(RequestError::InputFileNotFound(p.clone())),
        _ => Ok(()),
    }
}

impl PredictionRequest {
    pub fn structure_sequence(sequence: impl Into<String>) -> Self {
        PredictionRequest::Structure(StructureRequest {
            sequence: Some(sequence.into()),
            ..Default::default()
        })
    }

    pub fn structure_file(path: impl Into<PathBuf>) -> Self {
        PredictionRequest::Structure(StructureRequest {
            input_file: Some(path.into()),
            ..Default::default()
        })
    }

    pub fn affinity_smiles(protein: impl Into<String>, smiles: impl Into<String>) -> Self {
        PredictionRequest::Affinity(AffinityRequest {
            protein_sequence: Some(protein.into()),
            ligand_smiles: Some(smiles.into()),
            ..Default::default()
        })
    }

    pub fn affinity_ccd(protein: impl Into<String>, ccd: impl Into<String>) -> Self {
        PredictionRequest::Affinity(AffinityRequest {
            protein_sequence: Some(protein.into()),
            ligand_ccd: Some(ccd.into()),
            ..Default::default()
        })
    }

    pub fn batch<S: Into<String>>(sequences: impl IntoIterator<Item = S>) -> Self {
        PredictionRequest::BatchStructure(BatchStructureRequest {
            sequences: sequences.into_iter().map(Into::into).collect(),
            ..Default::default()
        })
    }

    /// Replace the options, keeping the inputs.
    pub fn with_options(mut self, options: PredictionOptions) -> Self {
        *self.options_mut() = options;
        self
    }

    pub fn kind(&self) -> JobKind {
        match self {
            PredictionRequest::Structure(_) => JobKind::Structure,
            PredictionRequest::Affinity(_) => JobKind::Affinity,
            PredictionRequest::BatchStructure(_) => JobKind::BatchStructure,
        }
    }

    pub fn options(&self) -> &PredictionOptions {
        match self {
            PredictionRequest::Structure(r) => &r.options,
            PredictionRequest::Affinity(r) => &r.options,
            PredictionRequest::BatchStructure(r) => &r.options,
        }
    }

    fn options_mut(&mut self) -> &mut PredictionOptions {
        match self {
            PredictionRequest::Structure(r) => &mut r.options,
            PredictionRequest::Affinity(r) => &mut r.options,
            PredictionRequest::BatchStructure(r) => &mut r.options,
        }
    }

    /// Job name when the caller did not supply one.
    pub fn default_name(&self) -> String {
        match self {
            PredictionRequest::Structure(_) => "structure_prediction".to_string(),
            PredictionRequest::Affinity(_) => "affinity_prediction".to_string(),
            PredictionRequest::BatchStructure(r) => {
                format!("batch_structure_{}_sequences", r.sequences.len())
            }
        }
    }

    /// Caller-supplied name, or the kind default.
    pub fn job_name(&self) -> String {
        match self.options().job_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.default_name(),
        }
    }

    /// Number of structures a successful run must produce.
    pub fn expected_structures(&self) -> usize {
        match self {
            PredictionRequest::BatchStructure(r) => r.sequences.len(),
            _ => 1,
        }
    }

    /// Check which inputs are present and that they agree with each other.
    pub fn validate_shape(&self) -> Result<(), RequestError> {
        match self {
            PredictionRequest::Structure(r) => {
                match (&r.input_file, &r.sequence) {
                    (Some(_), Some(_)) => return Err(RequestError::ConflictingInputs("sequence")),
                    (None, None) => return Err(RequestError::MissingInput("sequence")),
                    (None, seq) if is_blank(seq) => {
                        return Err(RequestError::EmptySequence("sequence"))
                    }
                    _ => {}
                }
                check_input_file(&r.input_file)
            }
            PredictionRequest::Affinity(r) => {
                if r.input_file.is_some() {
                    if r.protein_sequence.is_some()
                        || r.ligand_smiles.is_some()
                        || r.ligand_ccd.is_some()
                    {
                        return Err(RequestError::ConflictingInputs("protein_sequence"));
                    }
                    return check_input_file(&r.input_file);
                }
                if r.protein_sequence.is_none() {
                    return Err(RequestError::MissingInput("protein_sequence"));
                }
                if is_blank(&r.protein_sequence) {
                    return Err(RequestError::EmptySequence("protein_sequence"));
                }
                match (is_blank(&r.ligand_smiles), is_blank(&r.ligand_ccd)) {
                    (true, true) => Err(RequestError::MissingLigand),
                    (false, false) => Err(RequestError::ConflictingLigands),
                    _ => Ok(()),
                }
            }
            PredictionRequest::BatchStructure(r) => {
                if r.sequences.is_empty() {
                    return Err(RequestError::NoSequences);
                }
                if let Some(index) = r.sequences.iter().position(|s| s.trim().is_empty()) {
                    return Err(RequestError::EmptyBatchSequence { index });
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
