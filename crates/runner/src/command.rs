// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Translate a job's request into worker input files and a command line.

use crate::config::WorkerConfig;
use crate::descriptor::Descriptor;
use crate::error::RunnerError;
use pj_core::{Job, PredictionRequest};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// A fully resolved worker invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    pub program: String,
    pub args: Vec<OsString>,
    pub cwd: PathBuf,
    pub env: BTreeMap<String, String>,
}

impl WorkerCommand {
    /// Single-line command line for log notes. Words with whitespace or
    /// quotes are shown quoted and escaped.
    pub fn display(&self) -> String {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().map(|a| a.to_string_lossy().into_owned()))
            .map(|word| {
                let plain = !word.is_empty()
                    && !word.contains(|c: char| c.is_whitespace() || c == '"' || c == '\'');
                if plain {
                    word
                } else {
                    format!("{word:?}")
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub(crate) fn to_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args).current_dir(&self.cwd).envs(&self.env);
        cmd
    }
}

fn write_descriptor(path: &Path, descriptor: &Descriptor) -> Result<(), RunnerError> {
    let bytes = descriptor.to_bytes()?;
    std::fs::write(path, bytes).map_err(RunnerError::Inputs)
}

/// Path handed to the worker as its input, writing descriptors as needed.
fn write_inputs(request: &PredictionRequest, inputs_dir: &Path) -> Result<PathBuf, RunnerError> {
    std::fs::create_dir_all(inputs_dir).map_err(RunnerError::Inputs)?;
    let single = inputs_dir.join("input.yaml");
    match request {
        PredictionRequest::Structure(r) => {
            if let Some(file) = &r.input_file {
                return Ok(file.clone());
            }
            let sequence = r.sequence.as_deref().unwrap_or_default();
            write_descriptor(&single, &Descriptor::structure(sequence, r.options.use_msa_server))?;
            Ok(single)
        }
        PredictionRequest::Affinity(r) => {
            if let Some(file) = &r.input_file {
                return Ok(file.clone());
            }
            let descriptor = Descriptor::affinity(
                r.protein_sequence.as_deref().unwrap_or_default(),
                r.ligand_smiles.as_deref(),
                r.ligand_ccd.as_deref(),
                r.options.use_msa_server,
            );
            write_descriptor(&single, &descriptor)?;
            Ok(single)
        }
        PredictionRequest::BatchStructure(r) => {
            let batch_dir = inputs_dir.join("batch");
            std::fs::create_dir_all(&batch_dir).map_err(RunnerError::Inputs)?;
            for (i, sequence) in r.sequences.iter().enumerate() {
                let path = batch_dir.join(format!("seq_{i}.yaml"));
                let descriptor = Descriptor::structure(sequence, r.options.use_msa_server);
                write_descriptor(&path, &descriptor)?;
            }
            Ok(batch_dir)
        }
    }
}

/// Write the job's input descriptors into `inputs_dir` and build the worker
/// command line. The worker runs with `cwd` as its working directory.
pub fn prepare(
    config: &WorkerConfig,
    job: &Job,
    inputs_dir: &Path,
    cwd: &Path,
) -> Result<WorkerCommand, RunnerError> {
    let input = write_inputs(&job.request, inputs_dir)?;
    let options = job.request.options();

    let mut args: Vec<OsString> = config.args.iter().map(OsString::from).collect();
    args.push(input.into_os_string());
    args.push("--out_dir".into());
    args.push(job.output_dir.clone().into_os_string());
    args.push("--output_format".into());
    args.push(options.output_format.extension().into());
    if options.use_msa_server {
        args.push("--use_msa_server".into());
    }
    if options.use_potentials {
        args.push("--use_potentials".into());
    }

    Ok(WorkerCommand {
        program: config.program.clone(),
        args,
        cwd: cwd.to_path_buf(),
        env: config.env.clone(),
    })
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
