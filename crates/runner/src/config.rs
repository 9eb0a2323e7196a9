// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How to invoke the prediction worker.
///
/// The final command line is `<program> <args...> <input> --out_dir <dir>
/// --output_format <fmt> [--use_msa_server] [--use_potentials]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub program: String,
    /// Arguments placed before the input path
    pub args: Vec<String>,
    /// Extra environment for the worker
    pub env: BTreeMap<String, String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            program: "boltz".to_string(),
            args: vec!["predict".to_string()],
            env: BTreeMap::new(),
        }
    }
}

impl WorkerConfig {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), args: Vec::new(), env: BTreeMap::new() }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}
