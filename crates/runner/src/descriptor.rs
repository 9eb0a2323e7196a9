// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker input descriptors.
//!
//! The worker reads a YAML document listing the chains to fold. We emit it
//! as JSON, which every YAML 1.2 loader accepts unchanged.

use serde::Serialize;

const SCHEMA_VERSION: u32 = 1;
const PROTEIN_CHAIN: &str = "A";
const LIGAND_CHAIN: &str = "B";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Descriptor {
    pub version: u32,
    pub sequences: Vec<Entity>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Protein {
        id: String,
        sequence: String,
        /// `"empty"` runs single-sequence mode when no MSA server is used
        #[serde(skip_serializing_if = "Option::is_none")]
        msa: Option<String>,
    },
    Ligand {
        id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        smiles: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        ccd: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Property {
    Affinity { binder: String },
}

fn protein(sequence: &str, use_msa_server: bool) -> Entity {
    Entity::Protein {
        id: PROTEIN_CHAIN.to_string(),
        sequence: sequence.trim().to_string(),
        msa: (!use_msa_server).then(|| "empty".to_string()),
    }
}

impl Descriptor {
    pub fn structure(sequence: &str, use_msa_server: bool) -> Self {
        Self {
            version: SCHEMA_VERSION,
            sequences: vec![protein(sequence, use_msa_server)],
            properties: Vec::new(),
        }
    }

    pub fn affinity(
        protein_sequence: &str,
        smiles: Option<&str>,
        ccd: Option<&str>,
        use_msa_server: bool,
    ) -> Self {
        let ligand = Entity::Ligand {
            id: LIGAND_CHAIN.to_string(),
            smiles: smiles.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            ccd: ccd.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        };
        Self {
            version: SCHEMA_VERSION,
            sequences: vec![protein(protein_sequence, use_msa_server), ligand],
            properties: vec![Property::Affinity { binder: LIGAND_CHAIN.to_string() }],
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

#[cfg(test)]
#[path = "descriptor_tests.rs"]
mod tests;
