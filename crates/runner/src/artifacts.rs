// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Classify what a worker left in its output directory.
//!
//! Only files below a `predictions` directory count. Paths are reported
//! relative to the output directory.

use pj_core::PredictionRequest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Structure,
    Confidence,
    Affinity,
    Other,
}

impl ArtifactKind {
    pub fn classify(path: &Path) -> Self {
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        let ext = path.extension().map(|e| e.to_string_lossy().to_ascii_lowercase());
        match ext.as_deref() {
            Some("pdb" | "cif") => ArtifactKind::Structure,
            Some("json") if name.contains("confidence") => ArtifactKind::Confidence,
            Some("json") if name.contains("affinity") => ArtifactKind::Affinity,
            _ => ArtifactKind::Other,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifacts {
    pub structures: Vec<PathBuf>,
    pub confidence: Vec<PathBuf>,
    pub affinity: Vec<PathBuf>,
    pub other: Vec<PathBuf>,
}

impl Artifacts {
    /// Scan `output_dir` recursively. A missing directory yields no artifacts.
    pub fn scan(output_dir: &Path) -> std::io::Result<Self> {
        let mut files = Vec::new();
        if output_dir.is_dir() {
            walk(output_dir, &mut files)?;
        }
        files.sort();

        let mut artifacts = Artifacts::default();
        for path in files {
            let Ok(rel) = path.strip_prefix(output_dir) else { continue };
            let in_predictions =
                rel.components().any(|c| c == Component::Normal("predictions".as_ref()));
            if !in_predictions {
                continue;
            }
            let rel = rel.to_path_buf();
            match ArtifactKind::classify(&rel) {
                ArtifactKind::Structure => artifacts.structures.push(rel),
                ArtifactKind::Confidence => artifacts.confidence.push(rel),
                ArtifactKind::Affinity => artifacts.affinity.push(rel),
                ArtifactKind::Other => artifacts.other.push(rel),
            }
        }
        Ok(artifacts)
    }

    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
            && self.confidence.is_empty()
            && self.affinity.is_empty()
            && self.other.is_empty()
    }

    /// What a successful run of `request` should have produced but did not.
    pub fn missing_for(&self, request: &PredictionRequest) -> Option<String> {
        let expected = request.expected_structures();
        if self.structures.len() < expected {
            return Some(format!(
                "expected {expected} structure file(s), found {}",
                self.structures.len()
            ));
        }
        if matches!(request, PredictionRequest::Affinity(_)) && self.affinity.is_empty() {
            return Some("no affinity output found".to_string());
        }
        None
    }

    /// Numeric top-level values from the affinity JSON files. Files that do
    /// not parse are skipped.
    pub fn affinity_values(&self, output_dir: &Path) -> BTreeMap<String, f64> {
        let mut values = BTreeMap::new();
        for rel in &self.affinity {
            let path = output_dir.join(rel);
            let parsed = std::fs::read(&path)
                .ok()
                .and_then(|bytes| serde_json::from_slice::<serde_json::Value>(&bytes).ok());
            let Some(serde_json::Value::Object(map)) = parsed else {
                tracing::debug!(path = %path.display(), "skipping unparsable affinity file");
                continue;
            };
            for (key, value) in map {
                if let Some(n) = value.as_f64() {
                    values.insert(key, n);
                }
            }
        }
        values
    }
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let ty = entry.file_type()?;
        if ty.is_dir() {
            walk(&entry.path(), out)?;
        } else if ty.is_file() {
            out.push(entry.path());
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "artifacts_tests.rs"]
mod tests;
