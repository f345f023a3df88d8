use serde::Serialize;

use crate::table::CanonicalDataset;

/// The end product of a pipeline run: analysis script plus the dataset it
/// reads.
///
/// Re-deriving from the same (dataset, roles, spec) triple yields a
/// byte-identical script, so `fingerprint` is stable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedArtifact {
    script_text: String,
    cleaned_dataset: CanonicalDataset,
}

impl GeneratedArtifact {
    pub fn new(script_text: String, cleaned_dataset: CanonicalDataset) -> Self {
        Self { script_text, cleaned_dataset }
    }

    pub fn script_text(&self) -> &str {
        &self.script_text
    }

    pub fn cleaned_dataset(&self) -> &CanonicalDataset {
        &self.cleaned_dataset
    }

    /// blake3 hash of the script text (with algorithm prefix).
    pub fn fingerprint(&self) -> String {
        format!("blake3:{}", blake3::hash(self.script_text.as_bytes()).to_hex())
    }
}
