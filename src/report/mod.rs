//! Read contract for the persisted training outputs
//!
//! A dashboard (or any other consumer) reads the model artifact and the
//! evaluation report from disk through these functions; nothing here writes
//! or mutates. This surface is the entire display contract.

use std::path::Path;

use crate::classifier::{EvaluationReport, ModelArtifact};
use crate::error::Result;
use crate::utils::io::validate_file;

/// Load the persisted model artifact for read-only display or inference
pub fn load_artifact(path: &Path) -> Result<ModelArtifact> {
    validate_file(path)?;
    ModelArtifact::load(path)
}

/// Load the persisted evaluation report for read-only display
pub fn load_report(path: &Path) -> Result<EvaluationReport> {
    validate_file(path)?;
    EvaluationReport::load(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_artifact_reports_the_path() {
        let err = load_artifact(Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/model.json"));
    }
}
