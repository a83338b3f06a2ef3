//! Persisted model artifact and evaluation report
//!
//! The artifact is written once by the training stage and never mutated;
//! retraining supersedes it with a new file. Reloading an artifact must
//! reproduce identical predictions on identical inputs.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::Utc;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::classifier::boosting::BoostedStumps;
use crate::classifier::logistic::LogisticModel;
use crate::classifier::metrics::ConfusionCounts;
use crate::config::{ModelType, TrainingConfig};
use crate::error::{Error, Result};

/// Current artifact schema version
pub const ARTIFACT_SCHEMA_VERSION: u32 = 1;

/// A fitted classifier of either supported family
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "kebab-case")]
pub enum FittedClassifier {
    /// Logistic regression
    Logistic(LogisticModel),
    /// Gradient-boosted stumps
    GradientBoosting(BoostedStumps),
}

impl FittedClassifier {
    /// Predict probabilities for a dense feature matrix
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Self::Logistic(model) => model.predict_proba(x),
            Self::GradientBoosting(model) => model.predict_proba(x),
        }
    }

    /// Per-feature importance in feature-column order
    #[must_use]
    pub fn importance(&self) -> Vec<f64> {
        match self {
            Self::Logistic(model) => model.importance(),
            Self::GradientBoosting(model) => model.importance(),
        }
    }

    /// The family this classifier belongs to
    #[must_use]
    pub fn model_type(&self) -> ModelType {
        match self {
            Self::Logistic(_) => ModelType::Logistic,
            Self::GradientBoosting(_) => ModelType::GradientBoosting,
        }
    }
}

/// Validation metrics for a fitted model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Classifier family that was evaluated
    pub model_type: ModelType,
    /// Rows used for fitting
    pub n_train: usize,
    /// Rows used for evaluation
    pub n_validation: usize,
    /// Share of correct validation predictions
    pub accuracy: f64,
    /// Positive-class precision
    pub precision: f64,
    /// Positive-class recall
    pub recall: f64,
    /// Harmonic mean of precision and recall
    pub f1: f64,
    /// ROC AUC; absent when validation holds a single class
    pub roc_auc: Option<f64>,
    /// Validation confusion counts
    pub confusion: ConfusionCounts,
    /// Feature name paired with importance, sorted descending
    pub feature_importance: Vec<(String, f64)>,
    /// RFC 3339 timestamp of the training run
    pub generated_at: String,
}

impl EvaluationReport {
    /// Load a report from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Write the report to a JSON file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(self, path)
    }

    /// Render a human-readable summary
    #[must_use]
    pub fn summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str("Evaluation Report:\n");
        summary.push_str(&format!("  Model Type: {}\n", self.model_type));
        summary.push_str(&format!(
            "  Rows: {} train / {} validation\n",
            self.n_train, self.n_validation
        ));
        summary.push_str(&format!("  Accuracy: {:.4}\n", self.accuracy));
        summary.push_str(&format!("  Precision: {:.4}\n", self.precision));
        summary.push_str(&format!("  Recall: {:.4}\n", self.recall));
        summary.push_str(&format!("  F1: {:.4}\n", self.f1));
        match self.roc_auc {
            Some(auc) => summary.push_str(&format!("  ROC AUC: {auc:.4}\n")),
            None => summary.push_str("  ROC AUC: undefined (single-class validation)\n"),
        }
        summary.push_str("  Top Features:\n");
        for (name, importance) in self.feature_importance.iter().take(5) {
            summary.push_str(&format!("    {name}: {importance:.4}\n"));
        }
        summary
    }
}

/// The persisted training output: fitted classifier plus its evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Artifact format version
    pub schema_version: u32,
    /// Feature column names, in matrix order
    pub feature_names: Vec<String>,
    /// The fitted classifier
    pub classifier: FittedClassifier,
    /// Training policy the model was fitted under
    pub training: TrainingConfig,
    /// Validation metrics
    pub report: EvaluationReport,
}

impl ModelArtifact {
    /// Assemble a new artifact stamped with the current time
    #[must_use]
    pub fn new(
        feature_names: Vec<String>,
        classifier: FittedClassifier,
        training: TrainingConfig,
        report: EvaluationReport,
    ) -> Self {
        Self {
            schema_version: ARTIFACT_SCHEMA_VERSION,
            feature_names,
            classifier,
            training,
            report,
        }
    }

    /// Predict probabilities with the persisted classifier
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.classifier.predict_proba(x)
    }

    /// Write the artifact to a JSON file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(self, path)
    }

    /// Load an artifact from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let artifact: Self = serde_json::from_reader(BufReader::new(file))?;
        if artifact.schema_version != ARTIFACT_SCHEMA_VERSION {
            return Err(Error::Training(format!(
                "unsupported artifact schema version {} at {}",
                artifact.schema_version,
                path.display()
            )));
        }
        Ok(artifact)
    }
}

/// Current timestamp for report stamping
#[must_use]
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339()
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoostingParams;
    use ndarray::array;

    fn fitted_artifact() -> (ModelArtifact, Array2<f64>) {
        let x = Array2::from_shape_vec(
            (6, 2),
            vec![0.0, 1.0, 1.0, 0.0, 2.0, 1.0, 5.0, 0.0, 6.0, 1.0, 7.0, 0.0],
        )
        .unwrap();
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let model = BoostedStumps::fit(&x, &y, &BoostingParams::default()).unwrap();

        let report = EvaluationReport {
            model_type: ModelType::GradientBoosting,
            n_train: 6,
            n_validation: 0,
            accuracy: 1.0,
            precision: 1.0,
            recall: 1.0,
            f1: 1.0,
            roc_auc: Some(1.0),
            confusion: crate::classifier::metrics::ConfusionCounts {
                true_positives: 3,
                false_positives: 0,
                false_negatives: 0,
                true_negatives: 3,
            },
            feature_importance: vec![("f0".to_string(), 1.0), ("f1".to_string(), 0.0)],
            generated_at: timestamp_now(),
        };

        let artifact = ModelArtifact::new(
            vec!["f0".to_string(), "f1".to_string()],
            FittedClassifier::GradientBoosting(model),
            TrainingConfig::default(),
            report,
        );
        (artifact, x)
    }

    #[test]
    fn save_load_round_trip_reproduces_predictions() {
        let dir = std::env::temp_dir()
            .join("ev-propensity-artifact-tests")
            .join(std::process::id().to_string());
        let path = dir.join("model.json");

        let (artifact, x) = fitted_artifact();
        let before = artifact.predict_proba(&x).unwrap();

        artifact.save(&path).unwrap();
        let loaded = ModelArtifact::load(&path).unwrap();
        let after = loaded.predict_proba(&x).unwrap();

        assert_eq!(before, after);
        assert_eq!(loaded.feature_names, artifact.feature_names);
        assert_eq!(loaded.schema_version, ARTIFACT_SCHEMA_VERSION);
    }

    #[test]
    fn summary_mentions_the_model_type() {
        let (artifact, _) = fitted_artifact();
        let summary = artifact.report.summary();
        assert!(summary.contains("gradient-boosting"));
        assert!(summary.contains("Accuracy"));
    }
}
