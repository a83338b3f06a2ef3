//! Model training stage
//!
//! Joins features to simulated labels, splits off a validation set, fits
//! the configured classifier and persists the artifact and its evaluation
//! report. Rows without a label (excluded households) never enter training.

use ndarray::{Array1, Array2};
use rustc_hash::FxHashMap;

use crate::algorithm::train_validation_split;
use crate::classifier::artifact::timestamp_now;
use crate::classifier::{
    BoostedStumps, EvaluationReport, FittedClassifier, LogisticModel, Metrics, ModelArtifact,
};
use crate::config::{ModelType, PipelineConfig, TrainingConfig};
use crate::error::{Error, Result};
use crate::models::{FEATURE_COLUMNS, FeatureVector, LabeledHousehold};
use crate::pipeline::{Stage, StageSummary};
use crate::utils::{log_operation_start, read_parquet};

/// The model training stage
pub struct TrainStage;

impl Stage for TrainStage {
    fn name(&self) -> &'static str {
        "train-model"
    }

    fn run(&self, config: &PipelineConfig) -> Result<StageSummary> {
        let features_path = config.features_path();
        log_operation_start("training model from", &features_path);

        let features = FeatureVector::from_record_batch(&read_parquet(&features_path)?)?;
        let labels = LabeledHousehold::from_record_batch(&read_parquet(&config.labels_path())?)?;

        let artifact = train_model(&features, &labels, &config.training)?;

        let model_path = config.model_path();
        artifact.save(&model_path)?;
        artifact.report.save(&config.report_path())?;

        log::info!("\n{}", artifact.report.summary());

        Ok(StageSummary {
            stage: self.name(),
            rows_in: features.len(),
            rows_out: artifact.report.n_train + artifact.report.n_validation,
            output: model_path,
        })
    }
}

/// Join, split, fit and evaluate; returns the assembled artifact
pub fn train_model(
    features: &[FeatureVector],
    labels: &[LabeledHousehold],
    config: &TrainingConfig,
) -> Result<ModelArtifact> {
    let (x, y) = assemble_dataset(features, labels)?;
    let n = x.nrows();

    let (train_idx, validation_idx) = train_validation_split(n, config.validation_split, config.seed)?;
    let (x_train, y_train) = select_rows(&x, &y, &train_idx);
    let (x_validation, y_validation) = select_rows(&x, &y, &validation_idx);

    log::info!(
        "fitting {} model on {} rows, validating on {}",
        config.model_type,
        x_train.nrows(),
        x_validation.nrows()
    );

    let classifier = match config.model_type {
        ModelType::Logistic => {
            FittedClassifier::Logistic(LogisticModel::fit(&x_train, &y_train, &config.logistic)?)
        }
        ModelType::GradientBoosting => FittedClassifier::GradientBoosting(BoostedStumps::fit(
            &x_train,
            &y_train,
            &config.boosting,
        )?),
    };

    let report = evaluate(
        &classifier,
        &x_validation,
        &y_validation,
        x_train.nrows(),
        config.model_type,
    )?;

    let feature_names = FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect();
    Ok(ModelArtifact::new(
        feature_names,
        classifier,
        config.clone(),
        report,
    ))
}

/// Join features to labels by identifier and build the dense matrices.
///
/// Only rows that carry a label and a fully dense feature vector survive.
fn assemble_dataset(
    features: &[FeatureVector],
    labels: &[LabeledHousehold],
) -> Result<(Array2<f64>, Array1<f64>)> {
    let label_by_id: FxHashMap<(&str, &str), i32> = labels
        .iter()
        .filter_map(|row| {
            row.label
                .map(|label| ((row.household_id.as_str(), row.person_id.as_str()), label))
        })
        .collect();

    let mut rows: Vec<Vec<f64>> = Vec::new();
    let mut targets: Vec<f64> = Vec::new();
    for feature in features {
        let key = (feature.household_id.as_str(), feature.person_id.as_str());
        let (Some(&label), Some(dense)) = (label_by_id.get(&key), feature.to_dense()) else {
            continue;
        };
        rows.push(dense);
        targets.push(f64::from(label));
    }

    if rows.is_empty() {
        return Err(Error::Training(
            "training set is empty after filtering unlabeled households".to_string(),
        ));
    }

    let n_features = FEATURE_COLUMNS.len();
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    let x = Array2::from_shape_vec((targets.len(), n_features), flat)
        .map_err(|e| Error::Training(format!("failed to shape the feature matrix: {e}")))?;

    Ok((x, Array1::from_vec(targets)))
}

fn select_rows(x: &Array2<f64>, y: &Array1<f64>, indices: &[usize]) -> (Array2<f64>, Array1<f64>) {
    let n_features = x.ncols();
    let mut flat = Vec::with_capacity(indices.len() * n_features);
    let mut targets = Vec::with_capacity(indices.len());

    for &index in indices {
        flat.extend(x.row(index).iter().copied());
        targets.push(y[index]);
    }

    (
        Array2::from_shape_vec((indices.len(), n_features), flat)
            .expect("selected rows always form a rectangular matrix"),
        Array1::from_vec(targets),
    )
}

fn evaluate(
    classifier: &FittedClassifier,
    x_validation: &Array2<f64>,
    y_validation: &Array1<f64>,
    n_train: usize,
    model_type: ModelType,
) -> Result<EvaluationReport> {
    let scores = classifier.predict_proba(x_validation)?;
    let predictions = scores.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 });

    let confusion = Metrics::confusion(y_validation, &predictions);
    let roc_auc = Metrics::roc_auc(y_validation, &scores);
    if roc_auc.is_none() {
        log::warn!("validation split holds a single class; ROC AUC is undefined");
    }

    let mut feature_importance: Vec<(String, f64)> = FEATURE_COLUMNS
        .iter()
        .map(|name| name.to_string())
        .zip(classifier.importance())
        .collect();
    feature_importance.sort_by(|a, b| b.1.total_cmp(&a.1));

    Ok(EvaluationReport {
        model_type,
        n_train,
        n_validation: y_validation.len(),
        accuracy: Metrics::accuracy(y_validation, &predictions),
        precision: Metrics::precision(&confusion),
        recall: Metrics::recall(&confusion),
        f1: Metrics::f1_score(&confusion),
        roc_auc,
        confusion,
        feature_importance,
        generated_at: timestamp_now(),
    })
}
