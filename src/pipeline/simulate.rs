//! Label simulation stage
//!
//! Attaches the synthetic EV financing propensity target to every feature
//! row. Rows with incomplete scoring inputs keep their place in the output
//! with null score and label.

use crate::algorithm::PropensityScorer;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::models::{FeatureVector, LabeledHousehold};
use crate::pipeline::{Stage, StageSummary};
use crate::utils::{create_progress_bar, log_operation_start, read_parquet, write_parquet};

/// The label simulation stage
pub struct SimulateStage;

impl Stage for SimulateStage {
    fn name(&self) -> &'static str {
        "simulate-labels"
    }

    fn run(&self, config: &PipelineConfig) -> Result<StageSummary> {
        let input = config.features_path();
        log_operation_start("simulating labels for", &input);

        let batch = read_parquet(&input)?;
        let features = FeatureVector::from_record_batch(&batch)?;

        let labels = simulate_labels(&features, config)?;

        let positives = labels.iter().filter(|l| l.label == Some(1)).count();
        let excluded = labels.iter().filter(|l| l.label.is_none()).count();
        log::info!(
            "simulated {} labels with seed {}: {} positive, {} excluded",
            labels.len() - excluded,
            config.scoring.seed,
            positives,
            excluded
        );

        let output = config.labels_path();
        let batch = LabeledHousehold::to_record_batch(&labels)?;
        write_parquet(&batch, &output)?;

        Ok(StageSummary {
            stage: self.name(),
            rows_in: features.len(),
            rows_out: labels.len(),
            output,
        })
    }
}

/// Score every feature row, preserving order and exclusions
pub fn simulate_labels(
    features: &[FeatureVector],
    config: &PipelineConfig,
) -> Result<Vec<LabeledHousehold>> {
    let scorer = PropensityScorer::new(&config.scoring, features)?;

    let pb = create_progress_bar(features.len() as u64, "scoring households");
    let labels = features
        .iter()
        .map(|row| {
            pb.inc(1);
            let scored = scorer.score(row);
            LabeledHousehold {
                household_id: row.household_id.clone(),
                person_id: row.person_id.clone(),
                propensity_score: scored.map(|(score, _)| score),
                label: scored.map(|(_, label)| label),
            }
        })
        .collect();
    pb.finish_and_clear();

    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;

    fn feature(id: &str, income: f64, complete: bool) -> FeatureVector {
        FeatureVector {
            household_id: id.to_string(),
            person_id: "P1".to_string(),
            total_income_monthly: income,
            log_income: (1.0 + income).ln(),
            income_band: 1,
            is_urban: Some(1),
            zone_coastal: Some(0),
            zone_middle: Some(1),
            zone_northern: Some(0),
            education_ordinal: Some(2),
            age: 30,
            age_band: 1,
            transport_expense_ratio: if complete { Some(0.25) } else { None },
            medical_expense_ratio: Some(0.05),
            owns_dwelling: Some(1),
            owns_vehicle: Some(1),
            has_primary_income: 1,
            is_complete: complete,
        }
    }

    #[test]
    fn labels_align_with_features_and_preserve_exclusions() {
        let config = PipelineConfig::default();
        let features = vec![
            feature("H1", 4_000.0, true),
            feature("H2", 900.0, false),
            feature("H3", 10_000.0, true),
        ];

        let labels = simulate_labels(&features, &config).unwrap();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels[1].household_id, "H2");
        assert!(labels[1].propensity_score.is_none());
        assert!(labels[1].label.is_none());
        assert!(labels[0].propensity_score.is_some());
        assert!(labels[2].propensity_score.is_some());
    }

    #[test]
    fn repeated_runs_are_identical() {
        let config = PipelineConfig::default();
        let features = vec![feature("H1", 4_000.0, true), feature("H2", 600.0, true)];

        let first = simulate_labels(&features, &config).unwrap();
        let second = simulate_labels(&features, &config).unwrap();
        assert_eq!(first, second);
    }
}
