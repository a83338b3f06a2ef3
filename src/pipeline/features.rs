//! Feature engineering stage
//!
//! Derives model-ready features from the cleaned table. The output is
//! strictly row-aligned with its input: no row is dropped or reordered, and
//! the identifier sequence is verified before anything is written.

use crate::config::{FeatureConfig, PipelineConfig};
use crate::error::{Error, Result};
use crate::models::{FeatureVector, HouseholdRecord};
use crate::pipeline::{Stage, StageSummary};
use crate::utils::{log_operation_start, read_parquet, write_parquet};

/// The feature engineering stage
pub struct FeatureStage;

impl Stage for FeatureStage {
    fn name(&self) -> &'static str {
        "feature-engineer"
    }

    fn run(&self, config: &PipelineConfig) -> Result<StageSummary> {
        let input = config.cleaned_path();
        log_operation_start("deriving features from", &input);

        let batch = read_parquet(&input)?;
        let records = HouseholdRecord::from_record_batch(&batch)?;

        let features = derive_features(&records, &config.features);
        verify_alignment(&records, &features)?;

        let incomplete = features.iter().filter(|f| !f.is_complete).count();
        if incomplete > 0 {
            log::info!(
                "{incomplete} of {} rows have incomplete scoring inputs and will be excluded \
                 from label simulation",
                features.len()
            );
        }

        let output = config.features_path();
        let batch = FeatureVector::to_record_batch(&features)?;
        write_parquet(&batch, &output)?;

        Ok(StageSummary {
            stage: self.name(),
            rows_in: records.len(),
            rows_out: features.len(),
            output,
        })
    }
}

/// Derive the feature vector for every cleaned record, preserving order
#[must_use]
pub fn derive_features(
    records: &[HouseholdRecord],
    config: &FeatureConfig,
) -> Vec<FeatureVector> {
    records
        .iter()
        .map(|record| derive_one(record, config))
        .collect()
}

fn derive_one(record: &HouseholdRecord, config: &FeatureConfig) -> FeatureVector {
    let total_income = record.total_income_monthly();
    let log_income = (1.0 + total_income).ln();

    let income_band = if total_income < config.income_band_low {
        0
    } else if total_income < config.income_band_high {
        1
    } else {
        2
    };

    let is_urban = match record.urban_rural.as_deref() {
        Some("Urban") => Some(1),
        Some("Rural") => Some(0),
        _ => None,
    };

    let zone = record.region.as_deref().and_then(region_zone);
    let one_hot = |target: Zone| zone.map(|z| i32::from(z == target));

    let education_ordinal = record.education_level.map(education_bucket);
    let age_band = match record.age {
        a if a < 25 => 0,
        a if a < 40 => 1,
        a if a < 60 => 2,
        _ => 3,
    };

    // Annual expenditure across the tracked categories; a zero denominator
    // yields null ratios rather than a silent zero
    let total_expense =
        record.transport_expense_12m + record.food_expense_12m + record.medical_expense_12m;
    let (transport_ratio, medical_ratio) = if total_expense > 0.0 {
        (
            Some(record.transport_expense_12m / total_expense),
            Some(record.medical_expense_12m / total_expense),
        )
    } else {
        (None, None)
    };

    let is_complete = is_urban.is_some()
        && record.owns_dwelling.is_some()
        && record.owns_vehicle.is_some()
        && education_ordinal.is_some()
        && transport_ratio.is_some();

    FeatureVector {
        household_id: record.household_id.clone(),
        person_id: record.person_id.clone(),
        total_income_monthly: total_income,
        log_income,
        income_band,
        is_urban,
        zone_coastal: one_hot(Zone::Coastal),
        zone_middle: one_hot(Zone::Middle),
        zone_northern: one_hot(Zone::Northern),
        education_ordinal,
        age: record.age,
        age_band,
        transport_expense_ratio: transport_ratio,
        medical_expense_ratio: medical_ratio,
        owns_dwelling: record.owns_dwelling,
        owns_vehicle: record.owns_vehicle,
        has_primary_income: record.has_primary_income,
        is_complete,
    }
}

/// Ecological zone grouping of the sixteen regions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    Coastal,
    Middle,
    Northern,
}

fn region_zone(region: &str) -> Option<Zone> {
    match region {
        "Western" | "Central" | "Greater Accra" | "Volta" | "Western North" => Some(Zone::Coastal),
        "Eastern" | "Ashanti" | "Brong Ahafo" | "Oti" | "Bono East" | "Ahafo" => Some(Zone::Middle),
        "Northern" | "Upper East" | "Upper West" | "Savannah" | "North East" => {
            Some(Zone::Northern)
        }
        _ => None,
    }
}

/// Collapse the education level code into a four-step ordinal:
/// 0 none/pre-primary, 1 basic, 2 secondary, 3 tertiary and above
fn education_bucket(level: i32) -> i32 {
    match level {
        i32::MIN..=1 => 0,
        2..=3 => 1,
        4..=5 => 2,
        _ => 3,
    }
}

/// Confirm the alignment invariant between cleaned rows and features
fn verify_alignment(records: &[HouseholdRecord], features: &[FeatureVector]) -> Result<()> {
    if records.len() != features.len() {
        return Err(Error::Feature(format!(
            "feature table has {} rows but the cleaned table has {}",
            features.len(),
            records.len()
        )));
    }

    for (record, feature) in records.iter().zip(features.iter()) {
        if record.household_id != feature.household_id || record.person_id != feature.person_id {
            return Err(Error::Feature(format!(
                "row misalignment at household {} person {}",
                record.household_id, record.person_id
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> HouseholdRecord {
        HouseholdRecord {
            household_id: id.to_string(),
            person_id: "P1".to_string(),
            region: Some("Ashanti".to_string()),
            urban_rural: Some("Urban".to_string()),
            sex: Some("Male".to_string()),
            age: 42,
            marital_status: Some(1),
            education_level: Some(4),
            grade_completed: Some(12.0),
            worked_last_7_days: Some("Yes".to_string()),
            primary_income_monthly: 3_000.0,
            has_primary_income: 1,
            secondary_income_monthly: 500.0,
            medical_expense_12m: 200.0,
            transport_expense_12m: 800.0,
            food_expense_12m: 3_000.0,
            owns_dwelling: Some(1),
            owns_vehicle: Some(1),
        }
    }

    #[test]
    fn derives_expected_columns() {
        let config = FeatureConfig::default();
        let features = derive_features(&[record("H1")], &config);
        let f = &features[0];

        assert!((f.total_income_monthly - 3_500.0).abs() < f64::EPSILON);
        assert!((f.log_income - 3_501.0_f64.ln()).abs() < 1e-12);
        assert_eq!(f.income_band, 1);
        assert_eq!(f.is_urban, Some(1));
        assert_eq!(f.zone_middle, Some(1));
        assert_eq!(f.zone_coastal, Some(0));
        assert_eq!(f.zone_northern, Some(0));
        assert_eq!(f.education_ordinal, Some(2));
        assert_eq!(f.age_band, 2);
        assert!((f.transport_expense_ratio.unwrap() - 0.2).abs() < 1e-12);
        assert!((f.medical_expense_ratio.unwrap() - 0.05).abs() < 1e-12);
        assert!(f.is_complete);
    }

    #[test]
    fn income_bands_follow_thresholds() {
        let config = FeatureConfig::default();
        let mut poor = record("H1");
        poor.primary_income_monthly = 300.0;
        poor.secondary_income_monthly = 0.0;
        let mut rich = record("H2");
        rich.primary_income_monthly = 9_000.0;

        let features = derive_features(&[poor, rich], &config);
        assert_eq!(features[0].income_band, 0);
        assert_eq!(features[1].income_band, 2);
    }

    #[test]
    fn zero_expenditure_yields_null_ratios_and_incompleteness() {
        let config = FeatureConfig::default();
        let mut r = record("H1");
        r.transport_expense_12m = 0.0;
        r.food_expense_12m = 0.0;
        r.medical_expense_12m = 0.0;

        let features = derive_features(&[r], &config);
        assert_eq!(features[0].transport_expense_ratio, None);
        assert_eq!(features[0].medical_expense_ratio, None);
        assert!(!features[0].is_complete);
    }

    #[test]
    fn missing_asset_indicator_marks_the_row_incomplete() {
        let config = FeatureConfig::default();
        let mut r = record("H1");
        r.owns_vehicle = None;

        let features = derive_features(&[r], &config);
        assert_eq!(features[0].owns_vehicle, None);
        assert!(!features[0].is_complete);
        // Dense extraction for training is refused too
        assert!(features[0].to_dense().is_none());
    }

    #[test]
    fn output_stays_row_aligned() {
        let config = FeatureConfig::default();
        let records = vec![record("H3"), record("H1"), record("H2")];
        let features = derive_features(&records, &config);

        assert!(verify_alignment(&records, &features).is_ok());
        let ids: Vec<&str> = features.iter().map(|f| f.household_id.as_str()).collect();
        assert_eq!(ids, vec!["H3", "H1", "H2"]);
    }

    #[test]
    fn misalignment_is_detected() {
        let config = FeatureConfig::default();
        let records = vec![record("H1"), record("H2")];
        let mut features = derive_features(&records, &config);
        features.swap(0, 1);

        assert!(matches!(
            verify_alignment(&records, &features),
            Err(Error::Feature(_))
        ));
    }

    #[test]
    fn unknown_region_produces_null_zone() {
        let config = FeatureConfig::default();
        let mut r = record("H1");
        r.region = None;

        let features = derive_features(&[r], &config);
        assert_eq!(features[0].zone_coastal, None);
        assert_eq!(features[0].zone_middle, None);
        assert_eq!(features[0].zone_northern, None);
        // Zone is not a scoring input, so the row can still be complete
        assert!(features[0].is_complete);
    }
}
