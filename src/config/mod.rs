//! Configuration for the EV propensity pipeline.
//!
//! A single [`PipelineConfig`] describes the data directory convention and
//! the policy of every stage: which raw AHIES columns are extracted, how
//! missing values are treated, how the synthetic label is scored and how the
//! classifier is trained. `Default` is the documented policy; a JSON file
//! can override it.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Imputation strategy for a single cleaned column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputationStrategy {
    /// Replace missing values with the most frequent value (ties: smallest)
    Mode,
    /// Replace missing values with the median
    Median,
    /// Replace missing values with a fixed constant
    Constant(f64),
}

/// Policy for the data loader/cleaner stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Raw AHIES column code to cleaned column name
    pub column_map: BTreeMap<String, String>,
    /// Rows with age below this (or missing age) are dropped
    pub min_age: i32,
    /// Imputation strategy per cleaned column, applied after the age filter.
    /// `primary_income_monthly` and `worked_last_7_days` are handled by the
    /// dedicated smart-income and work-status passes instead.
    pub imputation: BTreeMap<String, ImputationStrategy>,
    /// Region code to region name
    pub region_map: BTreeMap<i32, String>,
    /// Urban/rural code to label
    pub urban_rural_map: BTreeMap<i32, String>,
    /// Sex code to label
    pub sex_map: BTreeMap<i32, String>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        let column_map = [
            ("hhid", "household_id"),
            ("personid", "person_id"),
            ("region", "region"),
            ("urbrur", "urban_rural"),
            // Demographics
            ("s1aq1", "sex"),
            ("s1aq4y", "age"),
            ("s1aq5", "marital_status"),
            // Education
            ("s2aq3", "education_level"),
            ("s2aq4", "grade_completed"),
            // Income
            ("s4aq55a", "primary_income_monthly"),
            ("s4bq9", "secondary_income_monthly"),
            // Expenditure
            ("s3aq21", "medical_expense_12m"),
            ("s9aq4", "food_expense_12m"),
            ("s9aq11", "transport_expense_12m"),
            // Employment
            ("s4aq1", "worked_last_7_days"),
            // Housing and assets
            ("s11aq1", "owns_dwelling"),
            ("s11aq12", "owns_vehicle"),
        ]
        .into_iter()
        .map(|(raw, clean)| (raw.to_string(), clean.to_string()))
        .collect();

        let imputation = [
            ("marital_status", ImputationStrategy::Mode),
            ("education_level", ImputationStrategy::Mode),
            ("grade_completed", ImputationStrategy::Median),
            ("secondary_income_monthly", ImputationStrategy::Constant(0.0)),
            ("medical_expense_12m", ImputationStrategy::Constant(0.0)),
            ("food_expense_12m", ImputationStrategy::Constant(0.0)),
            ("transport_expense_12m", ImputationStrategy::Constant(0.0)),
        ]
        .into_iter()
        .map(|(col, strategy)| (col.to_string(), strategy))
        .collect();

        let region_map = [
            (1, "Western"),
            (2, "Central"),
            (3, "Greater Accra"),
            (4, "Volta"),
            (5, "Eastern"),
            (6, "Ashanti"),
            (7, "Brong Ahafo"),
            (8, "Northern"),
            (9, "Upper East"),
            (10, "Upper West"),
            (11, "Oti"),
            (12, "Bono East"),
            (13, "Ahafo"),
            (14, "Western North"),
            (15, "Savannah"),
            (16, "North East"),
        ]
        .into_iter()
        .map(|(code, name)| (code, name.to_string()))
        .collect();

        let urban_rural_map = [(1, "Urban"), (2, "Rural")]
            .into_iter()
            .map(|(code, name)| (code, name.to_string()))
            .collect();

        let sex_map = [(1, "Male"), (2, "Female")]
            .into_iter()
            .map(|(code, name)| (code, name.to_string()))
            .collect();

        Self {
            column_map,
            min_age: 18,
            imputation,
            region_map,
            urban_rural_map,
            sex_map,
        }
    }
}

/// Policy for the feature engineering stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Upper bound of the low income band, GHS per month
    pub income_band_low: f64,
    /// Lower bound of the high income band, GHS per month
    pub income_band_high: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            income_band_low: 1_000.0,
            income_band_high: 5_000.0,
        }
    }
}

/// Weighted heuristic rules for the label simulator.
///
/// The weights are a documented placeholder policy, not an empirically
/// validated model of EV financing behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Seed for the bounded noise term
    pub seed: u64,
    /// Half-width of the uniform perturbation added before the sigmoid
    pub noise_amplitude: f64,
    /// Scores at or above this threshold are labeled 1
    pub threshold: f64,
    /// Intercept of the linear score
    pub bias: f64,
    /// Weight of min-max normalized log income
    pub w_income: f64,
    /// Weight of the urban indicator
    pub w_urban: f64,
    /// Weight of vehicle ownership
    pub w_vehicle: f64,
    /// Weight of dwelling ownership
    pub w_dwelling: f64,
    /// Weight of the education ordinal, scaled to [0, 1]
    pub w_education: f64,
    /// Weight of the transport expenditure ratio
    pub w_transport: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            noise_amplitude: 0.25,
            threshold: 0.5,
            bias: -2.0,
            w_income: 1.6,
            w_urban: 0.8,
            w_vehicle: 0.9,
            w_dwelling: 0.4,
            w_education: 0.6,
            w_transport: 0.7,
        }
    }
}

/// Supported classifier families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelType {
    /// Logistic regression fitted by batch gradient descent
    Logistic,
    /// Gradient-boosted decision stumps
    GradientBoosting,
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Logistic => write!(f, "logistic"),
            Self::GradientBoosting => write!(f, "gradient-boosting"),
        }
    }
}

/// Hyperparameters for logistic regression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticParams {
    /// Gradient descent step size
    pub learning_rate: f64,
    /// Maximum gradient descent iterations
    pub max_iter: usize,
    /// Convergence tolerance on the log-loss delta
    pub tolerance: f64,
    /// L2 regularization strength (0 disables)
    pub l2: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            max_iter: 2_000,
            tolerance: 1e-7,
            l2: 0.0,
        }
    }
}

/// Hyperparameters for gradient-boosted stumps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostingParams {
    /// Number of boosting rounds (stumps)
    pub n_trees: usize,
    /// Shrinkage applied to each stump's contribution
    pub learning_rate: f64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            learning_rate: 0.1,
        }
    }
}

/// Policy for the model training stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Which classifier family to fit
    pub model_type: ModelType,
    /// Fraction of labeled rows held out for validation
    pub validation_split: f64,
    /// Seed for the train/validation shuffle
    pub seed: u64,
    /// Logistic regression hyperparameters
    pub logistic: LogisticParams,
    /// Gradient boosting hyperparameters
    pub boosting: BoostingParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            model_type: ModelType::GradientBoosting,
            validation_split: 0.2,
            seed: 42,
            logistic: LogisticParams::default(),
            boosting: BoostingParams::default(),
        }
    }
}

/// Configuration for the whole pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root of the staged data directories
    pub data_root: PathBuf,
    /// Directory for model artifacts and reports
    pub models_root: PathBuf,
    /// Raw survey file name under `data_root/01_raw`
    pub raw_file: String,
    /// Cleaner stage policy
    pub cleaning: CleaningConfig,
    /// Feature stage policy
    pub features: FeatureConfig,
    /// Label simulator policy
    pub scoring: ScoringConfig,
    /// Trainer policy
    pub training: TrainingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            models_root: PathBuf::from("models"),
            raw_file: "ahies_survey.csv".to_string(),
            cleaning: CleaningConfig::default(),
            features: FeatureConfig::default(),
            scoring: ScoringConfig::default(),
            training: TrainingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Path of the raw survey extract
    #[must_use]
    pub fn raw_path(&self) -> PathBuf {
        self.data_root.join("01_raw").join(&self.raw_file)
    }

    /// Path of the cleaned household table
    #[must_use]
    pub fn cleaned_path(&self) -> PathBuf {
        self.data_root
            .join("02_intermediate")
            .join("households_cleaned.parquet")
    }

    /// Path of the engineered feature table
    #[must_use]
    pub fn features_path(&self) -> PathBuf {
        self.data_root
            .join("03_processed")
            .join("household_features.parquet")
    }

    /// Path of the simulated label table
    #[must_use]
    pub fn labels_path(&self) -> PathBuf {
        self.data_root
            .join("03_processed")
            .join("household_labels.parquet")
    }

    /// Path of the persisted model artifact
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.models_root.join("propensity_model.json")
    }

    /// Path of the persisted evaluation report
    #[must_use]
    pub fn report_path(&self) -> PathBuf {
        self.models_root.join("evaluation_report.json")
    }
}

impl fmt::Display for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pipeline Configuration:")?;
        writeln!(f, "  Raw Input: {}", self.raw_path().display())?;
        writeln!(f, "  Cleaned Table: {}", self.cleaned_path().display())?;
        writeln!(f, "  Feature Table: {}", self.features_path().display())?;
        writeln!(f, "  Label Table: {}", self.labels_path().display())?;
        writeln!(f, "  Model Artifact: {}", self.model_path().display())?;
        writeln!(f, "  Minimum Age: {}", self.cleaning.min_age)?;
        writeln!(f, "  Scoring Seed: {}", self.scoring.seed)?;
        writeln!(f, "  Model Type: {}", self.training.model_type)?;
        writeln!(
            f,
            "  Validation Split: {:.2}",
            self.training.validation_split
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_column_map_covers_identifiers() {
        let config = CleaningConfig::default();
        assert_eq!(
            config.column_map.get("hhid").map(String::as_str),
            Some("household_id")
        );
        assert_eq!(
            config.column_map.get("personid").map(String::as_str),
            Some("person_id")
        );
        assert_eq!(config.region_map.len(), 16);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let loaded: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.cleaning.min_age, config.cleaning.min_age);
        assert_eq!(loaded.training.model_type, config.training.model_type);
        assert_eq!(loaded.scoring.seed, config.scoring.seed);
    }

    #[test]
    fn staged_paths_follow_directory_convention() {
        let config = PipelineConfig::default();
        assert!(config.raw_path().starts_with("data/01_raw"));
        assert!(config.cleaned_path().starts_with("data/02_intermediate"));
        assert!(config.features_path().starts_with("data/03_processed"));
        assert!(config.labels_path().starts_with("data/03_processed"));
        assert!(config.model_path().starts_with("models"));
    }
}
