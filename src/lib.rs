//! A Rust pipeline for household survey data: cleans a raw AHIES extract,
//! engineers model-ready features, simulates a synthetic EV financing
//! propensity label and trains a classifier, persisting the fitted model
//! and its evaluation report.

pub mod algorithm;
pub mod classifier;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod utils;

// Re-export the most common types for easier use
// Core types
pub use config::{ModelType, PipelineConfig, ScoringConfig, TrainingConfig};
pub use error::{Error, Result};

// Row models
pub use models::{FEATURE_COLUMNS, FeatureVector, HouseholdRecord, LabeledHousehold};

// Stages
pub use pipeline::{FeatureStage, LoadStage, SimulateStage, Stage, StageSummary, TrainStage, run_pipeline};

// Training outputs
pub use classifier::{EvaluationReport, ModelArtifact};
