//! Classifiers for the propensity target
//!
//! Two interchangeable families are supported: logistic regression and
//! gradient-boosted decision stumps. Both operate on the dense feature
//! matrix, persist through serde, and reproduce identical predictions after
//! a save/load round trip.

pub mod artifact;
pub mod boosting;
pub mod logistic;
pub mod metrics;

pub use artifact::{EvaluationReport, FittedClassifier, ModelArtifact};
pub use boosting::BoostedStumps;
pub use logistic::LogisticModel;
pub use metrics::Metrics;
