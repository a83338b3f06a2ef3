//! Study algorithms: propensity scoring and dataset splitting

pub mod scoring;
pub mod split;

pub use scoring::PropensityScorer;
pub use split::train_validation_split;
