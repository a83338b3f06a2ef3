//! Row models flowing between pipeline stages
//!
//! Each stage hands the next a Parquet table; these structs are the typed
//! view of one row of those tables. Conversion to and from Arrow record
//! batches goes through `serde_arrow`, so the serde derives are the single
//! source of truth for each table's schema.

pub mod features;
pub mod household;
pub mod labels;

pub use features::{FEATURE_COLUMNS, FeatureVector};
pub use household::HouseholdRecord;
pub use labels::LabeledHousehold;
