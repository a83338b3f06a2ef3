//! Engineered feature vector
//!
//! Derived per cleaned row and strictly row-aligned with the cleaned table:
//! the feature stage never drops or reorders rows, so the identifier
//! sequence here equals the cleaned table's.

use arrow::datatypes::FieldRef;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use serde_arrow::schema::{SchemaLike, TracingOptions};

use crate::error::Result;

/// Names of the model-ready feature columns, in dense-matrix order
pub const FEATURE_COLUMNS: [&str; 14] = [
    "log_income",
    "income_band",
    "is_urban",
    "zone_coastal",
    "zone_middle",
    "zone_northern",
    "education_ordinal",
    "age",
    "age_band",
    "transport_expense_ratio",
    "medical_expense_ratio",
    "owns_dwelling",
    "owns_vehicle",
    "has_primary_income",
];

/// Derived features for one household row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Household identifier, copied from the cleaned row
    pub household_id: String,
    /// Person identifier, copied from the cleaned row
    pub person_id: String,
    /// Primary plus secondary monthly income
    pub total_income_monthly: f64,
    /// ln(1 + total income)
    pub log_income: f64,
    /// Income band ordinal: 0 low, 1 middle, 2 high
    pub income_band: i32,
    /// 1 for urban households, 0 for rural, null when the flag was unmapped
    pub is_urban: Option<i32>,
    /// Coastal zone one-hot, null when the region is unknown
    pub zone_coastal: Option<i32>,
    /// Middle zone one-hot, null when the region is unknown
    pub zone_middle: Option<i32>,
    /// Northern zone one-hot, null when the region is unknown
    pub zone_northern: Option<i32>,
    /// Education level ordinal, null when unreported
    pub education_ordinal: Option<i32>,
    /// Age in years
    pub age: i32,
    /// Age band ordinal: 0 under 25, 1 for 25-39, 2 for 40-59, 3 for 60+
    pub age_band: i32,
    /// Transport share of annual expenditure, null when expenditure is zero
    pub transport_expense_ratio: Option<f64>,
    /// Medical share of annual expenditure, null when expenditure is zero
    pub medical_expense_ratio: Option<f64>,
    /// Dwelling ownership (1/0), null when unreported
    pub owns_dwelling: Option<i32>,
    /// Vehicle ownership (1/0), null when unreported
    pub owns_vehicle: Option<i32>,
    /// 1 when primary income was reported before imputation
    pub has_primary_income: i32,
    /// True when every scoring input is present; incomplete rows are
    /// excluded from label simulation rather than defaulted
    pub is_complete: bool,
}

impl FeatureVector {
    /// Arrow fields describing the feature table
    pub fn fields() -> Result<Vec<FieldRef>> {
        Ok(Vec::<FieldRef>::from_type::<Self>(
            TracingOptions::default().allow_null_fields(true),
        )?)
    }

    /// Convert a slice of feature vectors to a `RecordBatch`
    pub fn to_record_batch(rows: &[Self]) -> Result<RecordBatch> {
        let fields = Self::fields()?;
        Ok(serde_arrow::to_record_batch(&fields, &rows)?)
    }

    /// Convert a `RecordBatch` back to typed feature vectors
    pub fn from_record_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        Ok(serde_arrow::from_record_batch(batch)?)
    }

    /// Dense model-ready values in [`FEATURE_COLUMNS`] order, or `None`
    /// when any model feature is null
    #[must_use]
    pub fn to_dense(&self) -> Option<Vec<f64>> {
        Some(vec![
            self.log_income,
            f64::from(self.income_band),
            f64::from(self.is_urban?),
            f64::from(self.zone_coastal?),
            f64::from(self.zone_middle?),
            f64::from(self.zone_northern?),
            f64::from(self.education_ordinal?),
            f64::from(self.age),
            f64::from(self.age_band),
            self.transport_expense_ratio?,
            self.medical_expense_ratio?,
            f64::from(self.owns_dwelling?),
            f64::from(self.owns_vehicle?),
            f64::from(self.has_primary_income),
        ])
    }
}
