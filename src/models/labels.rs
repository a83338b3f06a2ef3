//! Simulated propensity labels
//!
//! One row per feature row, same order. Households whose scoring inputs
//! were incomplete keep their row with null score and label, so exclusion
//! is observable downstream instead of collapsing to zero.

use arrow::datatypes::FieldRef;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use serde_arrow::schema::{SchemaLike, TracingOptions};

use crate::error::Result;

/// A simulated label row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledHousehold {
    /// Household identifier, copied from the feature row
    pub household_id: String,
    /// Person identifier, copied from the feature row
    pub person_id: String,
    /// Synthetic propensity score in [0, 1], null for excluded rows
    pub propensity_score: Option<f64>,
    /// Binary label derived from the score, null for excluded rows
    pub label: Option<i32>,
}

impl LabeledHousehold {
    /// Arrow fields describing the label table
    pub fn fields() -> Result<Vec<FieldRef>> {
        Ok(Vec::<FieldRef>::from_type::<Self>(
            TracingOptions::default().allow_null_fields(true),
        )?)
    }

    /// Convert a slice of label rows to a `RecordBatch`
    pub fn to_record_batch(rows: &[Self]) -> Result<RecordBatch> {
        let fields = Self::fields()?;
        Ok(serde_arrow::to_record_batch(&fields, &rows)?)
    }

    /// Convert a `RecordBatch` back to typed label rows
    pub fn from_record_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        Ok(serde_arrow::from_record_batch(batch)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excluded_rows_round_trip_as_null() {
        let rows = vec![
            LabeledHousehold {
                household_id: "H001".to_string(),
                person_id: "P01".to_string(),
                propensity_score: Some(0.83),
                label: Some(1),
            },
            LabeledHousehold {
                household_id: "H002".to_string(),
                person_id: "P01".to_string(),
                propensity_score: None,
                label: None,
            },
        ];

        let batch = LabeledHousehold::to_record_batch(&rows).unwrap();
        let restored = LabeledHousehold::from_record_batch(&batch).unwrap();
        assert_eq!(restored, rows);
        assert!(restored[1].label.is_none());
    }
}
