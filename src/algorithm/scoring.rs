//! Synthetic propensity scoring
//!
//! No observed EV financing outcome exists in the survey, so the target is
//! manufactured: an explainable weighted combination of household features
//! plus a bounded, seeded perturbation. The rule is a documented placeholder
//! policy, not an empirically validated model.
//!
//! Determinism: the noise term for a row is drawn from an rng seeded by the
//! configured seed combined with a stable hash of the row identifiers, so
//! identical inputs produce identical labels regardless of row order.

use std::hash::Hasher;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHasher;

use crate::config::ScoringConfig;
use crate::error::{Error, Result};
use crate::models::FeatureVector;

/// Deterministic scorer over one feature batch
#[derive(Debug)]
pub struct PropensityScorer<'a> {
    config: &'a ScoringConfig,
    log_income_min: f64,
    log_income_max: f64,
}

impl<'a> PropensityScorer<'a> {
    /// Prepare a scorer for a feature batch.
    ///
    /// Log income is min-max normalized over the whole batch before
    /// weighting.
    pub fn new(config: &'a ScoringConfig, rows: &[FeatureVector]) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::Simulation(
                "feature table is empty, nothing to score".to_string(),
            ));
        }

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for row in rows {
            if !row.log_income.is_finite() {
                return Err(Error::Simulation(format!(
                    "nonfinite log income for household {} person {}",
                    row.household_id, row.person_id
                )));
            }
            min = min.min(row.log_income);
            max = max.max(row.log_income);
        }

        Ok(Self {
            config,
            log_income_min: min,
            log_income_max: max,
        })
    }

    /// Score a single row. Returns `None` for rows whose scoring inputs are
    /// incomplete; those households get no label rather than a silent zero.
    #[must_use]
    pub fn score(&self, row: &FeatureVector) -> Option<(f64, i32)> {
        if !row.is_complete {
            return None;
        }

        let is_urban = row.is_urban?;
        let owns_vehicle = row.owns_vehicle?;
        let owns_dwelling = row.owns_dwelling?;
        let education = row.education_ordinal?;
        let transport_ratio = row.transport_expense_ratio?;

        let config = self.config;
        let raw = config.bias
            + config.w_income * self.normalized_income(row.log_income)
            + config.w_urban * f64::from(is_urban)
            + config.w_vehicle * f64::from(owns_vehicle)
            + config.w_dwelling * f64::from(owns_dwelling)
            + config.w_education * (f64::from(education) / 3.0)
            + config.w_transport * transport_ratio;

        let noise = self.noise_for(&row.household_id, &row.person_id);
        let score = sigmoid(raw + noise);
        let label = i32::from(score >= config.threshold);

        Some((score, label))
    }

    /// Min-max normalized log income over the batch; a degenerate batch
    /// where every income is equal maps to the midpoint
    fn normalized_income(&self, log_income: f64) -> f64 {
        let span = self.log_income_max - self.log_income_min;
        if span > 0.0 {
            (log_income - self.log_income_min) / span
        } else {
            0.5
        }
    }

    /// Bounded uniform perturbation, stable per row identifier
    fn noise_for(&self, household_id: &str, person_id: &str) -> f64 {
        let amplitude = self.config.noise_amplitude;
        if amplitude <= 0.0 {
            return 0.0;
        }

        let mut hasher = FxHasher::default();
        hasher.write(household_id.as_bytes());
        hasher.write(b"/");
        hasher.write(person_id.as_bytes());
        let mut rng = StdRng::seed_from_u64(self.config.seed ^ hasher.finish());

        rng.random_range(-amplitude..=amplitude)
    }
}

/// Numerically stable logistic function
#[must_use]
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let exp_z = z.exp();
        exp_z / (1.0 + exp_z)
    }
}
