//! Logistic regression fitted by batch gradient descent
//!
//! Features are standardized column-wise before fitting; the scaler
//! parameters are part of the fitted model so reloaded artifacts reproduce
//! identical predictions. Coefficients are stored as plain vectors so the
//! model serializes with serde; `ndarray` is used for the training math.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::algorithm::scoring::sigmoid;
use crate::config::LogisticParams;
use crate::error::{Error, Result};

/// A fitted logistic regression model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    /// Fitted coefficients on standardized features, one per column
    pub weights: Vec<f64>,
    /// Intercept term
    pub intercept: f64,
    /// Column means captured at fit time
    pub feature_means: Vec<f64>,
    /// Column standard deviations captured at fit time
    pub feature_stds: Vec<f64>,
    /// Hyperparameters the model was fitted with
    pub params: LogisticParams,
}

impl LogisticModel {
    /// Fit on a dense feature matrix and 0/1 targets.
    ///
    /// Fails with a convergence error when the loss goes nonfinite
    /// (divergence, usually a too-large learning rate). Exhausting the
    /// iteration budget without meeting the tolerance is logged, not fatal.
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, params: &LogisticParams) -> Result<Self> {
        if x.nrows() == 0 {
            return Err(Error::Training(
                "cannot fit logistic regression on an empty matrix".to_string(),
            ));
        }
        if x.nrows() != y.len() {
            return Err(Error::Training(format!(
                "feature matrix has {} rows but target has {}",
                x.nrows(),
                y.len()
            )));
        }

        let means = x
            .mean_axis(Axis(0))
            .ok_or_else(|| Error::Training("empty feature matrix".to_string()))?;
        let stds = x.std_axis(Axis(0), 0.0);
        let x = standardize(x, &means, &stds);

        let n_samples = x.nrows() as f64;
        let n_features = x.ncols();

        let mut weights = Array1::<f64>::zeros(n_features);
        let mut bias = 0.0;
        let mut previous_cost = f64::INFINITY;
        let mut converged = false;

        for iteration in 0..params.max_iter {
            let linear = x.dot(&weights) + bias;
            let predictions = linear.mapv(sigmoid);

            let errors = &predictions - y;
            let mut gradient = x.t().dot(&errors) / n_samples;
            if params.l2 > 0.0 {
                gradient = &gradient + &(&weights * params.l2);
            }
            let bias_gradient = errors.sum() / n_samples;

            weights = &weights - &(&gradient * params.learning_rate);
            bias -= params.learning_rate * bias_gradient;

            let cost = log_loss(y, &predictions);
            if !cost.is_finite() {
                return Err(Error::Convergence {
                    iterations: iteration + 1,
                });
            }

            if (previous_cost - cost).abs() < params.tolerance {
                log::debug!("logistic regression converged at iteration {iteration}");
                converged = true;
                break;
            }
            previous_cost = cost;
        }

        if !converged {
            log::warn!(
                "logistic regression stopped after {} iterations without meeting tolerance {}",
                params.max_iter,
                params.tolerance
            );
        }

        Ok(Self {
            weights: weights.to_vec(),
            intercept: bias,
            feature_means: means.to_vec(),
            feature_stds: stds.to_vec(),
            params: params.clone(),
        })
    }

    /// Predict probabilities for a dense feature matrix
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if x.ncols() != self.weights.len() {
            return Err(Error::Training(format!(
                "matrix has {} columns, model expects {}",
                x.ncols(),
                self.weights.len()
            )));
        }

        let means = Array1::from_vec(self.feature_means.clone());
        let stds = Array1::from_vec(self.feature_stds.clone());
        let x = standardize(x, &means, &stds);

        let weights = Array1::from_vec(self.weights.clone());
        let linear = x.dot(&weights) + self.intercept;
        Ok(linear.mapv(sigmoid))
    }

    /// Absolute coefficient magnitudes, usable as feature importance
    #[must_use]
    pub fn importance(&self) -> Vec<f64> {
        self.weights.iter().map(|w| w.abs()).collect()
    }
}

/// Column-wise z-scoring; constant columns pass through unscaled
fn standardize(x: &Array2<f64>, means: &Array1<f64>, stds: &Array1<f64>) -> Array2<f64> {
    let mut out = x.clone();
    for (j, mut column) in out.axis_iter_mut(Axis(1)).enumerate() {
        let std = stds[j];
        let mean = means[j];
        if std > 1e-10 {
            column.mapv_inplace(|v| (v - mean) / std);
        }
    }
    out
}

/// Binary cross-entropy with clipped probabilities
fn log_loss(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let eps = 1e-15;
    let n = y_true.len() as f64;

    -y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(&y, &p)| {
            let p = p.clamp(eps, 1.0 - eps);
            y * p.ln() + (1.0 - y) * (1.0 - p).ln()
        })
        .sum::<f64>()
        / n
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec(
            (6, 2),
            vec![0.0, 0.0, 0.5, 0.5, 1.0, 1.0, 5.0, 5.0, 5.5, 5.5, 6.0, 6.0],
        )
        .unwrap();
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn fits_linearly_separable_data() {
        let (x, y) = separable_data();
        let model = LogisticModel::fit(&x, &y, &LogisticParams::default()).unwrap();
        let proba = model.predict_proba(&x).unwrap();

        for (p, &t) in proba.iter().zip(y.iter()) {
            assert_eq!(i32::from(*p >= 0.5), t as i32);
        }
    }

    #[test]
    fn scaling_survives_serde_round_trip() {
        let (x, y) = separable_data();
        let model = LogisticModel::fit(&x, &y, &LogisticParams::default()).unwrap();

        let json = serde_json::to_string(&model).unwrap();
        let loaded: LogisticModel = serde_json::from_str(&json).unwrap();

        assert_eq!(
            model.predict_proba(&x).unwrap(),
            loaded.predict_proba(&x).unwrap()
        );
    }

    #[test]
    fn l2_shrinks_coefficients() {
        let (x, y) = separable_data();
        let free = LogisticModel::fit(&x, &y, &LogisticParams::default()).unwrap();
        let ridge = LogisticModel::fit(
            &x,
            &y,
            &LogisticParams {
                l2: 1.0,
                ..LogisticParams::default()
            },
        )
        .unwrap();

        let norm = |m: &LogisticModel| m.weights.iter().map(|w| w * w).sum::<f64>().sqrt();
        assert!(norm(&ridge) < norm(&free));
    }

    #[test]
    fn constant_columns_do_not_break_fitting() {
        let x = Array2::from_shape_vec(
            (4, 2),
            vec![1.0, 0.0, 1.0, 1.0, 1.0, 4.0, 1.0, 5.0],
        )
        .unwrap();
        let y = array![0.0, 0.0, 1.0, 1.0];

        let model = LogisticModel::fit(&x, &y, &LogisticParams::default()).unwrap();
        let proba = model.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn empty_matrix_is_a_training_error() {
        let x = Array2::<f64>::zeros((0, 2));
        let y = Array1::<f64>::zeros(0);
        assert!(LogisticModel::fit(&x, &y, &LogisticParams::default()).is_err());
    }

    #[test]
    fn column_mismatch_is_rejected_at_prediction() {
        let (x, y) = separable_data();
        let model = LogisticModel::fit(&x, &y, &LogisticParams::default()).unwrap();
        let wrong = Array2::<f64>::zeros((2, 3));
        assert!(model.predict_proba(&wrong).is_err());
    }
}
