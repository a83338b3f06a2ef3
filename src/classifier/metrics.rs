//! Evaluation metrics for the propensity classifier
//!
//! Binary classification metrics: accuracy, precision, recall, F1,
//! confusion counts and ROC AUC computed from ranked scores.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Confusion matrix counts for the positive class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    /// Predicted positive, actually positive
    pub true_positives: usize,
    /// Predicted positive, actually negative
    pub false_positives: usize,
    /// Predicted negative, actually positive
    pub false_negatives: usize,
    /// Predicted negative, actually negative
    pub true_negatives: usize,
}

/// Metrics calculator
pub struct Metrics;

impl Metrics {
    /// Calculate accuracy: (correct predictions) / (total predictions)
    #[must_use]
    pub fn accuracy(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
        if y_true.is_empty() {
            return 0.0;
        }

        let correct = y_true
            .iter()
            .zip(y_pred.iter())
            .filter(|(t, p)| (*t - *p).abs() < 1e-10)
            .count();

        correct as f64 / y_true.len() as f64
    }

    /// Confusion counts with 1.0 as the positive class
    #[must_use]
    pub fn confusion(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> ConfusionCounts {
        let mut counts = ConfusionCounts {
            true_positives: 0,
            false_positives: 0,
            false_negatives: 0,
            true_negatives: 0,
        };

        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            match (*t >= 0.5, *p >= 0.5) {
                (true, true) => counts.true_positives += 1,
                (false, true) => counts.false_positives += 1,
                (true, false) => counts.false_negatives += 1,
                (false, false) => counts.true_negatives += 1,
            }
        }

        counts
    }

    /// Precision: TP / (TP + FP)
    #[must_use]
    pub fn precision(counts: &ConfusionCounts) -> f64 {
        let denominator = counts.true_positives + counts.false_positives;
        if denominator == 0 {
            0.0
        } else {
            counts.true_positives as f64 / denominator as f64
        }
    }

    /// Recall: TP / (TP + FN)
    #[must_use]
    pub fn recall(counts: &ConfusionCounts) -> f64 {
        let denominator = counts.true_positives + counts.false_negatives;
        if denominator == 0 {
            0.0
        } else {
            counts.true_positives as f64 / denominator as f64
        }
    }

    /// F1: harmonic mean of precision and recall
    #[must_use]
    pub fn f1_score(counts: &ConfusionCounts) -> f64 {
        let precision = Self::precision(counts);
        let recall = Self::recall(counts);

        if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        }
    }

    /// ROC AUC from predicted scores, computed as the normalized
    /// Mann-Whitney U statistic with average ranks for tied scores.
    ///
    /// Returns `None` when the sample contains only one class.
    #[must_use]
    pub fn roc_auc(y_true: &Array1<f64>, scores: &Array1<f64>) -> Option<f64> {
        let n = y_true.len();
        let n_positive = y_true.iter().filter(|&&t| t >= 0.5).count();
        let n_negative = n - n_positive;
        if n_positive == 0 || n_negative == 0 {
            return None;
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

        // Assign average ranks across ties
        let mut ranks = vec![0.0; n];
        let mut i = 0;
        while i < n {
            let mut j = i;
            while j + 1 < n && scores[order[j + 1]] == scores[order[i]] {
                j += 1;
            }
            let average_rank = ((i + 1 + j + 1) as f64) / 2.0;
            for &index in &order[i..=j] {
                ranks[index] = average_rank;
            }
            i = j + 1;
        }

        let positive_rank_sum: f64 = y_true
            .iter()
            .zip(ranks.iter())
            .filter(|&(&t, _)| t >= 0.5)
            .map(|(_, &rank)| rank)
            .sum();

        let u = positive_rank_sum - (n_positive * (n_positive + 1)) as f64 / 2.0;
        Some(u / (n_positive * n_negative) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn accuracy_counts_matches() {
        let y_true = array![0.0, 1.0, 1.0, 0.0, 1.0];
        let y_pred = array![0.0, 1.0, 0.0, 0.0, 1.0];
        assert!((Metrics::accuracy(&y_true, &y_pred) - 0.8).abs() < 1e-10);
    }

    #[test]
    fn precision_recall_from_confusion() {
        let y_true = array![1.0, 1.0, 1.0, 0.0, 0.0];
        let y_pred = array![1.0, 1.0, 0.0, 1.0, 0.0];

        // TP=2, FP=1, FN=1, TN=1
        let counts = Metrics::confusion(&y_true, &y_pred);
        assert_eq!(counts.true_positives, 2);
        assert_eq!(counts.false_positives, 1);
        assert_eq!(counts.false_negatives, 1);
        assert_eq!(counts.true_negatives, 1);

        assert!((Metrics::precision(&counts) - 2.0 / 3.0).abs() < 1e-10);
        assert!((Metrics::recall(&counts) - 2.0 / 3.0).abs() < 1e-10);
        assert!((Metrics::f1_score(&counts) - 2.0 / 3.0).abs() < 1e-10);
    }

    #[test]
    fn auc_is_one_for_perfect_ranking() {
        let y_true = array![0.0, 0.0, 1.0, 1.0];
        let scores = array![0.1, 0.2, 0.8, 0.9];
        assert!((Metrics::roc_auc(&y_true, &scores).unwrap() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn auc_is_half_for_constant_scores() {
        let y_true = array![0.0, 1.0, 0.0, 1.0];
        let scores = array![0.5, 0.5, 0.5, 0.5];
        assert!((Metrics::roc_auc(&y_true, &scores).unwrap() - 0.5).abs() < 1e-10);
    }

    #[test]
    fn auc_matches_hand_computed_example() {
        let y_true = array![1.0, 0.0, 1.0, 0.0];
        // Every positive outranks every negative: 4 of 4 concordant pairs
        let scores = array![0.8, 0.6, 0.7, 0.3];
        assert!((Metrics::roc_auc(&y_true, &scores).unwrap() - 1.0).abs() < 1e-10);

        // The 0.9 negative outranks both positives: 2 of 4 concordant pairs
        let scores = array![0.8, 0.9, 0.7, 0.3];
        assert!((Metrics::roc_auc(&y_true, &scores).unwrap() - 0.5).abs() < 1e-10);
    }

    #[test]
    fn auc_requires_both_classes() {
        let y_true = array![1.0, 1.0];
        let scores = array![0.2, 0.9];
        assert!(Metrics::roc_auc(&y_true, &scores).is_none());
    }
}
