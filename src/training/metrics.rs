//! Evaluation metrics for the held-out partition

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Coefficient of determination. 1.0 is a perfect fit; can be arbitrarily
/// negative for models worse than predicting the mean.
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let n = y_true.len() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let y_mean = y_true.sum() / n;
    let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();

    if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else {
        0.0
    }
}

/// Root mean squared error.
pub fn rmse(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let n = y_true.len() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mse: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / n;
    mse.sqrt()
}

/// Mean absolute percentage error. Near-zero actuals are floored to keep the
/// ratio finite, matching the reference metric's epsilon behavior.
pub fn mape(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let n = y_true.len() as f64;
    if n == 0.0 {
        return 0.0;
    }
    y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| {
            let denom = t.abs().max(f64::EPSILON);
            (t - p).abs() / denom
        })
        .sum::<f64>()
        / n
}

/// Share of exact label matches.
pub fn accuracy(y_true: &[String], y_pred: &[String]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t == p)
        .count();
    correct as f64 / y_true.len() as f64
}

/// Per-class precision/recall/F1 with support.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Confusion matrix in the given class order: rows are actual classes,
/// columns are predicted classes.
pub fn confusion_matrix(y_true: &[String], y_pred: &[String], classes: &[String]) -> Vec<Vec<usize>> {
    let index = |label: &String| classes.iter().position(|c| c == label);

    let mut matrix = vec![vec![0usize; classes.len()]; classes.len()];
    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        if let (Some(ti), Some(pi)) = (index(t), index(p)) {
            matrix[ti][pi] += 1;
        }
    }
    matrix
}

/// Full per-class report derived from the confusion matrix.
pub fn classification_report(
    y_true: &[String],
    y_pred: &[String],
    classes: &[String],
) -> Vec<ClassMetrics> {
    let matrix = confusion_matrix(y_true, y_pred, classes);

    classes
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let tp = matrix[i][i];
            let actual: usize = matrix[i].iter().sum();
            let predicted: usize = matrix.iter().map(|row| row[i]).sum();

            let precision = if predicted > 0 {
                tp as f64 / predicted as f64
            } else {
                0.0
            };
            let recall = if actual > 0 {
                tp as f64 / actual as f64
            } else {
                0.0
            };
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };

            ClassMetrics {
                label: label.clone(),
                precision,
                recall,
                f1,
                support: actual,
            }
        })
        .collect()
}
