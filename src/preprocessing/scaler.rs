//! Feature scaling
//!
//! Standard (z-score) scaling fitted on the training partition only and
//! replayed on test and inference inputs. The scaler is stored with the
//! trained model, so it serializes alongside it.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{RealtyError, Result};

/// Standard scaler: (x - mean) / std per column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Array1<f64>,
    stds: Array1<f64>,
    is_fitted: bool,
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardScaler {
    pub fn new() -> Self {
        Self {
            means: Array1::zeros(0),
            stds: Array1::zeros(0),
            is_fitted: false,
        }
    }

    /// Fit per-column mean and standard deviation.
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(RealtyError::InsufficientData(
                "cannot fit scaler on empty matrix".to_string(),
            ));
        }

        self.means = x.mean_axis(Axis(0)).ok_or_else(|| {
            RealtyError::ComputationError("failed to compute column means".to_string())
        })?;

        // Population std; constant columns scale by 1.0
        let n = x.nrows() as f64;
        let stds: Vec<f64> = (0..x.ncols())
            .map(|j| {
                let mean = self.means[j];
                let var = x.column(j).iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                let std = var.sqrt();
                if std > 0.0 {
                    std
                } else {
                    1.0
                }
            })
            .collect();
        self.stds = Array1::from_vec(stds);
        self.is_fitted = true;

        Ok(self)
    }

    /// Transform a matrix through the fitted parameters.
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(RealtyError::ModelNotFitted);
        }
        if x.ncols() != self.means.len() {
            return Err(RealtyError::ShapeError {
                expected: format!("{} columns", self.means.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut out = x.clone();
        for (j, mut column) in out.columns_mut().into_iter().enumerate() {
            let mean = self.means[j];
            let std = self.stds[j];
            column.mapv_inplace(|v| (v - mean) / std);
        }
        Ok(out)
    }

    /// Fit and transform in one step.
    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_transform_zero_mean() {
        let x = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0]];
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&x).unwrap();

        for j in 0..2 {
            let col = scaled.column(j);
            let mean: f64 = col.iter().sum::<f64>() / col.len() as f64;
            assert!(mean.abs() < 1e-12, "mean {} should be ~0", mean);
        }
        assert!((scaled[[2, 0]] - scaled[[0, 0]]).abs() > 1.0);
    }

    #[test]
    fn test_transform_uses_training_parameters() {
        let train = array![[0.0], [10.0]];
        let test = array![[5.0]];

        let mut scaler = StandardScaler::new();
        scaler.fit(&train).unwrap();

        let scaled = scaler.transform(&test).unwrap();
        // mean 5, std 5 -> (5 - 5) / 5 = 0
        assert!((scaled[[0, 0]]).abs() < 1e-12);
    }

    #[test]
    fn test_constant_column_does_not_divide_by_zero() {
        let x = array![[3.0], [3.0], [3.0]];
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&x).unwrap();
        assert!(scaled.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_transform_before_fit() {
        let scaler = StandardScaler::new();
        let err = scaler.transform(&array![[1.0]]).unwrap_err();
        assert!(matches!(err, RealtyError::ModelNotFitted));
    }

    #[test]
    fn test_column_count_mismatch() {
        let mut scaler = StandardScaler::new();
        scaler.fit(&array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
        let err = scaler.transform(&array![[1.0]]).unwrap_err();
        assert!(matches!(err, RealtyError::ShapeError { .. }));
    }
}
