//! Linear regression via ordinary least squares
//!
//! Solves the normal equations with a Cholesky decomposition, retrying with a
//! ridge-regularized Gram matrix when the plain decomposition fails (exactly
//! collinear predictors are valid input), then falling back to Gauss-Jordan
//! inversion. A system that defeats all three is a hard error.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{RealtyError, Result};

/// Solve the symmetric system Ax = b by Cholesky decomposition. A Gram
/// matrix that is not positive definite (rank-deficient from collinear
/// columns) gets one retry with a small ridge on the diagonal.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    cholesky_solve_inner(a, b).or_else(|| {
        let scale = a
            .diag()
            .iter()
            .fold(0.0f64, |acc, d| acc.max(d.abs()))
            .max(1.0);
        let mut a_reg = a.clone();
        for i in 0..a.nrows() {
            a_reg[[i, i]] += 1e-8 * scale;
        }
        cholesky_solve_inner(&a_reg, b)
    })
}

/// Plain Cholesky solve. Returns `None` when A is not positive definite.
fn cholesky_solve_inner(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    // A = L * L^T
    let mut l = Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // Forward substitution: L * y = b
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // Backward substitution: L^T * x = y
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Gauss-Jordan inversion fallback for small near-degenerate systems.
fn matrix_inverse(m: &Array2<f64>) -> Option<Array2<f64>> {
    let n = m.nrows();
    if n != m.ncols() {
        return None;
    }

    // Augmented matrix [M | I]
    let mut aug = Array2::zeros((n, 2 * n));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = m[[i, j]];
        }
        aug[[i, n + i]] = 1.0;
    }

    for pivot in 0..n {
        let mut max_row = pivot;
        for row in pivot + 1..n {
            if aug[[row, pivot]].abs() > aug[[max_row, pivot]].abs() {
                max_row = row;
            }
        }
        if max_row != pivot {
            for j in 0..2 * n {
                let tmp = aug[[pivot, j]];
                aug[[pivot, j]] = aug[[max_row, j]];
                aug[[max_row, j]] = tmp;
            }
        }

        if aug[[pivot, pivot]].abs() < 1e-10 {
            return None;
        }

        let pivot_val = aug[[pivot, pivot]];
        for j in 0..2 * n {
            aug[[pivot, j]] /= pivot_val;
        }
        for row in 0..n {
            if row != pivot {
                let factor = aug[[row, pivot]];
                for j in 0..2 * n {
                    aug[[row, j]] -= factor * aug[[pivot, j]];
                }
            }
        }
    }

    let mut inv = Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            inv[[i, j]] = aug[[i, n + j]];
        }
    }
    Some(inv)
}

/// Ordinary least squares linear regression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    /// Fitted coefficients
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept
    pub intercept: Option<f64>,
    is_fitted: bool,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearRegression {
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            is_fitted: false,
        }
    }

    /// Fit the model to training data.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();

        if n_samples != y.len() {
            return Err(RealtyError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(RealtyError::InsufficientData(
                "cannot fit linear regression on zero rows".to_string(),
            ));
        }

        // Center, solve for slopes, recover the intercept from the means
        let x_mean = x.mean_axis(Axis(0)).ok_or_else(|| {
            RealtyError::ComputationError("failed to compute feature means".to_string())
        })?;
        let y_mean = y.mean().unwrap_or(0.0);

        let x_centered = x - &x_mean.clone().insert_axis(Axis(0));
        let y_centered = y - y_mean;

        let xtx = x_centered.t().dot(&x_centered);
        let xty = x_centered.t().dot(&y_centered);

        let coefficients = match cholesky_solve(&xtx, &xty) {
            Some(coef) => coef,
            None => match matrix_inverse(&xtx) {
                Some(inv) => inv.dot(&xty),
                None => {
                    return Err(RealtyError::ComputationError(
                        "design matrix is singular, cannot solve least squares".to_string(),
                    ));
                }
            },
        };

        self.intercept = Some(y_mean - coefficients.dot(&x_mean));
        self.coefficients = Some(coefficients);
        self.is_fitted = true;

        Ok(self)
    }

    /// Make predictions.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or(RealtyError::ModelNotFitted)?;
        let intercept = self.intercept.ok_or(RealtyError::ModelNotFitted)?;

        if x.ncols() != coefficients.len() {
            return Err(RealtyError::ShapeError {
                expected: format!("{} features", coefficients.len()),
                actual: format!("{} features", x.ncols()),
            });
        }

        Ok(x.dot(coefficients) + intercept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_recovers_line() {
        // y = 3x + 2
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![5.0, 8.0, 11.0, 14.0, 17.0];

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let coef = model.coefficients.as_ref().unwrap();
        assert!((coef[0] - 3.0).abs() < 1e-8, "slope: {}", coef[0]);
        assert!((model.intercept.unwrap() - 2.0).abs() < 1e-8);
    }

    #[test]
    fn test_fit_multivariate() {
        // y = 2a - b + 1
        let x = array![
            [1.0, 1.0],
            [2.0, 1.0],
            [3.0, 2.0],
            [4.0, 5.0],
            [5.0, 3.0],
            [6.0, 2.0],
        ];
        let y = x
            .rows()
            .into_iter()
            .map(|r| 2.0 * r[0] - r[1] + 1.0)
            .collect::<Array1<f64>>();

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&x).unwrap();

        for (p, t) in pred.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-6);
        }
    }

    #[test]
    fn test_fit_collinear_features() {
        // second column is an exact affine function of the first, so the
        // Gram matrix is rank-deficient but the data is perfectly valid
        let x = array![
            [1.0, 3.0],
            [2.0, 5.0],
            [3.0, 7.0],
            [4.0, 9.0],
            [5.0, 11.0],
            [6.0, 13.0],
        ];
        let y = x
            .rows()
            .into_iter()
            .map(|r| 3.0 * r[0] + 2.0)
            .collect::<Array1<f64>>();

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&x).unwrap();

        for (p, t) in pred.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-3, "predicted {} for {}", p, t);
        }
    }

    #[test]
    fn test_predict_before_fit() {
        let model = LinearRegression::new();
        let err = model.predict(&array![[1.0]]).unwrap_err();
        assert!(matches!(err, RealtyError::ModelNotFitted));
    }

    #[test]
    fn test_shape_mismatch() {
        let mut model = LinearRegression::new();
        let err = model
            .fit(&array![[1.0], [2.0]], &array![1.0, 2.0, 3.0])
            .unwrap_err();
        assert!(matches!(err, RealtyError::ShapeError { .. }));
    }
}
