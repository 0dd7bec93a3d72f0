//! Feature schema
//!
//! The canonical ordered predictor list shared by training and inference.
//! Training never imputes: rows with a null in any required predictor or in
//! the target are dropped, per model, before the split.

use ndarray::{Array1, Array2};
use polars::prelude::*;

use crate::error::{RealtyError, Result};

/// The eleven canonical numeric predictors, in schema order.
pub const REGRESSION_FEATURES: [&str; 11] = [
    "area_sqft",
    "bedrooms",
    "bathrooms",
    "property_age_at_deal",
    "experience_years",
    "rating",
    "hoa_fee",
    "school_score",
    "walk_score",
    "offer_price",
    "loan_rate",
];

/// Regression target column.
pub const PRICE_TARGET: &str = "final_price";

/// Classification target column.
pub const STATUS_TARGET: &str = "status";

/// Filter the frame down to rows with no null in any of `columns`.
pub fn complete_cases(frame: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
    for name in columns {
        if frame.column(name).is_err() {
            return Err(RealtyError::FeatureNotFound((*name).to_string()));
        }
    }

    let subset: Vec<Expr> = columns.iter().map(|c| col(*c)).collect();
    let filtered = frame.clone().lazy().drop_nulls(Some(subset)).collect()?;
    Ok(filtered)
}

/// Extract the named columns as a row-major `Array2<f64>` in the given order.
///
/// Columns must exist and contain no nulls; callers filter with
/// [`complete_cases`] first.
pub fn to_feature_matrix(frame: &DataFrame, columns: &[&str]) -> Result<Array2<f64>> {
    let n_rows = frame.height();
    let n_cols = columns.len();

    let col_data: Vec<Vec<f64>> = columns
        .iter()
        .map(|name| column_as_f64(frame, name))
        .collect::<Result<Vec<_>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| {
        col_refs[c][r]
    }))
}

/// Extract a single numeric column as an `Array1<f64>`.
pub fn to_target_vector(frame: &DataFrame, column: &str) -> Result<Array1<f64>> {
    Ok(Array1::from_vec(column_as_f64(frame, column)?))
}

/// Extract a categorical column as owned string labels.
pub fn to_label_vector(frame: &DataFrame, column: &str) -> Result<Vec<String>> {
    let series = frame
        .column(column)
        .map_err(|_| RealtyError::FeatureNotFound(column.to_string()))?
        .as_materialized_series()
        .clone();

    let ca = series
        .str()
        .map_err(|_| RealtyError::DataError(format!("column {column} is not categorical")))?;

    ca.into_iter()
        .map(|opt| {
            opt.map(str::to_string).ok_or_else(|| {
                RealtyError::DataError(format!("null label in column {column}"))
            })
        })
        .collect()
}

fn column_as_f64(frame: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = frame
        .column(name)
        .map_err(|_| RealtyError::FeatureNotFound(name.to_string()))?
        .as_materialized_series()
        .cast(&DataType::Float64)?;

    series
        .f64()
        .map_err(|e| RealtyError::DataError(e.to_string()))?
        .into_iter()
        .map(|opt| {
            opt.ok_or_else(|| RealtyError::DataError(format!("null value in column {name}")))
        })
        .collect()
}
