//! Error types for the realty analytics pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, RealtyError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum RealtyError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<polars::error::PolarsError> for RealtyError {
    fn from(err: polars::error::PolarsError) -> Self {
        RealtyError::DataError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for RealtyError {
    fn from(err: ndarray::ShapeError) -> Self {
        RealtyError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RealtyError::TableNotFound("Deals".to_string());
        assert_eq!(err.to_string(), "Table not found: Deals");

        let err = RealtyError::ModelNotFound("simple_regresion".to_string());
        assert_eq!(err.to_string(), "Model not found: simple_regresion");
    }

    #[test]
    fn test_shape_error_display() {
        let err = RealtyError::ShapeError {
            expected: "11 columns".to_string(),
            actual: "10 columns".to_string(),
        };
        assert!(err.to_string().contains("expected 11 columns"));
    }
}
