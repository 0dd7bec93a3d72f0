//! Preprocessing applied between the analytical frame and the estimators.

pub mod scaler;

pub use scaler::StandardScaler;
