//! Realty Analytics - data preparation and predictive modeling for tabular
//! real-estate deal data
//!
//! The pipeline runs raw workbook tables through city-name cleaning and a
//! fixed-order left join into a single analytical frame, then trains four
//! model variants against it: three price regressors of increasing
//! complexity and a deal-status classifier. Trained models live in an
//! in-memory registry that serves price and status predictions from flat
//! feature mappings.
//!
//! # Modules
//!
//! - [`data`] - workbook loading, city cleaning, table joining
//! - [`features`] - the canonical predictor schema and frame-to-matrix
//!   extraction
//! - [`preprocessing`] - standardization fitted on the training partition
//! - [`training`] - estimators, split discipline, metrics, per-variant
//!   training
//! - [`registry`] - trained-model store and prediction serving
//! - [`session`] - the explicit per-session context tying it together

pub mod data;
pub mod error;
pub mod features;
pub mod preprocessing;
pub mod registry;
pub mod session;
pub mod training;

pub use error::{RealtyError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::data::{build_analytical_frame, clean_city_names, RawTables, Workbook};
    pub use crate::error::{RealtyError, Result};
    pub use crate::features::{PRICE_TARGET, REGRESSION_FEATURES, STATUS_TARGET};
    pub use crate::registry::{ComparisonRow, ModelRegistry, StatusPrediction};
    pub use crate::session::AnalysisSession;
    pub use crate::training::{
        ModelVariant, TrainingConfig, TrainingReport,
    };
}
