//! Model registry and prediction serving
//!
//! The registry owns every trained variant and its evaluation report for the
//! lifetime of one analysis session. It is written once per variant at
//! training time and read many times afterward; predictions are pure reads.
//! Callers exposing it to concurrent writers must serialize retraining
//! themselves.

use std::collections::HashMap;

use ndarray::Array2;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{RealtyError, Result};
use crate::training::{
    train_variant, ModelVariant, TrainedVariant, TrainingConfig, TrainingReport,
};

/// Outcome of a status prediction: the winning label plus the probability of
/// every class the model was trained on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusPrediction {
    pub predicted_status: String,
    pub probabilities: HashMap<String, f64>,
}

/// One row of the regression comparison table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub model: String,
    pub r2: f64,
    pub rmse: f64,
    pub mape: f64,
    /// R² expressed as a percentage
    pub accuracy_pct: f64,
}

/// Per-variant results of a `train_all` pass. Failures are carried
/// explicitly rather than swallowed; one variant failing does not stop the
/// others.
#[derive(Debug)]
pub struct TrainingSummary {
    pub trained: Vec<ModelVariant>,
    pub failures: Vec<(ModelVariant, RealtyError)>,
}

#[derive(Debug)]
struct RegistryEntry {
    model: TrainedVariant,
    report: TrainingReport,
}

/// In-memory store of trained models and their results.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    config: TrainingConfig,
    entries: HashMap<ModelVariant, RegistryEntry>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::with_config(TrainingConfig::default())
    }

    pub fn with_config(config: TrainingConfig) -> Self {
        Self {
            config,
            entries: HashMap::new(),
        }
    }

    /// Train (or retrain) one variant and store the result.
    pub fn train(&mut self, variant: ModelVariant, frame: &DataFrame) -> Result<&TrainingReport> {
        let (model, report) = train_variant(variant, frame, &self.config)?;
        // Retraining replaces the previous entry wholesale
        self.entries.insert(variant, RegistryEntry { model, report });
        Ok(&self.entries[&variant].report)
    }

    /// Train all four variants. A variant failing (e.g. from
    /// data-insufficiency) is recorded in the summary and does not affect
    /// the others.
    pub fn train_all(&mut self, frame: &DataFrame) -> TrainingSummary {
        let mut summary = TrainingSummary {
            trained: Vec::new(),
            failures: Vec::new(),
        };

        for variant in ModelVariant::ALL {
            // Retraining replaces the previous entry wholesale
            self.entries.remove(&variant);
            match train_variant(variant, frame, &self.config) {
                Ok((model, report)) => {
                    self.entries.insert(variant, RegistryEntry { model, report });
                    summary.trained.push(variant);
                }
                Err(err) => {
                    warn!(variant = variant.name(), error = %err, "variant training failed");
                    summary.failures.push((variant, err));
                }
            }
        }

        info!(
            trained = summary.trained.len(),
            failed = summary.failures.len(),
            "training pass complete"
        );
        summary
    }

    /// Drop every trained model and result.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_trained(&self, variant: ModelVariant) -> bool {
        self.entries.contains_key(&variant)
    }

    pub fn trained_variants(&self) -> Vec<ModelVariant> {
        ModelVariant::ALL
            .into_iter()
            .filter(|v| self.entries.contains_key(v))
            .collect()
    }

    /// Evaluation report for a trained variant.
    pub fn report(&self, variant: ModelVariant) -> Option<&TrainingReport> {
        self.entries.get(&variant).map(|e| &e.report)
    }

    fn entry(&self, variant: ModelVariant) -> Result<&RegistryEntry> {
        self.entries
            .get(&variant)
            .ok_or_else(|| RealtyError::ModelNotFound(variant.name().to_string()))
    }

    /// Predict a deal price with the given regression variant.
    ///
    /// The feature mapping is projected down to the variant's training-time
    /// feature list, in training column order; the fitted scaler is replayed
    /// when the variant carries one.
    pub fn predict_price(
        &self,
        variant: ModelVariant,
        features: &HashMap<String, f64>,
    ) -> Result<f64> {
        if variant.is_classifier() {
            return Err(RealtyError::ModelNotFound(format!(
                "{} does not predict prices",
                variant.name()
            )));
        }

        let entry = self.entry(variant)?;
        let x = project_features(&entry.model.feature_names, features)?;
        let predictions = entry.model.predict(&x)?;
        Ok(predictions[0])
    }

    /// String-keyed form of [`predict_price`](Self::predict_price) for
    /// callers holding a variant name. Misspelled names are a not-found
    /// error, never a default prediction.
    pub fn predict_price_by_name(
        &self,
        variant_name: &str,
        features: &HashMap<String, f64>,
    ) -> Result<f64> {
        let variant = ModelVariant::parse(variant_name)
            .ok_or_else(|| RealtyError::ModelNotFound(variant_name.to_string()))?;
        self.predict_price(variant, features)
    }

    /// Predict a deal status with class probabilities.
    pub fn predict_status(&self, features: &HashMap<String, f64>) -> Result<StatusPrediction> {
        let entry = self.entry(ModelVariant::StatusClassifier)?;
        let x = project_features(&entry.model.feature_names, features)?;

        let predicted_encoded = entry.model.predict(&x)?;
        let proba = entry.model.predict_proba(&x)?;

        let classes = &entry.model.classes;
        let predicted_status = classes
            .get(predicted_encoded[0].round() as usize)
            .cloned()
            .ok_or_else(|| {
                RealtyError::ComputationError("predicted class index out of range".to_string())
            })?;

        let probabilities: HashMap<String, f64> = classes
            .iter()
            .cloned()
            .zip(proba.row(0).iter().copied())
            .collect();

        Ok(StatusPrediction {
            predicted_status,
            probabilities,
        })
    }

    /// Comparison table over the trained regression variants, in ladder
    /// order: one row each with R², RMSE, MAPE, and R² as a percentage.
    pub fn model_comparison(&self) -> Vec<ComparisonRow> {
        ModelVariant::REGRESSIONS
            .into_iter()
            .filter_map(|variant| {
                let report = self.report(variant)?.as_regression()?;
                Some(ComparisonRow {
                    model: variant.display_name().to_string(),
                    r2: report.r2,
                    rmse: report.rmse,
                    mape: report.mape,
                    accuracy_pct: report.r2 * 100.0,
                })
            })
            .collect()
    }
}

/// Project a flat feature mapping into a single-row matrix in the given
/// column order. Every required name must be present.
fn project_features(
    feature_names: &[String],
    features: &HashMap<String, f64>,
) -> Result<Array2<f64>> {
    let row: Vec<f64> = feature_names
        .iter()
        .map(|name| {
            features
                .get(name)
                .copied()
                .ok_or_else(|| RealtyError::FeatureNotFound(name.clone()))
        })
        .collect::<Result<Vec<f64>>>()?;

    Ok(Array2::from_shape_vec((1, row.len()), row)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_features_order_and_missing() {
        let names = vec!["a".to_string(), "b".to_string()];
        let mut map = HashMap::new();
        map.insert("b".to_string(), 2.0);
        map.insert("a".to_string(), 1.0);
        map.insert("extra".to_string(), 99.0);

        let x = project_features(&names, &map).unwrap();
        assert_eq!(x.shape(), &[1, 2]);
        assert_eq!(x[[0, 0]], 1.0);
        assert_eq!(x[[0, 1]], 2.0);

        map.remove("a");
        let err = project_features(&names, &map).unwrap_err();
        assert!(matches!(err, RealtyError::FeatureNotFound(_)));
    }

    #[test]
    fn test_untrained_variant_is_not_found() {
        let registry = ModelRegistry::new();
        let err = registry
            .predict_price(ModelVariant::SimpleRegression, &HashMap::new())
            .unwrap_err();
        assert!(matches!(err, RealtyError::ModelNotFound(_)));
    }

    #[test]
    fn test_misspelled_variant_is_not_found() {
        let registry = ModelRegistry::new();
        let err = registry
            .predict_price_by_name("simple_regresion", &HashMap::new())
            .unwrap_err();
        assert!(matches!(err, RealtyError::ModelNotFound(_)));
    }

    #[test]
    fn test_classifier_rejected_for_price() {
        let registry = ModelRegistry::new();
        let err = registry
            .predict_price(ModelVariant::StatusClassifier, &HashMap::new())
            .unwrap_err();
        assert!(matches!(err, RealtyError::ModelNotFound(_)));
    }

    #[test]
    fn test_comparison_empty_before_training() {
        let registry = ModelRegistry::new();
        assert!(registry.model_comparison().is_empty());
    }
}
