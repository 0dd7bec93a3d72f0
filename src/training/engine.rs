//! Per-variant training
//!
//! The four model kinds form a closed set: three price regressors of
//! increasing complexity plus a deal-status classifier. Each variant declares
//! its own predictors, target, and whether inputs are standardized, so the
//! prediction side can stay variant-agnostic.

use ndarray::{Array1, Array2};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::linear_models::LinearRegression;
use super::metrics::{
    self, accuracy, classification_report, confusion_matrix, ClassMetrics,
};
use super::random_forest::RandomForest;
use super::split::{stratified_split, train_test_split};
use crate::error::{RealtyError, Result};
use crate::features::{
    complete_cases, to_feature_matrix, to_label_vector, to_target_vector, PRICE_TARGET,
    REGRESSION_FEATURES, STATUS_TARGET,
};
use crate::preprocessing::StandardScaler;

/// The four trained model kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelVariant {
    SimpleRegression,
    MultipleRegression,
    RandomForestRegression,
    StatusClassifier,
}

impl ModelVariant {
    pub const ALL: [ModelVariant; 4] = [
        ModelVariant::SimpleRegression,
        ModelVariant::MultipleRegression,
        ModelVariant::RandomForestRegression,
        ModelVariant::StatusClassifier,
    ];

    /// The three price regressors, in ladder order.
    pub const REGRESSIONS: [ModelVariant; 3] = [
        ModelVariant::SimpleRegression,
        ModelVariant::MultipleRegression,
        ModelVariant::RandomForestRegression,
    ];

    /// Stable string identifier.
    pub fn name(&self) -> &'static str {
        match self {
            ModelVariant::SimpleRegression => "simple_regression",
            ModelVariant::MultipleRegression => "multiple_regression",
            ModelVariant::RandomForestRegression => "random_forest_regression",
            ModelVariant::StatusClassifier => "status_classifier",
        }
    }

    /// Parse a string identifier. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<ModelVariant> {
        Self::ALL.iter().copied().find(|v| v.name() == name)
    }

    /// Human-readable name for comparison tables.
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelVariant::SimpleRegression => "Simple Regression",
            ModelVariant::MultipleRegression => "Multiple Regression",
            ModelVariant::RandomForestRegression => "Random Forest Regression",
            ModelVariant::StatusClassifier => "Status Classifier",
        }
    }

    /// Predictors used by this variant, in training column order.
    pub fn features(&self) -> &'static [&'static str] {
        match self {
            // area_sqft only
            ModelVariant::SimpleRegression => &REGRESSION_FEATURES[..1],
            _ => &REGRESSION_FEATURES[..],
        }
    }

    /// Target column.
    pub fn target(&self) -> &'static str {
        match self {
            ModelVariant::StatusClassifier => STATUS_TARGET,
            _ => PRICE_TARGET,
        }
    }

    /// Whether inputs are standardized at train and inference time.
    /// Tree ensembles are scale-invariant and skip it.
    pub fn requires_scaling(&self) -> bool {
        matches!(
            self,
            ModelVariant::SimpleRegression | ModelVariant::MultipleRegression
        )
    }

    pub fn is_classifier(&self) -> bool {
        matches!(self, ModelVariant::StatusClassifier)
    }
}

/// Shared training configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Held-out fraction
    pub test_size: f64,
    /// Seed for splits and ensemble bootstrapping
    pub seed: u64,
    /// Trees per forest
    pub n_trees: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            seed: 42,
            n_trees: 100,
        }
    }
}

/// A fitted estimator, tagged by kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FittedEstimator {
    Linear(LinearRegression),
    Forest(RandomForest),
}

/// A trained variant: estimator plus everything inference needs to reproduce
/// the training-time preprocessing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedVariant {
    pub variant: ModelVariant,
    estimator: FittedEstimator,
    /// Feature names in training column order
    pub feature_names: Vec<String>,
    /// Present iff the variant standardizes inputs
    scaler: Option<StandardScaler>,
    /// Learned class labels in sorted order (classifier only)
    pub classes: Vec<String>,
}

impl TrainedVariant {
    /// Predict raw values, replaying the training-time scaling first.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let x_input = match &self.scaler {
            Some(scaler) => scaler.transform(x)?,
            None => x.clone(),
        };
        match &self.estimator {
            FittedEstimator::Linear(model) => model.predict(&x_input),
            FittedEstimator::Forest(model) => model.predict(&x_input),
        }
    }

    /// Predict class probabilities (classifier only). Columns follow
    /// `self.classes` order.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        match &self.estimator {
            FittedEstimator::Forest(model) => model.predict_proba(x),
            FittedEstimator::Linear(_) => Err(RealtyError::TrainingError(
                "probabilities are only available for the classifier".to_string(),
            )),
        }
    }
}

/// A feature with its ranking weight (|coefficient| or impurity importance).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureWeight {
    pub feature: String,
    pub weight: f64,
}

/// Regression evaluation snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionReport {
    pub r2: f64,
    pub rmse: f64,
    pub mape: f64,
    /// Held-out actual/predicted pairs
    pub actual: Vec<f64>,
    pub predicted: Vec<f64>,
    /// Ranked descending by weight; empty for the single-feature variant
    pub feature_ranking: Vec<FeatureWeight>,
    pub n_train: usize,
    pub n_test: usize,
}

/// Classification evaluation snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationOutcome {
    pub accuracy: f64,
    pub per_class: Vec<ClassMetrics>,
    /// Rows actual, columns predicted, both in `classes` order
    pub confusion: Vec<Vec<usize>>,
    pub classes: Vec<String>,
    pub actual: Vec<String>,
    pub predicted: Vec<String>,
    /// Per-row class probabilities, columns in `classes` order
    pub probabilities: Vec<Vec<f64>>,
    pub feature_ranking: Vec<FeatureWeight>,
    pub n_train: usize,
    pub n_test: usize,
}

/// Uniform per-variant training result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainingReport {
    Regression(RegressionReport),
    Classification(ClassificationOutcome),
}

impl TrainingReport {
    pub fn as_regression(&self) -> Option<&RegressionReport> {
        match self {
            TrainingReport::Regression(r) => Some(r),
            TrainingReport::Classification(_) => None,
        }
    }

    pub fn as_classification(&self) -> Option<&ClassificationOutcome> {
        match self {
            TrainingReport::Classification(c) => Some(c),
            TrainingReport::Regression(_) => None,
        }
    }
}

/// Train one variant against the analytical frame.
///
/// Null-filtering is per variant: each call re-filters the full frame using
/// only the columns this variant requires, so different variants may train
/// on different row counts.
pub fn train_variant(
    variant: ModelVariant,
    frame: &DataFrame,
    config: &TrainingConfig,
) -> Result<(TrainedVariant, TrainingReport)> {
    let features = variant.features();
    let mut required: Vec<&str> = features.to_vec();
    required.push(variant.target());

    let filtered = complete_cases(frame, &required)?;
    if filtered.height() == 0 {
        return Err(RealtyError::InsufficientData(format!(
            "no usable rows for {} after null filtering",
            variant.name()
        )));
    }

    let x = to_feature_matrix(&filtered, features)?;

    if variant.is_classifier() {
        train_classifier(variant, &filtered, x, config)
    } else {
        train_regressor(variant, &filtered, x, config)
    }
}

fn train_regressor(
    variant: ModelVariant,
    filtered: &DataFrame,
    x: Array2<f64>,
    config: &TrainingConfig,
) -> Result<(TrainedVariant, TrainingReport)> {
    let y = to_target_vector(filtered, variant.target())?;
    let split = train_test_split(&x, &y, config.test_size, config.seed)?;
    let feature_names: Vec<String> = variant.features().iter().map(|f| f.to_string()).collect();

    let (estimator, scaler, predicted, feature_ranking) = match variant {
        ModelVariant::SimpleRegression | ModelVariant::MultipleRegression => {
            let mut scaler = StandardScaler::new();
            let x_train = scaler.fit_transform(&split.x_train)?;
            let x_test = scaler.transform(&split.x_test)?;

            let mut model = LinearRegression::new();
            model.fit(&x_train, &split.y_train)?;
            let predicted = model.predict(&x_test)?;

            // Coefficient magnitudes rank features for the multi-feature fit
            let ranking = if variant == ModelVariant::MultipleRegression {
                let coefficients = model
                    .coefficients
                    .as_ref()
                    .ok_or(RealtyError::ModelNotFitted)?;
                rank_features(&feature_names, coefficients.iter().copied())
            } else {
                Vec::new()
            };

            (
                FittedEstimator::Linear(model),
                Some(scaler),
                predicted,
                ranking,
            )
        }
        ModelVariant::RandomForestRegression => {
            let mut model = RandomForest::new_regressor(config.n_trees)
                .with_max_depth(15)
                .with_min_samples_split(5)
                .with_seed(config.seed);
            model.fit(&split.x_train, &split.y_train)?;
            let predicted = model.predict(&split.x_test)?;

            let ranking = match model.feature_importances() {
                Some(imp) => rank_features(&feature_names, imp.iter().copied()),
                None => Vec::new(),
            };

            (FittedEstimator::Forest(model), None, predicted, ranking)
        }
        ModelVariant::StatusClassifier => unreachable!("classifier handled separately"),
    };

    let report = RegressionReport {
        r2: metrics::r2_score(&split.y_test, &predicted),
        rmse: metrics::rmse(&split.y_test, &predicted),
        mape: metrics::mape(&split.y_test, &predicted),
        actual: split.y_test.to_vec(),
        predicted: predicted.to_vec(),
        feature_ranking,
        n_train: split.y_train.len(),
        n_test: split.y_test.len(),
    };

    info!(
        variant = variant.name(),
        n_train = report.n_train,
        n_test = report.n_test,
        r2 = report.r2,
        rmse = report.rmse,
        "regression variant trained"
    );

    let trained = TrainedVariant {
        variant,
        estimator,
        feature_names,
        scaler,
        classes: Vec::new(),
    };

    Ok((trained, TrainingReport::Regression(report)))
}

fn train_classifier(
    variant: ModelVariant,
    filtered: &DataFrame,
    x: Array2<f64>,
    config: &TrainingConfig,
) -> Result<(TrainedVariant, TrainingReport)> {
    let labels = to_label_vector(filtered, variant.target())?;

    // Learned class order: sorted unique labels; encoded index is the
    // position, so the forest's numeric classes align with this order.
    let mut classes: Vec<String> = labels.clone();
    classes.sort();
    classes.dedup();

    let encode = |label: &String| -> Result<f64> {
        classes
            .iter()
            .position(|c| c == label)
            .map(|i| i as f64)
            .ok_or_else(|| RealtyError::DataError(format!("unknown label {label}")))
    };
    let y: Array1<f64> = Array1::from_vec(
        labels
            .iter()
            .map(encode)
            .collect::<Result<Vec<f64>>>()?,
    );

    let split = stratified_split(&x, &y, config.test_size, config.seed)?;

    let mut model = RandomForest::new_classifier(config.n_trees)
        .with_max_depth(10)
        .with_min_samples_split(5)
        .with_seed(config.seed);
    model.fit(&split.x_train, &split.y_train)?;

    let predicted_encoded = model.predict(&split.x_test)?;
    let proba = model.predict_proba(&split.x_test)?;

    let decode = |value: f64| -> Result<String> {
        classes
            .get(value.round() as usize)
            .cloned()
            .ok_or_else(|| {
                RealtyError::ComputationError(format!("predicted class index {value} out of range"))
            })
    };
    let predicted: Vec<String> = predicted_encoded
        .iter()
        .map(|&v| decode(v))
        .collect::<Result<Vec<_>>>()?;
    let actual: Vec<String> = split
        .y_test
        .iter()
        .map(|&v| decode(v))
        .collect::<Result<Vec<_>>>()?;

    let feature_names: Vec<String> = variant.features().iter().map(|f| f.to_string()).collect();
    let feature_ranking = match model.feature_importances() {
        Some(imp) => rank_features(&feature_names, imp.iter().copied()),
        None => Vec::new(),
    };

    let probabilities: Vec<Vec<f64>> = (0..proba.nrows())
        .map(|i| proba.row(i).to_vec())
        .collect();

    let outcome = ClassificationOutcome {
        accuracy: accuracy(&actual, &predicted),
        per_class: classification_report(&actual, &predicted, &classes),
        confusion: confusion_matrix(&actual, &predicted, &classes),
        classes: classes.clone(),
        actual,
        predicted,
        probabilities,
        feature_ranking,
        n_train: split.y_train.len(),
        n_test: split.y_test.len(),
    };

    info!(
        variant = variant.name(),
        n_train = outcome.n_train,
        n_test = outcome.n_test,
        accuracy = outcome.accuracy,
        n_classes = outcome.classes.len(),
        "classifier variant trained"
    );

    let trained = TrainedVariant {
        variant,
        estimator: FittedEstimator::Forest(model),
        feature_names,
        scaler: None,
        classes,
    };

    Ok((trained, TrainingReport::Classification(outcome)))
}

/// Rank features by absolute weight, descending.
fn rank_features(names: &[String], weights: impl Iterator<Item = f64>) -> Vec<FeatureWeight> {
    let mut ranking: Vec<FeatureWeight> = names
        .iter()
        .zip(weights)
        .map(|(name, weight)| FeatureWeight {
            feature: name.clone(),
            weight,
        })
        .collect();
    ranking.sort_by(|a, b| {
        b.weight
            .abs()
            .partial_cmp(&a.weight.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranking
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_names_round_trip() {
        for variant in ModelVariant::ALL {
            assert_eq!(ModelVariant::parse(variant.name()), Some(variant));
        }
        assert_eq!(ModelVariant::parse("simple_regresion"), None);
    }

    #[test]
    fn test_variant_capabilities() {
        assert!(ModelVariant::SimpleRegression.requires_scaling());
        assert!(ModelVariant::MultipleRegression.requires_scaling());
        assert!(!ModelVariant::RandomForestRegression.requires_scaling());
        assert!(!ModelVariant::StatusClassifier.requires_scaling());

        assert_eq!(ModelVariant::SimpleRegression.features(), ["area_sqft"]);
        assert_eq!(ModelVariant::MultipleRegression.features().len(), 11);
        assert_eq!(ModelVariant::StatusClassifier.target(), "status");
    }

    #[test]
    fn test_rank_features_by_absolute_weight() {
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let ranking = rank_features(&names, [1.0, -5.0, 2.0].into_iter());
        assert_eq!(ranking[0].feature, "b");
        assert_eq!(ranking[1].feature, "c");
        assert_eq!(ranking[2].feature, "a");
    }
}
