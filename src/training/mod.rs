//! Model training: estimators, split discipline, metrics, and the
//! per-variant training routines.

mod engine;
pub mod decision_tree;
pub mod linear_models;
pub mod metrics;
pub mod random_forest;
pub mod split;

pub use decision_tree::{DecisionTree, SplitCriterion, TreeNode};
pub use engine::{
    train_variant, ClassificationOutcome, FeatureWeight, FittedEstimator, ModelVariant,
    RegressionReport, TrainedVariant, TrainingConfig, TrainingReport,
};
pub use linear_models::LinearRegression;
pub use metrics::ClassMetrics;
pub use random_forest::{FeatureSubset, RandomForest};
pub use split::{stratified_split, train_test_split, Split};
