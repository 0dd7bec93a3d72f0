//! Random forest built on bootstrap-bagged CART trees

use ndarray::{Array1, Array2, Axis};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::decision_tree::DecisionTree;
use crate::error::{RealtyError, Result};

/// Per-split feature subsetting strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FeatureSubset {
    /// Square root of the feature count (classification default)
    Sqrt,
    /// All features (regression default)
    All,
}

impl FeatureSubset {
    fn resolve(self, n_features: usize) -> usize {
        match self {
            FeatureSubset::Sqrt => ((n_features as f64).sqrt().ceil() as usize).max(1),
            FeatureSubset::All => n_features,
        }
    }
}

/// Random forest model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub feature_subset: FeatureSubset,
    pub seed: u64,
    is_classification: bool,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
    /// Encoded class values, sorted (classification only)
    classes: Vec<f64>,
}

impl RandomForest {
    pub fn new_classifier(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            feature_subset: FeatureSubset::Sqrt,
            seed: 42,
            is_classification: true,
            n_features: 0,
            feature_importances: None,
            classes: Vec::new(),
        }
    }

    pub fn new_regressor(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            feature_subset: FeatureSubset::All,
            seed: 42,
            is_classification: false,
            n_features: 0,
            feature_importances: None,
            classes: Vec::new(),
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Fit the forest to training data.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(RealtyError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(RealtyError::InsufficientData(
                "cannot fit forest on zero rows".to_string(),
            ));
        }

        self.n_features = n_features;
        let max_features = self.feature_subset.resolve(n_features);

        if self.is_classification {
            let mut classes: Vec<f64> = y.iter().copied().collect();
            classes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            classes.dedup();
            self.classes = classes;
        }

        // One deterministic rng per tree, derived from the forest seed
        let base_seed = self.seed;
        let trees: Result<Vec<DecisionTree>> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let tree_seed = base_seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(tree_seed);

                let sample_indices: Vec<usize> = (0..n_samples)
                    .map(|_| (rng.next_u64() as usize) % n_samples)
                    .collect();

                let x_boot = x.select(Axis(0), &sample_indices);
                let y_boot: Array1<f64> =
                    Array1::from_vec(sample_indices.iter().map(|&i| y[i]).collect());

                let mut tree = if self.is_classification {
                    DecisionTree::new_classifier()
                } else {
                    DecisionTree::new_regressor()
                };
                if let Some(d) = self.max_depth {
                    tree = tree.with_max_depth(d);
                }
                tree = tree
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_max_features(max_features)
                    .with_seed(tree_seed);

                tree.fit(&x_boot, &y_boot)?;
                Ok(tree)
            })
            .collect();

        self.trees = trees?;
        self.compute_feature_importances();

        Ok(self)
    }

    fn compute_feature_importances(&mut self) {
        if self.trees.is_empty() {
            return;
        }

        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            if let Some(imp) = tree.feature_importances() {
                for (i, &val) in imp.iter().enumerate() {
                    total[i] += val;
                }
            }
        }

        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            for imp in &mut total {
                *imp /= sum;
            }
        }
        self.feature_importances = Some(Array1::from_vec(total));
    }

    /// Predict: mean over trees for regression, majority vote for
    /// classification.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(RealtyError::ModelNotFitted);
        }

        let all_predictions: Vec<Array1<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;

        let n_samples = x.nrows();
        let predictions: Vec<f64> = if self.is_classification {
            (0..n_samples)
                .map(|i| {
                    let mut votes: HashMap<i64, usize> = HashMap::new();
                    for preds in &all_predictions {
                        *votes.entry(preds[i].round() as i64).or_insert(0) += 1;
                    }
                    votes
                        .into_iter()
                        .max_by_key(|(_, count)| *count)
                        .map(|(class, _)| class as f64)
                        .unwrap_or(0.0)
                })
                .collect()
        } else {
            (0..n_samples)
                .map(|i| {
                    let sum: f64 = all_predictions.iter().map(|p| p[i]).sum();
                    sum / all_predictions.len() as f64
                })
                .collect()
        };

        Ok(Array1::from_vec(predictions))
    }

    /// Per-class vote shares (classification only). Rows sum to 1.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.trees.is_empty() {
            return Err(RealtyError::ModelNotFitted);
        }
        if !self.is_classification {
            return Err(RealtyError::TrainingError(
                "predict_proba is only available for classification".to_string(),
            ));
        }

        let all_predictions: Vec<Array1<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;

        let n_samples = x.nrows();
        let n_classes = self.classes.len();
        let mut proba = Array2::zeros((n_samples, n_classes));

        for i in 0..n_samples {
            for preds in &all_predictions {
                let class = preds[i].round() as i64;
                if let Some(class_idx) = self
                    .classes
                    .iter()
                    .position(|&c| c.round() as i64 == class)
                {
                    proba[[i, class_idx]] += 1.0;
                }
            }
            let row_sum: f64 = proba.row(i).sum();
            if row_sum > 0.0 {
                for j in 0..n_classes {
                    proba[[i, j]] /= row_sum;
                }
            }
        }

        Ok(proba)
    }

    /// Averaged, normalized impurity importances.
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Encoded class values in learned (sorted) order.
    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
