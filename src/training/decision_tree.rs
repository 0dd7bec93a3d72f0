//! CART decision tree used standalone and inside the random forest

use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{RealtyError, Result};

/// Tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SplitCriterion {
    /// Gini impurity (classification)
    Gini,
    /// Variance reduction (regression)
    Variance,
}

/// Decision tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Number of features considered per split (None = all)
    pub max_features: Option<usize>,
    pub criterion: SplitCriterion,
    /// Seed for per-split feature subsampling
    pub seed: u64,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
    is_classification: bool,
}

impl DecisionTree {
    pub fn new_classifier() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: SplitCriterion::Gini,
            seed: 42,
            n_features: 0,
            feature_importances: None,
            is_classification: true,
        }
    }

    pub fn new_regressor() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: SplitCriterion::Variance,
            seed: 42,
            n_features: 0,
            feature_importances: None,
            is_classification: false,
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

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Fit the tree to training data.
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
                "cannot fit tree on zero rows".to_string(),
            ));
        }

        self.n_features = n_features;

        let mut importances = vec![0.0; n_features];
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_tree(x, y, &indices, 0, &mut importances, &mut rng));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let y_subset: Vec<f64> = indices.iter().map(|&i| y[i]).collect();

        let should_stop = n_samples < self.min_samples_split
            || n_samples <= self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || is_pure(&y_subset);

        if should_stop {
            return TreeNode::Leaf {
                value: self.leaf_value(&y_subset),
                n_samples,
            };
        }

        if let Some((best_feature, best_threshold)) = self.find_best_split(x, y, indices, rng) {
            let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .partition(|&&i| x[[i, best_feature]] <= best_threshold);

            if left_indices.len() < self.min_samples_leaf
                || right_indices.len() < self.min_samples_leaf
            {
                return TreeNode::Leaf {
                    value: self.leaf_value(&y_subset),
                    n_samples,
                };
            }

            // Weighted impurity decrease accumulates into feature importances
            let parent_impurity = self.impurity(&y_subset);
            let left_y: Vec<f64> = left_indices.iter().map(|&i| y[i]).collect();
            let right_y: Vec<f64> = right_indices.iter().map(|&i| y[i]).collect();
            let weighted_child_impurity = (left_indices.len() as f64 * self.impurity(&left_y)
                + right_indices.len() as f64 * self.impurity(&right_y))
                / n_samples as f64;
            importances[best_feature] +=
                n_samples as f64 * (parent_impurity - weighted_child_impurity);

            let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, importances, rng));
            let right =
                Box::new(self.build_tree(x, y, &right_indices, depth + 1, importances, rng));

            TreeNode::Split {
                feature_idx: best_feature,
                threshold: best_threshold,
                left,
                right,
                n_samples,
            }
        } else {
            TreeNode::Leaf {
                value: self.leaf_value(&y_subset),
                n_samples,
            }
        }
    }

    /// Pick the split with the largest impurity gain over a (possibly
    /// subsampled) set of candidate features.
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        rng: &mut ChaCha8Rng,
    ) -> Option<(usize, f64)> {
        let n_features = x.ncols();
        let k = self.max_features.unwrap_or(n_features).min(n_features).max(1);

        let candidate_features: Vec<usize> = if k < n_features {
            let mut all: Vec<usize> = (0..n_features).collect();
            all.shuffle(rng);
            all.truncate(k);
            all
        } else {
            (0..n_features).collect()
        };

        let y_subset: Vec<f64> = indices.iter().map(|&i| y[i]).collect();
        let parent_impurity = self.impurity(&y_subset);

        // Each candidate feature independently finds its best threshold
        let feature_results: Vec<Option<(usize, f64, f64)>> = candidate_features
            .into_par_iter()
            .map(|feature_idx| {
                let mut values: Vec<f64> =
                    indices.iter().map(|&i| x[[i, feature_idx]]).collect();
                values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                values.dedup();

                let mut best_gain = 0.0f64;
                let mut best_threshold = 0.0f64;

                for window in values.windows(2) {
                    let threshold = (window[0] + window[1]) / 2.0;

                    let mut left = SplitStats::default();
                    let mut right = SplitStats::default();
                    for &idx in indices {
                        let yi = y[idx];
                        if x[[idx, feature_idx]] <= threshold {
                            left.add(yi);
                        } else {
                            right.add(yi);
                        }
                    }

                    if left.count < self.min_samples_leaf || right.count < self.min_samples_leaf {
                        continue;
                    }

                    let n = indices.len() as f64;
                    let weighted = (left.count as f64 * self.impurity_from_stats(&left)
                        + right.count as f64 * self.impurity_from_stats(&right))
                        / n;

                    let gain = parent_impurity - weighted;
                    if gain > best_gain {
                        best_gain = gain;
                        best_threshold = threshold;
                    }
                }

                if best_gain > 0.0 {
                    Some((feature_idx, best_threshold, best_gain))
                } else {
                    None
                }
            })
            .collect();

        feature_results
            .into_iter()
            .flatten()
            .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(feature, threshold, _)| (feature, threshold))
    }

    fn impurity_from_stats(&self, stats: &SplitStats) -> f64 {
        if stats.count == 0 {
            return 0.0;
        }
        let n = stats.count as f64;
        match self.criterion {
            SplitCriterion::Gini => {
                let mut gini = 1.0;
                for &c in stats.class_counts.values() {
                    let p = c as f64 / n;
                    gini -= p * p;
                }
                gini
            }
            // Var = E[X^2] - E[X]^2
            SplitCriterion::Variance => stats.sq_sum / n - (stats.sum / n).powi(2),
        }
    }

    fn impurity(&self, y: &[f64]) -> f64 {
        if y.is_empty() {
            return 0.0;
        }
        let mut stats = SplitStats::default();
        for &v in y {
            stats.add(v);
        }
        self.impurity_from_stats(&stats)
    }

    fn leaf_value(&self, y: &[f64]) -> f64 {
        if y.is_empty() {
            return 0.0;
        }
        if self.is_classification {
            // Mode (most common class)
            let mut counts: HashMap<i64, usize> = HashMap::new();
            for &val in y {
                *counts.entry(val.round() as i64).or_insert(0) += 1;
            }
            counts
                .into_iter()
                .max_by_key(|(_, count)| *count)
                .map(|(class, _)| class as f64)
                .unwrap_or(0.0)
        } else {
            y.iter().sum::<f64>() / y.len() as f64
        }
    }

    /// Make predictions.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(RealtyError::ModelNotFitted)?;

        let predictions: Vec<f64> = (0..x.nrows())
            .map(|i| predict_sample(root, &x.row(i).to_vec()))
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    /// Impurity-decrease feature importances (normalized, summing to 1).
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }
}

/// Incremental per-side split statistics
#[derive(Default)]
struct SplitStats {
    count: usize,
    sum: f64,
    sq_sum: f64,
    class_counts: HashMap<i64, usize>,
}

impl SplitStats {
    fn add(&mut self, y: f64) {
        self.count += 1;
        self.sum += y;
        self.sq_sum += y * y;
        *self.class_counts.entry(y.round() as i64).or_insert(0) += 1;
    }
}

fn is_pure(y: &[f64]) -> bool {
    match y.first() {
        Some(&first) => y.iter().all(|&v| (v - first).abs() < 1e-10),
        None => true,
    }
}

fn predict_sample(node: &TreeNode, sample: &[f64]) -> f64 {
    match node {
        TreeNode::Leaf { value, .. } => *value,
        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            ..
        } => {
            if sample[*feature_idx] <= *threshold {
                predict_sample(left, sample)
            } else {
                predict_sample(right, sample)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classifier_separable() {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.2],
            [0.2, 0.1],
            [1.0, 1.0],
            [1.1, 0.9],
            [1.2, 1.1],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut tree = DecisionTree::new_classifier();
        tree.fit(&x, &y).unwrap();

        let pred = tree.predict(&x).unwrap();
        assert_eq!(pred.to_vec(), y.to_vec());
    }

    #[test]
    fn test_regressor_step_function() {
        let x = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = array![5.0, 5.0, 5.0, 50.0, 50.0, 50.0];

        let mut tree = DecisionTree::new_regressor();
        tree.fit(&x, &y).unwrap();

        let pred = tree.predict(&array![[2.0], [11.0]]).unwrap();
        assert!((pred[0] - 5.0).abs() < 1e-9);
        assert!((pred[1] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_max_depth_limits_tree() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0], [8.0]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];

        let mut stump = DecisionTree::new_regressor().with_max_depth(1);
        stump.fit(&x, &y).unwrap();

        let pred = stump.predict(&x).unwrap();
        let distinct: std::collections::HashSet<i64> =
            pred.iter().map(|v| (v * 1000.0).round() as i64).collect();
        assert!(distinct.len() <= 2, "depth-1 tree has at most 2 leaves");
    }

    #[test]
    fn test_feature_importance_identifies_informative_feature() {
        let x = array![
            [1.0, 0.5],
            [2.0, 0.5],
            [3.0, 0.5],
            [4.0, 0.5],
            [5.0, 0.5],
            [6.0, 0.5],
        ];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];

        let mut tree = DecisionTree::new_regressor();
        tree.fit(&x, &y).unwrap();

        let imp = tree.feature_importances().unwrap();
        assert!(imp[0] > imp[1]);
        assert!((imp.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_predict_before_fit() {
        let tree = DecisionTree::new_regressor();
        let err = tree.predict(&array![[1.0]]).unwrap_err();
        assert!(matches!(err, RealtyError::ModelNotFitted));
    }

    #[test]
    fn test_empty_input_rejected() {
        let x = Array2::<f64>::zeros((0, 2));
        let y = Array1::<f64>::zeros(0);
        let mut tree = DecisionTree::new_regressor();
        let err = tree.fit(&x, &y).unwrap_err();
        assert!(matches!(err, RealtyError::InsufficientData(_)));
    }
}
