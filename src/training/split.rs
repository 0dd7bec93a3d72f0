//! Train/test split discipline
//!
//! Every variant shares a fixed fraction held out under a fixed seed so the
//! partitions, and therefore the evaluation metrics, are reproducible across
//! runs. The classifier uses the stratified form to preserve class
//! proportions in both partitions.

use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

use crate::error::{RealtyError, Result};

/// A train/test partition of (x, y).
#[derive(Debug)]
pub struct Split {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
    /// Row indices of the test partition in the original matrix
    pub test_indices: Vec<usize>,
}

fn take_rows(x: &Array2<f64>, indices: &[usize]) -> Array2<f64> {
    x.select(Axis(0), indices)
}

fn take_values(y: &Array1<f64>, indices: &[usize]) -> Array1<f64> {
    Array1::from_vec(indices.iter().map(|&i| y[i]).collect())
}

fn build_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
    train_indices: Vec<usize>,
    test_indices: Vec<usize>,
) -> Result<Split> {
    if train_indices.is_empty() || test_indices.is_empty() {
        return Err(RealtyError::InsufficientData(
            "split produced an empty train or test partition".to_string(),
        ));
    }

    Ok(Split {
        x_train: take_rows(x, &train_indices),
        x_test: take_rows(x, &test_indices),
        y_train: take_values(y, &train_indices),
        y_test: take_values(y, &test_indices),
        test_indices,
    })
}

/// Seeded shuffle split. `test_size` is the held-out fraction.
pub fn train_test_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
    test_size: f64,
    seed: u64,
) -> Result<Split> {
    let n = x.nrows();
    if n != y.len() {
        return Err(RealtyError::ShapeError {
            expected: format!("y length = {}", n),
            actual: format!("y length = {}", y.len()),
        });
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((n as f64) * test_size).round() as usize;
    let test_indices = indices[..n_test].to_vec();
    let train_indices = indices[n_test..].to_vec();

    build_split(x, y, train_indices, test_indices)
}

/// Seeded stratified split: the held-out fraction is drawn per class, so
/// label proportions in the test partition track the full dataset within
/// rounding slack. A class with a single member stays in train.
pub fn stratified_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
    test_size: f64,
    seed: u64,
) -> Result<Split> {
    let n = x.nrows();
    if n != y.len() {
        return Err(RealtyError::ShapeError {
            expected: format!("y length = {}", n),
            actual: format!("y length = {}", y.len()),
        });
    }

    // BTreeMap keeps class iteration order deterministic
    let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, &label) in y.iter().enumerate() {
        class_indices.entry(label.round() as i64).or_default().push(i);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train_indices = Vec::new();
    let mut test_indices = Vec::new();

    for indices in class_indices.values() {
        let mut shuffled = indices.clone();
        shuffled.shuffle(&mut rng);

        let n_class_test = if shuffled.len() < 2 {
            0
        } else {
            (((shuffled.len() as f64) * test_size).round() as usize)
                .clamp(1, shuffled.len() - 1)
        };

        test_indices.extend_from_slice(&shuffled[..n_class_test]);
        train_indices.extend_from_slice(&shuffled[n_class_test..]);
    }

    build_split(x, y, train_indices, test_indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn sample(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 2), |(i, j)| (i * 2 + j) as f64);
        let y = Array1::from_shape_fn(n, |i| i as f64);
        (x, y)
    }

    #[test]
    fn test_partition_sizes() {
        let (x, y) = sample(100);
        let split = train_test_split(&x, &y, 0.2, 42).unwrap();
        assert_eq!(split.x_test.nrows(), 20);
        assert_eq!(split.x_train.nrows(), 80);
        assert_eq!(split.y_test.len(), 20);
    }

    #[test]
    fn test_same_seed_same_partition() {
        let (x, y) = sample(50);
        let a = train_test_split(&x, &y, 0.2, 42).unwrap();
        let b = train_test_split(&x, &y, 0.2, 42).unwrap();
        assert_eq!(a.test_indices, b.test_indices);
        assert_eq!(a.y_train.to_vec(), b.y_train.to_vec());
    }

    #[test]
    fn test_different_seed_different_partition() {
        let (x, y) = sample(50);
        let a = train_test_split(&x, &y, 0.2, 42).unwrap();
        let b = train_test_split(&x, &y, 0.2, 43).unwrap();
        assert_ne!(a.test_indices, b.test_indices);
    }

    #[test]
    fn test_partitions_are_disjoint_and_complete() {
        let (x, y) = sample(40);
        let split = train_test_split(&x, &y, 0.25, 1).unwrap();

        let mut seen: Vec<f64> = split
            .y_train
            .iter()
            .chain(split.y_test.iter())
            .copied()
            .collect();
        seen.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let expected: Vec<f64> = (0..40).map(|i| i as f64).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_stratified_preserves_proportions() {
        // 60/40 class balance over 100 rows
        let x = Array2::from_shape_fn((100, 1), |(i, _)| i as f64);
        let y = Array1::from_shape_fn(100, |i| if i < 60 { 0.0 } else { 1.0 });

        let split = stratified_split(&x, &y, 0.2, 42).unwrap();
        assert_eq!(split.y_test.len(), 20);

        let test_zeros = split.y_test.iter().filter(|&&v| v == 0.0).count();
        assert_eq!(test_zeros, 12, "test partition keeps the 60/40 balance");
    }

    #[test]
    fn test_stratified_singleton_class_stays_in_train() {
        let x = Array2::from_shape_fn((11, 1), |(i, _)| i as f64);
        let mut labels = vec![0.0; 10];
        labels.push(1.0);
        let y = Array1::from_vec(labels);

        let split = stratified_split(&x, &y, 0.2, 42).unwrap();
        assert!(split.y_test.iter().all(|&v| v == 0.0));
        assert!(split.y_train.iter().any(|&v| v == 1.0));
    }

    #[test]
    fn test_empty_partition_rejected() {
        let (x, y) = sample(2);
        let err = train_test_split(&x, &y, 0.0, 42).unwrap_err();
        assert!(matches!(err, RealtyError::InsufficientData(_)));
    }

    #[test]
    fn test_split_is_debug_formattable() {
        let (x, y) = sample(10);
        let split = train_test_split(&x, &y, 0.2, 42).unwrap();
        assert!(format!("{:?}", split).contains("test_indices"));
    }
}
