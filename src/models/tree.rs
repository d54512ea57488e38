//! Дерево решений для классификации (Gini)

#![allow(non_snake_case)]

use ndarray::Array2;
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::{check_training_input, Classifier};
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
enum TreeNode {
    /// Доли классов в листе
    Leaf { distribution: Vec<f64> },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Сколько признаков рассматривать в каждом узле (None - все)
    pub max_features: Option<usize>,
    pub random_state: u64,
    n_classes: usize,
    root: Option<TreeNode>,
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            max_features: None,
            random_state: 0,
            n_classes: 0,
            root: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Обучение на подмножестве строк (индексы могут повторяться, как в bootstrap)
    pub fn fit_indices(
        &mut self,
        X: &Array2<f64>,
        y: &[usize],
        n_classes: usize,
        indices: &[usize],
    ) -> Result<()> {
        check_training_input(X, y, n_classes)?;
        if indices.is_empty() {
            return Err(PipelineError::InsufficientData("no rows to grow a tree".to_string()));
        }

        self.n_classes = n_classes;
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        self.root = Some(self.build_tree(X, y, indices.to_vec(), 0, &mut rng));
        Ok(())
    }

    fn class_counts(&self, y: &[usize], indices: &[usize]) -> Vec<f64> {
        let mut counts = vec![0.0; self.n_classes];
        for &i in indices {
            counts[y[i]] += 1.0;
        }
        counts
    }

    fn build_tree(
        &self,
        X: &Array2<f64>,
        y: &[usize],
        indices: Vec<usize>,
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let counts = self.class_counts(y, &indices);
        let n = indices.len() as f64;
        let is_pure = counts.iter().filter(|&&c| c > 0.0).count() <= 1;

        if is_pure
            || indices.len() < self.min_samples_split
            || self.max_depth.map_or(false, |d| depth >= d)
        {
            return TreeNode::Leaf {
                distribution: counts.iter().map(|c| c / n).collect(),
            };
        }

        let n_features = X.ncols();
        let n_try = self.max_features.unwrap_or(n_features).min(n_features);
        let candidates: Vec<usize> = if n_try < n_features {
            sample(rng, n_features, n_try).into_vec()
        } else {
            (0..n_features).collect()
        };

        let parent = gini(&counts, n);
        let mut best: Option<(usize, f64, f64)> = None;

        for feature in candidates {
            let mut sorted = indices.clone();
            sorted.sort_by(|&a, &b| X[[a, feature]].total_cmp(&X[[b, feature]]));

            let mut left = vec![0.0; self.n_classes];
            let mut right = counts.clone();

            for pos in 0..sorted.len() - 1 {
                let class = y[sorted[pos]];
                left[class] += 1.0;
                right[class] -= 1.0;

                let current = X[[sorted[pos], feature]];
                let next = X[[sorted[pos + 1], feature]];
                if next <= current {
                    continue;
                }

                let n_left = (pos + 1) as f64;
                let n_right = n - n_left;
                let impurity = (n_left * gini(&left, n_left) + n_right * gini(&right, n_right)) / n;

                if best.map_or(true, |(_, _, b)| impurity < b) {
                    best = Some((feature, (current + next) / 2.0, impurity));
                }
            }
        }

        match best {
            Some((feature, threshold, impurity)) if parent - impurity > 1e-12 => {
                let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .partition(|&&i| X[[i, feature]] <= threshold);

                TreeNode::Split {
                    feature,
                    threshold,
                    left: Box::new(self.build_tree(X, y, left_indices, depth + 1, rng)),
                    right: Box::new(self.build_tree(X, y, right_indices, depth + 1, rng)),
                }
            }
            _ => TreeNode::Leaf {
                distribution: counts.iter().map(|c| c / n).collect(),
            },
        }
    }

    fn leaf_distribution<'a>(&self, node: &'a TreeNode, X: &Array2<f64>, row: usize) -> &'a [f64] {
        match node {
            TreeNode::Leaf { distribution } => distribution,
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if X[[row, *feature]] <= *threshold {
                    self.leaf_distribution(left, X, row)
                } else {
                    self.leaf_distribution(right, X, row)
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        self.root.as_ref().map(node_depth).unwrap_or(0)
    }
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for DecisionTree {
    fn fit(&mut self, X: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<()> {
        let indices: Vec<usize> = (0..X.nrows()).collect();
        self.fit_indices(X, y, n_classes, &indices)
    }

    fn predict_proba(&self, X: &Array2<f64>) -> Result<Array2<f64>> {
        let root = self.root.as_ref().ok_or(PipelineError::ModelNotFitted)?;
        let mut proba = Array2::zeros((X.nrows(), self.n_classes));
        for i in 0..X.nrows() {
            for (k, &p) in self.leaf_distribution(root, X, i).iter().enumerate() {
                proba[[i, k]] = p;
            }
        }
        Ok(proba)
    }
}

fn gini(counts: &[f64], n: f64) -> f64 {
    if n <= 0.0 {
        return 0.0;
    }
    1.0 - counts.iter().map(|c| (c / n).powi(2)).sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_separable_data_is_learned() {
        let X = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0], [5.0, 0.0], [6.0, 0.0]];
        let y = vec![0, 0, 0, 1, 1, 1];

        let mut tree = DecisionTree::new();
        tree.fit(&X, &y, 2).unwrap();

        assert_eq!(tree.predict(&X).unwrap(), y);
        assert_eq!(tree.depth(), 2);
        let proba = tree.predict_proba(&array![[3.4, 0.0]]).unwrap();
        assert_eq!(proba.row(0).to_vec(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_max_depth_gives_mixed_leaves() {
        let X = array![[1.0], [2.0], [3.0], [4.0]];
        let y = vec![0, 1, 0, 1];

        let mut tree = DecisionTree::new().with_max_depth(0);
        tree.fit(&X, &y, 2).unwrap();

        let proba = tree.predict_proba(&X).unwrap();
        assert!(proba.iter().all(|p| (*p - 0.5).abs() < 1e-12));
    }

    #[test]
    fn test_constant_features_make_single_leaf() {
        let X = array![[1.0], [1.0], [1.0]];
        let mut tree = DecisionTree::new();
        tree.fit(&X, &[0, 1, 1], 2).unwrap();
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_unfitted() {
        assert!(matches!(
            DecisionTree::new().predict_proba(&array![[1.0]]),
            Err(PipelineError::ModelNotFitted)
        ));
    }
}
