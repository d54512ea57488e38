//! Random Forest: бэггинг деревьев Gini с подвыборкой признаков

use ndarray::Array2;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::tree::DecisionTree;
use super::{check_training_input, Classifier};
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// floor(sqrt(n_features))
    Sqrt,
    All,
    Fixed(usize),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub random_state: u64,
    trees: Vec<DecisionTree>,
    n_classes: usize,
}

impl RandomForest {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            n_estimators,
            max_depth: None,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            random_state: 42,
            trees: Vec::new(),
            n_classes: 0,
        }
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    fn features_per_split(&self, n_features: usize) -> usize {
        match self.max_features {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::All => n_features,
            MaxFeatures::Fixed(n) => n.min(n_features),
        }
        .max(1)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(100)
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<()> {
        check_training_input(x, y, n_classes)?;
        if self.n_estimators == 0 {
            return Err(PipelineError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "need at least one tree".to_string(),
            });
        }

        let n_samples = x.nrows();
        let max_features = self.features_per_split(x.ncols());
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);

        self.n_classes = n_classes;
        self.trees.clear();

        for _ in 0..self.n_estimators {
            let tree_seed = rng.next_u64();

            // Bootstrap выборка
            let indices: Vec<usize> = if self.bootstrap {
                (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
            } else {
                (0..n_samples).collect()
            };

            let mut tree = DecisionTree::new()
                .with_max_features(max_features)
                .with_random_state(tree_seed);
            if let Some(depth) = self.max_depth {
                tree = tree.with_max_depth(depth);
            }
            tree.fit_indices(x, y, n_classes, &indices)?;
            self.trees.push(tree);
        }

        tracing::debug!(trees = self.trees.len(), max_features, "random forest fitted");
        Ok(())
    }

    /// Среднее распределений листьев по всем деревьям
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.trees.is_empty() {
            return Err(PipelineError::ModelNotFitted);
        }

        let mut proba = Array2::<f64>::zeros((x.nrows(), self.n_classes));
        for tree in &self.trees {
            proba += &tree.predict_proba(x)?;
        }
        proba /= self.trees.len() as f64;
        Ok(proba)
    }
}
