//! Gradient boosted trees (второй порядок, как в XGBoost)
//!
//! Бинарная задача: логистическая функция потерь, одно дерево на раунд.
//! Мультикласс: softmax, по дереву на каждый класс в раунде.
//! Листья: w = -G / (H + lambda), разбиение по приросту
//! G_L^2/(H_L+lambda) + G_R^2/(H_R+lambda) - G^2/(H+lambda).

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::{check_training_input, softmax_rows, Classifier};
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// L2 регуляризация весов листьев
    pub reg_lambda: f64,
    /// Минимальная сумма гессиана в потомке
    pub min_child_weight: f64,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            reg_lambda: 1.0,
            min_child_weight: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum BoostNode {
    Leaf {
        weight: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<BoostNode>,
        right: Box<BoostNode>,
    },
}

impl BoostNode {
    fn predict(&self, x: &Array2<f64>, row: usize) -> f64 {
        match self {
            BoostNode::Leaf { weight } => *weight,
            BoostNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if x[[row, *feature]] <= *threshold {
                    left.predict(x, row)
                } else {
                    right.predict(x, row)
                }
            }
        }
    }
}

struct TreeBuilder<'a> {
    x: &'a Array2<f64>,
    grad: &'a [f64],
    hess: &'a [f64],
    config: &'a GradientBoostingConfig,
}

impl TreeBuilder<'_> {
    fn build(&self, indices: Vec<usize>, depth: usize) -> BoostNode {
        let lambda = self.config.reg_lambda;
        let g: f64 = indices.iter().map(|&i| self.grad[i]).sum();
        let h: f64 = indices.iter().map(|&i| self.hess[i]).sum();
        let leaf = BoostNode::Leaf {
            weight: -g / (h + lambda),
        };

        if depth >= self.config.max_depth || indices.len() < 2 {
            return leaf;
        }

        let parent_score = g * g / (h + lambda);
        let mut best: Option<(usize, f64, f64)> = None;

        for feature in 0..self.x.ncols() {
            let mut sorted = indices.clone();
            sorted.sort_by(|&a, &b| self.x[[a, feature]].total_cmp(&self.x[[b, feature]]));

            let mut g_left = 0.0;
            let mut h_left = 0.0;
            for pos in 0..sorted.len() - 1 {
                g_left += self.grad[sorted[pos]];
                h_left += self.hess[sorted[pos]];

                let current = self.x[[sorted[pos], feature]];
                let next = self.x[[sorted[pos + 1], feature]];
                if next <= current {
                    continue;
                }

                let g_right = g - g_left;
                let h_right = h - h_left;
                if h_left < self.config.min_child_weight || h_right < self.config.min_child_weight {
                    continue;
                }

                let gain = g_left * g_left / (h_left + lambda)
                    + g_right * g_right / (h_right + lambda)
                    - parent_score;
                if best.map_or(true, |(_, _, b)| gain > b) {
                    best = Some((feature, (current + next) / 2.0, gain));
                }
            }
        }

        match best {
            Some((feature, threshold, gain)) if gain > 1e-12 => {
                let (left, right): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .partition(|&&i| self.x[[i, feature]] <= threshold);
                BoostNode::Split {
                    feature,
                    threshold,
                    left: Box::new(self.build(left, depth + 1)),
                    right: Box::new(self.build(right, depth + 1)),
                }
            }
            _ => leaf,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoosting {
    config: GradientBoostingConfig,
    /// rounds[раунд][выход]
    rounds: Vec<Vec<BoostNode>>,
    n_classes: usize,
}

impl GradientBoosting {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            rounds: Vec::new(),
            n_classes: 0,
        }
    }

    fn n_outputs(&self) -> usize {
        if self.n_classes == 2 {
            1
        } else {
            self.n_classes
        }
    }

    fn margins(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut margins = Array2::zeros((x.nrows(), self.n_outputs()));
        for trees in &self.rounds {
            for (k, tree) in trees.iter().enumerate() {
                for i in 0..x.nrows() {
                    margins[[i, k]] += self.config.learning_rate * tree.predict(x, i);
                }
            }
        }
        margins
    }

    fn margins_to_proba(&self, margins: &Array2<f64>) -> Array2<f64> {
        let n = margins.nrows();
        if self.n_classes == 2 {
            let mut proba = Array2::zeros((n, 2));
            for i in 0..n {
                let p = sigmoid(margins[[i, 0]]);
                proba[[i, 0]] = 1.0 - p;
                proba[[i, 1]] = p;
            }
            proba
        } else {
            softmax_rows(margins)
        }
    }

    pub fn n_rounds(&self) -> usize {
        self.rounds.len()
    }
}

impl Default for GradientBoosting {
    fn default() -> Self {
        Self::new(GradientBoostingConfig::default())
    }
}

impl Classifier for GradientBoosting {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<()> {
        check_training_input(x, y, n_classes)?;
        if n_classes < 2 {
            return Err(PipelineError::InsufficientData(
                "boosting needs at least two classes".to_string(),
            ));
        }

        self.n_classes = n_classes;
        self.rounds.clear();

        let n_samples = x.nrows();
        let n_outputs = self.n_outputs();
        let mut margins = Array2::<f64>::zeros((n_samples, n_outputs));
        let all: Vec<usize> = (0..n_samples).collect();

        for _ in 0..self.config.n_estimators {
            let proba = self.margins_to_proba(&margins);
            let mut trees = Vec::with_capacity(n_outputs);

            for k in 0..n_outputs {
                // Для бинарного случая выход 0 отвечает за класс 1
                let class = if n_outputs == 1 { 1 } else { k };
                let mut grad = vec![0.0; n_samples];
                let mut hess = vec![0.0; n_samples];
                for i in 0..n_samples {
                    let p = proba[[i, class]];
                    let target = if y[i] == class { 1.0 } else { 0.0 };
                    grad[i] = p - target;
                    let h = if n_outputs == 1 { p * (1.0 - p) } else { 2.0 * p * (1.0 - p) };
                    hess[i] = h.max(1e-16);
                }

                let builder = TreeBuilder {
                    x,
                    grad: &grad,
                    hess: &hess,
                    config: &self.config,
                };
                let tree = builder.build(all.clone(), 0);
                for i in 0..n_samples {
                    margins[[i, k]] += self.config.learning_rate * tree.predict(x, i);
                }
                trees.push(tree);
            }

            self.rounds.push(trees);
        }

        tracing::debug!(rounds = self.rounds.len(), outputs = n_outputs, "gradient boosting fitted");
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.rounds.is_empty() {
            return Err(PipelineError::ModelNotFitted);
        }
        Ok(self.margins_to_proba(&self.margins(x)))
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
