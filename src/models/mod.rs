/// ML модели

pub mod gradient_boosting;
pub mod logistic;
pub mod random_forest;
pub mod tree;
pub mod voting;

pub use gradient_boosting::GradientBoosting;
pub use logistic::LogisticRegression;
pub use random_forest::RandomForest;
pub use tree::DecisionTree;
pub use voting::{BaseLearner, SoftVotingEnsemble};

use ndarray::Array2;

use crate::error::{PipelineError, Result};

/// Классификатор, выдающий вероятности классов.
/// Классы на входе - индексы 0..n_classes.
pub trait Classifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<()>;

    /// Матрица n_samples x n_classes, строки суммируются в 1
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        Ok(argmax_rows(&self.predict_proba(x)?))
    }
}

/// Индекс максимума в каждой строке; при равенстве берется меньший
pub fn argmax_rows(proba: &Array2<f64>) -> Vec<usize> {
    proba
        .rows()
        .into_iter()
        .map(|row| {
            let mut best = 0;
            for (k, &p) in row.iter().enumerate() {
                if p > row[best] {
                    best = k;
                }
            }
            best
        })
        .collect()
}

/// Построчный softmax со сдвигом на максимум
pub(crate) fn softmax_rows(logits: &Array2<f64>) -> Array2<f64> {
    let mut proba = logits.clone();
    for mut row in proba.rows_mut() {
        let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        row.mapv_inplace(|v| (v - max).exp());
        let sum: f64 = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    proba
}

pub(crate) fn check_training_input(x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(PipelineError::ShapeMismatch {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(PipelineError::InsufficientData("empty training set".to_string()));
    }
    if let Some(&bad) = y.iter().find(|&&c| c >= n_classes) {
        return Err(PipelineError::InvalidParameter {
            name: "y".to_string(),
            value: bad.to_string(),
            reason: format!("class index must be < {}", n_classes),
        });
    }
    Ok(())
}
