//! Мультиномиальная логистическая регрессия
//!
//! Градиентный спуск по средней кросс-энтропии с L2 штрафом ||W||^2 / (2 C n).
//! Свободный член не регуляризуется.

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use super::{check_training_input, softmax_rows, Classifier};
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Обратная сила регуляризации
    pub c: f64,
    pub learning_rate: f64,
    pub max_iter: usize,
    /// Остановка, когда max |градиент| < tol
    pub tol: f64,
    weights: Option<Array2<f64>>,
    bias: Option<Array1<f64>>,
    n_iter: usize,
}

impl LogisticRegression {
    pub fn new(c: f64, max_iter: usize) -> Self {
        Self {
            c,
            learning_rate: 0.5,
            max_iter,
            tol: 1e-6,
            weights: None,
            bias: None,
            n_iter: 0,
        }
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Число выполненных итераций последнего обучения
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    fn logits(&self, X: &Array2<f64>, W: &Array2<f64>, b: &Array1<f64>) -> Array2<f64> {
        X.dot(W) + b
    }
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(1.0, 500)
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, X: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<()> {
        check_training_input(X, y, n_classes)?;
        if self.c <= 0.0 {
            return Err(PipelineError::InvalidParameter {
                name: "c".to_string(),
                value: self.c.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let n = X.nrows() as f64;
        let mut W = Array2::<f64>::zeros((X.ncols(), n_classes));
        let mut b = Array1::<f64>::zeros(n_classes);

        let mut Y = Array2::<f64>::zeros((X.nrows(), n_classes));
        for (i, &class) in y.iter().enumerate() {
            Y[[i, class]] = 1.0;
        }

        self.n_iter = 0;
        for _ in 0..self.max_iter {
            self.n_iter += 1;

            let residual = softmax_rows(&self.logits(X, &W, &b)) - &Y;
            let grad_W = X.t().dot(&residual) / n + &W / (self.c * n);
            let grad_b = residual.sum_axis(Axis(0)) / n;

            W = W - &grad_W * self.learning_rate;
            b = b - &grad_b * self.learning_rate;

            let max_grad = grad_W
                .iter()
                .chain(grad_b.iter())
                .fold(0.0_f64, |acc, g| acc.max(g.abs()));
            if max_grad < self.tol {
                break;
            }
        }

        tracing::debug!(iterations = self.n_iter, "logistic regression fitted");
        self.weights = Some(W);
        self.bias = Some(b);
        Ok(())
    }

    fn predict_proba(&self, X: &Array2<f64>) -> Result<Array2<f64>> {
        let (W, b) = match (&self.weights, &self.bias) {
            (Some(W), Some(b)) => (W, b),
            _ => return Err(PipelineError::ModelNotFitted),
        };
        if X.ncols() != W.nrows() {
            return Err(PipelineError::ShapeMismatch {
                expected: format!("{} features", W.nrows()),
                actual: format!("{} features", X.ncols()),
            });
        }
        Ok(softmax_rows(&self.logits(X, W, b)))
    }
}
