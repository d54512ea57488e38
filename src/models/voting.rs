//! Ансамбль с мягким голосованием
//!
//! Каждый базовый классификатор выдает вероятности классов, ансамбль
//! усредняет их (с весами или поровну) и берет argmax.

use std::collections::BTreeSet;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::gradient_boosting::GradientBoostingConfig;
use super::{argmax_rows, Classifier, GradientBoosting, LogisticRegression, RandomForest};
use crate::config::EnsembleConfig;
use crate::error::{PipelineError, Result};

/// Базовая модель ансамбля. Enum, а не trait object, чтобы сериализоваться через serde.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BaseLearner {
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
    Logistic(LogisticRegression),
}

impl BaseLearner {
    pub fn name(&self) -> &'static str {
        match self {
            BaseLearner::RandomForest(_) => "random_forest",
            BaseLearner::GradientBoosting(_) => "gradient_boosting",
            BaseLearner::Logistic(_) => "logistic_regression",
        }
    }
}

impl Classifier for BaseLearner {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<()> {
        match self {
            BaseLearner::RandomForest(m) => m.fit(x, y, n_classes),
            BaseLearner::GradientBoosting(m) => m.fit(x, y, n_classes),
            BaseLearner::Logistic(m) => m.fit(x, y, n_classes),
        }
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        match self {
            BaseLearner::RandomForest(m) => m.predict_proba(x),
            BaseLearner::GradientBoosting(m) => m.predict_proba(x),
            BaseLearner::Logistic(m) => m.predict_proba(x),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftVotingEnsemble {
    members: Vec<BaseLearner>,
    weights: Option<Vec<f64>>,
    /// Исходные метки классов, индекс в векторе = столбец вероятностей
    classes: Vec<i64>,
}

impl SoftVotingEnsemble {
    pub fn new(members: Vec<BaseLearner>) -> Self {
        Self {
            members,
            weights: None,
            classes: Vec::new(),
        }
    }

    /// Лес, бустинг и логистическая регрессия с параметрами из конфигурации
    pub fn from_config(config: &EnsembleConfig, seed: u64) -> Self {
        let forest = RandomForest::new(config.forest_trees).with_random_state(seed);
        let boosting = GradientBoosting::new(GradientBoostingConfig {
            n_estimators: config.boosting_rounds,
            learning_rate: config.boosting_learning_rate,
            max_depth: config.boosting_max_depth,
            reg_lambda: config.boosting_lambda,
            ..Default::default()
        });
        let logistic = LogisticRegression::new(config.logistic_c, config.logistic_max_iter)
            .with_learning_rate(config.logistic_learning_rate);

        Self::new(vec![
            BaseLearner::RandomForest(forest),
            BaseLearner::GradientBoosting(boosting),
            BaseLearner::Logistic(logistic),
        ])
    }

    pub fn with_weights(mut self, weights: Vec<f64>) -> Result<Self> {
        if weights.len() != self.members.len() {
            return Err(PipelineError::InvalidParameter {
                name: "weights".to_string(),
                value: format!("{:?}", weights),
                reason: format!("expected {} weights", self.members.len()),
            });
        }
        if weights.iter().any(|w| *w < 0.0) || weights.iter().sum::<f64>() <= 0.0 {
            return Err(PipelineError::InvalidParameter {
                name: "weights".to_string(),
                value: format!("{:?}", weights),
                reason: "weights must be non-negative with a positive sum".to_string(),
            });
        }
        self.weights = Some(weights);
        Ok(self)
    }

    pub fn members(&self) -> &[BaseLearner] {
        &self.members
    }

    pub fn classes(&self) -> &[i64] {
        &self.classes
    }

    /// Обучение всех моделей на одних и тех же данных.
    /// Метки могут быть любыми целыми, внутри они переводятся в индексы 0..k.
    pub fn fit(&mut self, x: &Array2<f64>, y: &[i64]) -> Result<()> {
        if self.members.is_empty() {
            return Err(PipelineError::InvalidParameter {
                name: "members".to_string(),
                value: "0".to_string(),
                reason: "ensemble needs at least one model".to_string(),
            });
        }

        let classes: Vec<i64> = y.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        if classes.len() < 2 {
            return Err(PipelineError::InsufficientData(format!(
                "training labels contain {} distinct class(es), need at least 2",
                classes.len()
            )));
        }

        let indices: Vec<usize> = y
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or_default())
            .collect();

        for member in &mut self.members {
            tracing::info!(model = member.name(), rows = x.nrows(), "fitting base model");
            member.fit(x, &indices, classes.len())?;
        }

        self.classes = classes;
        Ok(())
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.classes.is_empty() {
            return Err(PipelineError::ModelNotFitted);
        }
        let probas = self
            .members
            .iter()
            .map(|m| m.predict_proba(x))
            .collect::<Result<Vec<_>>>()?;
        soft_vote(&probas, self.weights.as_deref())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<i64>> {
        let proba = self.predict_proba(x)?;
        Ok(argmax_rows(&proba)
            .into_iter()
            .map(|k| self.classes[k])
            .collect())
    }
}

/// Взвешенное среднее матриц вероятностей одинаковой формы
pub fn soft_vote(probas: &[Array2<f64>], weights: Option<&[f64]>) -> Result<Array2<f64>> {
    let first = probas
        .first()
        .ok_or_else(|| PipelineError::InsufficientData("nothing to vote on".to_string()))?;

    let uniform = vec![1.0; probas.len()];
    let weights = weights.unwrap_or(&uniform);
    if weights.len() != probas.len() {
        return Err(PipelineError::ShapeMismatch {
            expected: format!("{} weights", probas.len()),
            actual: format!("{} weights", weights.len()),
        });
    }

    let mut total = Array2::<f64>::zeros(first.raw_dim());
    for (proba, &w) in probas.iter().zip(weights) {
        if proba.dim() != first.dim() {
            return Err(PipelineError::ShapeMismatch {
                expected: format!("{:?}", first.dim()),
                actual: format!("{:?}", proba.dim()),
            });
        }
        total.scaled_add(w, proba);
    }
    total /= weights.iter().sum::<f64>();
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn small_config() -> EnsembleConfig {
        EnsembleConfig {
            forest_trees: 10,
            boosting_rounds: 10,
            logistic_max_iter: 200,
            ..Default::default()
        }
    }

    fn blobs() -> (Array2<f64>, Vec<i64>) {
        let mut rows = Vec::new();
        let mut y = Vec::new();
        for i in 0..15 {
            let d = (i % 5) as f64 * 0.1;
            rows.extend_from_slice(&[-1.0 - d, -1.0 + d]);
            y.push(0);
            rows.extend_from_slice(&[1.0 + d, 1.0 - d]);
            y.push(1);
        }
        (Array2::from_shape_vec((30, 2), rows).unwrap(), y)
    }

    #[test]
    fn test_soft_vote_averages() {
        let a = array![[0.9, 0.1], [0.2, 0.8]];
        let b = array![[0.3, 0.7], [0.4, 0.6]];
        let avg = soft_vote(&[a.clone(), b.clone()], None).unwrap();
        assert!((avg[[0, 0]] - 0.6).abs() < 1e-12);
        assert!((avg[[1, 1]] - 0.7).abs() < 1e-12);

        let weighted = soft_vote(&[a, b], Some(&[3.0, 1.0])).unwrap();
        assert!((weighted[[0, 0]] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_soft_vote_shape_mismatch() {
        let a = array![[0.5, 0.5]];
        let b = array![[0.2, 0.3, 0.5]];
        assert!(soft_vote(&[a, b], None).is_err());
        assert!(soft_vote(&[], None).is_err());
    }

    #[test]
    fn test_ensemble_maps_back_to_labels() {
        let (x, y) = blobs();
        // Метки 3 и 7 вместо 0 и 1
        let y: Vec<i64> = y.iter().map(|&c| if c == 0 { 3 } else { 7 }).collect();

        let mut ensemble = SoftVotingEnsemble::from_config(&small_config(), 42);
        ensemble.fit(&x, &y).unwrap();

        assert_eq!(ensemble.classes(), &[3, 7]);
        assert_eq!(ensemble.members().len(), 3);
        assert_eq!(ensemble.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_single_class_rejected() {
        let (x, _) = blobs();
        let y = vec![1; x.nrows()];
        let mut ensemble = SoftVotingEnsemble::from_config(&small_config(), 42);
        assert!(matches!(
            ensemble.fit(&x, &y),
            Err(PipelineError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_deterministic_for_seed() {
        let (x, y) = blobs();
        let mut a = SoftVotingEnsemble::from_config(&small_config(), 7);
        let mut b = SoftVotingEnsemble::from_config(&small_config(), 7);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn test_invalid_weights() {
        let ensemble = SoftVotingEnsemble::from_config(&small_config(), 1);
        assert!(ensemble.clone().with_weights(vec![1.0, 1.0]).is_err());
        assert!(ensemble.clone().with_weights(vec![1.0, -1.0, 1.0]).is_err());
        assert!(ensemble.with_weights(vec![2.0, 1.0, 1.0]).is_ok());
    }
}
