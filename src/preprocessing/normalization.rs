//! Z-score нормализация

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// (x - mean) / std по каждой колонке; std по генеральной совокупности
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Option<Array1<f64>>,
    std: Option<Array1<f64>>,
    is_fitted: bool,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self {
            mean: None,
            std: None,
            is_fitted: false,
        }
    }

    pub fn fit(&mut self, X: &Array2<f64>) -> Result<()> {
        if X.nrows() == 0 {
            return Err(PipelineError::InsufficientData(
                "cannot fit scaler on empty data".to_string(),
            ));
        }

        self.mean = X.mean_axis(Axis(0));
        let mut std = X.std_axis(Axis(0), 0.0);

        // Избегаем деления на ноль
        for val in std.iter_mut() {
            if *val < 1e-10 {
                *val = 1.0;
            }
        }
        self.std = Some(std);

        self.is_fitted = true;
        Ok(())
    }

    pub fn transform(&self, X: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(PipelineError::ModelNotFitted);
        }

        let mean = self.mean.as_ref().ok_or(PipelineError::ModelNotFitted)?;
        let std = self.std.as_ref().ok_or(PipelineError::ModelNotFitted)?;

        if X.ncols() != mean.len() {
            return Err(PipelineError::ShapeMismatch {
                expected: format!("{} features", mean.len()),
                actual: format!("{} features", X.ncols()),
            });
        }

        let mut normalized = X.clone();
        for mut row in normalized.rows_mut() {
            for (i, val) in row.iter_mut().enumerate() {
                *val = (*val - mean[i]) / std[i];
            }
        }

        Ok(normalized)
    }

    pub fn fit_transform(&mut self, X: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(X)?;
        self.transform(X)
    }

    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    pub fn std(&self) -> Option<&Array1<f64>> {
        self.std.as_ref()
    }

    pub fn n_features(&self) -> usize {
        self.mean.as_ref().map(|m| m.len()).unwrap_or(0)
    }
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}
