//! Заполнение пропусков: среднее для чисел, мода для строк

use std::collections::BTreeMap;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::frame::{column_series, is_text};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FillValue {
    Numeric(f64),
    Text(String),
}

#[derive(Debug, Clone, Default)]
pub struct Imputer {
    fill_values: Vec<(String, FillValue)>,
    is_fitted: bool,
}

impl Imputer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Вычисляет значение заполнения для каждой колонки таблицы
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        self.fill_values.clear();
        for column in df.get_columns() {
            let series = column.as_materialized_series();
            let fill = if is_text(series) {
                column_mode(series.str()?).map(FillValue::Text)
            } else {
                series.cast(&DataType::Float64)?.mean().map(FillValue::Numeric)
            }
            .ok_or_else(|| PipelineError::EmptyColumn(column.name().to_string()))?;
            self.fill_values.push((column.name().to_string(), fill));
        }
        self.is_fitted = true;
        Ok(self)
    }

    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(PipelineError::ModelNotFitted);
        }

        let mut result = df.clone();
        for (name, fill) in &self.fill_values {
            let series = column_series(df, name)?;
            let missing = series.null_count();
            if missing == 0 {
                continue;
            }
            let filled = match fill {
                FillValue::Numeric(value) if !is_text(series) => series
                    .cast(&DataType::Float64)?
                    .f64()?
                    .fill_null_with_values(*value)?
                    .into_series(),
                FillValue::Text(value) if is_text(series) => {
                    let ca = series.str()?;
                    ca.set(&ca.is_null(), Some(value.as_str()))?.into_series()
                }
                _ => {
                    return Err(PipelineError::ShapeMismatch {
                        expected: format!("column '{}' with fitted type", name),
                        actual: "column type changed after fit".to_string(),
                    })
                }
            };
            tracing::debug!(column = %name, filled = missing, "imputed");
            result.with_column(filled)?;
        }

        Ok(result)
    }

    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<DataFrame> {
        self.fit(df)?;
        self.transform(df)
    }

    pub fn fill_value(&self, column: &str) -> Option<&FillValue> {
        self.fill_values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, fill)| fill)
    }
}

/// Самое частое значение; при равенстве берется наименьшее
pub fn column_mode(values: &StringChunked) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values.into_iter().flatten() {
        *counts.entry(value).or_insert(0) += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value.to_string())
}
