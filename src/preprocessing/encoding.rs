//! Label encoding категориальных колонок

use std::collections::HashMap;

use polars::prelude::*;

use crate::error::{PipelineError, Result};
use crate::frame::{column_series, is_text};

/// Отображение категорий в 0..k-1.
/// Строки сортируются лексикографически, числа по значению.
#[derive(Debug, Clone, Default)]
pub struct LabelEncoder {
    classes: Vec<String>,
    index: HashMap<String, usize>,
}

/// -0.0 и 0.0 одна категория
fn canonical(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else {
        value
    }
}

fn numeric_key(value: f64) -> String {
    canonical(value).to_string()
}

/// Ключи категорий по строкам; пропуск - ошибка
fn keys(series: &Series) -> Result<Vec<String>> {
    let missing = |row: usize| PipelineError::MissingValue {
        column: series.name().to_string(),
        row,
    };

    if is_text(series) {
        series
            .str()?
            .into_iter()
            .enumerate()
            .map(|(row, value)| value.map(str::to_string).ok_or_else(|| missing(row)))
            .collect()
    } else {
        series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .enumerate()
            .map(|(row, value)| value.map(numeric_key).ok_or_else(|| missing(row)))
            .collect()
    }
}

/// Отсортированные различные значения колонки
fn sorted_classes(series: &Series) -> Result<Vec<String>> {
    if is_text(series) {
        let unique = series.unique()?.sort(SortOptions::default())?;
        return Ok(unique
            .str()?
            .into_iter()
            .flatten()
            .map(str::to_string)
            .collect());
    }

    let values: Vec<Option<f64>> = series
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .map(|value| value.map(canonical))
        .collect();
    let unique = Series::new(series.name().clone(), values)
        .unique()?
        .sort(SortOptions::default())?;
    Ok(unique
        .f64()?
        .into_iter()
        .flatten()
        .map(numeric_key)
        .collect())
}

impl LabelEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, series: &Series) -> Result<&mut Self> {
        let nulls = series.is_null();
        if let Some(row) = nulls.into_iter().position(|null| null == Some(true)) {
            return Err(PipelineError::MissingValue {
                column: series.name().to_string(),
                row,
            });
        }

        let classes = sorted_classes(series)?;
        self.index = classes
            .iter()
            .enumerate()
            .map(|(code, class)| (class.clone(), code))
            .collect();
        self.classes = classes;
        Ok(self)
    }

    pub fn transform(&self, series: &Series) -> Result<Series> {
        let codes = keys(series)?
            .into_iter()
            .map(|key| {
                self.index
                    .get(&key)
                    .map(|code| *code as f64)
                    .ok_or_else(|| PipelineError::InvalidParameter {
                        name: series.name().to_string(),
                        value: key,
                        reason: "category not seen during fit".to_string(),
                    })
            })
            .collect::<Result<Vec<f64>>>()?;
        Ok(Series::new(series.name().clone(), codes))
    }

    pub fn fit_transform(&mut self, series: &Series) -> Result<Series> {
        self.fit(series)?;
        self.transform(series)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

/// Кодирует колонку таблицы на месте свежим энкодером
pub fn encode_column(df: &mut DataFrame, name: &str) -> Result<LabelEncoder> {
    let mut encoder = LabelEncoder::new();
    let encoded = encoder.fit_transform(column_series(df, name)?)?;
    df.with_column(encoded)?;
    tracing::debug!(column = name, classes = encoder.classes().len(), "label encoded");
    Ok(encoder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::float_values;
    use std::collections::BTreeSet;

    fn text(name: &str, values: &[&str]) -> Series {
        Series::new(name.into(), values.to_vec())
    }

    fn codes(series: &Series) -> Vec<f64> {
        series.f64().unwrap().into_iter().flatten().collect()
    }

    #[test]
    fn test_codes_are_contiguous_bijection() {
        let data = text("htn", &["yes", "no", "yes", "unknown", "no"]);
        let mut encoder = LabelEncoder::new();
        let encoded = codes(&encoder.fit_transform(&data).unwrap());

        assert_eq!(encoder.classes(), &["no", "unknown", "yes"]);
        assert_eq!(encoded, vec![2.0, 0.0, 2.0, 1.0, 0.0]);

        let distinct: BTreeSet<i64> = encoded.iter().map(|c| *c as i64).collect();
        assert_eq!(distinct, (0..3).collect::<BTreeSet<i64>>());
    }

    #[test]
    fn test_numeric_categories_sorted_by_value() {
        let data = Series::new("sex".into(), vec![10.0, 2.0, 1.0, 2.0]);
        let encoded = LabelEncoder::new().fit_transform(&data).unwrap();
        assert_eq!(codes(&encoded), vec![2.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_signed_zero_is_one_category() {
        let data = Series::new("sex".into(), vec![0.0, -0.0, 1.0]);
        let mut encoder = LabelEncoder::new();
        let encoded = encoder.fit_transform(&data).unwrap();
        assert_eq!(encoder.classes().len(), 2);
        assert_eq!(codes(&encoded), vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_encoding_already_encoded_column_is_identity() {
        let data = Series::new("gender".into(), vec![0.0, 1.0, 1.0, 0.0]);
        let encoded = LabelEncoder::new().fit_transform(&data).unwrap();
        assert_eq!(codes(&encoded), vec![0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_unseen_and_missing_values_fail() {
        let mut encoder = LabelEncoder::new();
        encoder.fit(&text("pe", &["yes", "no"])).unwrap();
        assert!(matches!(
            encoder.transform(&text("pe", &["maybe"])),
            Err(PipelineError::InvalidParameter { .. })
        ));

        let missing = Series::new("pe".into(), vec![Some("yes"), None]);
        assert!(matches!(
            LabelEncoder::new().fit(&missing),
            Err(PipelineError::MissingValue { row: 1, .. })
        ));
    }

    #[test]
    fn test_encode_column_in_frame() {
        let mut df = DataFrame::new(vec![text("target", &["ckd", "notckd", "ckd"]).into()]).unwrap();
        let encoder = encode_column(&mut df, "target").unwrap();
        assert_eq!(encoder.classes(), &["ckd", "notckd"]);
        assert_eq!(
            float_values(&df, "target").unwrap(),
            vec![Some(0.0), Some(1.0), Some(0.0)]
        );
    }
}
