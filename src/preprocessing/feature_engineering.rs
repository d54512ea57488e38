//! Извлечение признаков и классов из очищенной таблицы

use ndarray::Array2;
use polars::prelude::DataFrame;

use crate::config::LabelRule;
use crate::error::{PipelineError, Result};
use crate::frame::{column_names, float_values, to_matrix};

pub struct FeatureEngineer;

impl FeatureEngineer {
    /// Колонки признаков в порядке таблицы: все, кроме метки и идентификаторов
    pub fn feature_columns(df: &DataFrame, label: &str, exclude: &[String]) -> Vec<String> {
        column_names(df)
            .into_iter()
            .filter(|name| name != label && !exclude.contains(name))
            .collect()
    }

    /// Целевая колонка в целочисленные классы
    pub fn extract_labels(df: &DataFrame, label: &str, rule: LabelRule) -> Result<Vec<i64>> {
        float_values(df, label)?
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                let value = value.ok_or_else(|| PipelineError::MissingValue {
                    column: label.to_string(),
                    row,
                })?;
                match rule {
                    LabelRule::Round => Ok(round_half_even(value) as i64),
                    LabelRule::AsIs if value.fract() == 0.0 => Ok(value as i64),
                    LabelRule::AsIs => Err(PipelineError::InvalidParameter {
                        name: label.to_string(),
                        value: value.to_string(),
                        reason: "label is not an integer class; use the round label rule".to_string(),
                    }),
                }
            })
            .collect()
    }

    /// (матрица признаков, классы, имена признаков)
    pub fn extract(
        df: &DataFrame,
        label: &str,
        exclude: &[String],
        rule: LabelRule,
    ) -> Result<(Array2<f64>, Vec<i64>, Vec<String>)> {
        let names = Self::feature_columns(df, label, exclude);
        if names.is_empty() {
            return Err(PipelineError::InsufficientData(
                "no feature columns left after removing label and identifiers".to_string(),
            ));
        }
        let features = to_matrix(df, &names)?;
        let labels = Self::extract_labels(df, label, rule)?;
        Ok((features, labels, names))
    }
}

/// Округление к ближайшему, половины к четному
pub fn round_half_even(value: f64) -> f64 {
    let rounded = value.round();
    if (value - value.trunc()).abs() == 0.5 {
        2.0 * (value / 2.0).round()
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn test_round_half_even() {
        assert_eq!(round_half_even(0.49), 0.0);
        assert_eq!(round_half_even(0.51), 1.0);
        assert_eq!(round_half_even(0.5), 0.0);
        assert_eq!(round_half_even(1.5), 2.0);
        assert_eq!(round_half_even(2.5), 2.0);
        assert_eq!(round_half_even(-0.51), -1.0);
    }

    #[test]
    fn test_continuous_label_is_discretized() {
        let df = DataFrame::new(vec![
            Series::new("jitter".into(), vec![0.1, 0.2]).into(),
            Series::new("target".into(), vec![0.49, 0.51]).into(),
        ])
        .unwrap();

        let labels = FeatureEngineer::extract_labels(&df, "target", LabelRule::Round).unwrap();
        assert_eq!(labels, vec![0, 1]);
        assert!(FeatureEngineer::extract_labels(&df, "target", LabelRule::AsIs).is_err());
    }

    #[test]
    fn test_extract_skips_label_and_identifiers() {
        let df = DataFrame::new(vec![
            Series::new("patient_id".into(), vec!["p0", "p1"]).into(),
            Series::new("fo".into(), vec![119.9, 122.4]).into(),
            Series::new("target".into(), vec![1.0, 0.0]).into(),
            Series::new("spread1".into(), vec![-4.8, -4.1]).into(),
        ])
        .unwrap();

        let (x, y, names) = FeatureEngineer::extract(
            &df,
            "target",
            &["patient_id".to_string()],
            LabelRule::AsIs,
        )
        .unwrap();

        assert_eq!(names, vec!["fo".to_string(), "spread1".to_string()]);
        assert_eq!(x.shape(), &[2, 2]);
        assert_eq!(x[[1, 1]], -4.1);
        assert_eq!(y, vec![1, 0]);
    }
}
