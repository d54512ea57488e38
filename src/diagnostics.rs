//! Проверка очищенных данных: какие колонки остались строковыми

use std::collections::HashSet;

use polars::prelude::*;
use serde::Serialize;

use crate::error::Result;
use crate::frame::is_text;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextColumnSummary {
    pub column: String,
    /// Первые различные значения в порядке появления
    pub sample: Vec<String>,
    pub distinct: usize,
}

pub fn inspect_text_columns(df: &DataFrame, sample: usize) -> Result<Vec<TextColumnSummary>> {
    let mut summaries = Vec::new();
    for column in df.get_columns() {
        let series = column.as_materialized_series();
        if !is_text(series) {
            continue;
        }

        let mut seen = HashSet::new();
        let mut first = Vec::new();
        for value in series.str()?.into_iter().flatten() {
            if seen.insert(value) && first.len() < sample {
                first.push(value.to_string());
            }
        }
        summaries.push(TextColumnSummary {
            column: column.name().to_string(),
            sample: first,
            distinct: seen.len(),
        });
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(name: &str, values: &[&str]) -> Column {
        Series::new(name.into(), values.to_vec()).into()
    }

    #[test]
    fn test_reports_only_text_columns() {
        let df = DataFrame::new(vec![
            Series::new("age".into(), vec![1.0, 2.0, 3.0, 4.0]).into(),
            text("rbc", &["normal", "abnormal", "normal", "\t?"]),
        ])
        .unwrap();

        let summary = inspect_text_columns(&df, 5).unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].column, "rbc");
        assert_eq!(summary[0].sample, vec!["normal", "abnormal", "\t?"]);
        assert_eq!(summary[0].distinct, 3);
    }

    #[test]
    fn test_sample_is_truncated() {
        let df = DataFrame::new(vec![text("c", &["a", "b", "c", "d"])]).unwrap();
        let summary = inspect_text_columns(&df, 2).unwrap();
        assert_eq!(summary[0].sample, vec!["a", "b"]);
        assert_eq!(summary[0].distinct, 4);
    }

    #[test]
    fn test_clean_frame_has_nothing_to_report() {
        let df = DataFrame::new(vec![Series::new("x".into(), vec![0.5]).into()]).unwrap();
        assert!(inspect_text_columns(&df, 5).unwrap().is_empty());
    }
}
