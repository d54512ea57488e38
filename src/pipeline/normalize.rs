//! Очистка сырого датасета: переименование, пропуски, кодирование, масштабирование

use polars::prelude::*;

use crate::config::{DatasetSpec, PipelineConfig, ScaleSelection};
use crate::error::Result;
use crate::frame::{has_column, missing_count, numeric_columns, rename_columns, to_matrix};
use crate::io::{read_csv, write_csv};
use crate::preprocessing::cleaning::{coerce_numeric, strip_whitespace};
use crate::preprocessing::{encode_column, Imputer, StandardScaler};

/// Краткая сводка по одному прогону очистки
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeSummary {
    pub dataset: String,
    pub rows: usize,
    pub columns: usize,
    pub imputed: usize,
    pub encoded: Vec<String>,
    pub scaled: Vec<String>,
}

/// Оставляет только присутствующие колонки, об остальных предупреждает
fn present(df: &DataFrame, dataset: &str, step: &str, names: &[String]) -> Vec<String> {
    names
        .iter()
        .filter(|name| {
            let found = has_column(df, name);
            if !found {
                tracing::warn!(dataset, step, column = %name, "column not present, skipped");
            }
            found
        })
        .cloned()
        .collect()
}

fn scale_targets(df: &DataFrame, spec: &DatasetSpec) -> Vec<String> {
    let selected = match &spec.scale {
        ScaleSelection::Columns(names) => present(df, &spec.name, "scale", names),
        ScaleSelection::AllNumeric => numeric_columns(df),
    };
    // Целевая колонка не масштабируется никогда
    selected.into_iter().filter(|name| *name != spec.label).collect()
}

/// Полная очистка таблицы в памяти
pub fn normalize_table(spec: &DatasetSpec, mut df: DataFrame) -> Result<(DataFrame, NormalizeSummary)> {
    let renamed = rename_columns(&mut df, &spec.rename)?;
    tracing::debug!(dataset = %spec.name, renamed, "columns renamed");

    let strip = present(&df, &spec.name, "strip", &spec.strip_columns);
    strip_whitespace(&mut df, &strip)?;

    for name in present(&df, &spec.name, "coerce", &spec.coerce_numeric) {
        let lost = coerce_numeric(&mut df, &name)?;
        if lost > 0 {
            tracing::debug!(dataset = %spec.name, column = %name, lost, "non-numeric cells dropped");
        }
    }

    let imputed = missing_count(&df);
    let mut df = Imputer::new().fit_transform(&df)?;

    let encoded = present(&df, &spec.name, "encode", &spec.categorical);
    for name in &encoded {
        encode_column(&mut df, name)?;
    }

    let scaled = scale_targets(&df, spec);
    if !scaled.is_empty() {
        let matrix = to_matrix(&df, &scaled)?;
        let mut scaler = StandardScaler::new();
        let matrix = scaler.fit_transform(&matrix)?;
        for (j, name) in scaled.iter().enumerate() {
            df.with_column(Series::new(name.as_str().into(), matrix.column(j).to_vec()))?;
        }
    }

    let summary = NormalizeSummary {
        dataset: spec.name.clone(),
        rows: df.height(),
        columns: df.width(),
        imputed,
        encoded,
        scaled,
    };
    Ok((df, summary))
}

/// Читает сырой CSV, очищает и перезаписывает чистый CSV
pub fn normalize_dataset(config: &PipelineConfig, spec: &DatasetSpec) -> Result<NormalizeSummary> {
    let raw_path = config.raw_path(spec);
    tracing::info!(dataset = %spec.name, path = %raw_path.display(), "normalizing dataset");

    let raw = read_csv(&raw_path)?;
    let (mut clean, summary) = normalize_table(spec, raw)?;

    let clean_path = config.clean_path(spec);
    if let Some(parent) = clean_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    write_csv(&mut clean, &clean_path)?;

    tracing::info!(
        dataset = %spec.name,
        rows = summary.rows,
        imputed = summary.imputed,
        path = %clean_path.display(),
        "cleaned dataset written"
    );
    Ok(summary)
}
