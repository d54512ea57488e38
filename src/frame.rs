//! Помощники над polars DataFrame: доступ к колонкам, пропуски, матрица признаков

use ndarray::Array2;
use polars::prelude::*;

use crate::error::{PipelineError, Result};

/// Колонка как Series; отсутствие колонки - `ColumnNotFound`
pub fn column_series<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(|column| column.as_materialized_series())
        .map_err(|_| PipelineError::ColumnNotFound(name.to_string()))
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

pub fn is_text(series: &Series) -> bool {
    series.dtype() == &DataType::String
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|name| name.to_string()).collect()
}

/// Имена всех строковых колонок в порядке таблицы
pub fn text_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|column| column.dtype() == &DataType::String)
        .map(|column| column.name().to_string())
        .collect()
}

pub fn numeric_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|column| column.dtype() != &DataType::String)
        .map(|column| column.name().to_string())
        .collect()
}

pub fn missing_count(df: &DataFrame) -> usize {
    df.get_columns().iter().map(|column| column.null_count()).sum()
}

/// Переименование по парам (источник, новое имя).
/// Отсутствующие колонки молча пропускаются.
pub fn rename_columns(df: &mut DataFrame, pairs: &[(String, String)]) -> Result<usize> {
    let mut renamed = 0;
    for (from, to) in pairs {
        if from == to || !has_column(df, from) {
            continue;
        }
        df.rename(from, to.as_str().into())?;
        renamed += 1;
    }
    Ok(renamed)
}

/// Приводит все нестроковые колонки к Float64
pub fn numeric_as_float(mut df: DataFrame) -> Result<DataFrame> {
    for name in numeric_columns(&df) {
        let series = column_series(&df, &name)?;
        if series.dtype() != &DataType::Float64 {
            let cast = series.cast(&DataType::Float64)?;
            df.with_column(cast)?;
        }
    }
    Ok(df)
}

fn first_text(series: &Series) -> Result<String> {
    Ok(series
        .str()?
        .into_iter()
        .flatten()
        .next()
        .unwrap_or_default()
        .to_string())
}

/// Значения числовой колонки; строковая колонка - `NonNumeric`
pub fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = column_series(df, name)?;
    if is_text(series) {
        return Err(PipelineError::NonNumeric {
            column: name.to_string(),
            value: first_text(series)?,
        });
    }
    let series = series.cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().collect())
}

pub fn text_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = column_series(df, name)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}

/// Матрица признаков (строки x колонки) из числовых колонок без пропусков
pub fn to_matrix(df: &DataFrame, names: &[String]) -> Result<Array2<f64>> {
    let columns = names
        .iter()
        .map(|name| {
            float_values(df, name)?
                .into_iter()
                .enumerate()
                .map(|(row, value)| {
                    value.ok_or_else(|| PipelineError::MissingValue {
                        column: name.clone(),
                        row,
                    })
                })
                .collect::<Result<Vec<f64>>>()
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    Ok(Array2::from_shape_fn((df.height(), names.len()), |(r, c)| {
        columns[c][r]
    }))
}
