//! Очистка строковых и "почти числовых" колонок

use polars::prelude::*;

use crate::error::Result;
use crate::frame::{column_series, is_text};

pub use crate::frame::text_columns;

/// Обрезает пробелы в строковых колонках; пропуски остаются пропусками.
/// Числовые колонки не трогаем.
pub fn strip_whitespace(df: &mut DataFrame, columns: &[String]) -> Result<()> {
    for name in columns {
        let series = column_series(df, name)?;
        if !is_text(series) {
            continue;
        }
        let stripped: Vec<Option<String>> = series
            .str()?
            .into_iter()
            .map(|value| value.map(|s| s.trim().to_string()))
            .collect();
        let stripped = Series::new(series.name().clone(), stripped);
        df.with_column(stripped)?;
    }
    Ok(())
}

fn parse_cell(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Приводит колонку к Float64; нечисловые ячейки становятся пропусками.
/// Возвращает число потерянных значений.
pub fn coerce_numeric(df: &mut DataFrame, name: &str) -> Result<usize> {
    let series = column_series(df, name)?;
    if !is_text(series) {
        return Ok(0);
    }

    let before = series.len() - series.null_count();
    let coerced: Vec<Option<f64>> = series
        .str()?
        .into_iter()
        .map(|value| value.and_then(parse_cell))
        .collect();
    let coerced = Series::new(series.name().clone(), coerced);
    let lost = before - (coerced.len() - coerced.null_count());

    df.with_column(coerced)?;
    Ok(lost)
}
