//! Чтение и запись CSV через polars

use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use polars::prelude::*;

use crate::error::Result;
use crate::frame::numeric_as_float;

/// Ячейки, которые читаются как пропуск. Сравнение точное, без trim:
/// " " остается строкой.
pub const MISSING_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_missing_token(cell: &str) -> bool {
    MISSING_TOKENS.contains(&cell)
}

/// Тип колонки выводится по всему файлу, а не по первым строкам
fn read_options() -> CsvReadOptions {
    let null_values: Vec<PlSmallStr> = MISSING_TOKENS.iter().map(|token| (*token).into()).collect();
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_parse_options(
            CsvParseOptions::default().with_null_values(Some(NullValues::AllColumns(null_values))),
        )
}

pub fn read_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let file = File::open(path.as_ref())?;
    let df = read_options().into_reader_with_file_handle(file).finish()?;
    numeric_as_float(df)
}

pub fn read_csv_from<R: Read>(mut reader: R) -> Result<DataFrame> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let df = read_options()
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;
    numeric_as_float(df)
}

pub fn write_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let mut file = File::create(path.as_ref())?;
    write_csv_to(df, &mut file)
}

pub fn write_csv_to<W: Write>(df: &mut DataFrame, writer: W) -> Result<()> {
    CsvWriter::new(writer).include_header(true).finish(df)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{float_values, text_values};

    #[test]
    fn test_infers_column_types() {
        let data = "age,bp,classification\n48,80,ckd\n7,,notckd\n62,?,ckd\n";
        let df = read_csv_from(data.as_bytes()).unwrap();

        assert_eq!(df.height(), 3);
        assert_eq!(df.column("age").unwrap().dtype(), &DataType::Float64);
        // "?" не число, колонка остается строковой
        assert_eq!(df.column("bp").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("bp").unwrap().null_count(), 1);
        assert_eq!(df.column("classification").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_late_text_value_makes_column_text() {
        let mut data = String::from("id,pcv\n");
        for i in 0..250 {
            data.push_str(&format!("{},{}\n", i, 30 + i % 20));
        }
        data.push_str("250,\t?\n");

        let df = read_csv_from(data.as_bytes()).unwrap();
        assert_eq!(df.height(), 251);
        assert_eq!(df.column("pcv").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("id").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn test_missing_tokens() {
        let data = "id,glucose\n1,148\n2,NaN\n3,\n4,85\n5,#N/A N/A\n6,1.#QNAN\n";
        let df = read_csv_from(data.as_bytes()).unwrap();
        assert_eq!(
            float_values(&df, "glucose").unwrap(),
            vec![Some(148.0), None, None, Some(85.0), None, None]
        );
    }

    #[test]
    fn test_whitespace_cell_is_not_missing() {
        let df = read_csv_from("a,b\n1, \n2,x\n".as_bytes()).unwrap();
        assert_eq!(
            text_values(&df, "b").unwrap(),
            vec![Some(" ".to_string()), Some("x".to_string())]
        );
        assert!(!is_missing_token(" "));
        assert!(is_missing_token("-1.#IND"));
    }

    #[test]
    fn test_write_then_read_keeps_values() {
        let mut df = DataFrame::new(vec![
            Series::new("x".into(), vec![1.5, -0.25]).into(),
            Series::new("name".into(), vec![Some("phon_R01_S01_1"), None]).into(),
        ])
        .unwrap();

        let mut buffer = Vec::new();
        write_csv_to(&mut df, &mut buffer).unwrap();
        let text = String::from_utf8(buffer.clone()).unwrap();
        assert!(text.starts_with("x,name\n1.5,phon_R01_S01_1\n"));

        let back = read_csv_from(buffer.as_slice()).unwrap();
        assert!(back.equals_missing(&df));
    }

    #[test]
    fn test_write_csv_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heart_clean.csv");
        let mut df = DataFrame::new(vec![Series::new("target".into(), vec![0.0, 1.0]).into()]).unwrap();

        write_csv(&mut df, &path).unwrap();
        let back = read_csv(&path).unwrap();
        assert_eq!(float_values(&back, "target").unwrap(), vec![Some(0.0), Some(1.0)]);
    }
}
