//! Data models for the analytics tables.
//!
//! This module contains the in-memory table loaded from a CSV file,
//! the cell interpretation rules shared by every dataset, and the
//! error type describing why a dataset was skipped.

use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Tokens treated as a missing value, in addition to the empty string.
const MISSING_TOKENS: &[&str] = &[
    "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "#N/A", "<NA>",
];

/// Reasons a dataset is left out of the output mapping.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// None of the candidate files exist.
    #[error("no source file found (tried {})", .tried.join(", "))]
    MissingFile { tried: Vec<String> },

    /// The file exists but could not be opened.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid delimited text.
    #[error("failed to parse {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A column the transform needs is absent.
    #[error("missing column '{0}'")]
    MissingColumn(String),

    /// A cell in a numeric column holds something other than a number.
    #[error("invalid number '{value}' in column '{column}' (row {row})")]
    InvalidNumber {
        column: String,
        row: usize,
        value: String,
    },

    /// The file has no header row.
    #[error("{} has no columns", .0.display())]
    Empty(PathBuf),
}

impl DatasetError {
    /// Whether the failure is just an absent file (expected in partial deployments).
    pub fn is_missing_file(&self) -> bool {
        matches!(self, DatasetError::MissingFile { .. })
    }
}

/// Result alias for dataset transforms.
pub type DatasetResult<T> = std::result::Result<T, DatasetError>;

/// Returns true if the raw cell text denotes a missing value.
pub fn is_missing(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || MISSING_TOKENS.contains(&trimmed)
}

/// Interpret a cell as a number.
///
/// `Ok(None)` for missing cells (including non-finite values),
/// `Err(())` when the text is present but not numeric.
pub fn parse_number(raw: &str) -> Result<Option<f64>, ()> {
    if is_missing(raw) {
        return Ok(None);
    }
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        Ok(_) => Ok(None),
        Err(_) => Err(()),
    }
}

/// Convert an optional float into JSON, mapping missing to `null`.
pub fn number_value(value: Option<f64>) -> Value {
    value
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Inferred JSON type of a whole column, used for row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Every present cell is an integer.
    Integer,
    /// Every present cell is numeric.
    Float,
    /// Anything else.
    Text,
}

impl ColumnKind {
    /// Infer the kind from a column's cells.
    pub fn infer<'a>(cells: impl IntoIterator<Item = &'a str>) -> Self {
        let mut kind = ColumnKind::Integer;
        for cell in cells {
            if is_missing(cell) {
                continue;
            }
            let cell = cell.trim();
            if cell.parse::<i64>().is_ok() {
                continue;
            }
            match cell.parse::<f64>() {
                Ok(_) => kind = ColumnKind::Float,
                Err(_) => return ColumnKind::Text,
            }
        }
        kind
    }

    /// Render one cell according to this kind.
    pub fn to_value(self, raw: &str) -> Value {
        if is_missing(raw) {
            return Value::Null;
        }
        let cell = raw.trim();
        match self {
            ColumnKind::Integer => cell
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or(Value::Null),
            ColumnKind::Float => number_value(cell.parse::<f64>().ok()),
            ColumnKind::Text => Value::String(cell.to_string()),
        }
    }
}

/// A table loaded from a delimited text file.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// Column names, in file order.
    pub headers: Vec<String>,
    /// Rows of raw cells. Every row has `headers.len()` cells.
    pub rows: Vec<Vec<String>>,
    index: HashMap<String, usize>,
}

impl RawTable {
    /// Build a table, padding or truncating rows to the header width.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_string(), i))
            .collect();
        Self {
            headers,
            rows,
            index,
        }
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Position of a column, or `MissingColumn`.
    pub fn column(&self, name: &str) -> DatasetResult<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))
    }

    /// Position of a column if present.
    pub fn optional_column(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Text of a cell, trimmed.
    pub fn text(&self, row: usize, col: usize) -> &str {
        self.rows[row][col].trim()
    }

    /// Numeric value of a cell, failing on non-numeric text.
    pub fn number(&self, row: usize, col: usize) -> DatasetResult<Option<f64>> {
        let raw = &self.rows[row][col];
        parse_number(raw).map_err(|_| DatasetError::InvalidNumber {
            column: self.headers[col].clone(),
            row,
            value: raw.clone(),
        })
    }

    /// Keep only rows whose `column` equals one of `values`.
    pub fn filter_in(&self, column: &str, values: &[&str]) -> DatasetResult<RawTable> {
        let col = self.column(column)?;
        let rows = self
            .rows
            .iter()
            .filter(|row| values.contains(&row[col].trim()))
            .cloned()
            .collect();
        Ok(RawTable::new(self.headers.clone(), rows))
    }

    /// Keep only rows whose `column` equals `value`.
    pub fn filter_eq(&self, column: &str, value: &str) -> DatasetResult<RawTable> {
        self.filter_in(column, &[value])
    }

    /// Keep the first `n` rows.
    pub fn head(&self, n: usize) -> RawTable {
        let rows = self.rows.iter().take(n).cloned().collect();
        RawTable::new(self.headers.clone(), rows)
    }

    /// Convert every row into a JSON object keyed by column name.
    pub fn to_records(&self) -> Vec<Value> {
        let kinds: Vec<ColumnKind> = (0..self.headers.len())
            .map(|col| ColumnKind::infer(self.rows.iter().map(|row| row[col].as_str())))
            .collect();

        self.rows
            .iter()
            .map(|row| {
                let record: Map<String, Value> = self
                    .headers
                    .iter()
                    .zip(row)
                    .zip(&kinds)
                    .map(|((name, raw), kind)| (name.clone(), kind.to_value(raw)))
                    .collect();
                Value::Object(record)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_missing_tokens() {
        assert!(is_missing(""));
        assert!(is_missing("  "));
        assert!(is_missing("NaN"));
        assert!(is_missing("NA"));
        assert!(!is_missing("0"));
        assert!(!is_missing("Germany"));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("12.5"), Ok(Some(12.5)));
        assert_eq!(parse_number(" 3 "), Ok(Some(3.0)));
        assert_eq!(parse_number("nan"), Ok(None));
        assert_eq!(parse_number("inf"), Ok(None));
        assert_eq!(parse_number("abc"), Err(()));
    }

    #[test]
    fn test_number_value_never_nan() {
        assert_eq!(number_value(Some(f64::NAN)), Value::Null);
        assert_eq!(number_value(None), Value::Null);
        assert_eq!(number_value(Some(1.5)), json!(1.5));
    }

    #[test]
    fn test_column_kind_inference() {
        assert_eq!(ColumnKind::infer(["1", "2", ""]), ColumnKind::Integer);
        assert_eq!(ColumnKind::infer(["1", "2.5", "NaN"]), ColumnKind::Float);
        assert_eq!(ColumnKind::infer(["1", "x"]), ColumnKind::Text);
        assert_eq!(ColumnKind::infer(Vec::<&str>::new()), ColumnKind::Integer);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let t = table(&["a", "b"], &[&["1"]]);
        assert_eq!(t.rows[0].len(), 2);
        assert_eq!(t.number(0, 1).unwrap(), None);
    }

    #[test]
    fn test_filter_and_missing_column() {
        let t = table(
            &["country", "pollutant_name"],
            &[&["A", "PM2.5"], &["B", "PM10"], &["C", " PM2.5 "]],
        );
        let filtered = t.filter_eq("pollutant_name", "PM2.5").unwrap();
        assert_eq!(filtered.len(), 2);

        let err = t.filter_eq("season_4", "Winter").unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn(ref c) if c == "season_4"));
    }

    #[test]
    fn test_invalid_number_reports_column() {
        let t = table(&["mean"], &[&["oops"]]);
        let err = t.number(0, 0).unwrap_err();
        assert!(err.to_string().contains("mean"));
    }

    #[test]
    fn test_to_records() {
        let t = table(
            &["country", "rmse", "n"],
            &[&["Spain", "4.2", "10"], &["Italy", "", "NaN"]],
        );
        let records = t.to_records();
        assert_eq!(
            records,
            vec![
                json!({"country": "Spain", "rmse": 4.2, "n": 10}),
                json!({"country": "Italy", "rmse": null, "n": null}),
            ]
        );
    }

    #[test]
    fn test_text_cells_are_trimmed() {
        let t = table(&["country", "station"], &[&["  Spain ", " Madrid-01"]]);
        assert_eq!(
            t.to_records(),
            vec![json!({"country": "Spain", "station": "Madrid-01"})]
        );
    }
}
