//! Row-level CSV reading shared by every dataset parser.

use std::fmt;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::ImportError;

/// Why one data row was rejected. `row` counts the header as row 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub row: usize,
    pub column: String,
    pub message: String,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.column.is_empty() {
            write!(f, "row {}: {}", self.row, self.message)
        } else {
            write!(f, "row {} column '{}': {}", self.row, self.column, self.message)
        }
    }
}

/// A validation failure before the row number is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub column: String,
    pub message: String,
}

impl FieldError {
    pub fn new(column: &str, message: impl Into<String>) -> Self {
        Self {
            column: column.to_string(),
            message: message.into(),
        }
    }

    pub fn at(self, row: usize) -> RowError {
        RowError {
            row,
            column: self.column,
            message: self.message,
        }
    }
}

/// Every data row of one file, validated.
#[derive(Debug)]
pub struct RowSet<T> {
    pub rows: usize,
    /// `(row number, record)` in file order.
    pub valid: Vec<(usize, T)>,
    pub errors: Vec<RowError>,
}

/// Reads `path` with headers, trimming every field. Missing columns listed in
/// `required_columns` fail the whole file as a header error on row 1; everything
/// else is validated row by row through `convert`.
pub fn read_rows<R, T, F>(
    path: &Path,
    required_columns: &[&str],
    mut convert: F,
) -> Result<RowSet<T>, ImportError>
where
    R: DeserializeOwned,
    F: FnMut(R) -> Result<T, FieldError>,
{
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|source| ImportError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

    let headers = reader
        .headers()
        .map_err(|source| ImportError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .clone();
    if let Some(missing) = required_columns
        .iter()
        .find(|col| !headers.iter().any(|h| h == **col))
    {
        return Err(ImportError::Row(RowError {
            row: 1,
            column: missing.to_string(),
            message: format!("{} has no '{missing}' column", path.display()),
        }));
    }

    let mut set = RowSet {
        rows: 0,
        valid: Vec::new(),
        errors: Vec::new(),
    };

    for (index, result) in reader.deserialize::<R>().enumerate() {
        let row = index + 2;
        set.rows += 1;
        match result {
            Ok(raw) => match convert(raw) {
                Ok(record) => set.valid.push((row, record)),
                Err(e) => set.errors.push(e.at(row)),
            },
            Err(e) => set.errors.push(RowError {
                row,
                column: String::new(),
                message: format!("unreadable row: {e}"),
            }),
        }
    }

    Ok(set)
}

/// Non-empty value or a `missing value` error naming the column.
pub fn required(value: Option<String>, column: &str) -> Result<String, FieldError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| FieldError::new(column, "missing value"))
}

pub fn optional(value: Option<String>) -> String {
    value.unwrap_or_default()
}

pub fn parse_bool(value: Option<String>, column: &str, default: bool) -> Result<bool, FieldError> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("") => Ok(default),
        Some("true" | "1" | "yes" | "y") => Ok(true),
        Some("false" | "0" | "no" | "n") => Ok(false),
        Some(other) => Err(FieldError::new(column, format!("'{other}' is not a boolean"))),
    }
}

pub fn parse_positive_int(value: Option<String>, column: &str) -> Result<i32, FieldError> {
    let raw = required(value, column)?;
    match raw.parse::<i32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(FieldError::new(column, format!("'{raw}' is not a positive integer"))),
    }
}

pub fn parse_int_or(value: Option<String>, column: &str, default: i32) -> Result<i32, FieldError> {
    match value {
        None => Ok(default),
        Some(raw) if raw.is_empty() => Ok(default),
        Some(raw) => raw
            .parse::<i32>()
            .map_err(|_| FieldError::new(column, format!("'{raw}' is not an integer"))),
    }
}

/// Comma-separated list, blanks dropped.
pub fn split_list(value: Option<String>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
