//! Shared utilities for the recommendation engine.
//!
//! This module contains common helpers used across the transform handlers,
//! the validator and the expression evaluator.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Milliseconds in one day.
pub const MILLIS_PER_DAY: i64 = 86_400_000;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Runtime kind of a dataset column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Integer or floating point numbers
    Numeric,
    /// Free text
    Text,
    /// Date or datetime types
    Datetime,
    /// Boolean type
    Boolean,
    /// Categorical or enum buckets
    Categorical,
    /// Anything else (lists, structs, nulls)
    Other,
}

impl ColumnKind {
    /// Lower-case name used in messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Text => "text",
            Self::Datetime => "datetime",
            Self::Boolean => "boolean",
            Self::Categorical => "categorical",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check if a DataType is an integer type.
#[inline]
pub fn is_integer_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    is_integer_dtype(dtype) || matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Check if a DataType is a datetime type.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Datetime(_, _) | DataType::Date)
}

/// Get the runtime kind of a DataType.
pub fn column_kind(dtype: &DataType) -> ColumnKind {
    if is_numeric_dtype(dtype) {
        ColumnKind::Numeric
    } else if is_datetime_dtype(dtype) {
        ColumnKind::Datetime
    } else if matches!(dtype, DataType::Boolean) {
        ColumnKind::Boolean
    } else if matches!(dtype, DataType::String) {
        ColumnKind::Text
    } else if matches!(dtype, DataType::Categorical(..) | DataType::Enum(..)) {
        ColumnKind::Categorical
    } else {
        ColumnKind::Other
    }
}

/// Get the runtime kind of a Series.
pub fn series_kind(series: &Series) -> ColumnKind {
    column_kind(series.dtype())
}

// =============================================================================
// DataFrame Utilities
// =============================================================================

/// Check whether `name` is exactly a column of `df`.
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Names of all text-typed columns, in order.
pub fn text_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| col.dtype() == &DataType::String)
        .map(|col| col.name().to_string())
        .collect()
}

/// Read a Date or Datetime series as milliseconds since the Unix epoch.
pub fn datetime_millis(series: &Series) -> PolarsResult<Vec<Option<i64>>> {
    match series.dtype() {
        DataType::Datetime(unit, _) => {
            let divisor = match unit {
                TimeUnit::Nanoseconds => 1_000_000,
                TimeUnit::Microseconds => 1_000,
                TimeUnit::Milliseconds => 1,
            };
            let physical = series.cast(&DataType::Int64)?;
            Ok(physical
                .i64()?
                .into_iter()
                .map(|v| v.map(|v| v.div_euclid(divisor)))
                .collect())
        }
        DataType::Date => {
            let days = series.cast(&DataType::Int32)?;
            Ok(days
                .i32()?
                .into_iter()
                .map(|v| v.map(|d| d as i64 * MILLIS_PER_DAY))
                .collect())
        }
        other => Err(PolarsError::InvalidOperation(
            format!("expected a date or datetime column, found {}", other).into(),
        )),
    }
}

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Characters commonly used in numeric formatting that should be stripped.
pub const NUMERIC_FORMAT_CHARS: [char; 6] = [',', '$', '%', '€', '£', ' '];

/// Common error/missing value markers in data.
pub const ERROR_MARKERS: [&str; 10] = [
    "error", "unknown", "n/a", "na", "nan", "null", "missing", "none", "#n/a", "-",
];

/// Clean a string for numeric parsing by removing formatting characters.
///
/// # Example
///
/// ```rust,ignore
/// use lex_transform::utils::clean_numeric_string;
///
/// assert_eq!(clean_numeric_string("$1,234.56"), "1234.56");
/// assert_eq!(clean_numeric_string("  42%  "), "42");
/// ```
pub fn clean_numeric_string(s: &str) -> String {
    let mut result = s.trim().to_string();
    for c in NUMERIC_FORMAT_CHARS {
        result = result.replace(c, "");
    }
    result
}

/// Check if a string is an error/missing value marker.
pub fn is_error_marker(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    ERROR_MARKERS.iter().any(|&marker| lower == marker)
}

/// Try to parse a string as a numeric value (f64).
///
/// Handles currency symbols, percentages and thousands separators. Empty
/// strings, error markers and non-finite results are `None`.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() || is_error_marker(trimmed) {
        return None;
    }
    let cleaned = clean_numeric_string(trimmed);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

// =============================================================================
// Tests
// =============================================================================
