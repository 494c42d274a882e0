//! Lenient column type conversions.
//!
//! Individual values that cannot be parsed become missing; a conversion
//! only fails when the column as a whole has a type that cannot be coerced.

use anyhow::{Result, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use tracing::debug;

use crate::config::EngineConfig;
use crate::utils::{is_datetime_dtype, is_error_marker, is_numeric_dtype, parse_numeric_string};

const DATETIME_MS: DataType = DataType::Datetime(TimeUnit::Milliseconds, None);

/// Interpret an integer as a Unix timestamp in seconds or milliseconds.
///
/// Only values in a plausible range (roughly 2001 to 2033) are accepted.
pub(crate) fn unix_millis(timestamp: i64) -> Option<i64> {
    if timestamp > 1_000_000_000 && timestamp < 2_000_000_000 {
        Some(timestamp * 1000)
    } else if timestamp > 1_000_000_000_000 && timestamp < 2_000_000_000_000 {
        Some(timestamp)
    } else {
        None
    }
}

/// Parse a date or date-time string using RFC 3339 and the configured
/// formats. Returns milliseconds since the Unix epoch (UTC).
pub(crate) fn parse_datetime_text(text: &str, config: &EngineConfig) -> Option<i64> {
    let trimmed = text.trim();
    if trimmed.is_empty() || is_error_marker(trimmed) {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.timestamp_millis());
    }

    for format in &config.datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }

    for format in &config.date_formats {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format)
            && let Some(dt) = date.and_hms_opt(0, 0, 0)
        {
            return Some(dt.and_utc().timestamp_millis());
        }
    }

    None
}

/// Parse a datetime string, falling back to Unix timestamps.
pub fn parse_datetime_millis(text: &str, config: &EngineConfig) -> Option<i64> {
    parse_datetime_text(text, config).or_else(|| {
        text.trim()
            .parse::<i64>()
            .ok()
            .and_then(unix_millis)
    })
}

/// Coerce a column to `Float64`.
pub(crate) fn to_numeric(series: &Series) -> Result<Series> {
    let dtype = series.dtype();

    if is_numeric_dtype(dtype) || dtype == &DataType::Boolean {
        return Ok(series.cast(&DataType::Float64)?);
    }

    match dtype {
        DataType::String => Ok(strings_to_numeric(series.name().clone(), series.str()?)),
        DataType::Categorical(..) | DataType::Enum(..) => {
            let text = series.cast(&DataType::String)?;
            Ok(strings_to_numeric(series.name().clone(), text.str()?))
        }
        DataType::Null => Ok(Series::new(
            series.name().clone(),
            vec![None::<f64>; series.len()],
        )),
        other => bail!("cannot coerce {} values to numbers", other),
    }
}

fn strings_to_numeric(name: PlSmallStr, values: &StringChunked) -> Series {
    let parsed: Vec<Option<f64>> = values
        .into_iter()
        .map(|v| v.and_then(parse_numeric_string))
        .collect();
    Series::new(name, parsed)
}

/// Coerce a column to `Datetime(Milliseconds)`.
pub(crate) fn to_datetime(series: &Series, config: &EngineConfig) -> Result<Series> {
    let dtype = series.dtype();

    if dtype == &DATETIME_MS {
        return Ok(series.clone());
    }
    if is_datetime_dtype(dtype) {
        return Ok(series.cast(&DATETIME_MS)?);
    }

    let name = series.name().clone();
    let millis: Vec<Option<i64>> = match dtype {
        DataType::String => series
            .str()?
            .into_iter()
            .map(|v| v.and_then(|s| parse_datetime_millis(s, config)))
            .collect(),
        DataType::Categorical(..) | DataType::Enum(..) => series
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|v| v.and_then(|s| parse_datetime_millis(s, config)))
            .collect(),
        dt if is_numeric_dtype(dt) => series
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|v| v.and_then(unix_millis))
            .collect(),
        DataType::Null => vec![None; series.len()],
        other => bail!("cannot coerce {} values to datetimes", other),
    };

    Ok(Series::new(name, millis).cast(&DATETIME_MS)?)
}

/// Convert every text column whose non-missing values all parse as dates.
///
/// Columns with any unparsable value, or with no values at all, are left
/// untouched. Returns the converted column names.
pub(crate) fn standardize_date_columns(
    mut df: DataFrame,
    config: &EngineConfig,
) -> PolarsResult<(DataFrame, Vec<String>)> {
    let mut converted = Vec::new();

    for name in crate::utils::text_columns(&df) {
        let series = df.column(&name)?.as_materialized_series();
        let values = series.str()?;

        let mut parsed = Vec::with_capacity(values.len());
        let mut complete = true;
        let mut seen = 0usize;
        for value in values.into_iter() {
            match value {
                None => parsed.push(None),
                Some(text) => match parse_datetime_text(text, config) {
                    Some(ms) => {
                        seen += 1;
                        parsed.push(Some(ms));
                    }
                    None => {
                        complete = false;
                        break;
                    }
                },
            }
        }

        if !complete || seen == 0 {
            debug!("Column '{}' left as text", name);
            continue;
        }

        let datetimes = Series::new(name.as_str().into(), parsed).cast(&DATETIME_MS)?;
        df.replace(&name, datetimes)?;
        converted.push(name);
    }

    Ok((df, converted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const JAN_15_2024: i64 = 1_705_276_800_000;

    #[test]
    fn test_parse_datetime_formats() {
        let config = EngineConfig::default();
        assert_eq!(parse_datetime_millis("2024-01-15", &config), Some(JAN_15_2024));
        assert_eq!(parse_datetime_millis("2024/01/15", &config), Some(JAN_15_2024));
        assert_eq!(parse_datetime_millis("15 January 2024", &config), Some(JAN_15_2024));
        assert_eq!(
            parse_datetime_millis("2024-01-15T00:00:00Z", &config),
            Some(JAN_15_2024)
        );
        assert_eq!(
            parse_datetime_millis("2024-01-15 01:00:00", &config),
            Some(JAN_15_2024 + 3_600_000)
        );
        assert_eq!(parse_datetime_millis("1705276800", &config), Some(JAN_15_2024));
        assert_eq!(parse_datetime_millis("n/a", &config), None);
        assert_eq!(parse_datetime_millis("tomorrow", &config), None);
    }

    #[test]
    fn test_to_numeric_is_lenient() {
        let series = Series::new("price".into(), &[Some("$1,200"), Some("abc"), None, Some("3.5")]);
        let result = to_numeric(&series).unwrap();
        assert_eq!(result.dtype(), &DataType::Float64);
        let values: Vec<Option<f64>> = result.f64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(1200.0), None, None, Some(3.5)]);
    }

    #[test]
    fn test_to_numeric_from_integers() {
        let series = Series::new("n".into(), &[1i64, 2]);
        let result = to_numeric(&series).unwrap();
        assert_eq!(result.dtype(), &DataType::Float64);
    }

    #[test]
    fn test_to_datetime_from_text() {
        let config = EngineConfig::default();
        let series = Series::new("d".into(), &[Some("2024-01-15"), Some("garbage"), None]);
        let result = to_datetime(&series, &config).unwrap();
        assert_eq!(result.dtype(), &DATETIME_MS);
        assert_eq!(result.null_count(), 2);
    }

    #[test]
    fn test_to_datetime_from_unix_seconds() {
        let config = EngineConfig::default();
        let series = Series::new("t".into(), &[1_705_276_800i64, 5]);
        let result = to_datetime(&series, &config).unwrap();
        assert_eq!(result.null_count(), 1);
    }

    #[test]
    fn test_standardize_date_columns_is_all_or_nothing() {
        let config = EngineConfig::default();
        let df = df!(
            "joined" => [Some("2024-01-15"), None, Some("2023/12/01")],
            "mixed" => ["2024-01-15", "soon", "2023-01-01"],
            "name" => ["a", "b", "c"],
        )
        .unwrap();

        let (df, converted) = standardize_date_columns(df, &config).unwrap();
        assert_eq!(converted, vec!["joined".to_string()]);
        assert_eq!(df.column("joined").unwrap().dtype(), &DATETIME_MS);
        assert_eq!(df.column("mixed").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("name").unwrap().dtype(), &DataType::String);
    }
}
