//! Execution of matched transforms.

use polars::prelude::*;
use tracing::debug;

use super::Transform;
use crate::cleaner;
use crate::config::EngineConfig;
use crate::error::{Result, ResultExt, TransformError};
use crate::expression::SafeExpressionEvaluator;
use crate::utils::{ColumnKind, has_column, is_datetime_dtype, series_kind};

/// Output column of the email check when `valid_email` is free.
pub const EMAIL_FLAG_COLUMN: &str = "valid_email";

/// Output column of the age grouping.
pub const AGE_GROUP_COLUMN: &str = "age_group";

impl Transform {
    /// Apply the transform to `df`, returning the new dataset.
    ///
    /// `df` itself is never modified, so a failure leaves the caller's frame
    /// exactly as it was.
    pub fn apply(&self, df: &DataFrame, config: &EngineConfig) -> Result<DataFrame> {
        match self {
            Self::DropMissing => cleaner::drop_missing(df).context("Dropping rows with missing values"),
            Self::RemoveDuplicateRows => {
                cleaner::drop_duplicates(df, None).context("Removing duplicate rows")
            }
            Self::RemoveDuplicatesInColumn { column } => {
                require_column(df, column)?;
                cleaner::drop_duplicates(df, Some(column.as_str()))
                    .context(format!("Removing duplicates in '{}'", column))
            }
            Self::RenameColumn { from, to } => rename_column(df, from, to),
            Self::ConvertToNumeric { column } => convert_to_numeric(df, column),
            Self::ConvertToDatetime { column } => convert_to_datetime(df, column, config),
            Self::StandardizeText { column } => {
                let series = text_column(df, column)?;
                replace_column(df, column, cleaner::standardize_text(series)?)
            }
            Self::LowercaseTextColumns => {
                let (out, columns) = cleaner::lowercase_text_columns(df.clone())?;
                debug!("Lower-cased columns: {:?}", columns);
                Ok(out)
            }
            Self::StandardizeDates => {
                let (out, columns) = cleaner::standardize_date_columns(df.clone(), config)?;
                debug!("Converted date columns: {:?}", columns);
                Ok(out)
            }
            Self::ValidateEmail { column } => {
                let series = text_column(df, column)?;
                let output = self.output_column(df).unwrap_or_else(|| EMAIL_FLAG_COLUMN.to_string());
                add_column(df, cleaner::email_flags(series, &output)?)
            }
            Self::CreateAgeGroups { column } => {
                let series = numeric_column(df, column)?;
                add_column(
                    df,
                    cleaner::age_groups(series, &config.age_group_bins, AGE_GROUP_COLUMN)?,
                )
            }
            Self::FlagOutliers { column } => {
                let series = numeric_column(df, column)?;
                let output = format!("{}_is_outlier", column);
                add_column(
                    df,
                    cleaner::outlier_flags(series, config.outlier_iqr_multiplier, &output)?,
                )
            }
            Self::CreateFeature { name, expression } => {
                let series = SafeExpressionEvaluator::new(config).evaluate_feature(df, name, expression)?;
                add_column(df, series)
            }
            Self::FilterRows { condition } => {
                let mask = SafeExpressionEvaluator::new(config).evaluate_filter(df, condition)?;
                Ok(cleaner::filter_rows(df, &mask)?)
            }
        }
    }

    /// Name of the column an addition rule will create on `df`.
    pub fn output_column(&self, df: &DataFrame) -> Option<String> {
        match self {
            Self::ValidateEmail { column } => Some(if has_column(df, EMAIL_FLAG_COLUMN) {
                format!("{}_{}", column, EMAIL_FLAG_COLUMN)
            } else {
                EMAIL_FLAG_COLUMN.to_string()
            }),
            Self::CreateAgeGroups { .. } => Some(AGE_GROUP_COLUMN.to_string()),
            Self::FlagOutliers { column } => Some(format!("{}_is_outlier", column)),
            Self::CreateFeature { name, .. } => Some(name.clone()),
            _ => None,
        }
    }
}

fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    if !has_column(df, name) {
        return Err(TransformError::ColumnNotFound(name.to_string()));
    }
    Ok(df.column(name)?.as_materialized_series())
}

fn text_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    let series = require_column(df, name)?;
    match series_kind(series) {
        ColumnKind::Text | ColumnKind::Categorical => Ok(series),
        other => Err(TransformError::UnsupportedColumnType {
            column: name.to_string(),
            expected: ColumnKind::Text.to_string(),
            found: other.to_string(),
        }),
    }
}

fn numeric_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    let series = require_column(df, name)?;
    match series_kind(series) {
        ColumnKind::Numeric => Ok(series),
        other => Err(TransformError::UnsupportedColumnType {
            column: name.to_string(),
            expected: ColumnKind::Numeric.to_string(),
            found: other.to_string(),
        }),
    }
}

fn replace_column(df: &DataFrame, name: &str, series: Series) -> Result<DataFrame> {
    let mut out = df.clone();
    out.replace(name, series)
        .context(format!("Replacing column '{}'", name))?;
    Ok(out)
}

/// Insert or overwrite a column. A length mismatch is a defect in the
/// producing handler, not bad input.
fn add_column(df: &DataFrame, series: Series) -> Result<DataFrame> {
    if df.width() > 0 && series.len() != df.height() {
        return Err(TransformError::Internal(format!(
            "column '{}' has {} values for {} rows",
            series.name(),
            series.len(),
            df.height()
        )));
    }
    let mut out = df.clone();
    out.with_column(series)?;
    Ok(out)
}

fn rename_column(df: &DataFrame, from: &str, to: &str) -> Result<DataFrame> {
    require_column(df, from)?;
    if from == to {
        return Ok(df.clone());
    }
    if has_column(df, to) {
        return Err(TransformError::ColumnExists(to.to_string()));
    }
    let mut out = df.clone();
    out.rename(from, to.into())
        .context(format!("Renaming '{}' to '{}'", from, to))?;
    Ok(out)
}

fn non_null(series: &Series) -> usize {
    series.len() - series.null_count()
}

fn conversion_failed(column: &str, target: &str, reason: impl Into<String>) -> TransformError {
    TransformError::TypeConversionFailed {
        column: column.to_string(),
        target_type: target.to_string(),
        reason: reason.into(),
    }
}

fn convert_to_numeric(df: &DataFrame, column: &str) -> Result<DataFrame> {
    let series = require_column(df, column)?;
    let converted =
        cleaner::to_numeric(series).map_err(|e| conversion_failed(column, "numeric", e.to_string()))?;

    if converted.dtype() != &DataType::Float64 {
        return Err(conversion_failed(
            column,
            "numeric",
            format!("result has type {}", converted.dtype()),
        ));
    }
    if non_null(series) > 0 && non_null(&converted) == 0 {
        return Err(conversion_failed(column, "numeric", "no value could be parsed as a number"));
    }

    debug!(
        "Converted '{}' to numeric ({} values became missing)",
        column,
        converted.null_count().saturating_sub(series.null_count())
    );
    replace_column(df, column, converted)
}

fn convert_to_datetime(df: &DataFrame, column: &str, config: &EngineConfig) -> Result<DataFrame> {
    let series = require_column(df, column)?;
    let converted = cleaner::to_datetime(series, config)
        .map_err(|e| conversion_failed(column, "datetime", e.to_string()))?;

    if !is_datetime_dtype(converted.dtype()) {
        return Err(conversion_failed(
            column,
            "datetime",
            format!("result has type {}", converted.dtype()),
        ));
    }
    if non_null(series) > 0 && non_null(&converted) == 0 {
        return Err(conversion_failed(column, "datetime", "no value could be parsed as a date"));
    }

    replace_column(df, column, converted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    fn people() -> DataFrame {
        df!(
            "name" => ["Ann", "Bob", "Cid"],
            "age" => [-1i64, 5, 0],
            "email" => ["ann@x.com", "bob", "cid@y.org"],
        )
        .unwrap()
    }

    #[test]
    fn test_rename() {
        let transform = Transform::RenameColumn {
            from: "name".to_string(),
            to: "full_name".to_string(),
        };
        let out = transform.apply(&people(), &config()).unwrap();
        assert_eq!(
            out.get_column_names().iter().map(|c| c.as_str()).collect::<Vec<_>>(),
            vec!["full_name", "age", "email"]
        );
    }

    #[test]
    fn test_rename_onto_existing_column_fails() {
        let transform = Transform::RenameColumn {
            from: "name".to_string(),
            to: "age".to_string(),
        };
        let err = transform.apply(&people(), &config()).unwrap_err();
        assert!(matches!(err, TransformError::ColumnExists(ref c) if c == "age"));
    }

    #[test]
    fn test_convert_to_numeric_rejects_fully_non_numeric() {
        let transform = Transform::ConvertToNumeric {
            column: "name".to_string(),
        };
        let err = transform.apply(&people(), &config()).unwrap_err();
        assert_eq!(err.error_code(), "TYPE_CONVERSION_FAILED");
    }

    #[test]
    fn test_convert_to_numeric_mixed() {
        let df = df!("v" => ["1", "x", "3.5"]).unwrap();
        let transform = Transform::ConvertToNumeric {
            column: "v".to_string(),
        };
        let out = transform.apply(&df, &config()).unwrap();
        let values: Vec<Option<f64>> = out
            .column("v")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(values, vec![Some(1.0), None, Some(3.5)]);
    }

    #[test]
    fn test_convert_to_datetime() {
        let df = df!("d" => ["2024-01-15", "bad"]).unwrap();
        let transform = Transform::ConvertToDatetime {
            column: "d".to_string(),
        };
        let out = transform.apply(&df, &config()).unwrap();
        assert_eq!(
            out.column("d").unwrap().dtype(),
            &DataType::Datetime(TimeUnit::Milliseconds, None)
        );
    }

    #[test]
    fn test_standardize_text_requires_text() {
        let transform = Transform::StandardizeText {
            column: "age".to_string(),
        };
        let err = transform.apply(&people(), &config()).unwrap_err();
        assert_eq!(err.to_string(), "Column 'age' must be text, found numeric");
    }

    #[test]
    fn test_email_output_name_avoids_existing_column() {
        let transform = Transform::ValidateEmail {
            column: "email".to_string(),
        };
        let out = transform.apply(&people(), &config()).unwrap();
        assert!(has_column(&out, "valid_email"));

        let again = transform.apply(&out, &config()).unwrap();
        assert!(has_column(&again, "email_valid_email"));
    }

    #[test]
    fn test_outliers_require_numeric() {
        let transform = Transform::FlagOutliers {
            column: "name".to_string(),
        };
        let err = transform.apply(&people(), &config()).unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_COLUMN_TYPE");
    }

    #[test]
    fn test_filter_keeps_order() {
        let transform = Transform::FilterRows {
            condition: "age >= 0".to_string(),
        };
        let out = transform.apply(&people(), &config()).unwrap();
        let ages: Vec<Option<i64>> = out
            .column("age")
            .unwrap()
            .as_materialized_series()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(ages, vec![Some(5), Some(0)]);
    }

    #[test]
    fn test_create_feature_leaves_input_untouched() {
        let df = people();
        let transform = Transform::CreateFeature {
            name: "ratio".to_string(),
            expression: "price / sqft".to_string(),
        };
        assert!(transform.apply(&df, &config()).is_err());
        assert_eq!(df.width(), 3);

        let transform = Transform::CreateFeature {
            name: "age_next_year".to_string(),
            expression: "age + 1".to_string(),
        };
        let out = transform.apply(&df, &config()).unwrap();
        assert_eq!(out.width(), 4);
        assert_eq!(df.width(), 3);
    }
}
