//! Configuration types for the recommendation engine.
//!
//! This module provides configuration options using the builder pattern.
//! All options tune how built-in transforms behave; none of them change which
//! rules exist or the order they are matched in.

use serde::{Deserialize, Serialize};

/// Default date-time formats tried (in order) after RFC 3339.
pub const DEFAULT_DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

/// Default date-only formats tried (in order) after the date-time formats.
pub const DEFAULT_DATE_FORMATS: [&str; 7] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d %B %Y",
    "%B %d, %Y",
];

/// Configuration for the recommendation engine.
///
/// Use [`EngineConfig::builder()`] to create a new configuration with a
/// fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use lex_transform::config::EngineConfig;
///
/// let config = EngineConfig::builder()
///     .outlier_iqr_multiplier(3.0)
///     .age_group_bins(vec![0.0, 30.0, 60.0, 120.0])
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Date-time formats (chrono syntax) tried when coercing text to datetime.
    pub datetime_formats: Vec<String>,

    /// Date-only formats (chrono syntax) tried after `datetime_formats`.
    pub date_formats: Vec<String>,

    /// Bin edges for `create age groups from column '<col>'`.
    /// Must be strictly increasing with at least two edges.
    /// Default: [0, 18, 35, 50, 100]
    pub age_group_bins: Vec<f64>,

    /// IQR multiplier for `flag outliers in column '<col>'`.
    /// Default: 1.5
    pub outlier_iqr_multiplier: f64,

    /// Maximum accepted length (in bytes) of a feature expression or filter
    /// condition.
    /// Default: 1024
    pub max_expression_length: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            datetime_formats: DEFAULT_DATETIME_FORMATS.iter().map(|s| s.to_string()).collect(),
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|s| s.to_string()).collect(),
            age_group_bins: vec![0.0, 18.0, 35.0, 50.0, 100.0],
            outlier_iqr_multiplier: 1.5,
            max_expression_length: 1024,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.age_group_bins.len() < 2 {
            return Err(ConfigValidationError::InvalidBins(
                "at least two bin edges are required".to_string(),
            ));
        }

        if self.age_group_bins.iter().any(|edge| !edge.is_finite()) {
            return Err(ConfigValidationError::InvalidBins(
                "bin edges must be finite".to_string(),
            ));
        }

        if self.age_group_bins.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(ConfigValidationError::InvalidBins(
                "bin edges must be strictly increasing".to_string(),
            ));
        }

        if !(self.outlier_iqr_multiplier.is_finite() && self.outlier_iqr_multiplier > 0.0) {
            return Err(ConfigValidationError::InvalidMultiplier(
                self.outlier_iqr_multiplier,
            ));
        }

        if self.max_expression_length == 0 {
            return Err(ConfigValidationError::InvalidExpressionLength);
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid age group bins: {0}")]
    InvalidBins(String),

    #[error("Invalid outlier IQR multiplier: {0} (must be a positive number)")]
    InvalidMultiplier(f64),

    #[error("Invalid max expression length: must be at least 1")]
    InvalidExpressionLength,
}

/// Builder for [`EngineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    datetime_formats: Option<Vec<String>>,
    date_formats: Option<Vec<String>>,
    age_group_bins: Option<Vec<f64>>,
    outlier_iqr_multiplier: Option<f64>,
    max_expression_length: Option<usize>,
}

impl EngineConfigBuilder {
    /// Replace the list of date-time formats.
    pub fn datetime_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.datetime_formats = Some(formats.into_iter().map(Into::into).collect());
        self
    }

    /// Replace the list of date-only formats.
    pub fn date_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.date_formats = Some(formats.into_iter().map(Into::into).collect());
        self
    }

    /// Set the bin edges used for age groups.
    pub fn age_group_bins(mut self, bins: Vec<f64>) -> Self {
        self.age_group_bins = Some(bins);
        self
    }

    /// Set the IQR multiplier used for outlier flags.
    pub fn outlier_iqr_multiplier(mut self, multiplier: f64) -> Self {
        self.outlier_iqr_multiplier = Some(multiplier);
        self
    }

    /// Set the maximum expression length.
    pub fn max_expression_length(mut self, length: usize) -> Self {
        self.max_expression_length = Some(length);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `EngineConfig` or an error if validation fails.
    pub fn build(self) -> Result<EngineConfig, ConfigValidationError> {
        let defaults = EngineConfig::default();
        let config = EngineConfig {
            datetime_formats: self.datetime_formats.unwrap_or(defaults.datetime_formats),
            date_formats: self.date_formats.unwrap_or(defaults.date_formats),
            age_group_bins: self.age_group_bins.unwrap_or(defaults.age_group_bins),
            outlier_iqr_multiplier: self
                .outlier_iqr_multiplier
                .unwrap_or(defaults.outlier_iqr_multiplier),
            max_expression_length: self
                .max_expression_length
                .unwrap_or(defaults.max_expression_length),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.age_group_bins, vec![0.0, 18.0, 35.0, 50.0, 100.0]);
        assert_eq!(config.outlier_iqr_multiplier, 1.5);
        assert_eq!(config.max_expression_length, 1024);
        assert!(config.datetime_formats.iter().any(|f| f == "%Y-%m-%d %H:%M:%S"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = EngineConfig::builder()
            .outlier_iqr_multiplier(3.0)
            .age_group_bins(vec![0.0, 65.0, 120.0])
            .date_formats(["%d.%m.%Y"])
            .max_expression_length(64)
            .build()
            .unwrap();

        assert_eq!(config.outlier_iqr_multiplier, 3.0);
        assert_eq!(config.age_group_bins, vec![0.0, 65.0, 120.0]);
        assert_eq!(config.date_formats, vec!["%d.%m.%Y".to_string()]);
        assert_eq!(config.max_expression_length, 64);
    }

    #[test]
    fn test_validation_rejects_unsorted_bins() {
        let result = EngineConfig::builder()
            .age_group_bins(vec![0.0, 50.0, 18.0])
            .build();

        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidBins(_)
        ));
    }

    #[test]
    fn test_validation_rejects_single_bin_edge() {
        let result = EngineConfig::builder().age_group_bins(vec![10.0]).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_rejects_non_positive_multiplier() {
        let result = EngineConfig::builder().outlier_iqr_multiplier(0.0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidMultiplier(_)
        ));
    }

    #[test]
    fn test_validation_rejects_zero_expression_length() {
        let result = EngineConfig::builder().max_expression_length(0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidExpressionLength
        ));
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "datetime_formats": ["%Y-%m-%d %H:%M"],
            "date_formats": ["%Y-%m-%d"],
            "age_group_bins": [0, 21, 65, 120],
            "outlier_iqr_multiplier": 2.0,
            "max_expression_length": 256
        }"#;

        let config: EngineConfig = serde_json::from_str(json).expect("Should deserialize");
        assert_eq!(config.age_group_bins, vec![0.0, 21.0, 65.0, 120.0]);
        assert_eq!(config.outlier_iqr_multiplier, 2.0);
        assert!(config.validate().is_ok());
    }
}
