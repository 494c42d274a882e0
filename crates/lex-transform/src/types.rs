//! Result types returned by the engine.

use serde::ser::Serializer;
use serde::Serialize;

/// A recommendation that matched a rule but could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRecommendation {
    pub recommendation: String,
    pub message: String,
}

impl FailedRecommendation {
    pub fn new(recommendation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            recommendation: recommendation.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FailedRecommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.recommendation, self.message)
    }
}

/// Serialized as the rendered `"<text> - <message>"` string.
impl Serialize for FailedRecommendation {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Outcome of applying a batch of recommendations.
///
/// Every input recommendation lands in exactly one of `applied`, `skipped`
/// or `errors`, in input order within each list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionResult {
    /// Recommendations that matched a rule and were applied.
    pub applied: Vec<String>,
    /// Recommendations that matched no rule.
    pub skipped: Vec<String>,
    /// Recommendations that matched a rule but failed.
    pub errors: Vec<FailedRecommendation>,
    pub rows_before: usize,
    pub rows_after: usize,
    pub columns_before: usize,
    pub columns_after: usize,
    /// Wall-clock time spent in `apply`.
    pub duration_ms: u64,
}

impl ExecutionResult {
    /// Total number of recommendations processed.
    pub fn total(&self) -> usize {
        self.applied.len() + self.skipped.len() + self.errors.len()
    }

    /// True when nothing failed.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors rendered as `"<text> - <message>"`.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// Net change in row count (negative when rows were removed).
    pub fn rows_delta(&self) -> i64 {
        self.rows_after as i64 - self.rows_before as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_failed_recommendation_rendering() {
        let failed = FailedRecommendation::new("rename column 'A' to 'B'", "Column 'A' not found");
        assert_eq!(failed.to_string(), "rename column 'A' to 'B' - Column 'A' not found");
        assert_eq!(
            serde_json::to_string(&failed).unwrap(),
            r#""rename column 'A' to 'B' - Column 'A' not found""#
        );
    }

    #[test]
    fn test_execution_result_counts() {
        let result = ExecutionResult {
            applied: vec!["drop missing values".to_string()],
            skipped: vec!["hello".to_string()],
            errors: vec![FailedRecommendation::new("x", "y")],
            rows_before: 10,
            rows_after: 7,
            ..Default::default()
        };
        assert_eq!(result.total(), 3);
        assert!(!result.is_clean());
        assert_eq!(result.error_messages(), vec!["x - y".to_string()]);
        assert_eq!(result.rows_delta(), -3);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["errors"][0], "x - y");
        assert_eq!(json["rows_after"], 7);
    }
}
