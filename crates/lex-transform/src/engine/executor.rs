//! The recommendation engine: a left-to-right fold over a batch.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::engine::builder::RecommendationEngineBuilder;
use crate::engine::outcome::{OutcomeReporter, OutcomeStatus, RecommendationOutcome};
use crate::error::{EngineError, Result, TransformError};
use crate::rules::{RecommendationParser, RuleId, RuleKind, Transform};
use crate::types::{ExecutionResult, FailedRecommendation};
use crate::utils::has_column;
use crate::validator::Validator;

/// Applies free-text recommendations to a dataset.
///
/// The engine holds no per-dataset state: every call to
/// [`apply`](Self::apply) starts from the frame it is given and returns a
/// new one. The caller's frame is never modified.
pub struct RecommendationEngine {
    config: EngineConfig,
    parser: RecommendationParser,
    validator: Validator,
    outcome_reporter: Option<Arc<dyn OutcomeReporter>>,
}

static_assertions::assert_impl_all!(RecommendationEngine: Send, Sync);

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::from_parts(EngineConfig::default(), RecommendationParser::default(), None)
    }
}

/// How a recommendation would be handled, without running it.
#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    pub recommendation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<RuleId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<RuleKind>,
    pub params: Vec<String>,
    /// Precondition failure against the frame that was classified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<String>,
}

impl RecommendationEngine {
    /// Engine with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> RecommendationEngineBuilder {
        RecommendationEngineBuilder::default()
    }

    pub(crate) fn from_parts(
        config: EngineConfig,
        parser: RecommendationParser,
        outcome_reporter: Option<Arc<dyn OutcomeReporter>>,
    ) -> Self {
        Self {
            config,
            parser,
            validator: Validator,
            outcome_reporter,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn parser(&self) -> &RecommendationParser {
        &self.parser
    }

    /// Apply `recommendations` in order.
    ///
    /// Each recommendation is matched, validated against the current working
    /// frame and executed. Unmatched text is skipped; validation and
    /// execution failures are recorded and leave the working frame as it
    /// was. Only a broken dataset invariant aborts the batch.
    pub fn apply<S: AsRef<str>>(
        &self,
        df: &DataFrame,
        recommendations: &[S],
    ) -> std::result::Result<(DataFrame, ExecutionResult), EngineError> {
        let start = Instant::now();
        let total = recommendations.len();

        info!(
            "Applying {} recommendations to {} rows x {} columns",
            total,
            df.height(),
            df.width()
        );

        let mut current = df.clone();
        let mut result = ExecutionResult {
            rows_before: df.height(),
            columns_before: df.width(),
            ..Default::default()
        };

        for (index, recommendation) in recommendations.iter().enumerate() {
            let text = recommendation.as_ref();

            let Some((rule, transform)) = self.parser.match_recommendation(text) else {
                debug!("Skipped: {}", text);
                result.skipped.push(text.to_string());
                self.report(index, total, text, OutcomeStatus::Skipped, None, None);
                continue;
            };

            let expected_column = transform.output_column(&current);
            match self.run(&transform, &current) {
                Ok(next) => {
                    check_invariants(text, &next, expected_column.as_deref())?;
                    info!(
                        "Applied [{}] '{}' ({} rows x {} columns)",
                        rule.id(),
                        text,
                        next.height(),
                        next.width()
                    );
                    current = next;
                    result.applied.push(text.to_string());
                    self.report(index, total, text, OutcomeStatus::Applied, Some(rule.id()), None);
                }
                Err(e) if e.is_fatal() => {
                    error!("Aborting batch at '{}': {}", text, e);
                    return Err(EngineError::Internal {
                        recommendation: text.to_string(),
                        source: e,
                    });
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!("Failed [{}] '{}': {}", rule.id(), text, message);
                    result.errors.push(FailedRecommendation::new(text, message.clone()));
                    self.report(
                        index,
                        total,
                        text,
                        OutcomeStatus::Failed,
                        Some(rule.id()),
                        Some(message),
                    );
                }
            }
        }

        result.rows_after = current.height();
        result.columns_after = current.width();
        result.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Batch complete: {} applied, {} skipped, {} failed in {}ms",
            result.applied.len(),
            result.skipped.len(),
            result.errors.len(),
            result.duration_ms
        );

        Ok((current, result))
    }

    /// Match and validate each recommendation against `df` without
    /// executing anything.
    ///
    /// Validation always runs against `df` itself, so a recommendation that
    /// depends on an earlier rename or new column reports that column as
    /// missing here even though [`apply`](Self::apply) would succeed.
    pub fn classify<S: AsRef<str>>(&self, df: &DataFrame, recommendations: &[S]) -> Vec<Classification> {
        recommendations
            .iter()
            .map(|recommendation| {
                let text = recommendation.as_ref();
                match self.parser.match_recommendation(text) {
                    None => Classification {
                        recommendation: text.to_string(),
                        rule: None,
                        kind: None,
                        params: Vec::new(),
                        validation_error: None,
                    },
                    Some((rule, transform)) => Classification {
                        recommendation: text.to_string(),
                        rule: Some(rule.id()),
                        kind: Some(rule.kind()),
                        params: transform.params().into_iter().map(String::from).collect(),
                        validation_error: self
                            .validator
                            .check(&transform, df)
                            .err()
                            .map(|e| e.to_string()),
                    },
                }
            })
            .collect()
    }

    fn run(&self, transform: &Transform, df: &DataFrame) -> Result<DataFrame> {
        self.validator.check(transform, df)?;
        transform.apply(df, &self.config)
    }

    fn report(
        &self,
        index: usize,
        total: usize,
        recommendation: &str,
        status: OutcomeStatus,
        rule: Option<RuleId>,
        message: Option<String>,
    ) {
        if let Some(reporter) = &self.outcome_reporter {
            reporter.report(RecommendationOutcome {
                index,
                total,
                recommendation: recommendation.to_string(),
                status,
                rule,
                message,
            });
        }
    }
}

/// Dataset invariants that must hold after every applied recommendation.
fn check_invariants(
    recommendation: &str,
    df: &DataFrame,
    expected_column: Option<&str>,
) -> std::result::Result<(), EngineError> {
    let violated = |reason: String| EngineError::InvariantViolated {
        recommendation: recommendation.to_string(),
        reason,
    };

    let mut names = HashSet::with_capacity(df.width());
    for column in df.get_columns() {
        if !names.insert(column.name().as_str()) {
            return Err(violated(format!("duplicate column name '{}'", column.name())));
        }
        if column.len() != df.height() {
            return Err(violated(format!(
                "column '{}' has {} values for {} rows",
                column.name(),
                column.len(),
                df.height()
            )));
        }
    }

    if let Some(name) = expected_column
        && !has_column(df, name)
    {
        return Err(violated(TransformError::FeatureNotCreated(name.to_string()).to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    fn homes() -> DataFrame {
        df!(
            "price" => [100.0, 200.0, 300.0],
            "sqft" => [10.0, 20.0, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn test_unmatched_text_is_skipped() {
        let engine = RecommendationEngine::new();
        let df = homes();
        let recs = ["think about outliers", "maybe impute"];
        let (out, result) = engine.apply(&df, &recs).unwrap();

        assert!(result.applied.is_empty());
        assert!(result.errors.is_empty());
        assert_eq!(result.skipped, vec!["think about outliers", "maybe impute"]);
        assert!(out.equals_missing(&df));
    }

    #[test]
    fn test_failure_leaves_working_frame() {
        let engine = RecommendationEngine::new();
        let recs = [
            "create new feature 'ratio' as price / area",
            "create new feature 'ratio' as price / sqft",
        ];
        let (out, result) = engine.apply(&homes(), &recs).unwrap();

        assert_eq!(result.applied, vec!["create new feature 'ratio' as price / sqft"]);
        assert_eq!(
            result.error_messages(),
            vec!["create new feature 'ratio' as price / area - Invalid expression: price / area"]
        );
        assert_eq!(out.width(), 3);
        assert_eq!(result.columns_before, 2);
        assert_eq!(result.columns_after, 3);
    }

    #[test]
    fn test_outcomes_are_reported_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let engine = RecommendationEngine::builder()
            .on_outcome(move |outcome| seen_clone.lock().push((outcome.index, outcome.status)))
            .build()
            .unwrap();

        let recs = ["drop missing values", "nonsense", "rename column 'x' to 'y'"];
        engine.apply(&homes(), &recs).unwrap();

        assert_eq!(
            *seen.lock(),
            vec![
                (0, OutcomeStatus::Applied),
                (1, OutcomeStatus::Skipped),
                (2, OutcomeStatus::Failed),
            ]
        );
    }

    #[test]
    fn test_classify() {
        let engine = RecommendationEngine::new();
        let recs = ["convert column 'price' to numeric", "convert column 'cost' to numeric", "hmm"];
        let classified = engine.classify(&homes(), &recs);

        assert_eq!(classified[0].rule, Some(RuleId::ConvertToNumeric));
        assert_eq!(classified[0].validation_error, None);
        assert_eq!(
            classified[1].validation_error.as_deref(),
            Some("Column 'cost' not found")
        );
        assert_eq!(classified[2].rule, None);
    }

    #[test]
    fn test_invariants_detect_missing_feature() {
        let err = check_invariants("create new feature 'x' as 1", &homes(), Some("x")).unwrap_err();
        assert_eq!(err.error_code(), "INVARIANT_VIOLATED");
        assert!(err.to_string().contains("Feature 'x' was not created"));
    }
}
