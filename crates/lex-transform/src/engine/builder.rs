//! Builder for [`RecommendationEngine`].

use std::sync::Arc;

use crate::config::{ConfigValidationError, EngineConfig};
use crate::engine::RecommendationEngine;
use crate::engine::outcome::{ClosureOutcomeReporter, OutcomeReporter, RecommendationOutcome};
use crate::rules::RecommendationParser;

/// Fluent constructor for a [`RecommendationEngine`].
///
/// # Example
///
/// ```rust,ignore
/// use lex_transform::{EngineConfig, RecommendationEngine};
///
/// let engine = RecommendationEngine::builder()
///     .config(EngineConfig::builder().outlier_iqr_multiplier(3.0).build()?)
///     .on_outcome(|outcome| println!("{:?}: {}", outcome.status, outcome.recommendation))
///     .build()?;
///
/// let (df, result) = engine.apply(&df, &["drop missing values"])?;
/// ```
#[derive(Default)]
pub struct RecommendationEngineBuilder {
    config: Option<EngineConfig>,
    outcome_reporter: Option<Arc<dyn OutcomeReporter>>,
}

static_assertions::assert_impl_all!(RecommendationEngineBuilder: Send);

impl RecommendationEngineBuilder {
    /// Set the engine configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a reporter that receives one event per recommendation.
    pub fn outcome_reporter(mut self, reporter: Arc<dyn OutcomeReporter>) -> Self {
        self.outcome_reporter = Some(reporter);
        self
    }

    /// Set an outcome callback closure.
    pub fn on_outcome<F>(mut self, callback: F) -> Self
    where
        F: Fn(RecommendationOutcome) + Send + Sync + 'static,
    {
        self.outcome_reporter = Some(Arc::new(ClosureOutcomeReporter::new(callback)));
        self
    }

    /// Build the engine.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<RecommendationEngine, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(RecommendationEngine::from_parts(
            config,
            RecommendationParser::default(),
            self.outcome_reporter,
        ))
    }
}
