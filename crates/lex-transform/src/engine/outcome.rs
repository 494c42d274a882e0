//! Per-recommendation outcome events.
//!
//! The engine emits one [`RecommendationOutcome`] for every recommendation it
//! processes, in order, to an optional [`OutcomeReporter`].
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_transform::RecommendationEngine;
//!
//! let engine = RecommendationEngine::builder()
//!     .on_outcome(|outcome| {
//!         println!("[{}/{}] {:?} {}", outcome.index + 1, outcome.total, outcome.status, outcome.recommendation);
//!     })
//!     .build()?;
//! ```

use serde::{Deserialize, Serialize};

use crate::rules::RuleId;

/// Classification of a single recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Matched and applied; the working dataset advanced.
    Applied,
    /// Matched no rule.
    Skipped,
    /// Matched a rule but failed validation or execution.
    Failed,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

/// What happened to one recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationOutcome {
    /// Zero-based position in the batch.
    pub index: usize,
    /// Batch size.
    pub total: usize,
    pub recommendation: String,
    pub status: OutcomeStatus,
    /// Matched rule, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<RuleId>,
    /// Error message for failed recommendations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Receives outcome events while a batch is applied.
///
/// Implementations must be `Send + Sync` so an engine can be shared across
/// threads.
pub trait OutcomeReporter: Send + Sync {
    fn report(&self, outcome: RecommendationOutcome);
}

/// Wrapper that implements [`OutcomeReporter`] using a closure.
pub struct ClosureOutcomeReporter<F>
where
    F: Fn(RecommendationOutcome) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureOutcomeReporter<F>
where
    F: Fn(RecommendationOutcome) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> OutcomeReporter for ClosureOutcomeReporter<F>
where
    F: Fn(RecommendationOutcome) + Send + Sync,
{
    fn report(&self, outcome: RecommendationOutcome) {
        (self.callback)(outcome);
    }
}

static_assertions::assert_impl_all!(RecommendationOutcome: Send, Sync);
