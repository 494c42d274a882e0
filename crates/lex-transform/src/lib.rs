//! Recommendation-to-Transform Engine
//!
//! Turns free-text data-cleaning recommendations (typically written by an AI
//! assistant) into deterministic operations on a Polars [`DataFrame`].
//!
//! # Overview
//!
//! Each recommendation goes through the same stages:
//!
//! - **Parsing**: [`RecommendationParser`] matches the text against the
//!   ordered rules of the [`TransformRegistry`]; the first match wins and
//!   yields a typed [`Transform`]. Text that matches nothing is skipped.
//! - **Validation**: [`Validator`] checks that every referenced column exists
//!   in the current dataset.
//! - **Execution**: the transform runs against the current dataset and
//!   produces a new one. Feature and filter expressions are evaluated by the
//!   whitelisted [`SafeExpressionEvaluator`], never by a general interpreter.
//!
//! [`RecommendationEngine::apply`] folds a batch left to right, so later
//! recommendations see the effects of earlier ones, and reports the outcome
//! in an [`ExecutionResult`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_transform::RecommendationEngine;
//! use polars::prelude::*;
//!
//! let df = df!(
//!     "Price" => ["$1,200", "950", "n/a"],
//!     "sqft" => [800.0, 640.0, 700.0],
//! )?;
//!
//! let engine = RecommendationEngine::new();
//! let (df, result) = engine.apply(&df, &[
//!     "Rename column 'Price' to 'price'",
//!     "Convert column 'price' to numeric",
//!     "Create new feature 'price_per_sqft' as price / sqft",
//!     "Consider collecting more data",
//! ])?;
//!
//! assert_eq!(result.applied.len(), 3);
//! assert_eq!(result.skipped, vec!["Consider collecting more data"]);
//! ```
//!
//! # Sessions
//!
//! The engine keeps no state between calls. Applications that hold one
//! dataset per user session can use [`SessionRunner`] over any
//! [`SessionStore`]; it serializes batches per session and only commits a
//! batch's result when the batch completes.

pub mod cleaner;
pub mod config;
pub mod engine;
pub mod error;
pub mod expression;
pub mod recommendations;
pub mod rules;
pub mod session;
pub mod types;
pub mod utils;
pub mod validator;

// Re-exports for convenient access
pub use config::{ConfigValidationError, EngineConfig, EngineConfigBuilder};
pub use engine::{
    Classification, ClosureOutcomeReporter, OutcomeReporter, OutcomeStatus, RecommendationEngine,
    RecommendationEngineBuilder, RecommendationOutcome,
};
pub use error::{EngineError, Result as TransformResult, ResultExt, TransformError};
pub use expression::{ExpressionError, SafeExpressionEvaluator};
pub use recommendations::split_recommendations;
pub use rules::{RecommendationParser, Rule, RuleId, RuleKind, Transform, TransformRegistry};
pub use session::{InMemorySessionStore, SessionError, SessionRunner, SessionStore};
pub use types::{ExecutionResult, FailedRecommendation};
pub use validator::Validator;

pub use polars::prelude::DataFrame;
