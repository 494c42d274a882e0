//! Batch execution of recommendations.

mod builder;
mod executor;
pub mod outcome;

pub use builder::RecommendationEngineBuilder;
pub use executor::{Classification, RecommendationEngine};
pub use outcome::{ClosureOutcomeReporter, OutcomeReporter, OutcomeStatus, RecommendationOutcome};
