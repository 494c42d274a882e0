//! Error types for the recommendation engine.
//!
//! Two layers exist:
//!
//! - [`TransformError`] is a per-recommendation failure. The engine records it
//!   against the offending recommendation and carries on with the batch.
//! - [`EngineError`] is a batch-level failure. It aborts `apply` entirely and
//!   indicates a defect (an internal invariant was violated), not bad input.
//!
//! Both are serializable as `{ code, message }` so callers can forward them
//! to a frontend unchanged.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// Failure of a single recommendation, during validation or execution.
#[derive(Error, Debug)]
pub enum TransformError {
    /// A referenced column does not exist in the current dataset.
    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    /// A rename target already names another column.
    #[error("Column '{0}' already exists")]
    ColumnExists(String),

    /// Feature expression failed to parse or evaluate.
    ///
    /// Only the expression is part of the message; `reason` is kept for logs.
    #[error("Invalid expression: {expression}")]
    InvalidExpression { expression: String, reason: String },

    /// Filter condition failed to parse, evaluate, or produce a boolean mask.
    #[error("Invalid filter condition: {condition}")]
    InvalidFilter { condition: String, reason: String },

    /// Column-level type conversion did not produce the requested type.
    #[error("Failed to convert column '{column}' to {target_type}: {reason}")]
    TypeConversionFailed {
        column: String,
        target_type: String,
        reason: String,
    },

    /// The column exists but its type does not support the transform.
    #[error("Column '{column}' must be {expected}, found {found}")]
    UnsupportedColumnType {
        column: String,
        expected: String,
        found: String,
    },

    /// A handler reported success but its output column is absent.
    #[error("Feature '{0}' was not created")]
    FeatureNotCreated(String),

    /// Internal invariant violated inside a handler. Escalated to [`EngineError`].
    #[error("Internal error: {0}")]
    Internal(String),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<TransformError>,
    },
}

impl TransformError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        TransformError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::ColumnExists(_) => "COLUMN_EXISTS",
            Self::InvalidExpression { .. } => "INVALID_EXPRESSION",
            Self::InvalidFilter { .. } => "INVALID_FILTER",
            Self::TypeConversionFailed { .. } => "TYPE_CONVERSION_FAILED",
            Self::UnsupportedColumnType { .. } => "UNSUPPORTED_COLUMN_TYPE",
            Self::FeatureNotCreated(_) => "FEATURE_NOT_CREATED",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether this is a precondition failure (raised before the handler ran).
    pub fn is_validation(&self) -> bool {
        match self {
            Self::ColumnNotFound(_) | Self::ColumnExists(_) => true,
            Self::WithContext { source, .. } => source.is_validation(),
            _ => false,
        }
    }

    /// Whether this error must abort the whole batch.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Internal(_) => true,
            Self::WithContext { source, .. } => source.is_fatal(),
            _ => false,
        }
    }
}

impl Serialize for TransformError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("TransformError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Batch-level failure returned from `apply`.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The working dataset broke an invariant after a recommendation ran.
    #[error("Invariant violated after '{recommendation}': {reason}")]
    InvariantViolated {
        recommendation: String,
        reason: String,
    },

    /// A handler escalated an internal error.
    #[error("Internal error while applying '{recommendation}': {source}")]
    Internal {
        recommendation: String,
        #[source]
        source: TransformError,
    },
}

impl EngineError {
    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvariantViolated { .. } => "INVARIANT_VIOLATED",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// The recommendation that was being applied when the batch aborted.
    pub fn recommendation(&self) -> &str {
        match self {
            Self::InvariantViolated { recommendation, .. } => recommendation,
            Self::Internal { recommendation, .. } => recommendation,
        }
    }
}

impl Serialize for EngineError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("EngineError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for per-recommendation operations.
pub type Result<T> = std::result::Result<T, TransformError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| TransformError::Polars(e).with_context(context))
    }
}
