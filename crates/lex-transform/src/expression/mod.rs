//! Safe expression evaluation for feature creation and row filtering.
//!
//! Expressions are written in a small, closed language: column references,
//! literals, arithmetic, comparisons, boolean logic and a fixed whitelist of
//! functions (see [`Function`]). Nothing outside that language is reachable,
//! so an expression can read the dataset but cannot perform I/O, reflect, or
//! call arbitrary code.
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_transform::config::EngineConfig;
//! use lex_transform::expression::SafeExpressionEvaluator;
//!
//! let config = EngineConfig::default();
//! let evaluator = SafeExpressionEvaluator::new(&config);
//! let ratio = evaluator.evaluate_feature(&df, "ratio", "price / sqft")?;
//! let mask = evaluator.evaluate_filter(&df, "age >= 18 and city != 'Paris'")?;
//! ```

mod ast;
mod evaluator;
mod lexer;
mod parser;

pub use ast::{BinaryOp, Expr, Function, Literal, UnaryOp};
pub use parser::MAX_DEPTH;

use polars::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{Result, TransformError};

/// Reasons an expression could not be parsed or evaluated.
///
/// These never reach the per-recommendation error list directly; they are
/// logged and folded into [`TransformError::InvalidExpression`] or
/// [`TransformError::InvalidFilter`].
#[derive(Error, Debug)]
pub enum ExpressionError {
    #[error("expression is empty")]
    Empty,

    #[error("expression is {length} bytes long, maximum is {max}")]
    TooLong { length: usize, max: usize },

    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("unexpected token {found} at offset {offset}")]
    UnexpectedToken { found: String, offset: usize },

    #[error("unexpected end of input")]
    UnexpectedEnd,

    #[error("nesting deeper than {0} levels")]
    TooDeep(usize),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("{function}() takes {expected} argument(s), {found} given")]
    Arity {
        function: String,
        expected: String,
        found: usize,
    },

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("{0}")]
    TypeMismatch(String),

    #[error("result mixes {first} and {second} values")]
    MixedTypes {
        first: &'static str,
        second: &'static str,
    },

    #[error("condition must be boolean, found {0}")]
    NotBoolean(&'static str),

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

/// Parses and evaluates whitelisted expressions against a dataset.
#[derive(Debug, Clone, Copy)]
pub struct SafeExpressionEvaluator<'a> {
    config: &'a EngineConfig,
}

impl<'a> SafeExpressionEvaluator<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Parse an expression without evaluating it.
    pub fn parse(&self, input: &str) -> std::result::Result<Expr, ExpressionError> {
        let input = input.trim();
        if input.len() > self.config.max_expression_length {
            return Err(ExpressionError::TooLong {
                length: input.len(),
                max: self.config.max_expression_length,
            });
        }
        parser::parse(input)
    }

    fn run(
        &self,
        df: &DataFrame,
        input: &str,
    ) -> std::result::Result<Vec<evaluator::Value>, ExpressionError> {
        let expr = self.parse(input)?;
        evaluator::evaluate(df, &expr, self.config)
    }

    /// Evaluate `expression` into a column named `name`, one value per row.
    ///
    /// Scalar expressions are broadcast to the dataset height.
    pub fn evaluate_feature(&self, df: &DataFrame, name: &str, expression: &str) -> Result<Series> {
        self.run(df, expression)
            .and_then(|values| evaluator::values_to_series(name, values))
            .map_err(|e| {
                debug!("Expression '{}' rejected: {}", expression, e);
                TransformError::InvalidExpression {
                    expression: expression.to_string(),
                    reason: e.to_string(),
                }
            })
    }

    /// Evaluate `condition` into a row mask. Missing results exclude the row.
    pub fn evaluate_filter(&self, df: &DataFrame, condition: &str) -> Result<BooleanChunked> {
        self.run(df, condition)
            .and_then(evaluator::values_to_mask)
            .map_err(|e| {
                debug!("Filter condition '{}' rejected: {}", condition, e);
                TransformError::InvalidFilter {
                    condition: condition.to_string(),
                    reason: e.to_string(),
                }
            })
    }
}
