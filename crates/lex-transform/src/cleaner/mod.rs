//! Column- and row-level cleaning primitives used by the built-in transforms.
//!
//! This module provides functionality for:
//! - Removing rows with missing values, duplicates, or failing a mask
//! - Lenient numeric and datetime coercion
//! - Text normalization
//! - Derived columns (email validity, age groups, outlier flags)
//!
//! Every function here is pure with respect to its input: it returns a new
//! frame or series and never mutates what it was given.

mod converters;
mod features;
mod rows;
mod sanitizers;

pub use converters::parse_datetime_millis;

pub(crate) use converters::{standardize_date_columns, to_datetime, to_numeric};
pub(crate) use features::{age_groups, email_flags, outlier_flags};
pub(crate) use rows::{drop_duplicates, drop_missing, filter_rows};
pub(crate) use sanitizers::{lowercase_text_columns, standardize_text};
