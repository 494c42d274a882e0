//! Built-in transform rules.
//!
//! A recommendation that matches a rule becomes a [`Transform`]: a closed
//! enum carrying that rule's typed parameters. Dispatch is a single `match`
//! in [`Transform::apply`].
//!
//! | Rule | Kind | Column parameters |
//! |------|------|-------------------|
//! | `drop missing values` | destructive | none |
//! | `remove duplicate rows` | destructive | none |
//! | `remove duplicates in column '<col>'` | destructive | `col` |
//! | `rename column '<old>' to '<new>'` | modification | `old` |
//! | `convert column '<col>' to numeric` | modification | `col` |
//! | `convert column '<col>' to datetime` | modification | `col` |
//! | `standardize text in column '<col>'` | modification | `col` |
//! | `convert text columns to lowercase` | modification | none |
//! | `standardize date formats` | modification | none |
//! | `validate email format in column '<col>'` | addition | `col` |
//! | `create age groups from column '<col>'` | addition | `col` |
//! | `flag outliers in column '<col>'` | addition | `col` |
//! | `create new feature '<name>' as <expr>` | addition | none |
//! | `filter rows where <condition>` | destructive | none |

mod handlers;
mod parser;
mod registry;

pub use parser::RecommendationParser;
pub use registry::{Rule, TransformRegistry};

use serde::{Deserialize, Serialize};

/// How a rule changes the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Removes rows.
    Destructive,
    /// Changes existing columns in place.
    Modification,
    /// Adds a column.
    Addition,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Destructive => "destructive",
            Self::Modification => "modification",
            Self::Addition => "addition",
        }
    }
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of every registered rule, in registry order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    DropMissing,
    RemoveDuplicateRows,
    RemoveDuplicatesInColumn,
    RenameColumn,
    ConvertToNumeric,
    ConvertToDatetime,
    StandardizeText,
    LowercaseTextColumns,
    StandardizeDates,
    ValidateEmail,
    CreateAgeGroups,
    FlagOutliers,
    CreateFeature,
    FilterRows,
}

impl RuleId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DropMissing => "drop_missing",
            Self::RemoveDuplicateRows => "remove_duplicate_rows",
            Self::RemoveDuplicatesInColumn => "remove_duplicates_in_column",
            Self::RenameColumn => "rename_column",
            Self::ConvertToNumeric => "convert_to_numeric",
            Self::ConvertToDatetime => "convert_to_datetime",
            Self::StandardizeText => "standardize_text",
            Self::LowercaseTextColumns => "lowercase_text_columns",
            Self::StandardizeDates => "standardize_dates",
            Self::ValidateEmail => "validate_email",
            Self::CreateAgeGroups => "create_age_groups",
            Self::FlagOutliers => "flag_outliers",
            Self::CreateFeature => "create_feature",
            Self::FilterRows => "filter_rows",
        }
    }

    pub fn kind(&self) -> RuleKind {
        match self {
            Self::DropMissing
            | Self::RemoveDuplicateRows
            | Self::RemoveDuplicatesInColumn
            | Self::FilterRows => RuleKind::Destructive,
            Self::RenameColumn
            | Self::ConvertToNumeric
            | Self::ConvertToDatetime
            | Self::StandardizeText
            | Self::LowercaseTextColumns
            | Self::StandardizeDates => RuleKind::Modification,
            Self::ValidateEmail | Self::CreateAgeGroups | Self::FlagOutliers | Self::CreateFeature => {
                RuleKind::Addition
            }
        }
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A matched recommendation with its typed parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Transform {
    DropMissing,
    RemoveDuplicateRows,
    RemoveDuplicatesInColumn { column: String },
    RenameColumn { from: String, to: String },
    ConvertToNumeric { column: String },
    ConvertToDatetime { column: String },
    StandardizeText { column: String },
    LowercaseTextColumns,
    StandardizeDates,
    ValidateEmail { column: String },
    CreateAgeGroups { column: String },
    FlagOutliers { column: String },
    CreateFeature { name: String, expression: String },
    FilterRows { condition: String },
}

impl Transform {
    pub fn id(&self) -> RuleId {
        match self {
            Self::DropMissing => RuleId::DropMissing,
            Self::RemoveDuplicateRows => RuleId::RemoveDuplicateRows,
            Self::RemoveDuplicatesInColumn { .. } => RuleId::RemoveDuplicatesInColumn,
            Self::RenameColumn { .. } => RuleId::RenameColumn,
            Self::ConvertToNumeric { .. } => RuleId::ConvertToNumeric,
            Self::ConvertToDatetime { .. } => RuleId::ConvertToDatetime,
            Self::StandardizeText { .. } => RuleId::StandardizeText,
            Self::LowercaseTextColumns => RuleId::LowercaseTextColumns,
            Self::StandardizeDates => RuleId::StandardizeDates,
            Self::ValidateEmail { .. } => RuleId::ValidateEmail,
            Self::CreateAgeGroups { .. } => RuleId::CreateAgeGroups,
            Self::FlagOutliers { .. } => RuleId::FlagOutliers,
            Self::CreateFeature { .. } => RuleId::CreateFeature,
            Self::FilterRows { .. } => RuleId::FilterRows,
        }
    }

    pub fn kind(&self) -> RuleKind {
        self.id().kind()
    }

    /// Captured parameters, in the order they appear in the recommendation.
    pub fn params(&self) -> Vec<&str> {
        match self {
            Self::DropMissing
            | Self::RemoveDuplicateRows
            | Self::LowercaseTextColumns
            | Self::StandardizeDates => Vec::new(),
            Self::RemoveDuplicatesInColumn { column }
            | Self::ConvertToNumeric { column }
            | Self::ConvertToDatetime { column }
            | Self::StandardizeText { column }
            | Self::ValidateEmail { column }
            | Self::CreateAgeGroups { column }
            | Self::FlagOutliers { column } => vec![column.as_str()],
            Self::RenameColumn { from, to } => vec![from.as_str(), to.as_str()],
            Self::CreateFeature { name, expression } => vec![name.as_str(), expression.as_str()],
            Self::FilterRows { condition } => vec![condition.as_str()],
        }
    }

    /// Parameters that must name columns of the current dataset.
    ///
    /// Expression-based rules declare none; unknown columns inside an
    /// expression are reported by the evaluator.
    pub fn column_params(&self) -> Vec<&str> {
        match self {
            Self::RemoveDuplicatesInColumn { column }
            | Self::ConvertToNumeric { column }
            | Self::ConvertToDatetime { column }
            | Self::StandardizeText { column }
            | Self::ValidateEmail { column }
            | Self::CreateAgeGroups { column }
            | Self::FlagOutliers { column } => vec![column.as_str()],
            Self::RenameColumn { from, .. } => vec![from.as_str()],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_kinds() {
        assert_eq!(RuleId::FilterRows.kind(), RuleKind::Destructive);
        assert_eq!(RuleId::RenameColumn.kind(), RuleKind::Modification);
        assert_eq!(RuleId::CreateFeature.kind(), RuleKind::Addition);
    }

    #[test]
    fn test_params_and_column_params() {
        let rename = Transform::RenameColumn {
            from: "Price".to_string(),
            to: "price".to_string(),
        };
        assert_eq!(rename.params(), vec!["Price", "price"]);
        assert_eq!(rename.column_params(), vec!["Price"]);

        let feature = Transform::CreateFeature {
            name: "ratio".to_string(),
            expression: "price / sqft".to_string(),
        };
        assert_eq!(feature.params(), vec!["ratio", "price / sqft"]);
        assert!(feature.column_params().is_empty());
        assert!(Transform::DropMissing.column_params().is_empty());
    }

    #[test]
    fn test_transform_serialization() {
        let transform = Transform::ConvertToNumeric {
            column: "age".to_string(),
        };
        let json = serde_json::to_string(&transform).unwrap();
        assert_eq!(json, r#"{"rule":"convert_to_numeric","column":"age"}"#);
    }
}
