//! Precondition checks run before a transform executes.

use polars::prelude::*;

use crate::error::{Result, TransformError};
use crate::rules::Transform;
use crate::utils::has_column;

/// Checks that a transform's declared column parameters exist in the
/// current dataset. Column names are matched exactly.
#[derive(Debug, Default, Clone, Copy)]
pub struct Validator;

impl Validator {
    pub fn check(&self, transform: &Transform, df: &DataFrame) -> Result<()> {
        for column in transform.column_params() {
            if !has_column(df, column) {
                return Err(TransformError::ColumnNotFound(column.to_string()));
            }
        }

        if let Transform::RenameColumn { from, to } = transform
            && from != to
            && has_column(df, to)
        {
            return Err(TransformError::ColumnExists(to.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn frame() -> DataFrame {
        df!("Name" => ["a"], "age" => [1i64]).unwrap()
    }

    #[test]
    fn test_missing_column() {
        let transform = Transform::StandardizeText {
            column: "name".to_string(),
        };
        let err = Validator.check(&transform, &frame()).unwrap_err();
        assert_eq!(err.to_string(), "Column 'name' not found");
    }

    #[test]
    fn test_rename_checks_source_only_for_existence() {
        let ok = Transform::RenameColumn {
            from: "Name".to_string(),
            to: "name".to_string(),
        };
        assert!(Validator.check(&ok, &frame()).is_ok());

        let missing = Transform::RenameColumn {
            from: "A".to_string(),
            to: "B".to_string(),
        };
        assert_eq!(
            Validator.check(&missing, &frame()).unwrap_err().to_string(),
            "Column 'A' not found"
        );
    }

    #[test]
    fn test_rename_target_taken() {
        let transform = Transform::RenameColumn {
            from: "Name".to_string(),
            to: "age".to_string(),
        };
        assert_eq!(
            Validator.check(&transform, &frame()).unwrap_err().error_code(),
            "COLUMN_EXISTS"
        );
    }

    #[test]
    fn test_expression_rules_declare_no_columns() {
        let transform = Transform::CreateFeature {
            name: "x".to_string(),
            expression: "missing * 2".to_string(),
        };
        assert!(Validator.check(&transform, &frame()).is_ok());
        assert!(Validator.check(&Transform::DropMissing, &frame()).is_ok());
    }
}
