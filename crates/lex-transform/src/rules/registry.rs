//! The ordered registry of built-in rules.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::{RuleId, RuleKind, Transform};

/// Quoted column or feature name; either quote style is accepted.
const QUOTED: &str = r#"['"]([^'"]+)['"]"#;

/// A single registered rule: a case-insensitive, whole-text matcher and the
/// constructor for its typed transform.
pub struct Rule {
    id: RuleId,
    pattern: Regex,
    build: fn(&Captures) -> Transform,
}

impl Rule {
    fn new(id: RuleId, template: &str, build: fn(&Captures) -> Transform) -> Self {
        // Words may be separated by any whitespace; a trailing period is allowed
        // on fixed-text rules. Expression rules keep their tail verbatim.
        let body = template.replace(' ', r"\s+").replace("<Q>", QUOTED);
        let tail = if template.ends_with("(.+)") { "" } else { r"\.?" };
        let source = format!(r"(?i)^{}{}$", body, tail);
        let pattern = Regex::new(&source).expect("Invalid regex: rule pattern");
        Self { id, pattern, build }
    }

    pub fn id(&self) -> RuleId {
        self.id
    }

    pub fn kind(&self) -> RuleKind {
        self.id.kind()
    }

    /// The compiled matcher.
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Match the whole of `text`.
    pub fn try_match(&self, text: &str) -> Option<Transform> {
        self.pattern.captures(text).map(|caps| (self.build)(&caps))
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("pattern", &self.pattern.as_str())
            .finish()
    }
}

fn capture(caps: &Captures, index: usize) -> String {
    caps.get(index).map(|m| m.as_str().to_string()).unwrap_or_default()
}

/// Expression text with a sentence-ending period removed. A period directly
/// after a digit is kept since it belongs to a number literal.
fn expression_tail(caps: &Captures, index: usize) -> String {
    let text = capture(caps, index);
    let trimmed = text.trim_end();
    let mut chars = trimmed.chars().rev();
    match (chars.next(), chars.next()) {
        (Some('.'), Some(prev)) if !prev.is_ascii_digit() => {
            trimmed[..trimmed.len() - 1].trim_end().to_string()
        }
        _ => trimmed.to_string(),
    }
}

static BUILTIN: Lazy<TransformRegistry> = Lazy::new(|| {
    TransformRegistry::new(vec![
        Rule::new(RuleId::DropMissing, "drop missing values", |_| {
            Transform::DropMissing
        }),
        Rule::new(RuleId::RemoveDuplicateRows, "remove duplicate rows", |_| {
            Transform::RemoveDuplicateRows
        }),
        Rule::new(
            RuleId::RemoveDuplicatesInColumn,
            "remove duplicates in column <Q>",
            |c| Transform::RemoveDuplicatesInColumn {
                column: capture(c, 1),
            },
        ),
        Rule::new(RuleId::RenameColumn, "rename column <Q> to <Q>", |c| {
            Transform::RenameColumn {
                from: capture(c, 1),
                to: capture(c, 2),
            }
        }),
        Rule::new(RuleId::ConvertToNumeric, "convert column <Q> to numeric", |c| {
            Transform::ConvertToNumeric {
                column: capture(c, 1),
            }
        }),
        Rule::new(RuleId::ConvertToDatetime, "convert column <Q> to datetime", |c| {
            Transform::ConvertToDatetime {
                column: capture(c, 1),
            }
        }),
        Rule::new(RuleId::StandardizeText, "standardize text in column <Q>", |c| {
            Transform::StandardizeText {
                column: capture(c, 1),
            }
        }),
        Rule::new(
            RuleId::LowercaseTextColumns,
            "convert text columns to lowercase",
            |_| Transform::LowercaseTextColumns,
        ),
        Rule::new(RuleId::StandardizeDates, "standardize date formats", |_| {
            Transform::StandardizeDates
        }),
        Rule::new(
            RuleId::ValidateEmail,
            "validate email format in column <Q>",
            |c| Transform::ValidateEmail {
                column: capture(c, 1),
            },
        ),
        Rule::new(RuleId::CreateAgeGroups, "create age groups from column <Q>", |c| {
            Transform::CreateAgeGroups {
                column: capture(c, 1),
            }
        }),
        Rule::new(RuleId::FlagOutliers, "flag outliers in column <Q>", |c| {
            Transform::FlagOutliers {
                column: capture(c, 1),
            }
        }),
        Rule::new(RuleId::CreateFeature, "create new feature <Q> as (.+)", |c| {
            Transform::CreateFeature {
                name: capture(c, 1),
                expression: expression_tail(c, 2),
            }
        }),
        Rule::new(RuleId::FilterRows, "filter rows where (.+)", |c| {
            Transform::FilterRows {
                condition: expression_tail(c, 1),
            }
        }),
    ])
});

/// Ordered, immutable collection of rules. The first matching rule wins.
#[derive(Debug)]
pub struct TransformRegistry {
    rules: Vec<Rule>,
}

impl TransformRegistry {
    fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// The built-in registry, compiled once per process.
    pub fn builtin() -> &'static TransformRegistry {
        &BUILTIN
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule matching `text`, with its transform.
    pub fn find(&self, text: &str) -> Option<(&Rule, Transform)> {
        self.rules
            .iter()
            .find_map(|rule| rule.try_match(text).map(|transform| (rule, transform)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_registry_order_matches_rule_ids() {
        let ids: Vec<RuleId> = TransformRegistry::builtin().rules().iter().map(Rule::id).collect();
        assert_eq!(
            ids,
            vec![
                RuleId::DropMissing,
                RuleId::RemoveDuplicateRows,
                RuleId::RemoveDuplicatesInColumn,
                RuleId::RenameColumn,
                RuleId::ConvertToNumeric,
                RuleId::ConvertToDatetime,
                RuleId::StandardizeText,
                RuleId::LowercaseTextColumns,
                RuleId::StandardizeDates,
                RuleId::ValidateEmail,
                RuleId::CreateAgeGroups,
                RuleId::FlagOutliers,
                RuleId::CreateFeature,
                RuleId::FilterRows,
            ]
        );
    }

    #[test]
    fn test_patterns_are_anchored() {
        let registry = TransformRegistry::builtin();
        assert!(registry.find("please drop missing values now").is_none());
        assert!(registry.find("drop missing values").is_some());
    }

    #[test]
    fn test_trailing_period_and_spacing() {
        let registry = TransformRegistry::builtin();
        let (rule, _) = registry.find("Remove   duplicate rows.").unwrap();
        assert_eq!(rule.id(), RuleId::RemoveDuplicateRows);
    }

    #[test]
    fn test_expression_tail() {
        let registry = TransformRegistry::builtin();
        let (_, transform) = registry.find("filter rows where age >= 18.").unwrap();
        assert_eq!(
            transform,
            Transform::FilterRows {
                condition: "age >= 18.".to_string()
            }
        );

        let (_, transform) = registry.find("filter rows where city == 'Paris'.").unwrap();
        assert_eq!(
            transform,
            Transform::FilterRows {
                condition: "city == 'Paris'".to_string()
            }
        );
    }

    #[test]
    fn test_double_quoted_params() {
        let registry = TransformRegistry::builtin();
        let (_, transform) = registry
            .find(r#"rename column "Unit Price" to "unit_price""#)
            .unwrap();
        assert_eq!(
            transform,
            Transform::RenameColumn {
                from: "Unit Price".to_string(),
                to: "unit_price".to_string(),
            }
        );
    }
}
