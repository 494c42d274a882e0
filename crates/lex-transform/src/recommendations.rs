//! Splitting free-form recommendation text into individual lines.

use once_cell::sync::Lazy;
use regex::Regex;

/// Leading bullet (`-`, `•`, `*`) or list numbering (`1.`, `2)`).
static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-•*]\s+|\d+[.)]\s+)").expect("Invalid regex: list marker"));

/// Split AI-written text into one recommendation per line.
///
/// List markers and markdown emphasis wrapping the whole line (`**...**`,
/// `*...*`) are stripped. A `*` inside the text is kept, since it is also
/// the multiplication operator of feature and filter expressions. Blank
/// lines are dropped and order is preserved.
pub fn split_recommendations(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let line = strip_list_marker(line.trim());
            let line = strip_list_marker(strip_emphasis(line));
            (!line.is_empty()).then(|| line.to_string())
        })
        .collect()
}

fn strip_list_marker(line: &str) -> &str {
    match LIST_MARKER.find(line) {
        Some(marker) => line[marker.end()..].trim(),
        None => line,
    }
}

fn strip_emphasis(line: &str) -> &str {
    for marker in ["**", "*"] {
        if let Some(inner) = line.strip_prefix(marker).and_then(|rest| rest.strip_suffix(marker))
            && !inner.trim().is_empty()
        {
            return inner.trim();
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_strips_markup() {
        let text = "\
**Recommendations:**

1. Drop missing values.
2) **Rename column 'A' to 'B'**
- remove duplicate rows
• standardize date formats
   * convert column 'price' to numeric
";
        assert_eq!(
            split_recommendations(text),
            vec![
                "Recommendations:",
                "Drop missing values.",
                "Rename column 'A' to 'B'",
                "remove duplicate rows",
                "standardize date formats",
                "convert column 'price' to numeric",
            ]
        );
    }

    #[test]
    fn test_split_keeps_multiplication() {
        let text = "\
1. Create new feature 'area' as width * height
2. *Create new feature 'sq' as width ** 2*
- Filter rows where a * 2 > b
";
        assert_eq!(
            split_recommendations(text),
            vec![
                "Create new feature 'area' as width * height",
                "Create new feature 'sq' as width ** 2",
                "Filter rows where a * 2 > b",
            ]
        );
    }

    #[test]
    fn test_split_keeps_inner_numbers() {
        assert_eq!(
            split_recommendations("filter rows where age >= 18"),
            vec!["filter rows where age >= 18"]
        );
        assert!(split_recommendations("\n  \n").is_empty());
    }
}
