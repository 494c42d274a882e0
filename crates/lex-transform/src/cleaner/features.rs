//! Derived columns: email validity, age groups and outlier flags.

use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.-]+@[\w.-]+\.\w+$").expect("Invalid regex: email"));

/// Flag which values of a text column look like email addresses.
/// Missing values stay missing.
pub(crate) fn email_flags(series: &Series, output: &str) -> PolarsResult<Series> {
    let text = series.cast(&DataType::String)?;
    let flags: Vec<Option<bool>> = text
        .str()?
        .into_iter()
        .map(|v| v.map(|s| EMAIL_PATTERN.is_match(s.trim())))
        .collect();
    Ok(Series::new(output.into(), flags))
}

/// Label for the right-closed interval `(lo, hi]`.
pub(crate) fn interval_label(lo: f64, hi: f64) -> String {
    format!("({}, {}]", format_edge(lo), format_edge(hi))
}

fn format_edge(edge: f64) -> String {
    if edge.fract() == 0.0 && edge.abs() < 1e15 {
        format!("{}", edge as i64)
    } else {
        format!("{}", edge)
    }
}

/// Bucket a numeric column into right-closed bins labelled `(lo, hi]`.
///
/// Values outside `(bins[0], bins[last]]` and missing values are missing.
pub(crate) fn age_groups(series: &Series, bins: &[f64], output: &str) -> PolarsResult<Series> {
    let values = series.cast(&DataType::Float64)?;
    let labels: Vec<String> = bins.windows(2).map(|w| interval_label(w[0], w[1])).collect();

    let grouped: Vec<Option<String>> = values
        .f64()?
        .into_iter()
        .map(|v| {
            let v = v.filter(|v| !v.is_nan())?;
            bins.windows(2)
                .position(|w| v > w[0] && v <= w[1])
                .map(|i| labels[i].clone())
        })
        .collect();

    Ok(Series::new(output.into(), grouped))
}

/// Quantile with linear interpolation over sorted values.
pub(crate) fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Flag values outside `[Q1 - k*IQR, Q3 + k*IQR]`. Missing values stay missing.
pub(crate) fn outlier_flags(series: &Series, multiplier: f64, output: &str) -> PolarsResult<Series> {
    let values = series.cast(&DataType::Float64)?;
    let values = values.f64()?;

    let mut sorted: Vec<f64> = values.into_iter().flatten().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let bounds = match (quantile(&sorted, 0.25), quantile(&sorted, 0.75)) {
        (Some(q1), Some(q3)) => {
            let iqr = q3 - q1;
            Some((q1 - multiplier * iqr, q3 + multiplier * iqr))
        }
        _ => None,
    };

    let flags: Vec<Option<bool>> = values
        .into_iter()
        .map(|v| {
            let v = v.filter(|v| !v.is_nan())?;
            let (lower, upper) = bounds?;
            Some(v < lower || v > upper)
        })
        .collect();

    Ok(Series::new(output.into(), flags))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_email_flags() {
        let series = Series::new(
            "email".into(),
            &[Some("ann@example.com"), Some("not-an-email"), None, Some("b.c@x.co")],
        );
        let flags = email_flags(&series, "valid_email").unwrap();
        let values: Vec<Option<bool>> = flags.bool().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(true), Some(false), None, Some(true)]);
        assert_eq!(flags.name().as_str(), "valid_email");
    }

    #[test]
    fn test_interval_label() {
        assert_eq!(interval_label(0.0, 18.0), "(0, 18]");
        assert_eq!(interval_label(2.5, 7.0), "(2.5, 7]");
    }

    #[test]
    fn test_age_groups_are_right_closed() {
        let series = Series::new("age".into(), &[Some(0i64), Some(18), Some(19), Some(120), None]);
        let groups = age_groups(&series, &[0.0, 18.0, 35.0, 50.0, 100.0], "age_group").unwrap();
        let values: Vec<Option<&str>> = groups.str().unwrap().into_iter().collect();
        assert_eq!(values, vec![None, Some("(0, 18]"), Some("(18, 35]"), None, None]);
    }

    #[test]
    fn test_quantile_interpolates() {
        assert_eq!(quantile(&[1.0, 2.0, 3.0, 4.0], 0.25), Some(1.75));
        assert_eq!(quantile(&[5.0], 0.75), Some(5.0));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn test_outlier_flags() {
        let series = Series::new(
            "income".into(),
            &[Some(10.0), Some(11.0), Some(12.0), Some(13.0), Some(500.0), None],
        );
        let flags = outlier_flags(&series, 1.5, "income_is_outlier").unwrap();
        let values: Vec<Option<bool>> = flags.bool().unwrap().into_iter().collect();
        assert_eq!(
            values,
            vec![Some(false), Some(false), Some(false), Some(false), Some(true), None]
        );
    }
}
