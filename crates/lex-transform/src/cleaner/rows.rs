//! Row-removing operations. All of them preserve the relative order of the
//! rows they keep.

use polars::prelude::*;
use tracing::debug;

/// Remove every row that has a missing value in any column.
///
/// Floating point `NaN` counts as missing.
pub(crate) fn drop_missing(df: &DataFrame) -> PolarsResult<DataFrame> {
    let mut keep = vec![true; df.height()];

    for column in df.get_columns() {
        let series = column.as_materialized_series();
        match series.dtype() {
            DataType::Float32 | DataType::Float64 => {
                let floats = series.cast(&DataType::Float64)?;
                for (row, value) in floats.f64()?.into_iter().enumerate() {
                    if value.is_none_or(f64::is_nan) {
                        keep[row] = false;
                    }
                }
            }
            _ => {
                if series.null_count() == 0 {
                    continue;
                }
                for (row, is_null) in series.is_null().into_iter().enumerate() {
                    if is_null == Some(true) {
                        keep[row] = false;
                    }
                }
            }
        }
    }

    apply_mask(df, &keep)
}

/// Remove rows whose key repeats an earlier row, keeping the first
/// occurrence. With `subset` the key is that column alone, otherwise the key
/// is the whole row.
pub(crate) fn drop_duplicates(df: &DataFrame, subset: Option<&str>) -> PolarsResult<DataFrame> {
    let subset = subset.map(|name| [name.to_string()]);
    let out = df.unique_stable(subset.as_ref().map(|s| &s[..]), UniqueKeepStrategy::First, None)?;
    debug!("Found {} duplicate rows", df.height() - out.height());
    Ok(out)
}

/// Keep the rows where `mask` is true.
pub(crate) fn filter_rows(df: &DataFrame, mask: &BooleanChunked) -> PolarsResult<DataFrame> {
    df.filter(mask)
}

fn apply_mask(df: &DataFrame, keep: &[bool]) -> PolarsResult<DataFrame> {
    if keep.iter().all(|k| *k) {
        return Ok(df.clone());
    }
    let mask = BooleanChunked::from_slice("mask".into(), keep);
    df.filter(&mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids(df: &DataFrame) -> Vec<Option<i64>> {
        df.column("id")
            .unwrap()
            .as_materialized_series()
            .i64()
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn test_drop_missing() {
        let df = df!(
            "id" => [1i64, 2, 3, 4],
            "name" => [Some("a"), None, Some("c"), Some("d")],
            "score" => [Some(1.0), Some(2.0), Some(f64::NAN), Some(4.0)],
        )
        .unwrap();

        let result = drop_missing(&df).unwrap();
        assert_eq!(ids(&result), vec![Some(1), Some(4)]);
    }

    #[test]
    fn test_drop_duplicates_keeps_first_in_order() {
        let df = df!(
            "id" => [3i64, 1, 3, 2, 1],
            "name" => ["c", "a", "c", "b", "a"],
        )
        .unwrap();

        let result = drop_duplicates(&df, None).unwrap();
        assert_eq!(ids(&result), vec![Some(3), Some(1), Some(2)]);

        let again = drop_duplicates(&result, None).unwrap();
        assert_eq!(ids(&again), ids(&result));
    }

    #[test]
    fn test_drop_duplicates_distinguishes_null_from_text() {
        let df = df!(
            "id" => [1i64, 1],
            "name" => [None, Some("null")],
        )
        .unwrap();

        let result = drop_duplicates(&df, None).unwrap();
        assert_eq!(result.height(), 2);
    }

    #[test]
    fn test_drop_duplicates_treats_signed_zero_as_equal() {
        let df = df!("x" => [0.0f64, -0.0, 1.0]).unwrap();

        let result = drop_duplicates(&df, None).unwrap();
        assert_eq!(result.height(), 2);
    }

    #[test]
    fn test_drop_duplicates_in_column() {
        let df = df!(
            "id" => [1i64, 2, 3],
            "email" => ["x@a.com", "y@a.com", "x@a.com"],
        )
        .unwrap();

        let result = drop_duplicates(&df, Some("email")).unwrap();
        assert_eq!(ids(&result), vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_filter_rows() {
        let df = df!("id" => [1i64, 2, 3]).unwrap();
        let mask = BooleanChunked::from_slice("mask".into(), &[true, false, true]);
        let result = filter_rows(&df, &mask).unwrap();
        assert_eq!(ids(&result), vec![Some(1), Some(3)]);
    }
}
