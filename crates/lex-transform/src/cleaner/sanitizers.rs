//! Text sanitization.

use polars::prelude::*;
use tracing::debug;

use crate::utils::text_columns;

/// Lower-case and trim every value of a text column.
pub(crate) fn standardize_text(series: &Series) -> PolarsResult<Series> {
    map_text(series, |s| s.trim().to_lowercase())
}

/// Lower-case every text column of `df`. Returns the affected column names.
pub(crate) fn lowercase_text_columns(mut df: DataFrame) -> PolarsResult<(DataFrame, Vec<String>)> {
    let columns = text_columns(&df);

    for name in &columns {
        let series = df.column(name)?.as_materialized_series();
        let lowered = map_text(series, str::to_lowercase)?;
        df.replace(name, lowered)?;
    }

    debug!("Lower-cased {} text columns", columns.len());
    Ok((df, columns))
}

fn map_text(series: &Series, f: impl Fn(&str) -> String) -> PolarsResult<Series> {
    let text = if series.dtype() == &DataType::String {
        series.clone()
    } else {
        series.cast(&DataType::String)?
    };

    let mapped: Vec<Option<String>> = text.str()?.into_iter().map(|v| v.map(&f)).collect();
    Ok(Series::new(series.name().clone(), mapped))
}
