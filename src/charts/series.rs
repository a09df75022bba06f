//! Chart input preparation: turns aggregated tables into plain vectors.

use crate::charts::ChartError;
use crate::data::{days_to_date, DataCleaner, DataLoader};
use chrono::NaiveDate;
use polars::prelude::*;

/// Date-indexed values for line charts.
pub type TimeSeries = Vec<(NaiveDate, f64)>;

/// Labelled values for bar rankings, in display order.
pub type Ranking = Vec<(String, f64)>;

/// Numeric column as f64; nulls read as zero.
pub fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<f64>, ChartError> {
    let values = df.column(name)?.cast(&DataType::Float64)?;
    Ok(values
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(0.0))
        .collect())
}

/// Any column rendered as text; nulls read as empty strings.
pub fn string_values(df: &DataFrame, name: &str) -> Result<Vec<String>, ChartError> {
    let values = df.column(name)?.cast(&DataType::String)?;
    Ok(values
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect())
}

/// Date column values; string columns are parsed on the fly.
pub fn date_values(df: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDate>>, ChartError> {
    let column = df.column(name)?;
    let dates = match column.dtype() {
        DataType::Date => column.as_materialized_series().clone(),
        _ => DataCleaner::parse_date_column(column)?,
    };
    let days = dates.cast(&DataType::Int32)?;
    Ok(days
        .i32()?
        .into_iter()
        .map(|d| d.and_then(days_to_date))
        .collect())
}

/// Pair dates with values, dropping rows without a date.
pub fn time_series(df: &DataFrame, date_col: &str, value_col: &str) -> Result<TimeSeries, ChartError> {
    let dates = date_values(df, date_col)?;
    let values = f64_values(df, value_col)?;
    Ok(dates
        .into_iter()
        .zip(values)
        .filter_map(|(date, value)| date.map(|d| (d, value)))
        .collect())
}

/// Pair labels with values, keeping table order.
pub fn ranking(df: &DataFrame, label_col: &str, value_col: &str) -> Result<Ranking, ChartError> {
    let labels = string_values(df, label_col)?;
    let values = f64_values(df, value_col)?;
    Ok(labels.into_iter().zip(values).collect())
}

/// First preferred column present in `df`, else its first numeric column.
pub fn pick_value_column(df: &DataFrame, preferred: &[&str]) -> Option<String> {
    preferred
        .iter()
        .find(|name| df.column(name).is_ok())
        .map(|name| name.to_string())
        .or_else(|| DataLoader::numeric_columns(df).into_iter().next())
}

/// True when every name is a column of `df`.
pub fn has_columns(df: &DataFrame, names: &[&str]) -> bool {
    names.iter().all(|name| df.column(name).is_ok())
}

/// Upper bound for a value axis starting at zero, with 5% headroom.
pub fn axis_upper(values: impl IntoIterator<Item = f64>) -> f64 {
    let max = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    if max > 0.0 {
        max * 1.05
    } else {
        1.0
    }
}

/// Date axis bounds; a single date is widened to one day.
pub fn date_bounds(series: &[(NaiveDate, f64)]) -> Option<(NaiveDate, NaiveDate)> {
    let start = series.iter().map(|(d, _)| *d).min()?;
    let end = series.iter().map(|(d, _)| *d).max()?;
    if start == end {
        return Some((start, start.succ_opt().unwrap_or(start)));
    }
    Some((start, end))
}

/// Integer with thousands separators, e.g. `1,234,567`.
pub fn format_count(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
