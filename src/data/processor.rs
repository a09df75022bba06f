//! Data Processor Module
//! Cleans raw COVID-19 tables: drops aggregate rows, null-fills numeric
//! columns and parses date columns.

use crate::data::DataLoader;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Lowercase substrings marking a national/aggregate row rather than a state.
pub const AGGREGATE_MARKERS: [&str; 2] = ["total", "india"];

/// Date layouts seen across the covid19india exports.
const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%d %B %Y",
    "%d-%b-%y",
    "%d-%b-%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
];

/// `NaiveDate::num_days_from_ce` of 1970-01-01 (Polars Date epoch).
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Convert a date to Polars' physical Date representation.
pub fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - EPOCH_DAYS_FROM_CE
}

/// Inverse of [`date_to_days`].
pub fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(EPOCH_DAYS_FROM_CE)?)
}

/// Parse a date in any of the known layouts. `None` when nothing matches.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Handles data cleaning operations.
pub struct DataCleaner;

impl DataCleaner {
    /// Clean a raw table.
    ///
    /// Rows labelled as aggregates in the state column are removed, numeric
    /// nulls and NaN become zero and date-named columns are parsed to `Date`
    /// (unparsable values become null). The input is left untouched.
    pub fn clean(df: &DataFrame) -> Result<DataFrame, ProcessorError> {
        let mut cleaned = match Self::find_state_column(df) {
            Some(state_col) => Self::drop_aggregate_rows(df, &state_col)?,
            None => df.clone(),
        };

        Self::fill_numeric_nulls(&mut cleaned)?;
        Self::parse_date_columns(&mut cleaned)?;

        info!("Cleaned: {} rows", cleaned.height());
        Ok(cleaned)
    }

    /// True if a state label names an aggregate ("Total", "India", ...).
    pub fn is_aggregate_label(label: &str) -> bool {
        let label = label.to_lowercase();
        AGGREGATE_MARKERS.iter().any(|marker| label.contains(marker))
    }

    /// Remove rows whose `state_col` value is an aggregate label.
    /// Null labels are kept.
    pub fn drop_aggregate_rows(
        df: &DataFrame,
        state_col: &str,
    ) -> Result<DataFrame, ProcessorError> {
        let labels = df.column(state_col)?.cast(&DataType::String)?;
        let mask: BooleanChunked = labels
            .str()?
            .into_iter()
            .map(|label| !label.is_some_and(Self::is_aggregate_label))
            .collect();

        let filtered = df.filter(&mask)?;
        debug!(
            "Dropped {} aggregate rows using column '{}'",
            df.height() - filtered.height(),
            state_col
        );
        Ok(filtered)
    }

    /// Nulls, and NaN in float columns, become zero.
    fn fill_numeric_nulls(df: &mut DataFrame) -> Result<(), ProcessorError> {
        for name in DataLoader::numeric_columns(df) {
            let series = df.column(&name)?.as_materialized_series();
            let without_nan = match series.dtype() {
                DataType::Float64 => series
                    .f64()?
                    .apply_values(|v| if v.is_nan() { 0.0 } else { v })
                    .into_series(),
                DataType::Float32 => series
                    .f32()?
                    .apply_values(|v| if v.is_nan() { 0.0 } else { v })
                    .into_series(),
                _ if series.null_count() == 0 => continue,
                _ => series.clone(),
            };
            df.with_column(without_nan.fill_null(FillNullStrategy::Zero)?)?;
        }
        Ok(())
    }

    /// True for `Date`-style headers: the name starts with "date",
    /// case-insensitively (`Date`, `Date_YMD`). `Last_Updated_Time` is not one.
    pub fn is_date_column_name(name: &str) -> bool {
        name.to_lowercase().starts_with("date")
    }

    /// Parse date-named columns. A column where no value parses is left as is.
    fn parse_date_columns(df: &mut DataFrame) -> Result<(), ProcessorError> {
        let date_cols: Vec<String> = df
            .get_columns()
            .iter()
            .filter(|col| col.dtype() != &DataType::Date)
            .filter(|col| Self::is_date_column_name(col.name()))
            .map(|col| col.name().to_string())
            .collect();

        for name in date_cols {
            let column = df.column(&name)?;
            let parsed = Self::parse_date_column(column)?;
            if parsed.null_count() == parsed.len() && column.null_count() < column.len() {
                warn!("Column '{}' has no parsable dates, left unchanged", name);
                continue;
            }
            df.with_column(parsed)?;
        }
        Ok(())
    }

    /// Parse a column into a `Date` series, mapping unparsable values to null.
    pub fn parse_date_column(column: &Column) -> Result<Series, ProcessorError> {
        let text = column.cast(&DataType::String)?;
        let days: Vec<Option<i32>> = text
            .str()?
            .into_iter()
            .map(|value| value.and_then(parse_date).map(date_to_days))
            .collect();

        let parsed = Series::new(column.name().clone(), days).cast(&DataType::Date)?;
        Ok(parsed)
    }

    /// First column whose name contains "state" (case-insensitive).
    pub fn find_state_column(df: &DataFrame) -> Option<String> {
        df.get_column_names()
            .into_iter()
            .find(|name| name.to_lowercase().contains("state"))
            .map(|name| name.to_string())
    }

    /// Best-effort state column resolver.
    ///
    /// Falls back to the first column when no header mentions "state", so an
    /// unusual header layout can resolve to the wrong column.
    pub fn state_column(df: &DataFrame) -> Option<String> {
        Self::find_state_column(df)
            .or_else(|| df.get_column_names().first().map(|name| name.to_string()))
    }
}
