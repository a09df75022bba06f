//! Aggregation Module
//! Per-state and per-date reductions over cleaned COVID-19 tables,
//! plus mortality/recovery rate derivation.

use crate::data::{DataCleaner, ProcessorError};
use polars::prelude::*;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

pub const DATE: &str = "Date";
pub const STATE: &str = "State";
pub const CONFIRMED: &str = "Confirmed";
pub const DECEASED: &str = "Deceased";
pub const RECOVERED: &str = "Recovered";
pub const MORTALITY_RATE: &str = "Mortality_Rate";
pub const RECOVERY_RATE: &str = "Recovery_Rate";

/// The three cumulative case metrics, in chart order.
pub const CASE_METRICS: [&str; 3] = [CONFIRMED, DECEASED, RECOVERED];

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Date parsing failed: {0}")]
    Processor(#[from] ProcessorError),
    #[error("Table has no columns to group by")]
    NoStateColumn,
}

/// `100 * numerator / denominator`, or zero when the result is not finite.
pub fn rate(numerator: f64, denominator: f64) -> f64 {
    let value = numerator / denominator * 100.0;
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Handles grouping and reduction operations.
pub struct Aggregator;

impl Aggregator {
    fn resolve_state_column(
        df: &DataFrame,
        state_col: Option<&str>,
    ) -> Result<String, AggregateError> {
        match state_col {
            Some(name) => Ok(name.to_string()),
            None => DataCleaner::state_column(df).ok_or(AggregateError::NoStateColumn),
        }
    }

    /// Latest record for each state.
    ///
    /// With a date column, each state keeps its row with the greatest date
    /// (first one on ties), ordered by state label. Without one, the last
    /// occurring row per state is kept in original row order. Rows with a
    /// null state are ignored.
    pub fn latest_by_state(
        df: &DataFrame,
        date_col: &str,
        state_col: Option<&str>,
    ) -> Result<DataFrame, AggregateError> {
        let state_col = Self::resolve_state_column(df, state_col)?;
        let states = df.column(&state_col)?.cast(&DataType::String)?;
        let states = states.str()?;

        let indices = match df.column(date_col) {
            Ok(dates) => Self::latest_rows_by_date(states, &Self::date_keys(dates)?),
            Err(_) => Self::last_rows(states),
        };

        let idx = IdxCa::from_vec("idx".into(), indices);
        Ok(df.take(&idx)?)
    }

    /// Physical day numbers for a date column; string columns are parsed.
    fn date_keys(column: &Column) -> Result<Vec<Option<i32>>, AggregateError> {
        let dates = match column.dtype() {
            DataType::Date => column.as_materialized_series().clone(),
            _ => DataCleaner::parse_date_column(column)?,
        };
        let days = dates.cast(&DataType::Int32)?;
        Ok(days.i32()?.into_iter().collect())
    }

    fn latest_rows_by_date(states: &StringChunked, days: &[Option<i32>]) -> Vec<IdxSize> {
        let mut latest: BTreeMap<&str, (usize, Option<i32>)> = BTreeMap::new();

        for (row, (state, day)) in states.into_iter().zip(days.iter().copied()).enumerate() {
            let Some(state) = state else {
                continue;
            };
            latest
                .entry(state)
                .and_modify(|best| {
                    let newer = match (best.1, day) {
                        (Some(current), Some(candidate)) => candidate > current,
                        (None, Some(_)) => true,
                        // all-null so far: keep the last row
                        (None, None) => true,
                        (Some(_), None) => false,
                    };
                    if newer {
                        *best = (row, day);
                    }
                })
                .or_insert((row, day));
        }

        latest
            .into_values()
            .map(|(row, _)| row as IdxSize)
            .collect()
    }

    fn last_rows(states: &StringChunked) -> Vec<IdxSize> {
        let mut last: HashMap<&str, usize> = HashMap::new();
        for (row, state) in states.into_iter().enumerate() {
            if let Some(state) = state {
                last.insert(state, row);
            }
        }

        let mut rows: Vec<IdxSize> = last.into_values().map(|row| row as IdxSize).collect();
        rows.sort_unstable();
        rows
    }

    /// Sum the given metrics per date, sorted by date.
    ///
    /// Returns `None` when `date_col` is absent. Rows with a null date are
    /// dropped before grouping.
    pub fn daily_totals(
        df: &DataFrame,
        date_col: &str,
        metrics: &[&str],
    ) -> Result<Option<DataFrame>, AggregateError> {
        if df.column(date_col).is_err() {
            return Ok(None);
        }

        let aggs: Vec<Expr> = metrics.iter().map(|metric| col(*metric).sum()).collect();
        let daily = df
            .clone()
            .lazy()
            .filter(col(date_col).is_not_null())
            .group_by([col(date_col)])
            .agg(aggs)
            .sort([date_col], SortMultipleOptions::default())
            .collect()?;

        Ok(Some(daily))
    }

    /// Daily Confirmed/Deceased/Recovered totals across all states.
    pub fn daily_stats(df: &DataFrame, date_col: &str) -> Result<Option<DataFrame>, AggregateError> {
        Self::daily_totals(df, date_col, &CASE_METRICS)
    }

    /// Max of each metric per state, in order of first appearance.
    pub fn state_maxima(
        df: &DataFrame,
        state_col: &str,
        metrics: &[&str],
    ) -> Result<DataFrame, AggregateError> {
        let aggs: Vec<Expr> = metrics.iter().map(|metric| col(*metric).max()).collect();
        let maxima = df
            .clone()
            .lazy()
            .filter(col(state_col).is_not_null())
            .group_by_stable([col(state_col)])
            .agg(aggs)
            .collect()?;

        Ok(maxima)
    }

    /// The `n` rows with the largest `metric`, descending. Ties keep their
    /// input order.
    pub fn top_n(df: &DataFrame, metric: &str, n: usize) -> Result<DataFrame, AggregateError> {
        let options = SortMultipleOptions::default()
            .with_order_descending(true)
            .with_nulls_last(true)
            .with_maintain_order(true);

        let top = df
            .clone()
            .lazy()
            .sort([metric], options)
            .limit(IdxSize::try_from(n).unwrap_or(IdxSize::MAX))
            .collect()?;

        Ok(top)
    }

    /// Per-state max of `metric`, then the `n` largest states.
    pub fn top_states(
        df: &DataFrame,
        state_col: Option<&str>,
        metric: &str,
        n: usize,
    ) -> Result<DataFrame, AggregateError> {
        let state_col = Self::resolve_state_column(df, state_col)?;
        let maxima = Self::state_maxima(df, &state_col, &[metric])?;
        Self::top_n(&maxima, metric, n)
    }

    /// Append `out_name` = `100 * numerator / denominator`, clamping
    /// non-finite results and nulls to zero.
    pub fn with_rate(
        df: &DataFrame,
        numerator: &str,
        denominator: &str,
        out_name: &str,
    ) -> Result<DataFrame, AggregateError> {
        let num = df.column(numerator)?.cast(&DataType::Float64)?;
        let den = df.column(denominator)?.cast(&DataType::Float64)?;

        let rates: Vec<f64> = num
            .f64()?
            .into_iter()
            .zip(den.f64()?.into_iter())
            .map(|pair| match pair {
                (Some(n), Some(d)) => rate(n, d),
                _ => 0.0,
            })
            .collect();

        let mut out = df.clone();
        out.with_column(Series::new(out_name.into(), rates))?;
        Ok(out)
    }

    /// Append `Mortality_Rate` (deaths per 100 cases).
    pub fn mortality_rate(
        df: &DataFrame,
        deaths_col: &str,
        cases_col: &str,
    ) -> Result<DataFrame, AggregateError> {
        Self::with_rate(df, deaths_col, cases_col, MORTALITY_RATE)
    }

    /// Append `Recovery_Rate` (recoveries per 100 cases).
    pub fn recovery_rate(
        df: &DataFrame,
        recovered_col: &str,
        cases_col: &str,
    ) -> Result<DataFrame, AggregateError> {
        Self::with_rate(df, recovered_col, cases_col, RECOVERY_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(df: &DataFrame, name: &str) -> Vec<String> {
        df.column(name)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap_or_default().to_string())
            .collect()
    }

    fn ints(df: &DataFrame, name: &str) -> Vec<i64> {
        df.column(name)
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap_or_default())
            .collect()
    }

    fn floats(df: &DataFrame, name: &str) -> Vec<f64> {
        df.column(name)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect()
    }

    fn states_frame() -> DataFrame {
        let raw = df!(
            "Date" => ["2020-04-02", "2020-04-01", "2020-04-01", "2020-04-02", "2020-04-03", "bad"],
            "State" => ["Kerala", "Kerala", "Goa", "Goa", "Goa", "Assam"],
            "Confirmed" => [20i64, 10, 5, 7, 9, 4],
            "Deceased" => [2i64, 1, 0, 0, 1, 0],
            "Recovered" => [10i64, 5, 1, 2, 3, 1],
        )
        .unwrap();
        DataCleaner::clean(&raw).unwrap()
    }

    #[test]
    fn test_rate_clamps_non_finite() {
        assert_eq!(rate(0.0, 0.0), 0.0);
        assert_eq!(rate(5.0, 0.0), 0.0);
        assert_eq!(rate(1.0, 100.0), 1.0);
        assert_eq!(rate(f64::NAN, 3.0), 0.0);
    }

    #[test]
    fn test_kerala_mortality_after_cleaning() {
        let raw = df!(
            "State" => ["Kerala", "Total"],
            "Confirmed" => [100i64, 5000],
            "Deceased" => [1i64, 50],
        )
        .unwrap();

        let cleaned = DataCleaner::clean(&raw).unwrap();
        let with_rate = Aggregator::mortality_rate(&cleaned, DECEASED, CONFIRMED).unwrap();

        assert_eq!(with_rate.height(), 1);
        assert_eq!(floats(&with_rate, MORTALITY_RATE), vec![1.0]);
        // the source table does not gain the column
        assert!(cleaned.column(MORTALITY_RATE).is_err());
    }

    #[test]
    fn test_rates_with_zero_confirmed_are_zero() {
        let df = df!(
            "State" => ["Goa", "Assam", "Bihar"],
            "Confirmed" => [0i64, 0, 200],
            "Deceased" => [0i64, 3, 2],
            "Recovered" => [Some(0i64), Some(0), None],
        )
        .unwrap();

        let df = Aggregator::mortality_rate(&df, DECEASED, CONFIRMED).unwrap();
        let df = Aggregator::recovery_rate(&df, RECOVERED, CONFIRMED).unwrap();

        assert_eq!(floats(&df, MORTALITY_RATE), vec![0.0, 0.0, 1.0]);
        assert_eq!(floats(&df, RECOVERY_RATE), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_daily_rollup_preserves_totals() {
        let df = states_frame();
        let daily = Aggregator::daily_stats(&df, DATE).unwrap().unwrap();

        // the unparsable date row is dropped, three distinct dates remain
        assert_eq!(daily.height(), 3);
        assert_eq!(ints(&daily, CONFIRMED), vec![15, 27, 9]);

        let dated = df
            .clone()
            .lazy()
            .filter(col(DATE).is_not_null())
            .collect()
            .unwrap();
        for metric in CASE_METRICS {
            let raw: i64 = ints(&dated, metric).iter().sum();
            let rolled: i64 = ints(&daily, metric).iter().sum();
            assert_eq!(raw, rolled, "{metric}");
        }
    }

    #[test]
    fn test_daily_stats_without_date_column() {
        let df = df!("State" => ["Goa"], "Confirmed" => [1i64]).unwrap();
        assert!(Aggregator::daily_stats(&df, DATE).unwrap().is_none());
    }

    #[test]
    fn test_top_n_returns_ten_of_36_descending() {
        let states: Vec<String> = (0..36).map(|i| format!("State {i:02}")).collect();
        let mut names = Vec::new();
        let mut confirmed = Vec::new();
        for (i, state) in states.iter().enumerate() {
            // two cumulative rows per state; the max is the second
            names.push(state.clone());
            confirmed.push(i as i64 * 10);
            names.push(state.clone());
            confirmed.push(i as i64 * 10 + 5);
        }
        let df = df!("State" => names, "Confirmed" => confirmed).unwrap();

        let top = Aggregator::top_states(&df, Some(STATE), CONFIRMED, 10).unwrap();

        assert_eq!(top.height(), 10);
        let values = ints(&top, CONFIRMED);
        assert_eq!(values[0], 355);
        assert!(values.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(strings(&top, STATE)[0], "State 35");
    }

    #[test]
    fn test_top_n_with_fewer_states_than_n() {
        let df = df!("State" => ["Goa", "Assam"], "Confirmed" => [1i64, 2]).unwrap();
        let top = Aggregator::top_states(&df, None, CONFIRMED, 10).unwrap();
        assert_eq!(strings(&top, STATE), vec!["Assam", "Goa"]);
    }

    #[test]
    fn test_top_n_with_huge_n_keeps_every_state() {
        let df = df!("State" => ["Goa", "Assam"], "Confirmed" => [1i64, 2]).unwrap();
        // wraps to 1 if narrowed to a 32-bit index
        let n = usize::try_from(u64::from(u32::MAX) + 2).unwrap_or(usize::MAX);
        let top = Aggregator::top_states(&df, None, CONFIRMED, n).unwrap();
        assert_eq!(top.height(), 2);
    }

    #[test]
    fn test_top_n_ties_keep_input_order() {
        let df = df!(
            "State" => ["Punjab", "Goa", "Assam", "Bihar"],
            "Confirmed" => [5i64, 5, 9, 5],
        )
        .unwrap();

        let top = Aggregator::top_states(&df, Some(STATE), CONFIRMED, 3).unwrap();
        assert_eq!(strings(&top, STATE), vec!["Assam", "Punjab", "Goa"]);
    }

    #[test]
    fn test_latest_by_state_picks_max_date() {
        let df = states_frame();
        let latest = Aggregator::latest_by_state(&df, DATE, None).unwrap();

        assert_eq!(strings(&latest, STATE), vec!["Assam", "Goa", "Kerala"]);
        assert_eq!(ints(&latest, CONFIRMED), vec![4, 9, 20]);
    }

    #[test]
    fn test_latest_by_state_without_dates_keeps_last_row() {
        let df = df!(
            "State" => [Some("Goa"), Some("Kerala"), None, Some("Goa")],
            "Confirmed" => [1i64, 2, 3, 4],
        )
        .unwrap();

        let latest = Aggregator::latest_by_state(&df, DATE, Some(STATE)).unwrap();
        assert_eq!(strings(&latest, STATE), vec!["Kerala", "Goa"]);
        assert_eq!(ints(&latest, CONFIRMED), vec![2, 4]);
    }

    #[test]
    fn test_state_maxima_takes_max_per_metric() {
        let df = states_frame();
        let maxima = Aggregator::state_maxima(&df, STATE, &CASE_METRICS).unwrap();

        assert_eq!(strings(&maxima, STATE), vec!["Kerala", "Goa", "Assam"]);
        assert_eq!(ints(&maxima, CONFIRMED), vec![20, 9, 4]);
        assert_eq!(ints(&maxima, DECEASED), vec![2, 1, 0]);
    }
}
