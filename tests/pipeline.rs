use covid_india_analysis::data::{
    export_for_tableau, DataCleaner, DataLoader, DAILY_EXPORT_FILE, STATES_EXPORT_FILE,
};
use covid_india_analysis::stats::{Aggregator, CASE_METRICS, CONFIRMED, DATE, DECEASED, MORTALITY_RATE};
use polars::prelude::*;
use std::fs;
use std::path::Path;

const STATES_CSV: &str = "\
Date,State,Confirmed,Recovered,Deceased,Other,Tested
2020-04-25,Kerala,457,338,3,0,
2020-04-25,Maharashtra,6817,957,301,0,
2020-04-25,India,24942,5210,780,0,
2020-04-26,Kerala,458,338,4,0,21334
2020-04-26,Maharashtra,7628,1076,323,0,
2020-04-26,Total,26283,5939,825,0,625309
2020-04-27,Kerala,469,342,4,0,22000
2020-04-27,Maharashtra,8068,1188,342,0,
";

fn write_fixture(dir: &Path) {
    fs::write(dir.join("states.csv"), STATES_CSV).unwrap();
}

fn column_sum(df: &DataFrame, name: &str) -> i64 {
    df.column(name)
        .unwrap()
        .cast(&DataType::Int64)
        .unwrap()
        .i64()
        .unwrap()
        .sum()
        .unwrap_or(0)
}

#[test]
fn test_load_clean_aggregate_export() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());

    let loader = DataLoader::new(dir.path());
    let raw = loader.load_states(None).unwrap();
    let cleaned = DataCleaner::clean(&raw).unwrap();

    // aggregate rows removed, nothing else
    assert_eq!(raw.height(), 8);
    assert_eq!(cleaned.height(), 6);
    for name in DataLoader::numeric_columns(&cleaned) {
        assert_eq!(cleaned.column(&name).unwrap().null_count(), 0, "{name}");
    }
    assert_eq!(cleaned.column(DATE).unwrap().dtype(), &DataType::Date);

    let daily = Aggregator::daily_stats(&cleaned, DATE).unwrap().unwrap();
    assert_eq!(daily.height(), 3);
    for metric in CASE_METRICS {
        assert_eq!(column_sum(&daily, metric), column_sum(&cleaned, metric), "{metric}");
    }

    let latest = Aggregator::latest_by_state(&cleaned, DATE, None).unwrap();
    assert_eq!(latest.height(), 2);
    assert_eq!(column_sum(&latest, CONFIRMED), 469 + 8068);

    let with_rate = Aggregator::mortality_rate(&latest, DECEASED, CONFIRMED).unwrap();
    let rates: Vec<f64> = with_rate
        .column(MORTALITY_RATE)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    assert_eq!(rates.len(), 2);
    assert!(rates.iter().all(|r| r.is_finite() && *r > 0.0));

    let out = dir.path().join("tableau");
    let written = export_for_tableau(Some(&cleaned), Some(&daily), None, &out).unwrap();
    assert_eq!(written.len(), 2);

    let reloaded = DataLoader::load_csv(&out.join(STATES_EXPORT_FILE)).unwrap();
    assert_eq!(reloaded.height(), cleaned.height());
    let reloaded_daily = DataLoader::load_csv(&out.join(DAILY_EXPORT_FILE)).unwrap();
    assert_eq!(reloaded_daily.height(), daily.height());
}

#[test]
fn test_ragged_csv_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("states.csv"),
        "State,Confirmed\nKerala,10\nGoa,3,7,extra\n",
    )
    .unwrap();

    let loader = DataLoader::new(dir.path());
    assert!(loader.load_states(None).is_err());
}
