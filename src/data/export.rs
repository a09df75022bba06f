//! Tableau Export Module
//! Writes cleaned and aggregated tables as flat CSV files.

use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const STATES_EXPORT_FILE: &str = "states_tableau.csv";
pub const DAILY_EXPORT_FILE: &str = "daily_tableau.csv";
pub const STATE_WISE_EXPORT_FILE: &str = "state_wise_tableau.csv";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Default export directory, `<crate root>/tableau`.
pub fn default_tableau_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tableau")
}

/// Write each present table to `output_dir`, creating it if needed.
///
/// Returns the paths written, in states/daily/state-wise order.
pub fn export_for_tableau(
    states: Option<&DataFrame>,
    daily: Option<&DataFrame>,
    state_wise: Option<&DataFrame>,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, ExportError> {
    fs::create_dir_all(output_dir)?;

    let tables = [
        (states, STATES_EXPORT_FILE),
        (daily, DAILY_EXPORT_FILE),
        (state_wise, STATE_WISE_EXPORT_FILE),
    ];

    let mut written = Vec::new();
    for (df, file_name) in tables {
        let Some(df) = df else {
            continue;
        };
        let path = output_dir.join(file_name);
        write_csv(df, &path)?;
        written.push(path);
    }

    info!("Exported to {}", output_dir.display());
    Ok(written)
}

/// Write a single table as CSV with a header row.
pub fn write_csv(df: &DataFrame, path: &Path) -> Result<(), ExportError> {
    let mut file = File::create(path)?;
    let mut df = df.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_skips_missing_tables() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("tableau");
        let states = df!("State" => ["Goa"], "Confirmed" => [3i64]).unwrap();

        let written = export_for_tableau(Some(&states), None, Some(&states), &out).unwrap();

        assert_eq!(
            written,
            vec![out.join(STATES_EXPORT_FILE), out.join(STATE_WISE_EXPORT_FILE)]
        );
        assert!(!out.join(DAILY_EXPORT_FILE).exists());

        let text = fs::read_to_string(out.join(STATES_EXPORT_FILE)).unwrap();
        assert_eq!(text.lines().next(), Some("State,Confirmed"));
        assert_eq!(text.lines().nth(1), Some("Goa,3"));
    }
}
