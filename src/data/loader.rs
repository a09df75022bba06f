//! CSV Data Loader Module
//! Loads the COVID-19 India datasets into Polars DataFrames.

use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const STATES_FILE: &str = "states.csv";
pub const CASE_TIME_SERIES_FILE: &str = "case_time_series.csv";
pub const STATE_WISE_DAILY_FILE: &str = "state_wise_daily.csv";
pub const STATE_WISE_FILE: &str = "state_wise.csv";

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV {}: {source}", .path.display())]
    CsvError {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },
    #[error("CSV file not found: {}", .0.display())]
    NotFound(PathBuf),
}

/// Default data directory, `<crate root>/data`.
pub fn default_data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data")
}

/// Reads the four COVID-19 India datasets from a data directory.
pub struct DataLoader {
    data_dir: PathBuf,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new(default_data_dir())
    }
}

impl DataLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Load state-wise time series data (`states.csv`).
    pub fn load_states(&self, path: Option<&Path>) -> Result<DataFrame, LoaderError> {
        self.load_dataset(path, STATES_FILE, "states data")
    }

    /// Load India daily time series data (`case_time_series.csv`).
    pub fn load_case_time_series(&self, path: Option<&Path>) -> Result<DataFrame, LoaderError> {
        self.load_dataset(path, CASE_TIME_SERIES_FILE, "case time series")
    }

    /// Load state-wise daily data (`state_wise_daily.csv`).
    pub fn load_state_wise_daily(&self, path: Option<&Path>) -> Result<DataFrame, LoaderError> {
        self.load_dataset(path, STATE_WISE_DAILY_FILE, "state-wise daily")
    }

    /// Load state-wise cumulative data (`state_wise.csv`).
    pub fn load_state_wise(&self, path: Option<&Path>) -> Result<DataFrame, LoaderError> {
        self.load_dataset(path, STATE_WISE_FILE, "state-wise cumulative")
    }

    fn load_dataset(
        &self,
        path: Option<&Path>,
        default_file: &str,
        label: &str,
    ) -> Result<DataFrame, LoaderError> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.data_dir.join(default_file));

        let df = Self::load_csv(&path)?;
        info!("Loaded {}: {} rows", label, df.height());
        Ok(df)
    }

    /// Load a CSV file using Polars.
    ///
    /// The whole file is scanned for schema inference and malformed values are
    /// reported rather than nulled out.
    pub fn load_csv(path: &Path) -> Result<DataFrame, LoaderError> {
        if !path.is_file() {
            return Err(LoaderError::NotFound(path.to_path_buf()));
        }

        let to_err = |source: PolarsError| LoaderError::CsvError {
            path: path.to_path_buf(),
            source,
        };

        LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(None)
            .finish()
            .and_then(|lazy| lazy.collect())
            .map_err(to_err)
    }

    /// Get list of numeric column names, in schema order.
    pub fn numeric_columns(df: &DataFrame) -> Vec<String> {
        df.get_columns()
            .iter()
            .filter(|col| is_numeric(col.dtype()))
            .map(|col| col.name().to_string())
            .collect()
    }
}

pub(crate) fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float32
            | DataType::Float64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}
