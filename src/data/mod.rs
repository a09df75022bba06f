//! Data module - CSV loading, cleaning and export

mod export;
mod loader;
mod processor;

pub use export::{
    default_tableau_dir, export_for_tableau, write_csv, ExportError, DAILY_EXPORT_FILE,
    STATES_EXPORT_FILE, STATE_WISE_EXPORT_FILE,
};
pub use loader::{default_data_dir, DataLoader, LoaderError};
pub use processor::{
    date_to_days, days_to_date, parse_date, DataCleaner, ProcessorError, AGGREGATE_MARKERS,
};
