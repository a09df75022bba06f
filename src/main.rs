//! COVID-19 India Analysis - batch driver
//!
//! Load → clean → aggregate → export → render, using paths from
//! `analysis.json` when present.

use anyhow::{Context, Result};
use covid_india_analysis::charts::ChartRenderer;
use covid_india_analysis::config::AnalysisConfig;
use covid_india_analysis::data::{export_for_tableau, DataCleaner, DataLoader, LoaderError};
use covid_india_analysis::stats::{Aggregator, CONFIRMED, DATE, DECEASED, RECOVERED};
use polars::prelude::DataFrame;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let config = AnalysisConfig::load_or_default()?;
    let loader = DataLoader::new(&config.data_dir);

    // States time series drives every chart
    let states = loader
        .load_states(None)
        .context("Failed to load states time series")?;
    let states_clean = DataCleaner::clean(&states)?;
    info!(
        "Cleaned data shape: ({}, {})",
        states_clean.height(),
        states_clean.width()
    );
    info!("Columns: {:?}", states_clean.get_column_names());

    let daily = Aggregator::daily_stats(&states_clean, DATE)?;
    if let Some(daily) = &daily {
        info!("Daily rollup: {} dates", daily.height());
    }

    // Secondary datasets are optional for the driver
    let state_wise = load_optional(&loader, "state_wise", |l| l.load_state_wise(None))?
        .map(|df| summarize_state_wise(&df))
        .transpose()?;
    load_optional(&loader, "case_time_series", |l| l.load_case_time_series(None))?;
    load_optional(&loader, "state_wise_daily", |l| l.load_state_wise_daily(None))?;

    export_for_tableau(
        Some(&states_clean),
        daily.as_ref(),
        state_wise.as_ref(),
        &config.tableau_dir,
    )?;

    let renderer = ChartRenderer::new(&config.visualizations_dir, config.dpi);
    renderer.create_all_visualizations(&states_clean)?;

    if let Some(path) = &config.testing_csv {
        let testing = DataCleaner::clean(&DataLoader::load_csv(path)?)?;
        renderer.plot_testing_by_state(&testing, None)?;
    }
    if let Some(path) = &config.vaccination_csv {
        let vaccination = DataCleaner::clean(&DataLoader::load_csv(path)?)?;
        renderer.plot_vaccination_progress(&vaccination, None)?;
    }

    Ok(())
}

/// Run `load` only when the dataset's file is present in the data dir.
fn load_optional<F>(loader: &DataLoader, name: &str, load: F) -> Result<Option<DataFrame>>
where
    F: FnOnce(&DataLoader) -> Result<DataFrame, LoaderError>,
{
    let path = loader.data_dir().join(format!("{name}.csv"));
    if !path.is_file() {
        warn!("{} not found, skipping", path.display());
        return Ok(None);
    }
    Ok(Some(load(loader)?))
}

/// Cleaned cumulative table, latest row per state, with rate columns.
fn summarize_state_wise(df: &DataFrame) -> Result<DataFrame> {
    let cleaned = DataCleaner::clean(df)?;
    let has_cases = [CONFIRMED, DECEASED, RECOVERED]
        .iter()
        .all(|name| cleaned.column(name).is_ok());
    if !has_cases {
        return Ok(cleaned);
    }

    let latest = Aggregator::latest_by_state(&cleaned, DATE, None)?;
    let with_mortality = Aggregator::mortality_rate(&latest, DECEASED, CONFIRMED)?;
    Ok(Aggregator::recovery_rate(&with_mortality, RECOVERED, CONFIRMED)?)
}
