//! COVID-19 India Analysis
//!
//! Loads the covid19india CSV exports, cleans and aggregates them with
//! Polars, writes Tableau-ready CSVs and renders static PNG charts.

pub mod charts;
pub mod config;
pub mod data;
pub mod stats;
