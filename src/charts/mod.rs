//! Charts module - Static chart rendering

mod renderer;
mod series;
mod style;

pub use renderer::{
    default_visualizations_dir, ChartError, ChartRenderer, CASES_DEATHS_RECOVERED_FILE,
    DAILY_TREND_FILE, MORTALITY_RECOVERY_FILE, STATE_COMPARISON_FILE, TESTING_FILE,
    TOP_STATES_FILE, VACCINATION_FILE,
};
pub use series::{format_count, pick_value_column, ranking, time_series, Ranking, TimeSeries};
pub use style::{palette_color, Figure, DEFAULT_DPI, PALETTE};
