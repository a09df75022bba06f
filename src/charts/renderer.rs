//! Static Chart Renderer
//! Generates the COVID-19 India chart images as PNG files.
//!
//! Charts:
//! 1. Daily trend: line with a translucent fill under it
//! 2. Top states: horizontal bars with value labels
//! 3. Confirmed / deaths / recovered: three time-series panels
//! 4. Mortality and recovery rates for the ten largest states
//! 5. Testing and 6. vaccination: top-15 rankings by any numeric column
//! 7. State comparison: top ten by cases next to top ten by deaths

use crate::charts::series::{
    axis_upper, date_bounds, format_count, has_columns, pick_value_column, ranking, time_series,
};
use crate::charts::style::{palette_color, Figure, DEFAULT_DPI, PALETTE};
use crate::data::{DataCleaner, ProcessorError};
use crate::stats::{
    AggregateError, Aggregator, CASE_METRICS, CONFIRMED, DATE, DECEASED, MORTALITY_RATE,
    RECOVERED, RECOVERY_RATE,
};
use chrono::NaiveDate;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use polars::prelude::{DataFrame, PolarsError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

pub const DAILY_TREND_FILE: &str = "01_daily_trend.png";
pub const TOP_STATES_FILE: &str = "02_top_states.png";
pub const CASES_DEATHS_RECOVERED_FILE: &str = "03_cases_deaths_recovered.png";
pub const MORTALITY_RECOVERY_FILE: &str = "04_mortality_recovery_rates.png";
pub const TESTING_FILE: &str = "05_testing_by_state.png";
pub const VACCINATION_FILE: &str = "06_vaccination_progress.png";
pub const STATE_COMPARISON_FILE: &str = "07_state_comparison.png";

const TOP_STATES: usize = 10;
const TOP_RANKING: usize = 15;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Aggregation failed: {0}")]
    Aggregate(#[from] AggregateError),
    #[error("Date parsing failed: {0}")]
    Processor(#[from] ProcessorError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to draw {file}: {message}")]
    Drawing { file: String, message: String },
}

type DrawResult<DB> = Result<(), DrawingAreaErrorKind<<DB as DrawingBackend>::ErrorType>>;

/// Default chart directory, `<crate root>/visualizations`.
pub fn default_visualizations_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("visualizations")
}

/// One horizontal bar panel.
struct BarPanel<'a> {
    title: &'a str,
    x_desc: &'a str,
    rows: &'a [(String, f64)],
    color: &'a dyn Fn(usize) -> RGBColor,
    value_label: Option<&'a dyn Fn(f64) -> String>,
}

/// One time-series panel.
struct LinePanel<'a> {
    title: &'a str,
    y_desc: &'a str,
    series: &'a [(NaiveDate, f64)],
    color: RGBColor,
}

/// Renders charts into a fixed output directory.
pub struct ChartRenderer {
    output_dir: PathBuf,
    dpi: u32,
}

impl Default for ChartRenderer {
    fn default() -> Self {
        Self::new(default_visualizations_dir(), DEFAULT_DPI)
    }
}

impl ChartRenderer {
    pub fn new(output_dir: impl Into<PathBuf>, dpi: u32) -> Self {
        Self {
            output_dir: output_dir.into(),
            dpi,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn figure(&self, width_in: f64, height_in: f64) -> Figure {
        Figure::new(width_in, height_in, self.dpi)
    }

    /// Draw onto a white bitmap and save it as `file_name`.
    fn render<F>(&self, file_name: &str, fig: &Figure, draw: F) -> Result<PathBuf, ChartError>
    where
        F: FnOnce(&DrawingArea<BitMapBackend<'_>, Shift>) -> Result<(), String>,
    {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(file_name);

        let drawn = {
            let root = BitMapBackend::new(&path, fig.pixels()).into_drawing_area();
            root.fill(&WHITE)
                .map_err(|e| e.to_string())
                .and_then(|_| draw(&root))
                .and_then(|_| root.present().map_err(|e| e.to_string()))
        };
        drawn.map_err(|message| ChartError::Drawing {
            file: file_name.to_string(),
            message,
        })?;

        info!("Saved {}", path.display());
        Ok(path)
    }

    fn resolve_state_column(df: &DataFrame, state_col: Option<&str>) -> Option<String> {
        state_col
            .map(str::to_string)
            .or_else(|| DataCleaner::state_column(df))
    }

    /// Plot the daily sum of `value_col` as a filled line.
    pub fn plot_daily_trend(
        &self,
        df: &DataFrame,
        date_col: &str,
        value_col: &str,
        title: &str,
    ) -> Result<Option<PathBuf>, ChartError> {
        if !has_columns(df, &[value_col]) {
            warn!("Skipping {}: missing column '{}'", DAILY_TREND_FILE, value_col);
            return Ok(None);
        }
        let Some(daily) = Aggregator::daily_totals(df, date_col, &[value_col])? else {
            warn!("Skipping {}: missing column '{}'", DAILY_TREND_FILE, date_col);
            return Ok(None);
        };
        let series = time_series(&daily, date_col, value_col)?;
        if series.is_empty() {
            return Ok(None);
        }

        let fig = self.figure(14.0, 6.0);
        let panel = LinePanel {
            title,
            y_desc: "Cases",
            series: &series,
            color: PALETTE[0],
        };
        let path = self.render(DAILY_TREND_FILE, &fig, |root| {
            draw_line_panel(root, &fig, &panel, 14.0).map_err(|e| e.to_string())
        })?;
        Ok(Some(path))
    }

    /// Top ten states by their maximum `value_col`, with value labels.
    pub fn plot_top_states(
        &self,
        df: &DataFrame,
        value_col: &str,
        state_col: Option<&str>,
        title: &str,
        file_name: &str,
    ) -> Result<Option<PathBuf>, ChartError> {
        let Some(state_col) = Self::resolve_state_column(df, state_col) else {
            return Ok(None);
        };
        if !has_columns(df, &[state_col.as_str(), value_col]) {
            warn!("Skipping {}: missing state or value column", file_name);
            return Ok(None);
        }

        let top = Aggregator::top_states(df, Some(state_col.as_str()), value_col, TOP_STATES)?;
        let rows = ranking(&top, &state_col, value_col)?;
        if rows.is_empty() {
            return Ok(None);
        }

        let fig = self.figure(12.0, 8.0);
        let color = |_: usize| PALETTE[0];
        let label: &dyn Fn(f64) -> String = &format_count;
        let panel = BarPanel {
            title,
            x_desc: "Number of Cases",
            rows: &rows,
            color: &color,
            value_label: Some(label),
        };
        let path = self.render(file_name, &fig, |root| {
            draw_bar_panel(root, &fig, &panel, 14.0).map_err(|e| e.to_string())
        })?;
        Ok(Some(path))
    }

    /// Three panels of daily confirmed, deceased and recovered totals.
    pub fn plot_cases_deaths_recovered(
        &self,
        df: &DataFrame,
        date_col: &str,
    ) -> Result<Option<PathBuf>, ChartError> {
        if !has_columns(df, &CASE_METRICS) {
            warn!("Skipping {}: missing case columns", CASES_DEATHS_RECOVERED_FILE);
            return Ok(None);
        }
        let Some(daily) = Aggregator::daily_stats(df, date_col)? else {
            return Ok(None);
        };

        let confirmed = time_series(&daily, date_col, CONFIRMED)?;
        let deceased = time_series(&daily, date_col, DECEASED)?;
        let recovered = time_series(&daily, date_col, RECOVERED)?;
        if confirmed.is_empty() {
            return Ok(None);
        }

        let panels = [
            ("Confirmed Cases", confirmed.as_slice(), PALETTE[0]),
            ("Deaths", deceased.as_slice(), PALETTE[1]),
            ("Recovered", recovered.as_slice(), PALETTE[2]),
        ]
        .map(|(title, series, color)| LinePanel {
            title,
            y_desc: "",
            series,
            color,
        });

        let fig = self.figure(18.0, 5.0);
        let path = self.render(CASES_DEATHS_RECOVERED_FILE, &fig, |root| {
            let area = root
                .titled(
                    "COVID-19 India: Cases, Deaths, and Recoveries",
                    fig.bold_font(14.0),
                )
                .map_err(|e| e.to_string())?;
            for (cell, panel) in area.split_evenly((1, 3)).iter().zip(&panels) {
                draw_line_panel(cell, &fig, panel, 12.0).map_err(|e| e.to_string())?;
            }
            Ok(())
        })?;
        Ok(Some(path))
    }

    /// Mortality and recovery rates of the ten states with the most cases.
    pub fn plot_mortality_recovery_rates(
        &self,
        df: &DataFrame,
        state_col: Option<&str>,
    ) -> Result<Option<PathBuf>, ChartError> {
        let Some(state_col) = Self::resolve_state_column(df, state_col) else {
            return Ok(None);
        };
        if !has_columns(df, &[state_col.as_str(), CONFIRMED, DECEASED, RECOVERED]) {
            warn!("Skipping {}: missing case columns", MORTALITY_RECOVERY_FILE);
            return Ok(None);
        }

        let maxima = Aggregator::state_maxima(df, &state_col, &CASE_METRICS)?;
        let maxima = Aggregator::mortality_rate(&maxima, DECEASED, CONFIRMED)?;
        let maxima = Aggregator::recovery_rate(&maxima, RECOVERED, CONFIRMED)?;
        let top = Aggregator::top_n(&maxima, CONFIRMED, TOP_STATES)?;

        let mortality = ranking(&top, &state_col, MORTALITY_RATE)?;
        let recovery = ranking(&top, &state_col, RECOVERY_RATE)?;
        if mortality.is_empty() {
            return Ok(None);
        }

        let red = |_: usize| PALETTE[1];
        let green = |_: usize| PALETTE[2];
        let two_decimals: &dyn Fn(f64) -> String = &|v| format!("{v:.2}%");
        let one_decimal: &dyn Fn(f64) -> String = &|v| format!("{v:.1}%");
        let panels = [
            BarPanel {
                title: "Mortality Rate by State",
                x_desc: "Mortality Rate (%)",
                rows: &mortality,
                color: &red,
                value_label: Some(two_decimals),
            },
            BarPanel {
                title: "Recovery Rate by State",
                x_desc: "Recovery Rate (%)",
                rows: &recovery,
                color: &green,
                value_label: Some(one_decimal),
            },
        ];

        let fig = self.figure(16.0, 8.0);
        let path = self.render(MORTALITY_RECOVERY_FILE, &fig, |root| {
            draw_bar_panels(
                root,
                &fig,
                "Mortality and Recovery Rates (Top 10 States by Cases)",
                &panels,
            )
            .map_err(|e| e.to_string())
        })?;
        Ok(Some(path))
    }

    /// Top fifteen states by samples tested.
    ///
    /// Uses `TotalSamples`, falling back to the first numeric column.
    pub fn plot_testing_by_state(
        &self,
        df: &DataFrame,
        state_col: Option<&str>,
    ) -> Result<Option<PathBuf>, ChartError> {
        self.plot_top_by_column(
            df,
            state_col,
            &["TotalSamples"],
            "Total Samples Tested",
            "COVID-19 Testing by State (Top 15)",
            TESTING_FILE,
        )
    }

    /// Top fifteen states by vaccine doses administered.
    ///
    /// Uses `Total Doses Administered`, then `Total`, then the first numeric
    /// column.
    pub fn plot_vaccination_progress(
        &self,
        df: &DataFrame,
        state_col: Option<&str>,
    ) -> Result<Option<PathBuf>, ChartError> {
        self.plot_top_by_column(
            df,
            state_col,
            &["Total Doses Administered", "Total"],
            "Total Doses Administered",
            "COVID-19 Vaccination Progress by State (Top 15)",
            VACCINATION_FILE,
        )
    }

    fn plot_top_by_column(
        &self,
        df: &DataFrame,
        state_col: Option<&str>,
        preferred: &[&str],
        x_desc: &str,
        title: &str,
        file_name: &str,
    ) -> Result<Option<PathBuf>, ChartError> {
        let Some(value_col) = pick_value_column(df, preferred) else {
            warn!("Skipping {}: no numeric column", file_name);
            return Ok(None);
        };
        let Some(state_col) = Self::resolve_state_column(df, state_col) else {
            return Ok(None);
        };
        if !has_columns(df, &[state_col.as_str()]) {
            warn!("Skipping {}: missing state column '{}'", file_name, state_col);
            return Ok(None);
        }

        let top = Aggregator::top_states(df, Some(state_col.as_str()), &value_col, TOP_RANKING)?;
        let rows = ranking(&top, &state_col, &value_col)?;
        if rows.is_empty() {
            return Ok(None);
        }

        let fig = self.figure(12.0, 10.0);
        let panel = BarPanel {
            title,
            x_desc,
            rows: &rows,
            color: &palette_color,
            value_label: None,
        };
        let path = self.render(file_name, &fig, |root| {
            draw_bar_panel(root, &fig, &panel, 14.0).map_err(|e| e.to_string())
        })?;
        Ok(Some(path))
    }

    /// Top ten states by confirmed cases next to the top ten by deaths.
    pub fn plot_state_comparison(
        &self,
        df: &DataFrame,
        state_col: Option<&str>,
    ) -> Result<Option<PathBuf>, ChartError> {
        let Some(state_col) = Self::resolve_state_column(df, state_col) else {
            return Ok(None);
        };
        if !has_columns(df, &[state_col.as_str(), CONFIRMED, DECEASED]) {
            warn!("Skipping {}: missing case columns", STATE_COMPARISON_FILE);
            return Ok(None);
        }

        let maxima = Aggregator::state_maxima(df, &state_col, &[CONFIRMED, DECEASED])?;
        let by_cases = ranking(
            &Aggregator::top_n(&maxima, CONFIRMED, TOP_STATES)?,
            &state_col,
            CONFIRMED,
        )?;
        let by_deaths = ranking(
            &Aggregator::top_n(&maxima, DECEASED, TOP_STATES)?,
            &state_col,
            DECEASED,
        )?;
        if by_cases.is_empty() {
            return Ok(None);
        }

        let blue = |_: usize| PALETTE[0];
        let red = |_: usize| PALETTE[1];
        let panels = [
            BarPanel {
                title: "Top 10 States by Confirmed Cases",
                x_desc: "Number of Cases",
                rows: &by_cases,
                color: &blue,
                value_label: None,
            },
            BarPanel {
                title: "Top 10 States by Deaths",
                x_desc: "Number of Deaths",
                rows: &by_deaths,
                color: &red,
                value_label: None,
            },
        ];

        let fig = self.figure(16.0, 8.0);
        let path = self.render(STATE_COMPARISON_FILE, &fig, |root| {
            draw_bar_panels(root, &fig, "State-wise Comparison: Cases vs Deaths", &panels)
                .map_err(|e| e.to_string())
        })?;
        Ok(Some(path))
    }

    /// Render every chart the state time series supports.
    ///
    /// Nothing is drawn when the table has no `Date` column.
    pub fn create_all_visualizations(&self, states: &DataFrame) -> Result<Vec<PathBuf>, ChartError> {
        info!("Creating visualizations...");
        if !has_columns(states, &[DATE]) {
            warn!("States table has no '{}' column, no charts created", DATE);
            return Ok(Vec::new());
        }

        let rendered = [
            self.plot_daily_trend(states, DATE, CONFIRMED, "Daily COVID-19 Cases")?,
            self.plot_top_states(states, CONFIRMED, None, "Top 10 States", TOP_STATES_FILE)?,
            self.plot_cases_deaths_recovered(states, DATE)?,
            self.plot_mortality_recovery_rates(states, None)?,
            self.plot_state_comparison(states, None)?,
        ];

        let written: Vec<PathBuf> = rendered.into_iter().flatten().collect();
        info!("Done! {} charts in {}", written.len(), self.output_dir.display());
        Ok(written)
    }
}

/// Pixel width needed for the longest category label.
fn label_area(fig: &Figure, labels: &[(String, f64)], points: f64) -> u32 {
    let longest = labels
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0);
    // average glyph advance of a sans-serif face is roughly 0.55 em
    (longest as f64 * fig.pt(points) * 0.55) as u32 + fig.px(points)
}

fn draw_line_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    fig: &Figure,
    panel: &LinePanel<'_>,
    title_points: f64,
) -> DrawResult<DB> {
    let Some((start, end)) = date_bounds(panel.series) else {
        return Ok(());
    };
    let y_max = axis_upper(panel.series.iter().map(|(_, v)| *v));

    let mut chart = ChartBuilder::on(area)
        .caption(panel.title, fig.bold_font(title_points))
        .margin(fig.px(8.0))
        .x_label_area_size(fig.px(40.0))
        .y_label_area_size(fig.px(64.0))
        .build_cartesian_2d(start..end, 0f64..y_max)?;

    let date_label = |d: &NaiveDate| d.format("%b %Y").to_string();
    let count_label = |v: &f64| format_count(*v);

    let mut mesh = chart.configure_mesh();
    mesh.x_labels(8)
        .x_label_formatter(&date_label)
        .y_label_formatter(&count_label)
        .label_style(fig.font(9.0))
        .axis_desc_style(fig.font(12.0))
        .bold_line_style(BLACK.mix(0.15))
        .light_line_style(WHITE)
        .x_desc("Date");
    if !panel.y_desc.is_empty() {
        mesh.y_desc(panel.y_desc);
    }
    mesh.draw()?;

    let points = panel.series.iter().copied();
    chart.draw_series(AreaSeries::new(points.clone(), 0.0, panel.color.mix(0.3)))?;
    chart.draw_series(LineSeries::new(
        points,
        panel.color.stroke_width(fig.px(2.0)),
    ))?;
    Ok(())
}

/// Horizontal bars, largest first at the top.
fn draw_bar_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    fig: &Figure,
    panel: &BarPanel<'_>,
    title_points: f64,
) -> DrawResult<DB> {
    let rows = panel.rows;
    let n = rows.len() as i32;
    let headroom = if panel.value_label.is_some() { 1.12 } else { 1.0 };
    let x_max = axis_upper(rows.iter().map(|(_, v)| *v)) * headroom;

    // rank 0 sits in the top segment
    let row_at = |segment: i32| usize::try_from(n - 1 - segment).ok().and_then(|i| rows.get(i));
    let segment_of = |rank: usize| n - 1 - rank as i32;

    let mut chart = ChartBuilder::on(area)
        .caption(panel.title, fig.bold_font(title_points))
        .margin(fig.px(8.0))
        .x_label_area_size(fig.px(40.0))
        .y_label_area_size(label_area(fig, rows, 10.0))
        .build_cartesian_2d(0f64..x_max, (0..n).into_segmented())?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(rows.len())
        .y_label_formatter(&|v: &SegmentValue<i32>| match v {
            SegmentValue::CenterOf(segment) => row_at(*segment)
                .map(|(label, _)| label.clone())
                .unwrap_or_default(),
            _ => String::new(),
        })
        .x_label_formatter(&|v: &f64| format_count(*v))
        .label_style(fig.font(10.0))
        .axis_desc_style(fig.font(12.0))
        .bold_line_style(BLACK.mix(0.15))
        .light_line_style(WHITE)
        .x_desc(panel.x_desc)
        .draw()?;

    let bar_margin = fig.px(4.0);
    chart.draw_series(rows.iter().enumerate().map(|(rank, (_, value))| {
        let segment = segment_of(rank);
        let mut bar = Rectangle::new(
            [
                (0.0, SegmentValue::Exact(segment)),
                (*value, SegmentValue::Exact(segment + 1)),
            ],
            (panel.color)(rank).filled(),
        );
        bar.set_margin(bar_margin, bar_margin, 0, 0);
        bar
    }))?;

    if let Some(format_value) = panel.value_label {
        let style = TextStyle::from(fig.font(9.0)).pos(Pos::new(HPos::Left, VPos::Center));
        chart.draw_series(rows.iter().enumerate().map(|(rank, (_, value))| {
            Text::new(
                format_value(*value),
                (*value + x_max * 0.005, SegmentValue::CenterOf(segment_of(rank))),
                style.clone(),
            )
        }))?;
    }
    Ok(())
}

fn draw_bar_panels<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    fig: &Figure,
    title: &str,
    panels: &[BarPanel<'_>],
) -> DrawResult<DB> {
    let area = root.titled(title, fig.bold_font(14.0))?;
    let cells = area.split_evenly((1, panels.len()));
    for (cell, panel) in cells.iter().zip(panels) {
        draw_bar_panel(cell, fig, panel, 12.0)?;
    }
    Ok(())
}
