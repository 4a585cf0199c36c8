use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use super::filter::{FilterSelection, narrow};
use super::model::{Cadence, MeasurementRecord, MeasurementTable, unit_for};
use super::period::{Period, parse_period};

// ---------------------------------------------------------------------------
// Chart mode
// ---------------------------------------------------------------------------

/// Which chart the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ChartMode {
    /// Monthly bars grouped by year, with a yearly-average reference line.
    #[default]
    Bar,
    /// Time series of mean values for one county.
    Line,
    /// One line per county of the selected state, optionally with a
    /// state-wide average line.
    Overview,
}

impl ChartMode {
    pub const ALL: [ChartMode; 3] = [ChartMode::Bar, ChartMode::Line, ChartMode::Overview];

    /// Human label, also the leading words of the chart title.
    pub fn graph_kind(self) -> &'static str {
        match self {
            ChartMode::Bar => "Bar Graph",
            ChartMode::Line => "Line Graph",
            ChartMode::Overview => "All Counties",
        }
    }
}

/// Knobs that change what a pipeline run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Add the state-wide average series to the overview chart.
    pub include_state_average: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            include_state_average: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregated outputs
// ---------------------------------------------------------------------------

/// Bar-mode output: mean value per (year, month) plus reference averages.
#[derive(Debug, Clone, PartialEq)]
pub struct BarGrid {
    /// year → month (1–12) → mean value.
    pub cells: BTreeMap<i32, BTreeMap<u32, f64>>,
    /// year → mean value over all of that year's records.
    pub yearly_average: BTreeMap<i32, f64>,
    /// Mean over every surviving record.
    pub overall_average: f64,
    /// Mean of the precomputed `Yearly Measurement Average` column, when the
    /// source carried one.
    pub source_yearly_average: Option<f64>,
}

impl BarGrid {
    /// Value for the horizontal reference line.
    pub fn reference_value(&self) -> f64 {
        self.source_yearly_average.unwrap_or(self.overall_average)
    }

    /// Every month that has a value in at least one year.
    pub fn months(&self) -> BTreeSet<u32> {
        self.cells
            .values()
            .flat_map(|months| months.keys().copied())
            .collect()
    }
}

/// A named, time-ordered sequence of (period, mean) points.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<(Period, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregatedSeries {
    Bar(BarGrid),
    Line(LineSeries),
    Overview(Vec<LineSeries>),
}

/// Result of [`aggregate`]. `series` is `None` when nothing survived.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub series: Option<AggregatedSeries>,
    /// Records discarded because their period could not be parsed.
    pub dropped_periods: usize,
}

/// Text handed to the chart surface alongside the series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartLabels {
    pub title: String,
    pub axis_label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub series: AggregatedSeries,
    pub labels: ChartLabels,
    pub dropped_periods: usize,
}

/// Pipeline result: either a plot-ready chart or an explicit "no data".
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Empty { dropped_periods: usize },
    Chart(Chart),
}

impl Outcome {
    pub fn dropped_periods(&self) -> usize {
        match self {
            Outcome::Empty { dropped_periods } => *dropped_periods,
            Outcome::Chart(chart) => chart.dropped_periods,
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Running mean accumulator.
#[derive(Debug, Clone, Copy, Default)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn add(&mut self, v: f64) {
        self.sum += v;
        self.count += 1;
    }

    fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Parse every record's period, dropping the ones that fail.
///
/// Returns the survivors paired with their parsed period and the number of
/// records dropped.
pub fn parse_periods<'a>(
    records: &[&'a MeasurementRecord],
) -> (Vec<(Period, &'a MeasurementRecord)>, usize) {
    let mut parsed = Vec::with_capacity(records.len());
    let mut dropped = 0;
    for rec in records {
        match parse_period(&rec.period) {
            Some(p) => parsed.push((p, *rec)),
            None => {
                log::debug!(
                    "Dropping record with unparseable period {:?} ({}, {}, {})",
                    rec.period,
                    rec.state,
                    rec.county,
                    rec.material
                );
                dropped += 1;
            }
        }
    }
    if dropped > 0 {
        log::warn!("Dropped {dropped} of {} records with unparseable periods", records.len());
    }
    (parsed, dropped)
}

/// Aggregate already-narrowed records for the given chart mode.
pub fn aggregate(
    records: &[&MeasurementRecord],
    mode: ChartMode,
    options: PipelineOptions,
) -> Aggregation {
    let (parsed, dropped_periods) = parse_periods(records);
    if parsed.is_empty() {
        return Aggregation {
            series: None,
            dropped_periods,
        };
    }

    let series = match mode {
        ChartMode::Bar => AggregatedSeries::Bar(bar_grid(&parsed)),
        ChartMode::Line => {
            let name = format!("{} Measurements", parsed[0].1.material);
            AggregatedSeries::Line(line_series(&name, &parsed))
        }
        ChartMode::Overview => {
            AggregatedSeries::Overview(overview(&parsed, options.include_state_average))
        }
    };
    Aggregation {
        series: Some(series),
        dropped_periods,
    }
}

fn bar_grid(parsed: &[(Period, &MeasurementRecord)]) -> BarGrid {
    let mut cells: BTreeMap<i32, BTreeMap<u32, Mean>> = BTreeMap::new();
    let mut years: BTreeMap<i32, Mean> = BTreeMap::new();
    let mut overall = Mean::default();
    let mut source = Mean::default();

    for (period, rec) in parsed {
        cells
            .entry(period.year())
            .or_default()
            .entry(period.month())
            .or_default()
            .add(rec.value);
        years.entry(period.year()).or_default().add(rec.value);
        overall.add(rec.value);
        if let Some(avg) = rec.yearly_average {
            source.add(avg);
        }
    }

    BarGrid {
        cells: cells
            .into_iter()
            .map(|(year, months)| {
                let months = months
                    .into_iter()
                    .filter_map(|(m, mean)| mean.value().map(|v| (m, v)))
                    .collect();
                (year, months)
            })
            .collect(),
        yearly_average: years
            .into_iter()
            .filter_map(|(year, mean)| mean.value().map(|v| (year, v)))
            .collect(),
        overall_average: overall.value().unwrap_or_default(),
        source_yearly_average: source.value(),
    }
}

/// Mean per calendar date, ascending.
fn line_series(name: &str, parsed: &[(Period, &MeasurementRecord)]) -> LineSeries {
    let mut by_date: BTreeMap<NaiveDate, (Period, Mean)> = BTreeMap::new();
    for (period, rec) in parsed {
        by_date
            .entry(period.date)
            .or_insert_with(|| (*period, Mean::default()))
            .1
            .add(rec.value);
    }
    LineSeries {
        name: name.to_string(),
        points: by_date
            .into_values()
            .filter_map(|(period, mean)| mean.value().map(|v| (period, v)))
            .collect(),
    }
}

fn overview(parsed: &[(Period, &MeasurementRecord)], include_state_average: bool) -> Vec<LineSeries> {
    let mut by_county: BTreeMap<&str, Vec<(Period, &MeasurementRecord)>> = BTreeMap::new();
    for (period, rec) in parsed {
        by_county
            .entry(rec.county.as_str())
            .or_default()
            .push((*period, *rec));
    }

    let mut series: Vec<LineSeries> = by_county
        .into_iter()
        .map(|(county, rows)| line_series(county, &rows))
        .collect();
    if include_state_average {
        series.push(line_series(STATE_AVERAGE_NAME, parsed));
    }
    series
}

/// Legend name of the state-wide average line in the overview chart.
pub const STATE_AVERAGE_NAME: &str = "State average";

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

/// Y-axis label, e.g. `Monthly PM2.5 (µg/m³)`.
pub fn axis_label(material: &str, cadence: Cadence) -> String {
    format!("{}{material} ({})", cadence.label_prefix(), unit_for(material))
}

/// Chart title for a selection and mode.
pub fn chart_title(selection: &FilterSelection, mode: ChartMode) -> String {
    let material = selection.material.as_deref().unwrap_or("all materials");
    let state = selection.state.as_deref().unwrap_or("all states");
    match mode {
        ChartMode::Bar | ChartMode::Line => {
            let county = selection.county.as_deref().unwrap_or("all counties");
            format!("{} on {material} in {county}, {state}", mode.graph_kind())
        }
        ChartMode::Overview => format!("{} on {material} in {state}", mode.graph_kind()),
    }
}

/// The selection a mode actually filters by.
///
/// The overview mode ignores the county field so every county of the
/// selected state is compared.
pub fn effective_selection(selection: &FilterSelection, mode: ChartMode) -> FilterSelection {
    match mode {
        ChartMode::Overview => FilterSelection {
            county: None,
            ..selection.clone()
        },
        ChartMode::Bar | ChartMode::Line => selection.clone(),
    }
}

/// Full pipeline: narrow, parse periods, aggregate, label.
pub fn run(
    table: &MeasurementTable,
    selection: &FilterSelection,
    mode: ChartMode,
    options: PipelineOptions,
) -> Outcome {
    let records = narrow(table, &effective_selection(selection, mode));
    let Aggregation {
        series,
        dropped_periods,
    } = aggregate(&records, mode, options);

    match series {
        None => Outcome::Empty { dropped_periods },
        Some(series) => Outcome::Chart(Chart {
            series,
            labels: ChartLabels {
                title: chart_title(selection, mode),
                axis_label: axis_label(
                    selection.material.as_deref().unwrap_or("Measurement"),
                    table.cadence,
                ),
            },
            dropped_periods,
        }),
    }
}
