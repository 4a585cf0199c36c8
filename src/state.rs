use crate::color::ColorMap;
use crate::data::aggregate::{self, AggregatedSeries, ChartMode, Outcome, PipelineOptions};
use crate::data::filter::{FilterOptions, FilterSelection, narrow, options_for};
use crate::data::model::MeasurementTable;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
#[derive(Default)]
pub struct AppState {
    /// Loaded table (None until a file is loaded).
    pub table: Option<MeasurementTable>,

    /// Current cascading selection.
    pub selection: FilterSelection,

    /// Dropdown contents for the current selection (cached).
    pub options: FilterOptions,

    /// Which chart to draw.
    pub mode: ChartMode,

    /// Pipeline knobs (state-average line in the overview).
    pub pipeline: PipelineOptions,

    /// Result of the last pipeline run.
    pub outcome: Option<Outcome>,

    /// Colours for the series in `outcome`.
    pub color_map: Option<ColorMap>,

    /// Diagnostic from the last pipeline run (dropped periods).
    pub status_message: Option<String>,

    /// Why the last load failed. Survives selection changes until the next
    /// successful load.
    pub load_error: Option<String>,
}

impl AppState {
    pub fn new(mode: ChartMode, pipeline: PipelineOptions) -> Self {
        Self {
            mode,
            pipeline,
            ..Default::default()
        }
    }

    /// Ingest a newly loaded table and select the first state in the file.
    pub fn set_table(&mut self, table: MeasurementTable) {
        self.selection = FilterSelection {
            state: table.states().first().map(|s| s.to_string()),
            ..Default::default()
        };
        self.table = Some(table);
        self.load_error = None;
        self.recompute();
    }

    /// Record a failed load. Any previously loaded table stays on screen.
    pub fn set_load_error(&mut self, message: String) {
        self.load_error = Some(message);
    }

    /// Records the current chart is built from, before period parsing.
    pub fn matching_records(&self) -> usize {
        self.table.as_ref().map_or(0, |table| {
            narrow(table, &aggregate::effective_selection(&self.selection, self.mode)).len()
        })
    }

    pub fn select_state(&mut self, state: &str) {
        self.selection.state = Some(state.to_string());
        self.recompute();
    }

    pub fn select_county(&mut self, county: &str) {
        self.selection.county = Some(county.to_string());
        self.recompute();
    }

    pub fn select_material(&mut self, material: &str) {
        self.selection.material = Some(material.to_string());
        self.recompute();
    }

    pub fn set_mode(&mut self, mode: ChartMode) {
        self.mode = mode;
        self.recompute();
    }

    pub fn set_include_state_average(&mut self, include: bool) {
        self.pipeline.include_state_average = include;
        self.recompute();
    }

    /// Re-cascade the selection, then rerun the pipeline from scratch.
    pub fn recompute(&mut self) {
        let Some(table) = &self.table else {
            self.options = FilterOptions::default();
            self.outcome = None;
            self.color_map = None;
            self.status_message = None;
            return;
        };

        // Each level is clamped against options computed from the (already
        // clamped) levels above it.
        self.options = options_for(table, &self.selection);
        self.selection.state = keep_or_first(self.selection.state.take(), &self.options.states);
        self.options = options_for(table, &self.selection);
        self.selection.county = keep_or_first(self.selection.county.take(), &self.options.counties);
        self.options = options_for(table, &self.selection);
        self.selection.material =
            keep_or_first(self.selection.material.take(), &self.options.materials);

        let outcome = aggregate::run(table, &self.selection, self.mode, self.pipeline);
        let dropped = outcome.dropped_periods();
        self.status_message = (dropped > 0)
            .then(|| format!("{dropped} record(s) with unreadable dates were skipped"));
        self.color_map = match &outcome {
            Outcome::Chart(chart) => Some(ColorMap::new(series_keys(&chart.series))),
            Outcome::Empty { .. } => None,
        };
        self.outcome = Some(outcome);
    }
}

fn keep_or_first(current: Option<String>, options: &[String]) -> Option<String> {
    match current {
        Some(value) if options.contains(&value) => Some(value),
        _ => options.first().cloned(),
    }
}

/// Legend keys that need a colour for a given series.
fn series_keys(series: &AggregatedSeries) -> Vec<String> {
    match series {
        AggregatedSeries::Bar(grid) => grid.months().iter().map(|m| m.to_string()).collect(),
        AggregatedSeries::Line(line) => vec![line.name.clone()],
        AggregatedSeries::Overview(lines) => lines.iter().map(|l| l.name.clone()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Cadence;
    use crate::data::model::tests::{record, sample_table};

    fn loaded() -> AppState {
        let mut state = AppState::default();
        state.set_table(sample_table());
        state
    }

    #[test]
    fn loading_cascades_to_first_options() {
        let state = loaded();
        assert_eq!(state.selection, FilterSelection::new("ND", "Cass", "PM2.5"));
        assert_eq!(state.options.states, vec!["ND", "MN"]);
        assert_eq!(state.options.counties, vec!["Cass", "Burleigh"]);
        assert_eq!(state.options.materials, vec!["PM2.5", "CO"]);
        assert!(matches!(state.outcome, Some(Outcome::Chart(_))));
    }

    #[test]
    fn loading_selects_the_first_state_in_file_order() {
        let mut state = AppState::default();
        state.set_table(MeasurementTable::from_records(
            vec![
                record("ND", "Cass", "CO", "2021-01", 1.0),
                record("MN", "Clay", "CO", "2021-01", 2.0),
            ],
            Cadence::Monthly,
        ));
        assert_eq!(state.selection, FilterSelection::new("ND", "Cass", "CO"));
        assert_eq!(state.options.states, vec!["ND", "MN"]);
    }

    #[test]
    fn changing_state_resets_invalid_downstream_choices() {
        let mut state = loaded();
        state.select_material("CO");
        state.select_state("MN");
        assert_eq!(state.selection, FilterSelection::new("MN", "Clay", "PM2.5"));

        state.select_state("ND");
        state.select_county("Burleigh");
        assert_eq!(state.selection, FilterSelection::new("ND", "Burleigh", "Ozone"));
    }

    #[test]
    fn still_valid_material_is_kept_across_state_change() {
        let mut state = loaded();
        state.select_state("MN");
        assert_eq!(state.selection, FilterSelection::new("MN", "Clay", "PM2.5"));
        state.select_material("NO2");
        state.select_state("ND");
        assert_eq!(state.selection, FilterSelection::new("ND", "Cass", "PM2.5"));
    }

    #[test]
    fn unknown_choice_falls_back_to_first_option() {
        let mut state = loaded();
        state.select_state("ZZ");
        assert_eq!(state.selection.state.as_deref(), Some("ND"));
    }

    #[test]
    fn load_error_survives_selection_changes() {
        let mut state = loaded();
        state.set_load_error("Error: unreadable file".to_string());
        state.select_state("MN");
        state.set_mode(ChartMode::Line);
        assert_eq!(state.load_error.as_deref(), Some("Error: unreadable file"));
        assert!(state.table.is_some());

        state.set_table(sample_table());
        assert_eq!(state.load_error, None);
    }

    #[test]
    fn matching_count_follows_the_chart_mode() {
        let mut state = AppState::default();
        state.set_table(MeasurementTable::from_records(
            vec![
                record("ND", "Cass", "CO", "2021-01", 1.0),
                record("ND", "Cass", "CO", "2021-02", 2.0),
                record("ND", "Burleigh", "CO", "2021-01", 3.0),
                record("MN", "Clay", "CO", "2021-01", 4.0),
            ],
            Cadence::Monthly,
        ));
        assert_eq!(state.selection, FilterSelection::new("ND", "Cass", "CO"));
        assert_eq!(state.matching_records(), 2);

        state.set_mode(ChartMode::Overview);
        let Some(Outcome::Chart(chart)) = &state.outcome else {
            panic!("expected chart");
        };
        let AggregatedSeries::Overview(lines) = &chart.series else {
            panic!("expected overview");
        };
        let plotted: usize = lines
            .iter()
            .filter(|l| l.name != aggregate::STATE_AVERAGE_NAME)
            .map(|l| l.points.len())
            .sum();
        assert_eq!(plotted, 3);
        assert_eq!(state.matching_records(), 3);

        assert_eq!(AppState::default().matching_records(), 0);
    }

    #[test]
    fn mode_change_reruns_pipeline() {
        let mut state = loaded();
        state.select_state("ND");
        state.select_county("Cass");
        state.select_material("PM2.5");
        state.set_mode(ChartMode::Line);
        let Some(Outcome::Chart(chart)) = &state.outcome else {
            panic!("expected chart");
        };
        assert!(matches!(chart.series, AggregatedSeries::Line(_)));
        assert_eq!(chart.labels.title, "Line Graph on PM2.5 in Cass, ND");

        state.set_mode(ChartMode::Overview);
        state.set_include_state_average(false);
        let Some(Outcome::Chart(chart)) = &state.outcome else {
            panic!("expected chart");
        };
        let AggregatedSeries::Overview(lines) = &chart.series else {
            panic!("expected overview");
        };
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].name, "Cass");
    }

    #[test]
    fn dropped_periods_surface_in_status() {
        let mut state = AppState::default();
        state.set_table(MeasurementTable::from_records(
            vec![
                record("ND", "Cass", "CO", "garbage", 1.0),
                record("ND", "Cass", "CO", "2021-04", 2.0),
            ],
            Cadence::Monthly,
        ));
        assert!(state.status_message.as_deref().unwrap().starts_with("1 record"));

        state.set_table(MeasurementTable::from_records(
            vec![record("ND", "Cass", "CO", "garbage", 1.0)],
            Cadence::Monthly,
        ));
        assert_eq!(state.outcome, Some(Outcome::Empty { dropped_periods: 1 }));
    }

    #[test]
    fn no_table_means_no_outcome() {
        let mut state = AppState::default();
        state.recompute();
        assert!(state.outcome.is_none());
        assert!(state.options.states.is_empty());
    }
}
