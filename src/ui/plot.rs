use chrono::{Datelike, NaiveDate};
use eframe::egui::{Color32, Ui};
use egui_plot::{Bar, BarChart, GridMark, HLine, Legend, Line, LineStyle, Plot, PlotPoints, Points};

use crate::color::ColorMap;
use crate::data::aggregate::{AggregatedSeries, BarGrid, Chart, LineSeries, Outcome};
use crate::state::AppState;

/// Share of each year slot covered by its month bars.
const YEAR_SLOT_FILL: f64 = 0.8;

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

// ---------------------------------------------------------------------------
// Chart (central panel)
// ---------------------------------------------------------------------------

/// Render the chart for the current outcome in the central panel.
pub fn chart(ui: &mut Ui, state: &AppState) {
    let Some(outcome) = &state.outcome else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a file to view measurements  (File → Open…)");
        });
        return;
    };

    let chart = match outcome {
        Outcome::Chart(chart) => chart,
        Outcome::Empty { .. } => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("No data available for the selected options.");
            });
            return;
        }
    };

    ui.heading(chart.labels.title.as_str());
    ui.add_space(4.0);

    let fallback = ColorMap::new(Vec::new());
    let colors = state.color_map.as_ref().unwrap_or(&fallback);

    match &chart.series {
        AggregatedSeries::Bar(grid) => bar_plot(ui, chart, grid, colors),
        AggregatedSeries::Line(line) => line_plot(ui, chart, std::slice::from_ref(line), colors),
        AggregatedSeries::Overview(lines) => line_plot(ui, chart, lines, colors),
    }
}

// ---------------------------------------------------------------------------
// Bar mode: one bar per month, grouped by year
// ---------------------------------------------------------------------------

fn bar_plot(ui: &mut Ui, chart: &Chart, grid: &BarGrid, colors: &ColorMap) {
    let months: Vec<u32> = grid.months().into_iter().collect();
    let bar_width = YEAR_SLOT_FILL / months.len().max(1) as f64;

    Plot::new("bar_plot")
        .legend(Legend::default())
        .x_axis_label("Year")
        .y_axis_label(chart.labels.axis_label.as_str())
        .x_axis_formatter(|mark: GridMark, _range| year_tick(mark.value))
        .allow_drag(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for (slot, month) in months.iter().enumerate() {
                let offset = -YEAR_SLOT_FILL / 2.0 + (slot as f64 + 0.5) * bar_width;
                let bars: Vec<Bar> = grid
                    .cells
                    .iter()
                    .filter_map(|(year, values)| {
                        let v = values.get(month)?;
                        Some(Bar::new(*year as f64 + offset, *v).width(bar_width * 0.95))
                    })
                    .collect();

                let name = MONTH_NAMES
                    .get(*month as usize - 1)
                    .copied()
                    .unwrap_or("?");
                plot_ui.bar_chart(
                    BarChart::new(bars)
                        .name(name)
                        .color(colors.color_for(&month.to_string())),
                );
            }

            let reference_name = if grid.source_yearly_average.is_some() {
                "Yearly Average"
            } else {
                "Overall Average"
            };
            plot_ui.hline(
                HLine::new(grid.reference_value())
                    .name(reference_name)
                    .color(Color32::RED)
                    .style(LineStyle::dashed_dense()),
            );
        });
}

/// Label integer x positions with the year, everything else blank.
fn year_tick(x: f64) -> String {
    if (x - x.round()).abs() < 1e-6 {
        format!("{}", x.round() as i64)
    } else {
        String::new()
    }
}

// ---------------------------------------------------------------------------
// Line modes: time series on a day axis
// ---------------------------------------------------------------------------

fn line_plot(ui: &mut Ui, chart: &Chart, lines: &[LineSeries], colors: &ColorMap) {
    Plot::new("line_plot")
        .legend(Legend::default())
        .x_axis_label("Year")
        .y_axis_label(chart.labels.axis_label.as_str())
        .x_axis_formatter(|mark: GridMark, _range| day_tick(mark.value))
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for series in lines {
                let coords: Vec<[f64; 2]> = series
                    .points
                    .iter()
                    .map(|(period, v)| [period.date.num_days_from_ce() as f64, *v])
                    .collect();
                let color = colors.color_for(&series.name);

                plot_ui.line(
                    Line::new(PlotPoints::from(coords.clone()))
                        .name(&series.name)
                        .color(color)
                        .width(1.5),
                );
                plot_ui.points(
                    Points::new(PlotPoints::from(coords))
                        .name(&series.name)
                        .color(color)
                        .radius(3.0),
                );
            }
        });
}

fn day_tick(x: f64) -> String {
    i32::try_from(x.round() as i64)
        .ok()
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .map(|d| d.format("%Y-%m").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_ticks_only_on_whole_years() {
        assert_eq!(year_tick(2021.0), "2021");
        assert_eq!(year_tick(2021.4), "");
    }

    #[test]
    fn day_ticks_render_year_month() {
        let x = NaiveDate::from_ymd_opt(2022, 7, 15).unwrap().num_days_from_ce() as f64;
        assert_eq!(day_tick(x), "2022-07");
        assert_eq!(day_tick(f64::MAX), "");
    }
}
