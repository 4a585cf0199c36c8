use std::path::Path;

use eframe::egui::{self, Color32, RichText, Ui};

use crate::data::aggregate::ChartMode;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – cascading filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    if state.table.is_none() {
        ui.label("No dataset loaded.");
        return;
    }

    // Clone what we need so we can mutate state from the widgets.
    let options = state.options.clone();
    let selection = state.selection.clone();

    if let Some(choice) = dropdown(ui, "Select State", &selection.state, &options.states) {
        state.select_state(&choice);
    }
    if let Some(choice) = dropdown(ui, "Select County", &selection.county, &options.counties) {
        state.select_county(&choice);
    }
    if let Some(choice) = dropdown(ui, "Select Material", &selection.material, &options.materials)
    {
        state.select_material(&choice);
    }

    ui.separator();
    ui.strong("Select Graph Type");
    let mut mode = state.mode;
    for candidate in ChartMode::ALL {
        ui.radio_value(&mut mode, candidate, candidate.graph_kind());
    }
    if mode != state.mode {
        state.set_mode(mode);
    }

    if state.mode == ChartMode::Overview {
        let mut include = state.pipeline.include_state_average;
        if ui.checkbox(&mut include, "Show state average").changed() {
            state.set_include_state_average(include);
        }
    }
}

/// A labelled combo box. Returns the newly picked value, if any.
fn dropdown(ui: &mut Ui, label: &str, current: &Option<String>, options: &[String]) -> Option<String> {
    let mut picked = None;
    ui.strong(label);
    let current_text = current.as_deref().unwrap_or("—");
    egui::ComboBox::from_id_salt(label)
        .selected_text(current_text)
        .width(ui.available_width())
        .show_ui(ui, |ui: &mut Ui| {
            for opt in options {
                let is_current = current.as_deref() == Some(opt.as_str());
                if ui.selectable_label(is_current, opt).clicked() && !is_current {
                    picked = Some(opt.clone());
                }
            }
        });
    ui.add_space(4.0);
    picked
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(table) = &state.table {
            let matching = state.matching_records();
            ui.label(format!("{} records loaded, {matching} matching", table.len()));
        }

        for msg in [&state.load_error, &state.status_message].into_iter().flatten() {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File loading
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open measurements")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        load_into(state, &path);
    }
}

/// Load `path` into `state`, reporting failures in the status bar.
pub fn load_into(state: &mut AppState, path: &Path) {
    match crate::data::loader::load_file(path) {
        Ok(table) => {
            if table.is_empty() {
                log::warn!("{} contains no usable records", path.display());
            }
            log::info!(
                "{} states, yearly averages {}",
                table.states().len(),
                if table.has_yearly_average { "present" } else { "absent" }
            );
            state.set_table(table);
        }
        Err(e) => {
            log::error!("Failed to load file: {e:#}");
            state.set_load_error(format!("Error: {e:#}"));
        }
    }
}
