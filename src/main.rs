mod app;
mod color;
mod config;
mod data;
mod state;
mod ui;

use app::EnvDashApp;
use clap::Parser;
use config::Config;
use eframe::egui;
use state::AppState;

fn main() -> eframe::Result {
    env_logger::init();
    let config = Config::parse();

    let mut state = AppState::new(config.mode, config.pipeline_options());
    if let Some(path) = &config.data {
        ui::panels::load_into(&mut state, path);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Environmental Measurements Dashboard",
        options,
        Box::new(|_cc| Ok(Box::new(EnvDashApp { state }))),
    )
}
