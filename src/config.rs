use std::path::PathBuf;

use clap::Parser;

use crate::data::aggregate::{ChartMode, PipelineOptions};

/// Environmental measurements dashboard.
///
/// Logging is controlled with `RUST_LOG` (e.g. `RUST_LOG=envdash=debug`).
#[derive(Debug, Parser)]
#[command(name = "envdash", version, about)]
pub struct Config {
    /// Measurements table to open at startup (.csv, .json, .parquet).
    #[arg(value_name = "FILE")]
    pub data: Option<PathBuf>,

    /// Chart shown first.
    #[arg(long, value_enum, default_value_t = ChartMode::Bar)]
    pub mode: ChartMode,

    /// Start with the state-average line hidden in the all-counties view.
    #[arg(long)]
    pub no_state_average: bool,
}

impl Config {
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            include_state_average: !self.no_state_average,
        }
    }
}
