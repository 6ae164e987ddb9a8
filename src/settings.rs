use crate::config::ReportConfig;

use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

/// Monthly sales KPI report from CSV files or a MySQL table
#[derive(Parser, Debug, Clone)]
#[command(name = "kpiline", version)]
pub struct Settings {
    /// JSON config file
    #[arg(long, default_value = "config.json")]
    pub config: PathBuf,

    /// CSV file or directory; replaces the configured source
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// First day of the period (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last day of the period (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Number of products kept in the rankings and product pivot
    #[arg(long)]
    pub top_n: Option<usize>,

    /// Directory the report artifact is written to
    #[arg(long)]
    pub report_dir: Option<PathBuf>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Directory receiving one log file per run
    #[arg(long, default_value = "logs")]
    pub log_dir: PathBuf,
}

impl Settings {
    /// Fold command-line overrides into the loaded config.
    pub fn apply(&self, config: &mut ReportConfig) {
        if let Some(data) = &self.data {
            config.data_source.kind = if data.is_dir() { "directory" } else { "single_file" }.to_string();
            config.data_source.path = Some(data.clone());
        }
        if let Some(top_n) = self.top_n {
            config.top_n_products = top_n;
        }
        if let Some(dir) = &self.report_dir {
            config.report_dir = dir.clone();
        }
    }
}
