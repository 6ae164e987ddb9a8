mod bootstrap;

use kpiline::{
    compute_kpis, config::ReportConfig, load_dataset, report, settings::Settings, PipelineError,
};

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use std::io::stdout;
use tracing::{error, info};

fn main() -> Result<()> {
    let settings = Settings::parse();
    let log_path = bootstrap::setup_logging(&settings.log_level, &settings.log_dir)?;
    info!("Logging to {}", log_path.display());

    if let Err(e) = run(&settings) {
        error!("Run aborted: {:#}", e);
        return Err(e);
    }

    Ok(())
}

fn run(settings: &Settings) -> Result<()> {
    let mut config = ReportConfig::load(&settings.config)?;
    settings.apply(&mut config);
    config.validate()?;

    let source = config.source()?;
    let today = Local::now().date_naive();
    let period = config.period.resolve(today, settings.start, settings.end);

    info!("Source: {}", source.describe());
    info!("Period: {}", period);

    let records = load_dataset(&source, &config.column_mapping, &period)?;
    if records.is_empty() {
        return Err(PipelineError::EmptyResult(source.describe()).into());
    }

    info!("Computing KPIs over {} records", records.len());
    let bundle = compute_kpis(&records, config.top_n_products)?;

    let path = report::report_path(&config, today)?;
    report::write_bundle(&bundle, &path)?;
    info!("Report written to {}", path.display());

    bundle.dump_summary(stdout().lock())?;

    Ok(())
}
