use chrono::{DateTime, Local};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Map the CLI level names onto `tracing` filter directives.
pub fn filter_directive(log_level: &str) -> &'static str {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug",
        "WARNING" => "warn",
        "ERROR" => "error",
        _ => "info",
    }
}

/// Create `dir` if needed and open `run_<YYYYmmdd_HHMMSS>.log` inside it.
pub fn open_run_log(dir: &Path, started: DateTime<Local>) -> io::Result<(PathBuf, File)> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("run_{}.log", started.format("%Y%m%d_%H%M%S")));
    let file = File::create(&path)?;
    Ok((path, file))
}

/// Install the global subscriber.
///
/// Every event goes to stderr, so stdout stays reserved for the report
/// summary, and to a fresh per-run file under `log_dir`.
pub fn setup_logging(log_level: &str, log_dir: &Path) -> anyhow::Result<PathBuf> {
    let filter =
        EnvFilter::try_new(filter_directive(log_level)).unwrap_or_else(|_| EnvFilter::new("info"));

    let (log_path, log_file) = open_run_log(log_dir, Local::now())?;

    let console = fmt::layer()
        .with_target(false)
        .with_writer(io::stderr);
    let file = fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()?;

    Ok(log_path)
}
