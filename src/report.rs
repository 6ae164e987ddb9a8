use crate::config::ReportConfig;
use crate::error::{PipelineError, Result};
use crate::kpi::KpiBundle;

use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDate;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Format `date` with a user-supplied strftime pattern.
///
/// An unknown specifier is a configuration error rather than a formatting panic.
pub fn format_date(date: NaiveDate, pattern: &str) -> Result<String> {
    let invalid = || PipelineError::Config(format!("invalid date_format `{}`", pattern));

    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(invalid());
    }

    let mut stamp = String::new();
    write!(stamp, "{}", date.format_with_items(StrftimeItems::new(pattern))).map_err(|_| invalid())?;
    Ok(stamp)
}

/// `<report_dir>/<report_prefix>_<date>.json`
pub fn report_path(config: &ReportConfig, today: NaiveDate) -> Result<PathBuf> {
    let stamp = format_date(today, &config.date_format)?;
    Ok(config
        .report_dir
        .join(format!("{}_{}.json", config.report_prefix, stamp)))
}

pub fn write_bundle(bundle: &KpiBundle, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, bundle).map_err(std::io::Error::other)?;
    writer.flush()?;

    Ok(())
}
