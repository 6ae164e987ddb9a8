use crate::error::{PipelineError, Result};
use crate::record::{CanonicalRecord, Period};
use crate::schema::ColumnMapping;
use crate::source::file::read_csv_file;

use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing::info;

const CSV_EXTENSION: &str = "csv";

/// CSV files directly inside `dir`, sorted by path. The extension match
/// ignores case, so `jan.CSV` is picked up.
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(PipelineError::NotFound(format!(
            "CSV directory not found: {}",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(CSV_EXTENSION));

        if is_csv && path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

pub fn read_csv_dir(
    dir: &Path,
    mapping: &ColumnMapping,
    period: &Period,
    batch_size: Option<NonZeroUsize>,
) -> Result<Vec<CanonicalRecord>> {
    let files = list_csv_files(dir)?;
    if files.is_empty() {
        return Err(PipelineError::NotFound(format!(
            "No CSV files found in {}",
            dir.display()
        )));
    }

    info!("Found {} CSV file(s) in {}", files.len(), dir.display());

    let mut records = Vec::new();
    for file in &files {
        records.extend(read_csv_file(file, mapping, period, batch_size)?);
    }

    Ok(records)
}
