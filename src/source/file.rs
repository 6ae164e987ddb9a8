use crate::error::{PipelineError, Result};
use crate::normalize::normalize;
use crate::record::{CanonicalRecord, Period};
use crate::schema::{map_and_validate, ColumnMapping};
use crate::table::RawTable;

use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::ErrorKind;
use std::num::NonZeroUsize;
use std::path::Path;
use tracing::{debug, info};

/// Read one CSV file into canonical records.
///
/// With a `batch_size` the file is consumed in slices of that many rows; each
/// slice is mapped, validated and normalized on its own. Any failing slice
/// fails the whole read and nothing accumulated so far is returned.
pub fn read_csv_file(
    path: &Path,
    mapping: &ColumnMapping,
    period: &Period,
    batch_size: Option<NonZeroUsize>,
) -> Result<Vec<CanonicalRecord>> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => {
            PipelineError::NotFound(format!("CSV file not found: {}", path.display()))
        }
        _ => PipelineError::Io(e),
    })?;

    let mut rdr = ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(file);

    let read_error = |source: csv::Error| PipelineError::Read {
        path: path.to_path_buf(),
        source,
    };

    let headers: Vec<String> = rdr
        .headers()
        .map_err(read_error)?
        .iter()
        .map(str::to_string)
        .collect();
    let origin = path.display().to_string();

    info!("Reading {}", origin);

    let Some(batch_size) = batch_size else {
        let mut table = RawTable::new(origin, headers);
        for result in rdr.records() {
            table.push_row(to_row(&result.map_err(read_error)?));
        }
        return finish_batch(table, mapping, period);
    };

    let mut records = Vec::new();
    let mut batches = 0usize;
    let mut batch = RawTable::new(origin.clone(), headers.clone());

    for result in rdr.records() {
        batch.push_row(to_row(&result.map_err(read_error)?));

        if batch.len() == batch_size.get() {
            let full = std::mem::replace(&mut batch, RawTable::new(origin.clone(), headers.clone()));
            records.extend(finish_batch(full, mapping, period)?);
            batches += 1;
        }
    }

    // A header-only file still goes through validation once.
    if !batch.is_empty() || batches == 0 {
        records.extend(finish_batch(batch, mapping, period)?);
        batches += 1;
    }

    debug!("Read {} batch(es) of up to {} rows from {}", batches, batch_size, origin);

    Ok(records)
}

fn finish_batch(
    table: RawTable,
    mapping: &ColumnMapping,
    period: &Period,
) -> Result<Vec<CanonicalRecord>> {
    let table = map_and_validate(table, mapping)?;
    Ok(normalize(&table, period))
}

fn to_row(record: &StringRecord) -> Vec<Option<String>> {
    record.iter().map(|cell| Some(cell.to_string())).collect()
}
