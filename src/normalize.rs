use crate::record::{CanonicalField, CanonicalRecord, Period};
use crate::table::RawTable;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

fn text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Turn a mapped table into canonical records inside `period`.
///
/// Rows whose date or amount do not parse, or that lack a text field, are
/// dropped. This never fails; an empty result is for the caller to judge.
/// Columns are looked up by canonical name, so the table must already be mapped.
pub fn normalize(table: &RawTable, period: &Period) -> Vec<CanonicalRecord> {
    let column = |field: CanonicalField| table.column_index(field.name());
    let (Some(date_col), Some(product_col), Some(category_col), Some(amount_col), Some(client_col)) = (
        column(CanonicalField::Date),
        column(CanonicalField::Product),
        column(CanonicalField::Category),
        column(CanonicalField::Amount),
        column(CanonicalField::Client),
    ) else {
        return Vec::new();
    };

    let mut dropped = 0usize;
    let mut out_of_period = 0usize;
    let mut records = Vec::with_capacity(table.len());

    for row in &table.rows {
        let parsed = (|| {
            Some(CanonicalRecord {
                date: parse_date(RawTable::cell(row, date_col)?)?,
                amount: parse_amount(RawTable::cell(row, amount_col)?)?,
                product: text(RawTable::cell(row, product_col))?,
                category: text(RawTable::cell(row, category_col))?,
                client: text(RawTable::cell(row, client_col))?,
            })
        })();

        match parsed {
            Some(record) if period.contains(record.date) => records.push(record),
            Some(_) => out_of_period += 1,
            None => dropped += 1,
        }
    }

    debug!(
        "Normalized {} rows from {}: {} kept, {} unparsable, {} outside period",
        table.len(),
        table.origin,
        records.len(),
        dropped,
        out_of_period
    );

    records
}
