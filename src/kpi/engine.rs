use crate::error::{PipelineError, Result};
use crate::kpi::bundle::{KpiBundle, MonthKeyTotal, MonthSummary, Pivot, PivotRow, RankedTotal};
use crate::record::CanonicalRecord;

use chrono::{Datelike, Days, Months, NaiveDate};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub const DEFAULT_TOP_N: usize = 10;
pub const TOP_CATEGORIES: usize = 5;

pub fn month_of(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

/// Calendar month before `month`, whatever the data holds.
pub fn previous_month(month: NaiveDate) -> Option<NaiveDate> {
    month_of(month).checked_sub_months(Months::new(1))
}

/// `acc + amount`, or `AmountOverflow` naming what was being summed.
fn add_amount<F>(acc: Decimal, amount: Decimal, what: F) -> Result<Decimal>
where
    F: FnOnce() -> String,
{
    acc.checked_add(amount)
        .ok_or_else(|| PipelineError::AmountOverflow(what()))
}

/// `(current - previous) / previous`; `Ok(None)` when the previous total is zero.
pub fn growth_ratio(current: Decimal, previous: Decimal) -> Result<Option<Decimal>> {
    if previous.is_zero() {
        return Ok(None);
    }
    current
        .checked_sub(previous)
        .and_then(|delta| delta.checked_div(previous))
        .map(Some)
        .ok_or_else(|| PipelineError::AmountOverflow("month-over-month growth".to_string()))
}

pub fn summarize_months(records: &[CanonicalRecord]) -> Result<Vec<MonthSummary>> {
    let mut months: BTreeMap<NaiveDate, (Decimal, usize)> = BTreeMap::new();
    for record in records {
        let month = month_of(record.date);
        let entry = months.entry(month).or_insert((Decimal::ZERO, 0));
        entry.0 = add_amount(entry.0, record.amount, || {
            format!("total for {}", month.format("%Y-%m"))
        })?;
        entry.1 += 1;
    }

    // Dividing by a positive count cannot leave the Decimal range.
    Ok(months
        .into_iter()
        .map(|(month, (total, count))| MonthSummary {
            month,
            total,
            count,
            mean: total / Decimal::from(count),
        })
        .collect())
}

/// Sum per (month, key), ordered by month then key.
pub fn group_by_month<F>(records: &[CanonicalRecord], key: F) -> Result<Vec<MonthKeyTotal>>
where
    F: Fn(&CanonicalRecord) -> &str,
{
    let mut groups: BTreeMap<(NaiveDate, &str), Decimal> = BTreeMap::new();
    for record in records {
        let month = month_of(record.date);
        let k = key(record);
        let total = groups.entry((month, k)).or_insert(Decimal::ZERO);
        *total = add_amount(*total, record.amount, || {
            format!("total for {} in {}", k, month.format("%Y-%m"))
        })?;
    }

    Ok(groups
        .into_iter()
        .map(|((month, key), total)| MonthKeyTotal {
            month,
            key: key.to_string(),
            total,
        })
        .collect())
}

/// Whole-period totals per key, highest first, truncated to `limit`.
///
/// Equal totals keep the order in which their keys first appear.
pub fn rank_totals<F>(records: &[CanonicalRecord], key: F, limit: usize) -> Result<Vec<RankedTotal>>
where
    F: Fn(&CanonicalRecord) -> &str,
{
    let mut ranked: Vec<RankedTotal> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for record in records {
        let k = key(record);
        match positions.get(k) {
            Some(&idx) => {
                let entry = &mut ranked[idx];
                entry.total = add_amount(entry.total, record.amount, || format!("total for {}", k))?;
            }
            None => {
                positions.insert(k, ranked.len());
                ranked.push(RankedTotal {
                    key: k.to_string(),
                    total: record.amount,
                });
            }
        }
    }

    // sort_by is stable
    ranked.sort_by(|a, b| b.total.cmp(&a.total));
    ranked.truncate(limit);
    Ok(ranked)
}

/// Zero-filled month x key matrix. Keys outside `columns` are ignored.
pub fn build_pivot(months: &[NaiveDate], grouped: &[MonthKeyTotal], columns: BTreeSet<String>) -> Pivot {
    let cells: HashMap<(NaiveDate, &str), Decimal> = grouped
        .iter()
        .map(|g| ((g.month, g.key.as_str()), g.total))
        .collect();

    let columns: Vec<String> = columns.into_iter().collect();
    let rows = months
        .iter()
        .map(|&month| PivotRow {
            month,
            values: columns
                .iter()
                .map(|col| {
                    cells
                        .get(&(month, col.as_str()))
                        .copied()
                        .unwrap_or(Decimal::ZERO)
                })
                .collect(),
        })
        .collect();

    Pivot { columns, rows }
}

/// Compute every aggregate for one dataset.
///
/// An empty dataset is `EmptyResult`; a sum leaving the `Decimal` range is
/// `AmountOverflow`.
pub fn compute_kpis(records: &[CanonicalRecord], top_n: usize) -> Result<KpiBundle> {
    let by_month = summarize_months(records)?;
    let current_month = by_month
        .last()
        .map(|m| m.month)
        .ok_or_else(|| PipelineError::EmptyResult("no records to aggregate".to_string()))?;
    // Only fails at the lower limit of NaiveDate.
    let previous_month = previous_month(current_month).ok_or_else(|| {
        PipelineError::NotFound(format!("month before {}", current_month.format("%Y-%m")))
    })?;

    let month_total = |month: NaiveDate| {
        by_month
            .iter()
            .find(|m| m.month == month)
            .map_or(Decimal::ZERO, |m| m.total)
    };
    let current_month_amount = month_total(current_month);
    let previous_month_amount = month_total(previous_month);

    let total_amount = records
        .iter()
        .try_fold(Decimal::ZERO, |acc, r| add_amount(acc, r.amount, || "grand total".to_string()))?;
    let mean_amount = total_amount / Decimal::from(records.len());

    let by_category = group_by_month(records, |r| r.category.as_str())?;
    let by_product = group_by_month(records, |r| r.product.as_str())?;

    let top_products = rank_totals(records, |r| r.product.as_str(), top_n)?;
    let top_categories = rank_totals(records, |r| r.category.as_str(), TOP_CATEGORIES)?;

    let months: Vec<NaiveDate> = by_month.iter().map(|m| m.month).collect();
    let categories: BTreeSet<String> = records.iter().map(|r| r.category.clone()).collect();
    let kept_products: BTreeSet<String> = top_products.iter().map(|t| t.key.clone()).collect();

    let pivot_category = build_pivot(&months, &by_category, categories);
    let pivot_product = build_pivot(&months, &by_product, kept_products);

    let growth_ratio = growth_ratio(current_month_amount, previous_month_amount)?;

    Ok(KpiBundle {
        row_count: records.len(),
        by_month,
        by_category,
        by_product,
        pivot_category,
        pivot_product,
        total_amount,
        current_month,
        current_month_amount,
        previous_month,
        previous_month_amount,
        growth_ratio,
        mean_amount,
        top_products,
        top_categories,
    })
}
