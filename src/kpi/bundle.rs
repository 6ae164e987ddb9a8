use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthSummary {
    pub month: NaiveDate,
    pub total: Decimal,
    pub count: usize,
    pub mean: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthKeyTotal {
    pub month: NaiveDate,
    pub key: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedTotal {
    pub key: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotRow {
    pub month: NaiveDate,
    pub values: Vec<Decimal>,
}

/// Months down, keys across. Cells with no underlying rows hold zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pivot {
    pub columns: Vec<String>,
    pub rows: Vec<PivotRow>,
}

impl Pivot {
    pub fn get(&self, month: NaiveDate, key: &str) -> Option<Decimal> {
        let col = self.columns.iter().position(|c| c == key)?;
        self.rows
            .iter()
            .find(|row| row.month == month)
            .and_then(|row| row.values.get(col).copied())
    }

    pub fn months(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|row| row.month).collect()
    }
}

/// Everything computed for one reporting run. Built once, then only read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiBundle {
    pub row_count: usize,
    pub by_month: Vec<MonthSummary>,
    pub by_category: Vec<MonthKeyTotal>,
    pub by_product: Vec<MonthKeyTotal>,
    pub pivot_category: Pivot,
    pub pivot_product: Pivot,
    pub total_amount: Decimal,
    pub current_month: NaiveDate,
    pub current_month_amount: Decimal,
    pub previous_month: NaiveDate,
    pub previous_month_amount: Decimal,
    /// `None` when the previous month sums to zero.
    pub growth_ratio: Option<Decimal>,
    pub mean_amount: Decimal,
    pub top_products: Vec<RankedTotal>,
    pub top_categories: Vec<RankedTotal>,
}

impl KpiBundle {
    /// Per-month CSV summary followed by the headline figures.
    pub fn dump_summary<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writeln!(writer, "month,total,count,mean")?;

        for month in &self.by_month {
            writeln!(
                writer,
                "{},{},{},{}",
                month.month.format("%Y-%m"),
                month.total.round_dp(2).normalize(),
                month.count,
                month.mean.round_dp(2).normalize()
            )?;
        }

        let growth = self
            .growth_ratio
            .and_then(|g| g.checked_mul(Decimal::ONE_HUNDRED))
            .map(|pct| format!("{}%", pct.round_dp(2).normalize()))
            .unwrap_or_else(|| "n/a".to_string());

        writeln!(writer)?;
        writeln!(writer, "records: {}", self.row_count)?;
        writeln!(writer, "total: {}", self.total_amount.round_dp(2).normalize())?;
        writeln!(
            writer,
            "{}: {} (previous {}: {}, growth {})",
            self.current_month.format("%Y-%m"),
            self.current_month_amount.round_dp(2).normalize(),
            self.previous_month.format("%Y-%m"),
            self.previous_month_amount.round_dp(2).normalize(),
            growth
        )?;
        writeln!(writer, "mean transaction: {}", self.mean_amount.round_dp(2).normalize())?;

        Ok(())
    }
}
