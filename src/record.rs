use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// One normalized sales row. Every field is present once a record exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRecord {
    pub date: NaiveDate,
    pub product: String,
    pub category: String,
    pub amount: Decimal,
    pub client: String,
}

impl CanonicalRecord {
    pub fn new(
        date: NaiveDate,
        product: impl Into<String>,
        category: impl Into<String>,
        amount: Decimal,
        client: impl Into<String>,
    ) -> Self {
        Self {
            date,
            product: product.into(),
            category: category.into(),
            amount,
            client: client.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CanonicalField {
    Date,
    Product,
    Category,
    Amount,
    Client,
}

impl CanonicalField {
    /// Canonical order, also the order missing fields are reported in.
    pub const REQUIRED: [CanonicalField; 5] = [
        CanonicalField::Date,
        CanonicalField::Product,
        CanonicalField::Category,
        CanonicalField::Amount,
        CanonicalField::Client,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CanonicalField::Date => "date",
            CanonicalField::Product => "product",
            CanonicalField::Category => "category",
            CanonicalField::Amount => "amount",
            CanonicalField::Client => "client",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inclusive reporting window. A missing bound leaves that side open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Period {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl Period {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |d: Option<NaiveDate>| d.map_or_else(|| "..".to_string(), |d| d.to_string());
        write!(f, "{} -> {}", side(self.start), side(self.end))
    }
}
