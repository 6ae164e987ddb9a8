use crate::error::{PipelineError, Result};
use crate::record::CanonicalField;
use crate::table::RawTable;

use serde::Deserialize;

/// Source column name for each canonical field.
///
/// A `None` entry means the field is not renamed; the source must then already
/// carry a column with the canonical name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnMapping {
    pub date: Option<String>,
    pub product: Option<String>,
    pub category: Option<String>,
    pub amount: Option<String>,
    pub client: Option<String>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            date: Some("date".to_string()),
            product: Some("product".to_string()),
            category: Some("category".to_string()),
            amount: Some("amount".to_string()),
            client: Some("client".to_string()),
        }
    }
}

impl ColumnMapping {
    /// A mapping that renames nothing.
    pub fn empty() -> Self {
        Self {
            date: None,
            product: None,
            category: None,
            amount: None,
            client: None,
        }
    }

    pub fn source_column(&self, field: CanonicalField) -> Option<&str> {
        match field {
            CanonicalField::Date => self.date.as_deref(),
            CanonicalField::Product => self.product.as_deref(),
            CanonicalField::Category => self.category.as_deref(),
            CanonicalField::Amount => self.amount.as_deref(),
            CanonicalField::Client => self.client.as_deref(),
        }
    }

    pub fn with(mut self, field: CanonicalField, column: impl Into<String>) -> Self {
        let slot = match field {
            CanonicalField::Date => &mut self.date,
            CanonicalField::Product => &mut self.product,
            CanonicalField::Category => &mut self.category,
            CanonicalField::Amount => &mut self.amount,
            CanonicalField::Client => &mut self.client,
        };
        *slot = Some(column.into());
        self
    }

    fn canonical_for(&self, header: &str) -> Option<CanonicalField> {
        CanonicalField::REQUIRED
            .into_iter()
            .find(|field| self.source_column(*field) == Some(header))
    }
}

/// Rename the headers that the mapping knows about. Anything else is left alone.
pub fn apply_mapping(mut table: RawTable, mapping: &ColumnMapping) -> RawTable {
    for header in table.headers.iter_mut() {
        if let Some(field) = mapping.canonical_for(header) {
            *header = field.name().to_string();
        }
    }
    table
}

pub fn ensure_required_columns(table: &RawTable) -> Result<()> {
    let missing: Vec<String> = CanonicalField::REQUIRED
        .iter()
        .filter(|field| !table.has_column(field.name()))
        .map(|field| field.name().to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::Schema {
            origin: table.origin.clone(),
            missing,
        })
    }
}

/// Mapping and validation in one step, as every reader applies them per batch.
pub fn map_and_validate(table: RawTable, mapping: &ColumnMapping) -> Result<RawTable> {
    let table = apply_mapping(table, mapping);
    ensure_required_columns(&table)?;
    Ok(table)
}
