use crate::error::{PipelineError, Result};
use crate::record::{CanonicalRecord, Period};
use crate::schema::ColumnMapping;
use crate::source::relational::{RelationalConfig, DEFAULT_PORT};
use crate::source::SourceConfig;

use serde::Deserialize;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tracing::info;

/// Source settings as written in a config file, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSourceSettings {
    #[serde(rename = "type", default = "default_source_type")]
    pub kind: String,
    pub path: Option<PathBuf>,
    pub batch_size: Option<usize>,
}

impl Default for RawSourceSettings {
    fn default() -> Self {
        Self {
            kind: default_source_type(),
            path: Some(PathBuf::from("./data/sales_sample.csv")),
            batch_size: None,
        }
    }
}

fn default_source_type() -> String {
    "single_file".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRelationalSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub query: Option<String>,
}

impl TryFrom<&RawRelationalSettings> for RelationalConfig {
    type Error = PipelineError;

    fn try_from(raw: &RawRelationalSettings) -> Result<Self> {
        let required = |value: &Option<String>, name: &str| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| PipelineError::Config(format!("relational source requires `{}`", name)))
        };

        Ok(RelationalConfig {
            host: required(&raw.host, "host")?,
            port: raw.port.unwrap_or(DEFAULT_PORT),
            user: required(&raw.user, "user")?,
            password: raw.password.clone().unwrap_or_default(),
            database: required(&raw.database, "database")?,
            query: raw.query.clone().filter(|q| !q.trim().is_empty()),
        })
    }
}

impl RawSourceSettings {
    /// Validate into a [`SourceConfig`]. Runs before any I/O.
    pub fn validate(&self, relational: Option<&RawRelationalSettings>) -> Result<SourceConfig> {
        let batch_size = match self.batch_size {
            None => None,
            Some(size) => Some(NonZeroUsize::new(size).ok_or_else(|| {
                PipelineError::Config("batch_size must be greater than zero".to_string())
            })?),
        };

        let path = || {
            self.path
                .clone()
                .filter(|p| !p.as_os_str().is_empty())
                .ok_or_else(|| {
                    PipelineError::Config(format!("source type `{}` requires a path", self.kind))
                })
        };

        match self.kind.as_str() {
            "single_file" => Ok(SourceConfig::SingleFile {
                path: path()?,
                batch_size,
            }),
            "directory" => Ok(SourceConfig::Directory {
                path: path()?,
                batch_size,
            }),
            "relational" => {
                let raw = relational.ok_or_else(|| {
                    PipelineError::Config("relational source requires credentials".to_string())
                })?;
                Ok(SourceConfig::Relational(RelationalConfig::try_from(raw)?))
            }
            other => Err(PipelineError::Config(format!("unknown source type `{}`", other))),
        }
    }
}

/// Read a source end to end: raw rows, mapping, validation, normalization.
///
/// An empty dataset is a valid result here.
pub fn load_dataset(
    source: &SourceConfig,
    mapping: &ColumnMapping,
    period: &Period,
) -> Result<Vec<CanonicalRecord>> {
    info!("Loading {} for period {}", source.describe(), period);

    let records = source.read(mapping, period)?;

    info!("Loaded {} records from {}", records.len(), source.kind());
    Ok(records)
}
