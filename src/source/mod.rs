pub mod directory;
pub mod file;
pub mod relational;

use crate::error::Result;
use crate::record::{CanonicalRecord, Period};
use crate::schema::ColumnMapping;

use relational::RelationalConfig;
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// A validated source description. Built once from loose settings, see
/// [`crate::ingestion::RawSourceSettings`].
#[derive(Debug, Clone, PartialEq)]
pub enum SourceConfig {
    SingleFile {
        path: PathBuf,
        batch_size: Option<NonZeroUsize>,
    },
    Directory {
        path: PathBuf,
        batch_size: Option<NonZeroUsize>,
    },
    Relational(RelationalConfig),
}

impl SourceConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            SourceConfig::SingleFile { .. } => "single_file",
            SourceConfig::Directory { .. } => "directory",
            SourceConfig::Relational(_) => "relational",
        }
    }

    pub fn describe(&self) -> String {
        match self {
            SourceConfig::SingleFile { path, .. } | SourceConfig::Directory { path, .. } => {
                format!("{} ({})", self.kind(), path.display())
            }
            SourceConfig::Relational(config) => format!("{} ({})", self.kind(), config.label()),
        }
    }

    pub fn read(&self, mapping: &ColumnMapping, period: &Period) -> Result<Vec<CanonicalRecord>> {
        match self {
            SourceConfig::SingleFile { path, batch_size } => {
                file::read_csv_file(path, mapping, period, *batch_size)
            }
            SourceConfig::Directory { path, batch_size } => {
                directory::read_csv_dir(path, mapping, period, *batch_size)
            }
            SourceConfig::Relational(config) => relational::read_mysql(config, mapping, period),
        }
    }
}
