use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required columns in {origin}: {missing:?}")]
    Schema {
        origin: String,
        missing: Vec<String>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Database connection failed for {origin}: {cause}")]
    Connection {
        origin: String,
        #[source]
        cause: sqlx::Error,
    },

    #[error("No data left after filtering: {0}")]
    EmptyResult(String),

    #[error("Amount out of range while computing {0}")]
    AmountOverflow(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
