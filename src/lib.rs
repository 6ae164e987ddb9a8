pub mod config;
pub mod error;
pub mod ingestion;
pub mod kpi;
pub mod normalize;
pub mod record;
pub mod report;
pub mod schema;
pub mod settings;
pub mod source;
pub mod table;

pub use error::{PipelineError, Result};
pub use ingestion::load_dataset;
pub use kpi::{compute_kpis, KpiBundle};
pub use record::{CanonicalRecord, Period};
