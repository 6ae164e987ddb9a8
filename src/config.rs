use crate::error::{PipelineError, Result};
use crate::ingestion::{RawRelationalSettings, RawSourceSettings};
use crate::kpi::DEFAULT_TOP_N;
use crate::record::Period;
use crate::report::format_date;
use crate::schema::ColumnMapping;
use crate::source::SourceConfig;

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Run configuration, read from a JSON file. Every key is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub data_source: RawSourceSettings,
    pub relational: Option<RawRelationalSettings>,
    pub column_mapping: ColumnMapping,
    pub report_dir: PathBuf,
    pub report_prefix: String,
    pub date_format: String,
    pub period: PeriodSettings,
    pub top_n_products: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            data_source: RawSourceSettings::default(),
            relational: None,
            column_mapping: ColumnMapping::default(),
            report_dir: PathBuf::from("./reports"),
            report_prefix: "report".to_string(),
            date_format: "%Y-%m-%d".to_string(),
            period: PeriodSettings::default(),
            top_n_products: DEFAULT_TOP_N,
        }
    }
}

impl ReportConfig {
    /// Load from `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json(&content)
            .map_err(|e| PipelineError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;

        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(content: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Checks that only surface later in the run, done up front instead.
    pub fn validate(&self) -> Result<()> {
        format_date(NaiveDate::default(), &self.date_format)?;
        Ok(())
    }

    pub fn source(&self) -> Result<SourceConfig> {
        self.data_source.validate(self.relational.as_ref())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodMode {
    #[default]
    LastFullMonth,
    Range,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PeriodSettings {
    pub mode: PeriodMode,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl PeriodSettings {
    /// Explicit bounds win when either is given; otherwise the mode decides.
    pub fn resolve(
        &self,
        today: NaiveDate,
        cli_start: Option<NaiveDate>,
        cli_end: Option<NaiveDate>,
    ) -> Period {
        if cli_start.is_some() || cli_end.is_some() {
            return Period::new(cli_start, cli_end);
        }

        match self.mode {
            PeriodMode::Range => Period::new(self.start, self.end),
            PeriodMode::LastFullMonth => last_full_month(today),
        }
    }
}

/// The whole calendar month before the one `today` falls in.
pub fn last_full_month(today: NaiveDate) -> Period {
    let first_this_month = NaiveDate::from_ymd_opt(today.year(), today.month(), 1);
    let end = first_this_month.and_then(|d| d.pred_opt());
    let start = end.and_then(|d| NaiveDate::from_ymd_opt(d.year(), d.month(), 1));
    Period::new(start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::CanonicalField;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = ReportConfig::default();

        assert_eq!(config.top_n_products, 10);
        assert_eq!(config.period.mode, PeriodMode::LastFullMonth);
        assert_eq!(config.column_mapping, ColumnMapping::default());
        assert_eq!(
            config.source().unwrap(),
            SourceConfig::SingleFile {
                path: PathBuf::from("./data/sales_sample.csv"),
                batch_size: None,
            }
        );
    }

    #[test]
    fn test_partial_json_keeps_other_defaults() {
        let config = ReportConfig::from_json(
            r#"{
                "data_source": {"type": "directory", "path": "./exports"},
                "column_mapping": {"date": "sold_on", "amount": "total"},
                "period": {"mode": "range", "start": "2024-01-01"},
                "top_n_products": 3
            }"#,
        )
        .unwrap();

        assert_eq!(config.report_prefix, "report");
        assert_eq!(config.top_n_products, 3);
        assert_eq!(config.column_mapping.source_column(CanonicalField::Date), Some("sold_on"));
        assert_eq!(config.period.start, Some(date(2024, 1, 1)));
        assert_eq!(config.period.end, None);
        assert_eq!(config.source().unwrap().kind(), "directory");
    }

    #[test]
    fn test_unknown_period_mode_is_rejected() {
        assert!(ReportConfig::from_json(r#"{"period": {"mode": "fortnight"}}"#).is_err());
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let config = ReportConfig::load(Path::new("/definitely/not/here.json")).unwrap();
        assert_eq!(config.report_dir, PathBuf::from("./reports"));
    }

    #[test]
    fn test_load_invalid_file_is_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        assert!(matches!(
            ReportConfig::load(file.path()),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn test_load_rejects_bad_date_format() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"date_format": "%Y-%Q"}}"#).unwrap();

        match ReportConfig::load(file.path()) {
            Err(PipelineError::Config(msg)) => assert!(msg.contains("date_format")),
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_last_full_month() {
        let period = last_full_month(date(2024, 3, 15));
        assert_eq!(period.start, Some(date(2024, 2, 1)));
        assert_eq!(period.end, Some(date(2024, 2, 29)));

        let january = last_full_month(date(2025, 1, 1));
        assert_eq!(january.start, Some(date(2024, 12, 1)));
        assert_eq!(january.end, Some(date(2024, 12, 31)));
    }

    #[test]
    fn test_explicit_bounds_override_mode() {
        let settings = PeriodSettings::default();

        let period = settings.resolve(date(2024, 3, 15), Some(date(2023, 6, 1)), None);
        assert_eq!(period, Period::new(Some(date(2023, 6, 1)), None));
    }

    #[test]
    fn test_range_mode() {
        let settings = PeriodSettings {
            mode: PeriodMode::Range,
            start: None,
            end: Some(date(2024, 6, 30)),
        };

        let period = settings.resolve(date(2024, 3, 15), None, None);
        assert_eq!(period, Period::new(None, Some(date(2024, 6, 30))));
    }
}
