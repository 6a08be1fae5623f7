//! Configuration for the QDM builder.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// What to do with a converted record whose subject was never enumerated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    /// Log under the attribution target, count it and drop the record
    #[default]
    Skip,
    /// Abort the build
    Fail,
}

/// Configuration for the `QdmBuilder`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Sweep category sources concurrently
    pub parallel: bool,
    /// Worker threads for the parallel sweep
    pub max_threads: usize,
    /// Handling of records attributed to unknown subjects
    pub orphan_policy: OrphanPolicy,
    /// Rows per record batch when reading Parquet tables
    pub batch_size: usize,
    /// Show a progress bar while sweeping categories
    pub show_progress: bool,
    /// Accepted formats for textual dates
    pub date_formats: DateFormatConfig,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            max_threads: num_cpus::get(),
            orphan_policy: OrphanPolicy::Skip,
            batch_size: 8192,
            show_progress: false,
            date_formats: DateFormatConfig::default(),
        }
    }
}

impl BuilderConfig {
    /// Load a configuration from a JSON file; absent keys keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the builder cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be positive".to_string()));
        }
        if self.max_threads == 0 {
            return Err(Error::Config("max_threads must be positive".to_string()));
        }
        if self.date_formats.date_formats.is_empty() {
            return Err(Error::Config("at least one date format is required".to_string()));
        }
        Ok(())
    }
}

/// Configuration for date format handling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DateFormatConfig {
    /// Date formats to try, in order
    pub date_formats: Vec<String>,
    /// Date-time formats to try before falling back to the date formats
    pub datetime_formats: Vec<String>,
}

impl Default for DateFormatConfig {
    fn default() -> Self {
        Self {
            date_formats: vec![
                "%Y-%m-%d".to_string(), // ISO format: 2023-01-15
                "%Y%m%d".to_string(),   // Compact: 20230115
                "%m/%d/%Y".to_string(), // US: 01/15/2023
                "%d.%m.%Y".to_string(), // 15.01.2023
            ],
            datetime_formats: vec![
                "%Y-%m-%d %H:%M:%S".to_string(),
                "%Y-%m-%dT%H:%M:%S".to_string(),
                "%Y-%m-%d %H:%M".to_string(),
                "%Y%m%d%H%M%S".to_string(),
            ],
        }
    }
}

impl DateFormatConfig {
    /// Parse a textual date or date-time; dates resolve to midnight
    ///
    /// Zero dates such as `0000-00-00` fail every format and come back as `None`.
    #[must_use]
    pub fn parse_datetime(&self, text: &str) -> Option<NaiveDateTime> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        self.datetime_formats
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
            .or_else(|| {
                self.date_formats
                    .iter()
                    .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            })
    }
}
