//! Query description and the executor interface to the backing store
//!
//! Category sources describe what they need as a [`QuerySpec`]; a
//! [`QueryExecutor`] answers it with a lazy stream of [`RawRecord`]s. Both
//! bundled executors share the row-level filtering in [`QuerySpec::matches`].

pub mod memory;
pub mod parquet_executor;
pub mod record;

pub use memory::InMemoryQueryExecutor;
pub use parquet_executor::ParquetQueryExecutor;
pub use record::{FieldValue, RawRecord, RecordEnvelope};

use itertools::Itertools;

use crate::config::DateFormatConfig;
use crate::error::Result;
use crate::request::{MeasurementPeriod, RequestContext, SubjectSelection};

/// Column holding the subject identifier unless a source says otherwise
pub const DEFAULT_SUBJECT_COLUMN: &str = "pid";

/// Lazily produced records of one query
pub type RecordStream<'a> = Box<dyn Iterator<Item = Result<RawRecord>> + 'a>;

/// Read-only access to the backing store
pub trait QueryExecutor: Send + Sync {
    /// Execute a query; records are produced as the stream is consumed
    fn run<'a>(&'a self, spec: &QuerySpec) -> Result<RecordStream<'a>>;
}

/// Columns that place a record in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodColumns {
    pub start: String,
    pub end: Option<String>,
}

/// What one category needs from the backing store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    /// Category the query belongs to, used in diagnostics
    pub category: String,
    /// Table holding the category's records
    pub table: String,
    /// Projected columns; empty selects everything
    pub columns: Vec<String>,
    /// Column holding the subject identifier
    pub subject_column: String,
    /// Subjects to return
    pub subjects: SubjectSelection,
    /// Window the records must touch
    pub period: Option<MeasurementPeriod>,
    /// Columns compared against `period`
    pub period_columns: Option<PeriodColumns>,
}

impl QuerySpec {
    /// Start a query for `table` scoped by the request's subjects and period
    pub fn for_request(
        category: impl Into<String>,
        table: impl Into<String>,
        ctx: &RequestContext,
    ) -> Self {
        Self {
            category: category.into(),
            table: table.into(),
            columns: Vec::new(),
            subject_column: DEFAULT_SUBJECT_COLUMN.to_string(),
            subjects: ctx.subjects().clone(),
            period: ctx.period().copied(),
            period_columns: None,
        }
    }

    /// Project the listed columns plus the subject column
    #[must_use]
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = std::iter::once(self.subject_column.as_str())
            .chain(columns.iter().copied())
            .unique()
            .map(str::to_string)
            .collect();
        self
    }

    /// Compare the request period against these columns
    #[must_use]
    pub fn period_columns(mut self, start: &str, end: Option<&str>) -> Self {
        self.period_columns = Some(PeriodColumns {
            start: start.to_string(),
            end: end.map(str::to_string),
        });
        self
    }

    /// Whether a record belongs in the result
    ///
    /// Records without a subject identifier pass through so the builder can
    /// report the malformed query. Records whose date cannot be read also pass
    /// through; the category conversion decides what to do with them.
    #[must_use]
    pub fn matches(&self, record: &RawRecord, formats: &DateFormatConfig) -> bool {
        if let Some(subject_id) = record.subject_id(&self.subject_column) {
            if !self.subjects.includes(&subject_id) {
                return false;
            }
        }

        let (Some(period), Some(columns)) = (&self.period, &self.period_columns) else {
            return true;
        };

        let Some(start) = record
            .get(&columns.start)
            .and_then(|value| value.to_datetime(formats))
        else {
            return true;
        };

        // Point-in-time sources end where they start
        let end = match columns.end.as_deref() {
            Some(column) => record
                .get(column)
                .and_then(|value| value.to_datetime(formats)),
            None => Some(start),
        };

        period.overlaps(start, end)
    }
}
