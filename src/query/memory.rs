//! Query executor over tables held in memory

use rustc_hash::FxHashMap;

use super::{QueryExecutor, QuerySpec, RawRecord, RecordStream};
use crate::config::DateFormatConfig;
use crate::error::Result;

/// Tables of records keyed by table name
///
/// Unknown tables answer with an empty stream, the same way a category
/// without data would on a real store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryQueryExecutor {
    tables: FxHashMap<String, Vec<RawRecord>>,
    date_formats: DateFormatConfig,
}

impl InMemoryQueryExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Formats used when a period filter meets a textual date
    #[must_use]
    pub fn with_date_formats(mut self, date_formats: DateFormatConfig) -> Self {
        self.date_formats = date_formats;
        self
    }

    /// Replace the contents of a table
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>, records: Vec<RawRecord>) -> Self {
        self.tables.insert(table.into(), records);
        self
    }

    /// Append one record to a table
    pub fn push(&mut self, table: &str, record: RawRecord) {
        self.tables.entry(table.to_string()).or_default().push(record);
    }
}

impl QueryExecutor for InMemoryQueryExecutor {
    fn run<'a>(&'a self, spec: &QuerySpec) -> Result<RecordStream<'a>> {
        let Some(records) = self.tables.get(&spec.table) else {
            log::debug!("No in-memory table `{}` for {}", spec.table, spec.category);
            return Ok(Box::new(std::iter::empty()));
        };

        let columns = spec.columns.clone();
        let spec = spec.clone();
        let formats = &self.date_formats;
        Ok(Box::new(
            records
                .iter()
                .filter(move |record| spec.matches(record, formats))
                .map(move |record| Ok(project(record, &columns))),
        ))
    }
}

/// Copy a record keeping only `columns`; an empty list keeps everything
fn project(record: &RawRecord, columns: &[String]) -> RawRecord {
    if columns.is_empty() {
        return record.clone();
    }
    record
        .iter()
        .filter(|(name, _)| columns.iter().any(|column| column == name))
        .map(|(name, value)| (name, value.clone()))
        .collect()
}
