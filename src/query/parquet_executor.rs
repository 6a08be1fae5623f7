//! Query executor over a directory of Parquet tables
//!
//! Each table lives under the base directory either as a directory of
//! `.parquet` files or as a single `<table>.parquet` file. Files are read one
//! record batch at a time, so a query never holds more than one batch in
//! memory.

use std::path::{Path, PathBuf};

use arrow::array::{
    Array, BooleanArray, Date32Array, Date64Array, Float32Array, Float64Array, Int16Array,
    Int32Array, Int64Array, LargeStringArray, StringArray, TimestampMicrosecondArray,
    TimestampMillisecondArray, TimestampNanosecondArray, TimestampSecondArray,
};
use arrow::datatypes::{DataType, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ProjectionMask;
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};

use super::{FieldValue, QueryExecutor, QuerySpec, RawRecord, RecordStream};
use crate::config::DateFormatConfig;
use crate::error::util::{safe_open_file, validate_directory};
use crate::error::Result;
use crate::utils::logging::log_warning;

/// Default number of rows per record batch
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// Reads category tables from Parquet files under a base directory
#[derive(Debug, Clone)]
pub struct ParquetQueryExecutor {
    base_dir: PathBuf,
    batch_size: usize,
    date_formats: DateFormatConfig,
}

impl ParquetQueryExecutor {
    /// Create an executor rooted at `base_dir`, which must be a readable directory
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        validate_directory(&base_dir, "parquet tables")?;
        Ok(Self {
            base_dir,
            batch_size: DEFAULT_BATCH_SIZE,
            date_formats: DateFormatConfig::default(),
        })
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Formats used when a period filter meets a textual date
    #[must_use]
    pub fn with_date_formats(mut self, date_formats: DateFormatConfig) -> Self {
        self.date_formats = date_formats;
        self
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Parquet files backing a table, in name order
    pub fn table_files(&self, table: &str) -> Result<Vec<PathBuf>> {
        let dir = self.base_dir.join(table);
        if dir.is_dir() {
            let mut files = Vec::new();
            for entry in std::fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.is_file() && path.extension().is_some_and(|ext| ext == "parquet") {
                    files.push(path);
                }
            }
            files.sort();
            if files.is_empty() {
                log_warning("No parquet files found in table directory", Some(&dir));
            }
            return Ok(files);
        }

        let file = self.base_dir.join(format!("{table}.parquet"));
        if file.is_file() {
            return Ok(vec![file]);
        }

        log::warn!(
            "Table `{table}` not found under {}, treating it as empty",
            self.base_dir.display()
        );
        Ok(Vec::new())
    }
}

impl QueryExecutor for ParquetQueryExecutor {
    fn run<'a>(&'a self, spec: &QuerySpec) -> Result<RecordStream<'a>> {
        let files = self.table_files(&spec.table)?;
        log::debug!(
            "Querying `{}` for {} from {} file(s)",
            spec.table,
            spec.category,
            files.len()
        );

        Ok(Box::new(ParquetRecordStream {
            spec: spec.clone(),
            formats: &self.date_formats,
            batch_size: self.batch_size,
            files: files.into_iter(),
            reader: None,
            batch: None,
            row: 0,
        }))
    }
}

/// Lazy row iterator over the files of one table
struct ParquetRecordStream<'a> {
    spec: QuerySpec,
    formats: &'a DateFormatConfig,
    batch_size: usize,
    files: std::vec::IntoIter<PathBuf>,
    reader: Option<ParquetRecordBatchReader>,
    batch: Option<RecordBatch>,
    row: usize,
}

impl Iterator for ParquetRecordStream<'_> {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(batch) = &self.batch {
                if self.row < batch.num_rows() {
                    let record = row_to_record(batch, self.row);
                    self.row += 1;
                    match record {
                        Ok(record) if self.spec.matches(&record, self.formats) => {
                            return Some(Ok(record));
                        }
                        Ok(_) => continue,
                        Err(e) => return Some(Err(e)),
                    }
                }
                self.batch = None;
            }

            if let Some(reader) = self.reader.as_mut() {
                match reader.next() {
                    Some(Ok(batch)) => {
                        self.batch = Some(batch);
                        self.row = 0;
                        continue;
                    }
                    Some(Err(e)) => {
                        self.reader = None;
                        return Some(Err(e.into()));
                    }
                    None => self.reader = None,
                }
            }

            let path = self.files.next()?;
            match open_reader(&path, &self.spec, self.batch_size) {
                Ok(reader) => self.reader = Some(reader),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Open a batch reader projected onto the query's columns
fn open_reader(path: &Path, spec: &QuerySpec, batch_size: usize) -> Result<ParquetRecordBatchReader> {
    let file = safe_open_file(path, &spec.table)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?.with_batch_size(batch_size);

    if spec.columns.is_empty() {
        return Ok(builder.build()?);
    }

    let file_schema = builder.schema().clone();
    let mut projection = Vec::new();
    for column in &spec.columns {
        match file_schema.index_of(column) {
            Ok(idx) => projection.push(idx),
            Err(_) => log::debug!(
                "Column {column} not found in {}, it will read as null",
                path.display()
            ),
        }
    }

    if projection.is_empty() {
        log::warn!(
            "No selected column of `{}` found in {}, reading all columns",
            spec.table,
            path.display()
        );
        return Ok(builder.build()?);
    }

    let mask = ProjectionMask::roots(builder.parquet_schema(), projection);
    Ok(builder.with_projection(mask).build()?)
}

/// Convert one row of a record batch into a raw record
fn row_to_record(batch: &RecordBatch, row: usize) -> Result<RawRecord> {
    let schema = batch.schema();
    let mut record = RawRecord::new();
    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        record.insert(field.name().as_str(), cell_value(column.as_ref(), row)?);
    }
    Ok(record)
}

macro_rules! downcast {
    ($array:expr, $ty:ty) => {
        $array.as_any().downcast_ref::<$ty>()
    };
}

/// Read a single cell as a typed field value
fn cell_value(array: &dyn Array, row: usize) -> Result<FieldValue> {
    if array.is_null(row) {
        return Ok(FieldValue::Null);
    }

    let value = match array.data_type() {
        DataType::Utf8 => downcast!(array, StringArray).map(|a| FieldValue::from(a.value(row))),
        DataType::LargeUtf8 => {
            downcast!(array, LargeStringArray).map(|a| FieldValue::from(a.value(row)))
        }
        DataType::Int16 => {
            downcast!(array, Int16Array).map(|a| FieldValue::Integer(i64::from(a.value(row))))
        }
        DataType::Int32 => {
            downcast!(array, Int32Array).map(|a| FieldValue::Integer(i64::from(a.value(row))))
        }
        DataType::Int64 => downcast!(array, Int64Array).map(|a| FieldValue::Integer(a.value(row))),
        DataType::Float32 => {
            downcast!(array, Float32Array).map(|a| FieldValue::Float(f64::from(a.value(row))))
        }
        DataType::Float64 => downcast!(array, Float64Array).map(|a| FieldValue::Float(a.value(row))),
        DataType::Boolean => {
            downcast!(array, BooleanArray).map(|a| FieldValue::Boolean(a.value(row)))
        }
        DataType::Date32 => downcast!(array, Date32Array)
            .and_then(|a| a.value_as_date(row))
            .map(FieldValue::Date),
        DataType::Date64 => downcast!(array, Date64Array)
            .and_then(|a| a.value_as_datetime(row))
            .map(FieldValue::DateTime),
        DataType::Timestamp(unit, _) => match unit {
            TimeUnit::Second => downcast!(array, TimestampSecondArray)
                .and_then(|a| a.value_as_datetime(row)),
            TimeUnit::Millisecond => downcast!(array, TimestampMillisecondArray)
                .and_then(|a| a.value_as_datetime(row)),
            TimeUnit::Microsecond => downcast!(array, TimestampMicrosecondArray)
                .and_then(|a| a.value_as_datetime(row)),
            TimeUnit::Nanosecond => downcast!(array, TimestampNanosecondArray)
                .and_then(|a| a.value_as_datetime(row)),
        }
        .map(FieldValue::DateTime),
        _ => None,
    };

    match value {
        Some(value) => Ok(value),
        None => {
            let text = arrow::util::display::array_value_to_string(array, row)?;
            Ok(FieldValue::Text(text))
        }
    }
}
