use std::fs::File;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};

use arrow::record_batch::RecordBatch;
use log::{Level, LevelFilter, Log, Metadata, Record};
use parquet::arrow::ArrowWriter;
use qdm_builder::{
    BuilderConfig, DataElementKind, InMemoryQueryExecutor, NoCodeLookup, QdmBuilder, QdmPatient,
    QueryExecutor, RawRecord, Result, SourceRegistry,
};

/// Subject row with only an identifier
#[must_use]
pub fn patient(pid: &str) -> RawRecord {
    RawRecord::new().with("pid", pid)
}

/// Diagnosis row starting on `begdate`
#[must_use]
pub fn diagnosis(pid: &str, code: &str, begdate: &str) -> RawRecord {
    RawRecord::new()
        .with("pid", pid)
        .with("code", code)
        .with("begdate", begdate)
}

/// Encounter row on `date`
#[must_use]
pub fn encounter(pid: &str, code: &str, date: &str) -> RawRecord {
    RawRecord::new()
        .with("pid", pid)
        .with("code", code)
        .with("date", date)
}

/// Executor holding the given subjects in the `patient` table
#[must_use]
pub fn executor_with_patients(pids: &[&str]) -> InMemoryQueryExecutor {
    InMemoryQueryExecutor::new()
        .with_table("patient", pids.iter().map(|pid| patient(pid)).collect())
}

/// Builder over the standard sources without code lookups
pub fn standard_builder(
    executor: impl QueryExecutor + 'static,
    config: BuilderConfig,
) -> Result<QdmBuilder> {
    QdmBuilder::new(Arc::new(executor), Arc::new(NoCodeLookup), config)
}

/// Builder over a custom registry without code lookups
pub fn builder_with(
    executor: impl QueryExecutor + 'static,
    registry: SourceRegistry,
    config: BuilderConfig,
) -> Result<QdmBuilder> {
    QdmBuilder::with_registry(
        Arc::new(executor),
        Arc::new(NoCodeLookup),
        Arc::new(registry),
        config,
    )
}

/// Find a patient by subject id
#[must_use]
pub fn find<'a>(patients: &'a [QdmPatient], subject_id: &str) -> &'a QdmPatient {
    patients
        .iter()
        .find(|patient| patient.subject_id() == subject_id)
        .unwrap_or_else(|| panic!("no patient {subject_id}"))
}

/// Primary codes of the patient's elements of one kind, in attachment order
#[must_use]
pub fn codes_of(patient: &QdmPatient, kind: DataElementKind) -> Vec<String> {
    patient
        .elements_of(kind)
        .filter_map(|element| element.primary_code())
        .map(|code| code.code.clone())
        .collect()
}

/// Elements of each patient rendered as sorted JSON, for order-independent comparison
#[must_use]
pub fn element_sets(patients: &[QdmPatient]) -> Vec<(String, Vec<String>)> {
    patients
        .iter()
        .map(|patient| {
            let mut elements: Vec<String> = patient
                .data_elements()
                .iter()
                .map(|element| serde_json::to_string(element).unwrap())
                .collect();
            elements.sort();
            (patient.subject_id().to_string(), elements)
        })
        .collect()
}

/// Write a record batch to `path` as a Parquet file
pub fn write_parquet(path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

/// One captured log line
#[derive(Debug, Clone)]
pub struct CapturedLog {
    pub level: Level,
    pub target: String,
    pub message: String,
}

struct CaptureLogger {
    records: Mutex<Vec<CapturedLog>>,
}

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        if let Ok(mut records) = self.records.lock() {
            records.push(CapturedLog {
                level: record.level(),
                target: record.target().to_string(),
                message: record.args().to_string(),
            });
        }
    }

    fn flush(&self) {}
}

static LOGGER: OnceLock<&'static CaptureLogger> = OnceLock::new();

fn logger() -> &'static CaptureLogger {
    LOGGER.get_or_init(|| {
        let logger: &'static CaptureLogger = Box::leak(Box::new(CaptureLogger {
            records: Mutex::new(Vec::new()),
        }));
        if log::set_logger(logger).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
        logger
    })
}

/// Start capturing log output for this test binary
pub fn capture_logs() {
    logger();
}

/// Captured log lines whose message contains `needle`
///
/// Tests run concurrently and share the logger, so filter on something only
/// the calling test produces.
#[must_use]
pub fn logs_containing(needle: &str) -> Vec<CapturedLog> {
    logger()
        .records
        .lock()
        .map(|records| {
            records
                .iter()
                .filter(|record| record.message.contains(needle))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}
