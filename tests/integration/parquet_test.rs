use std::sync::Arc;

use arrow::array::{ArrayRef, Date32Array, Float64Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use qdm_builder::{
    BuilderConfig, DataElementKind, MeasurementPeriod, ParquetQueryExecutor, RequestContext,
    ResultValue,
};

use crate::utils::{codes_of, find, standard_builder, write_parquet};

/// Days since the Unix epoch, as stored in a `Date32` column
fn days(y: i32, m: u32, d: u32) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
    (date - epoch).num_days() as i32
}

fn batch(columns: Vec<(&str, ArrayRef)>) -> RecordBatch {
    RecordBatch::try_from_iter(columns).unwrap()
}

/// A data directory with a patient file, a partitioned diagnosis table and a
/// lab table keyed by integer ids
fn data_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();

    let patients = batch(vec![
        ("pid", Arc::new(StringArray::from(vec!["1", "2"])) as ArrayRef),
        (
            "dob",
            Arc::new(Date32Array::from(vec![days(1970, 5, 17), days(1985, 2, 1)])) as ArrayRef,
        ),
        ("sex", Arc::new(StringArray::from(vec![Some("Female"), None])) as ArrayRef),
    ]);
    write_parquet(&dir.path().join("patient.parquet"), &patients).unwrap();

    std::fs::create_dir(dir.path().join("diagnosis")).unwrap();
    let first = batch(vec![
        ("pid", Arc::new(StringArray::from(vec!["1", "2"])) as ArrayRef),
        (
            "code",
            Arc::new(StringArray::from(vec!["ICD10:I10", "ICD10:E11.9"])) as ArrayRef,
        ),
        (
            "begdate",
            Arc::new(Date32Array::from(vec![days(2023, 2, 1), days(2018, 1, 1)])) as ArrayRef,
        ),
        (
            "enddate",
            Arc::new(Date32Array::from(vec![None, Some(days(2018, 6, 1))])) as ArrayRef,
        ),
    ]);
    let second = batch(vec![
        ("pid", Arc::new(StringArray::from(vec!["2"])) as ArrayRef),
        ("code", Arc::new(StringArray::from(vec!["bogus"])) as ArrayRef),
        ("begdate", Arc::new(Date32Array::from(vec![days(2023, 3, 1)])) as ArrayRef),
        ("enddate", Arc::new(Date32Array::from(vec![None::<i32>])) as ArrayRef),
    ]);
    write_parquet(&dir.path().join("diagnosis/part-0.parquet"), &first).unwrap();
    write_parquet(&dir.path().join("diagnosis/part-1.parquet"), &second).unwrap();

    let labs = batch(vec![
        ("pid", Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef),
        (
            "code",
            Arc::new(StringArray::from(vec!["LOINC:4548-4", "LOINC:4548-4"])) as ArrayRef,
        ),
        (
            "date",
            Arc::new(StringArray::from(vec!["2023-04-02", "2023-04-05"])) as ArrayRef,
        ),
        ("result_value", Arc::new(Float64Array::from(vec![7.9, 6.1])) as ArrayRef),
        ("result_units", Arc::new(StringArray::from(vec!["%", "%"])) as ArrayRef),
    ]);
    write_parquet(&dir.path().join("lab_result.parquet"), &labs).unwrap();

    dir
}

#[test]
fn test_parquet_directory_builds_patients() -> qdm_builder::Result<()> {
    let dir = data_dir();
    let executor = ParquetQueryExecutor::new(dir.path())?.with_batch_size(1);

    let output = standard_builder(executor, BuilderConfig::default())?
        .build_with_report(&RequestContext::all())?;

    assert_eq!(output.patients.len(), 2);
    let first = find(&output.patients, "1");
    let second = find(&output.patients, "2");

    assert!(first.birth_datetime().is_some());
    assert_eq!(
        codes_of(first, DataElementKind::PatientCharacteristicSex),
        vec!["F"]
    );
    assert_eq!(codes_of(first, DataElementKind::Diagnosis), vec!["I10"]);
    assert_eq!(codes_of(second, DataElementKind::Diagnosis), vec!["E11.9"]);

    let lab = first
        .elements_of(DataElementKind::LaboratoryTestPerformed)
        .next()
        .unwrap();
    assert!(matches!(
        &lab.result,
        Some(ResultValue::Quantity(quantity)) if quantity.value == 7.9
    ));

    let diagnoses = output.report.category("diagnosis").unwrap();
    assert_eq!(diagnoses.records, 3);
    assert_eq!(diagnoses.failed, 1);
    assert_eq!(output.report.category("laboratory_test").unwrap().attached, 2);
    Ok(())
}

#[test]
fn test_parquet_request_filters() -> qdm_builder::Result<()> {
    let dir = data_dir();
    let executor = ParquetQueryExecutor::new(dir.path())?;

    let period = MeasurementPeriod::new(
        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
    )?;
    let ctx = RequestContext::for_subjects(["2"]).with_period(period);

    let config = BuilderConfig {
        parallel: true,
        max_threads: 2,
        ..BuilderConfig::default()
    };
    let output = standard_builder(executor, config)?.build_with_report(&ctx)?;

    assert_eq!(output.patients.len(), 1);
    let patient = &output.patients[0];
    assert_eq!(patient.subject_id(), "2");
    // The 2018 diagnosis ended before the period; the 2023 one fails conversion
    assert!(codes_of(patient, DataElementKind::Diagnosis).is_empty());
    assert_eq!(output.report.category("diagnosis").unwrap().records, 1);
    assert_eq!(
        patient
            .elements_of(DataElementKind::LaboratoryTestPerformed)
            .count(),
        1
    );
    Ok(())
}

#[test]
fn test_missing_data_directory_is_rejected() {
    let result = ParquetQueryExecutor::new("/definitely/not/a/qdm/data/dir");
    assert!(matches!(result, Err(qdm_builder::Error::Config(_))));
}
