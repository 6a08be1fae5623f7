use chrono::NaiveDate;
use qdm_builder::{
    BuilderConfig, DataElementKind, Error, MeasurementPeriod, RawRecord, RequestContext,
};

use crate::utils::{
    capture_logs, codes_of, diagnosis, encounter, executor_with_patients, find, logs_containing,
    standard_builder,
};

#[test]
fn test_one_patient_per_subject() -> qdm_builder::Result<()> {
    let executor = executor_with_patients(&["1", "2", "3"]).with_table(
        "diagnosis",
        vec![
            diagnosis("1", "ICD10:I10", "2023-01-01"),
            diagnosis("1", "ICD10:E11.9", "2023-01-02"),
            diagnosis("1", "ICD10:E78.5", "2023-01-03"),
        ],
    );

    let patients = standard_builder(executor, BuilderConfig::default())?
        .build(&RequestContext::all())?;

    let ids: Vec<_> = patients.iter().map(|p| p.subject_id()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(patients[0].data_elements().len(), 3);
    assert!(patients[1].data_elements().is_empty());
    Ok(())
}

#[test]
fn test_failed_record_is_dropped_and_siblings_survive() -> qdm_builder::Result<()> {
    capture_logs();
    let executor = executor_with_patients(&["S1", "S2"]).with_table(
        "diagnosis",
        vec![
            diagnosis("S1", "ICD10:I10", "2023-03-01"),
            diagnosis("S2", "ICD10:E11.9", "2023-03-02"),
            diagnosis("S1", "D3-not-a-code", "2023-03-03"),
        ],
    );

    let output = standard_builder(executor, BuilderConfig::default())?
        .build_with_report(&RequestContext::all())?;

    let s1 = find(&output.patients, "S1");
    let s2 = find(&output.patients, "S2");
    assert_eq!(codes_of(s1, DataElementKind::Diagnosis), vec!["I10"]);
    assert_eq!(codes_of(s2, DataElementKind::Diagnosis), vec!["E11.9"]);

    let report = output.report.category("diagnosis").unwrap();
    assert_eq!(report.records, 3);
    assert_eq!(report.attached, 2);
    assert_eq!(report.failed, 1);

    let logged = logs_containing("D3-not-a-code");
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].level, log::Level::Error);
    assert!(logged[0].message.contains("diagnosis"));
    assert!(logged[0].message.contains("S1"));
    Ok(())
}

#[test]
fn test_no_model_is_logged_as_warning() -> qdm_builder::Result<()> {
    capture_logs();
    let executor = executor_with_patients(&["nm-1"]).with_table(
        "encounter",
        vec![
            encounter("nm-1", "CPT:99213", "2023-05-01"),
            encounter("nm-1", "CPT:99214", "0000-00-00"),
        ],
    );

    let output = standard_builder(executor, BuilderConfig::default())?
        .build_with_report(&RequestContext::all())?;

    let patient = find(&output.patients, "nm-1");
    assert_eq!(
        codes_of(patient, DataElementKind::EncounterPerformed),
        vec!["99213"]
    );
    assert_eq!(output.report.category("encounter").unwrap().no_model, 1);

    let warnings: Vec<_> = logs_containing("nm-1")
        .into_iter()
        .filter(|log| log.level == log::Level::Warn && log.message.contains("encounter"))
        .collect();
    assert_eq!(warnings.len(), 1);
    Ok(())
}

#[test]
fn test_missing_subject_id_fails_the_build() -> qdm_builder::Result<()> {
    let executor = executor_with_patients(&["1"]).with_table(
        "diagnosis",
        vec![
            diagnosis("1", "ICD10:I10", "2023-03-01"),
            RawRecord::new()
                .with("code", "ICD10:E11.9")
                .with("begdate", "2023-03-01"),
        ],
    );

    let result =
        standard_builder(executor, BuilderConfig::default())?.build(&RequestContext::all());

    match result {
        Err(Error::MissingSubjectId { category, field }) => {
            assert_eq!(category, "diagnosis");
            assert_eq!(field, "pid");
        }
        other => panic!("expected a missing subject id error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_missing_subject_id_in_subject_table_fails() -> qdm_builder::Result<()> {
    let mut executor = executor_with_patients(&["1"]);
    executor.push("patient", RawRecord::new().with("sex", "F"));

    let result =
        standard_builder(executor, BuilderConfig::default())?.build(&RequestContext::all());
    assert!(matches!(
        result,
        Err(Error::MissingSubjectId { category, .. }) if category == "patient"
    ));
    Ok(())
}

#[test]
fn test_record_order_does_not_change_attribution() -> qdm_builder::Result<()> {
    let records = vec![
        diagnosis("1", "ICD10:I10", "2023-01-01"),
        diagnosis("2", "ICD10:E11.9", "2023-01-02"),
        diagnosis("1", "ICD10:E78.5", "2023-01-03"),
        diagnosis("2", "ICD10:J45.909", "2023-01-04"),
    ];
    let mut reversed = records.clone();
    reversed.reverse();

    let forward = standard_builder(
        executor_with_patients(&["1", "2"]).with_table("diagnosis", records),
        BuilderConfig::default(),
    )?
    .build(&RequestContext::all())?;
    let backward = standard_builder(
        executor_with_patients(&["1", "2"]).with_table("diagnosis", reversed),
        BuilderConfig::default(),
    )?
    .build(&RequestContext::all())?;

    for subject in ["1", "2"] {
        let mut a = codes_of(find(&forward, subject), DataElementKind::Diagnosis);
        let mut b = codes_of(find(&backward, subject), DataElementKind::Diagnosis);
        assert_ne!(a, b, "attachment order follows processing order");
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }
    Ok(())
}

#[test]
fn test_request_scopes_subjects_and_period() -> qdm_builder::Result<()> {
    let executor = executor_with_patients(&["1", "2"]).with_table(
        "diagnosis",
        vec![
            diagnosis("1", "ICD10:I10", "2023-06-01"),
            diagnosis("1", "ICD10:E11.9", "2019-06-01")
                .with("enddate", "2019-12-31"),
            diagnosis("2", "ICD10:E78.5", "2023-06-01"),
        ],
    );

    let period = MeasurementPeriod::new(
        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
    )?;
    let ctx = RequestContext::for_subjects(["1"]).with_period(period);

    let patients = standard_builder(executor, BuilderConfig::default())?.build(&ctx)?;

    assert_eq!(patients.len(), 1);
    assert_eq!(
        codes_of(&patients[0], DataElementKind::Diagnosis),
        vec!["I10"]
    );
    Ok(())
}

#[test]
fn test_demographics_precede_clinical_elements() -> qdm_builder::Result<()> {
    let executor = qdm_builder::InMemoryQueryExecutor::new()
        .with_table(
            "patient",
            vec![
                RawRecord::new()
                    .with("pid", "1")
                    .with("dob", "1960-01-01")
                    .with("sex", "M"),
            ],
        )
        .with_table("diagnosis", vec![diagnosis("1", "ICD10:I10", "2023-01-01")]);

    let patients = standard_builder(executor, BuilderConfig::default())?
        .build(&RequestContext::all())?;

    let kinds: Vec<_> = patients[0].data_elements().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            DataElementKind::PatientCharacteristicBirthdate,
            DataElementKind::PatientCharacteristicSex,
            DataElementKind::Diagnosis,
        ]
    );
    assert_eq!(patients[0].clinical_elements().count(), 1);
    Ok(())
}

#[test]
fn test_builds_do_not_share_state() -> qdm_builder::Result<()> {
    let executor = executor_with_patients(&["1"])
        .with_table("diagnosis", vec![diagnosis("1", "ICD10:I10", "2023-01-01")]);
    let builder = standard_builder(executor, BuilderConfig::default())?;

    let first = builder.build(&RequestContext::all())?;
    let second = builder.build(&RequestContext::all())?;

    assert_eq!(first, second);
    assert_eq!(second[0].data_elements().len(), 1);
    Ok(())
}
