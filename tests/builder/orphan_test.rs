use qdm_builder::builder::ATTRIBUTION_LOG_TARGET;
use qdm_builder::{BuilderConfig, DataElementKind, Error, OrphanPolicy, RequestContext};

use crate::utils::{
    capture_logs, codes_of, diagnosis, executor_with_patients, find, logs_containing,
    standard_builder,
};

#[test]
fn test_orphan_is_skipped_and_reported() -> qdm_builder::Result<()> {
    capture_logs();
    let executor = executor_with_patients(&["1"]).with_table(
        "diagnosis",
        vec![
            diagnosis("1", "ICD10:I10", "2023-01-01"),
            diagnosis("ghost-17", "ICD10:E11.9", "2023-01-01"),
        ],
    );

    let output = standard_builder(executor, BuilderConfig::default())?
        .build_with_report(&RequestContext::all())?;

    assert_eq!(output.patients.len(), 1);
    assert_eq!(
        codes_of(find(&output.patients, "1"), DataElementKind::Diagnosis),
        vec!["I10"]
    );

    let report = output.report.category("diagnosis").unwrap();
    assert_eq!(report.orphaned, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(output.report.orphaned(), 1);

    let logged = logs_containing("ghost-17");
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].target, ATTRIBUTION_LOG_TARGET);
    Ok(())
}

#[test]
fn test_orphan_fails_build_when_configured() -> qdm_builder::Result<()> {
    let executor = executor_with_patients(&["1"]).with_table(
        "diagnosis",
        vec![diagnosis("2", "ICD10:E11.9", "2023-01-01")],
    );
    let config = BuilderConfig {
        orphan_policy: OrphanPolicy::Fail,
        ..BuilderConfig::default()
    };

    let result = standard_builder(executor, config)?.build(&RequestContext::all());

    match result {
        Err(Error::OrphanedRecord {
            category,
            subject_id,
        }) => {
            assert_eq!(category, "diagnosis");
            assert_eq!(subject_id, "2");
        }
        other => panic!("expected an orphaned record error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_subject_selection_applies_to_every_category() -> qdm_builder::Result<()> {
    let executor = executor_with_patients(&["1", "2"]).with_table(
        "diagnosis",
        vec![
            diagnosis("1", "ICD10:I10", "2023-01-01"),
            diagnosis("2", "ICD10:E11.9", "2023-01-01"),
        ],
    );
    let config = BuilderConfig {
        orphan_policy: OrphanPolicy::Fail,
        ..BuilderConfig::default()
    };

    let output = standard_builder(executor, config)?
        .build_with_report(&RequestContext::for_subjects(["2"]))?;

    assert_eq!(output.patients.len(), 1);
    assert_eq!(output.report.orphaned(), 0);
    assert_eq!(
        codes_of(&output.patients[0], DataElementKind::Diagnosis),
        vec!["E11.9"]
    );
    Ok(())
}
