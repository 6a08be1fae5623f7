use qdm_builder::{
    BuilderConfig, Error, InMemoryQueryExecutor, QueryExecutor, QuerySpec, RawRecord,
    RecordStream, RequestContext,
};

use crate::utils::{diagnosis, element_sets, encounter, executor_with_patients, standard_builder};

fn parallel() -> BuilderConfig {
    BuilderConfig {
        parallel: true,
        max_threads: 4,
        ..BuilderConfig::default()
    }
}

fn busy_executor() -> InMemoryQueryExecutor {
    let pids: Vec<String> = (0..50).map(|i| i.to_string()).collect();
    let pid_refs: Vec<&str> = pids.iter().map(String::as_str).collect();

    let mut executor = executor_with_patients(&pid_refs);
    for (i, pid) in pids.iter().enumerate() {
        let day = format!("2023-01-{:02}", i % 28 + 1);
        executor.push("diagnosis", diagnosis(pid, "ICD10:I10", &day));
        executor.push("diagnosis", diagnosis(pid, "ICD10:E11.9", &day));
        executor.push("encounter", encounter(pid, "CPT:99213", &day));
        executor.push(
            "lab_result",
            RawRecord::new()
                .with("pid", pid.as_str())
                .with("code", "LOINC:4548-4")
                .with("date", day.as_str())
                .with("result_value", (i as f64) / 10.0),
        );
        executor.push(
            "immunization",
            RawRecord::new()
                .with("pid", pid.as_str())
                .with("cvx_code", "140")
                .with("date", day.as_str()),
        );
    }
    executor
}

#[test]
fn test_parallel_matches_sequential() -> qdm_builder::Result<()> {
    let sequential = standard_builder(busy_executor(), BuilderConfig::default())?
        .build_with_report(&RequestContext::all())?;
    let concurrent = standard_builder(busy_executor(), parallel())?
        .build_with_report(&RequestContext::all())?;

    assert_eq!(
        element_sets(&sequential.patients),
        element_sets(&concurrent.patients)
    );
    assert_eq!(concurrent.report.attached(), 250);
    assert_eq!(
        sequential.report.categories,
        concurrent.report.categories
    );
    Ok(())
}

#[test]
fn test_parallel_reports_structural_fault() -> qdm_builder::Result<()> {
    let mut executor = busy_executor();
    executor.push(
        "encounter",
        RawRecord::new()
            .with("code", "CPT:99213")
            .with("date", "2023-01-01"),
    );

    let result = standard_builder(executor, parallel())?.build(&RequestContext::all());

    match result {
        Err(Error::MissingSubjectId { category, .. }) => assert_eq!(category, "encounter"),
        other => panic!("expected a missing subject id error, got {other:?}"),
    }
    Ok(())
}

/// Executor whose `encounter` table cannot be read
struct BrokenEncounters(InMemoryQueryExecutor);

impl QueryExecutor for BrokenEncounters {
    fn run<'a>(&'a self, spec: &QuerySpec) -> qdm_builder::Result<RecordStream<'a>> {
        if spec.table == "encounter" {
            return Err(Error::query(&spec.table, "connection reset"));
        }
        self.0.run(spec)
    }
}

#[test]
fn test_query_failure_aborts_both_modes() -> qdm_builder::Result<()> {
    for config in [BuilderConfig::default(), parallel()] {
        let result = standard_builder(BrokenEncounters(busy_executor()), config)?
            .build(&RequestContext::all());
        assert!(matches!(
            result,
            Err(Error::Query { table, .. }) if table == "encounter"
        ));
    }
    Ok(())
}
