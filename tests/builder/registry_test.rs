use qdm_builder::codes::{CodeSystem, parse_codes};
use qdm_builder::sources::PatientSource;
use qdm_builder::sources::diagnosis::DiagnosisSource;
use qdm_builder::{
    BuilderConfig, CategorySource, Conversion, ConversionContext, ConversionError, DataElement,
    DataElementKind, Error, InMemoryQueryExecutor, QuerySpec, RawRecord, RequestContext,
    SourceRegistry,
};

use crate::utils::{builder_with, diagnosis, encounter, executor_with_patients};

/// Care goals keyed by a `patient_id` column
struct CareGoalSource;

impl CategorySource for CareGoalSource {
    fn name(&self) -> &'static str {
        "care_goal"
    }

    fn query_spec(&self, ctx: &RequestContext) -> QuerySpec {
        let mut spec = QuerySpec::for_request(self.name(), "care_goal", ctx);
        spec.subject_column = "patient_id".to_string();
        spec.select(&["goal"])
    }

    fn make_model(&self, record: &RawRecord, _cx: &ConversionContext<'_>) -> Conversion {
        let Some(goal) = record.get("goal").and_then(|value| value.as_text()) else {
            return Conversion::Failed(ConversionError::MissingField("goal"));
        };
        match parse_codes(goal) {
            Ok(codes) => Conversion::Model(DataElement::new(
                DataElementKind::InterventionOrder,
                codes,
            )),
            Err(err) => Conversion::Failed(err),
        }
    }
}

/// Source whose projection forgets the subject column
struct ForgetfulSource;

impl CategorySource for ForgetfulSource {
    fn name(&self) -> &'static str {
        "forgetful"
    }

    fn query_spec(&self, ctx: &RequestContext) -> QuerySpec {
        let mut spec = QuerySpec::for_request(self.name(), "forgetful", ctx).select(&["code"]);
        spec.columns.retain(|column| column != "pid");
        spec
    }

    fn make_model(&self, _record: &RawRecord, _cx: &ConversionContext<'_>) -> Conversion {
        Conversion::NoModel
    }
}

#[test]
fn test_custom_source_with_own_subject_column() -> qdm_builder::Result<()> {
    let executor = executor_with_patients(&["1"]).with_table(
        "care_goal",
        vec![
            RawRecord::new()
                .with("patient_id", 1_i64)
                .with("goal", "SNOMED:410518001"),
        ],
    );
    let registry = SourceRegistry::new(PatientSource).with_category(CareGoalSource);

    let patients = builder_with(executor, registry, BuilderConfig::default())?
        .build(&RequestContext::all())?;

    let element = &patients[0].data_elements()[0];
    assert_eq!(element.codes[0].system, CodeSystem::SnomedCt);
    Ok(())
}

#[test]
fn test_non_conforming_sources_rejected_at_construction() {
    let forgetful = SourceRegistry::new(PatientSource).with_category(ForgetfulSource);
    let result = builder_with(InMemoryQueryExecutor::new(), forgetful, BuilderConfig::default());
    assert!(matches!(
        result,
        Err(Error::NonConformingSource { category, .. }) if category == "forgetful"
    ));

    let duplicated = SourceRegistry::new(PatientSource)
        .with_category(DiagnosisSource)
        .with_category(DiagnosisSource);
    let result = builder_with(InMemoryQueryExecutor::new(), duplicated, BuilderConfig::default());
    assert!(matches!(result, Err(ref err) if err.is_structural()));
}

#[test]
fn test_subset_registry_sweeps_only_named_categories() -> qdm_builder::Result<()> {
    let executor = executor_with_patients(&["1"])
        .with_table("diagnosis", vec![diagnosis("1", "ICD10:I10", "2023-01-01")])
        .with_table("encounter", vec![encounter("1", "CPT:99213", "2023-01-01")]);
    let registry = SourceRegistry::standard_subset(&["encounter"])?;

    let output = builder_with(executor, registry, BuilderConfig::default())?
        .build_with_report(&RequestContext::all())?;

    assert_eq!(output.report.categories.len(), 1);
    let kinds: Vec<_> = output.patients[0]
        .data_elements()
        .iter()
        .map(|e| e.kind)
        .collect();
    assert_eq!(kinds, vec![DataElementKind::EncounterPerformed]);
    Ok(())
}
