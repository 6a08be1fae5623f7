//! Construction of category sources by name

use super::CategorySource;
use super::allergy::AllergySource;
use super::assessment::AssessmentSource;
use super::diagnosis::DiagnosisSource;
use super::diagnostic_study::{DiagnosticStudyOrderSource, DiagnosticStudySource};
use super::encounter::EncounterSource;
use super::immunization::ImmunizationSource;
use super::intervention::{InterventionOrderSource, InterventionSource};
use super::laboratory::{LaboratoryTestOrderSource, LaboratoryTestSource};
use super::medication::{MedicationActiveSource, MedicationOrderSource};
use super::physical_exam::PhysicalExamSource;
use super::procedure::{ProcedureRecommendedSource, ProcedureSource};
use super::substance::SubstanceRecommendedSource;

/// Names of the bundled categories in sweep order
pub const STANDARD_CATEGORIES: [&str; 17] = [
    "allergy_intolerance",
    "assessment",
    "diagnosis",
    "diagnostic_study",
    "diagnostic_study_order",
    "encounter",
    "immunization",
    "intervention",
    "intervention_order",
    "laboratory_test",
    "laboratory_test_order",
    "medication_active",
    "medication_order",
    "physical_exam",
    "procedure",
    "procedure_recommended",
    "substance_recommended",
];

/// Create a bundled category source from its name
#[must_use]
pub fn category_from_name(name: &str) -> Option<Box<dyn CategorySource>> {
    let source: Box<dyn CategorySource> = match name.to_lowercase().as_str() {
        "allergy_intolerance" => Box::new(AllergySource),
        "assessment" => Box::new(AssessmentSource),
        "diagnosis" => Box::new(DiagnosisSource),
        "diagnostic_study" => Box::new(DiagnosticStudySource),
        "diagnostic_study_order" => Box::new(DiagnosticStudyOrderSource),
        "encounter" => Box::new(EncounterSource),
        "immunization" => Box::new(ImmunizationSource),
        "intervention" => Box::new(InterventionSource),
        "intervention_order" => Box::new(InterventionOrderSource),
        "laboratory_test" => Box::new(LaboratoryTestSource),
        "laboratory_test_order" => Box::new(LaboratoryTestOrderSource),
        "medication_active" => Box::new(MedicationActiveSource),
        "medication_order" => Box::new(MedicationOrderSource),
        "physical_exam" => Box::new(PhysicalExamSource),
        "procedure" => Box::new(ProcedureSource),
        "procedure_recommended" => Box::new(ProcedureRecommendedSource),
        "substance_recommended" => Box::new(SubstanceRecommendedSource),
        _ => return None,
    };
    Some(source)
}
