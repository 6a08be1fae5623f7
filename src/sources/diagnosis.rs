//! Problem list diagnoses

use super::extractors::{CODE, prevalence};
use super::{CategorySource, Conversion, ConversionContext};
use crate::models::DataElementKind;
use crate::query::{QuerySpec, RawRecord};
use crate::request::RequestContext;

const START: &str = "begdate";
const END: &str = "enddate";

/// Source for `QDM::Diagnosis`
///
/// Codes may list several systems for the same problem, e.g.
/// `ICD10:E11.9;SNOMED-CT:44054006`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiagnosisSource;

impl CategorySource for DiagnosisSource {
    fn name(&self) -> &'static str {
        "diagnosis"
    }

    fn query_spec(&self, ctx: &RequestContext) -> QuerySpec {
        QuerySpec::for_request(self.name(), "diagnosis", ctx)
            .select(&[CODE, START, END])
            .period_columns(START, Some(END))
    }

    fn make_model(&self, record: &RawRecord, cx: &ConversionContext<'_>) -> Conversion {
        prevalence(DataElementKind::Diagnosis, record, cx, START, END).into()
    }
}
