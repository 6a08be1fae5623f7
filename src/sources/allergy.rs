//! Allergies and intolerances

use super::extractors::{CODE, prevalence};
use super::{CategorySource, Conversion, ConversionContext};
use crate::models::DataElementKind;
use crate::query::{QuerySpec, RawRecord};
use crate::request::RequestContext;

const START: &str = "begdate";
const END: &str = "enddate";

/// Source for `QDM::AllergyIntolerance`
#[derive(Debug, Default, Clone, Copy)]
pub struct AllergySource;

impl CategorySource for AllergySource {
    fn name(&self) -> &'static str {
        "allergy_intolerance"
    }

    fn query_spec(&self, ctx: &RequestContext) -> QuerySpec {
        QuerySpec::for_request(self.name(), "allergy", ctx)
            .select(&[CODE, START, END])
            .period_columns(START, Some(END))
    }

    fn make_model(&self, record: &RawRecord, cx: &ConversionContext<'_>) -> Conversion {
        prevalence(DataElementKind::AllergyIntolerance, record, cx, START, END).into()
    }
}
