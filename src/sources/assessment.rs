//! Assessments performed, such as screening instruments and scores

use super::extractors::{RESULT_UNITS, RESULT_VALUE, Timing, event, event_query, result_value};
use super::{CategorySource, Conversion, ConversionContext};
use crate::models::DataElementKind;
use crate::query::{QuerySpec, RawRecord};
use crate::request::RequestContext;

const TIMING: Timing = Timing::Instant("date");

/// Source for `QDM::AssessmentPerformed`
#[derive(Debug, Default, Clone, Copy)]
pub struct AssessmentSource;

impl CategorySource for AssessmentSource {
    fn name(&self) -> &'static str {
        "assessment"
    }

    fn query_spec(&self, ctx: &RequestContext) -> QuerySpec {
        event_query(self.name(), "assessment", ctx, TIMING, &[RESULT_VALUE, RESULT_UNITS])
    }

    fn make_model(&self, record: &RawRecord, cx: &ConversionContext<'_>) -> Conversion {
        event(DataElementKind::AssessmentPerformed, record, cx, TIMING)
            .map(|element| {
                element.map(|element| {
                    if element.is_negated() {
                        element
                    } else {
                        element.with_result(result_value(record, cx))
                    }
                })
            })
            .into()
    }
}
