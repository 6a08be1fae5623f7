//! Physical exams performed, such as vital signs

use super::extractors::{RESULT_UNITS, RESULT_VALUE, Timing, event, event_query, result_value};
use super::{CategorySource, Conversion, ConversionContext};
use crate::models::DataElementKind;
use crate::query::{QuerySpec, RawRecord};
use crate::request::RequestContext;

const TIMING: Timing = Timing::Period {
    start: "date",
    end: "end_date",
};

/// Source for `QDM::PhysicalExamPerformed`
#[derive(Debug, Default, Clone, Copy)]
pub struct PhysicalExamSource;

impl CategorySource for PhysicalExamSource {
    fn name(&self) -> &'static str {
        "physical_exam"
    }

    fn query_spec(&self, ctx: &RequestContext) -> QuerySpec {
        event_query(
            self.name(),
            "physical_exam",
            ctx,
            TIMING,
            &[RESULT_VALUE, RESULT_UNITS],
        )
    }

    fn make_model(&self, record: &RawRecord, cx: &ConversionContext<'_>) -> Conversion {
        event(DataElementKind::PhysicalExamPerformed, record, cx, TIMING)
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
