//! Diagnostic studies, performed and ordered

use super::extractors::{RESULT_UNITS, RESULT_VALUE, Timing, event, event_query, result_value};
use super::{CategorySource, Conversion, ConversionContext};
use crate::models::DataElementKind;
use crate::query::{QuerySpec, RawRecord};
use crate::request::RequestContext;

const PERFORMED: Timing = Timing::Period {
    start: "date",
    end: "end_date",
};
const ORDERED: Timing = Timing::Authored("date");

/// Source for `QDM::DiagnosticStudyPerformed`
#[derive(Debug, Default, Clone, Copy)]
pub struct DiagnosticStudySource;

impl CategorySource for DiagnosticStudySource {
    fn name(&self) -> &'static str {
        "diagnostic_study"
    }

    fn query_spec(&self, ctx: &RequestContext) -> QuerySpec {
        event_query(
            self.name(),
            "diagnostic_study",
            ctx,
            PERFORMED,
            &[RESULT_VALUE, RESULT_UNITS],
        )
    }

    fn make_model(&self, record: &RawRecord, cx: &ConversionContext<'_>) -> Conversion {
        event(DataElementKind::DiagnosticStudyPerformed, record, cx, PERFORMED)
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

/// Source for `QDM::DiagnosticStudyOrder`
#[derive(Debug, Default, Clone, Copy)]
pub struct DiagnosticStudyOrderSource;

impl CategorySource for DiagnosticStudyOrderSource {
    fn name(&self) -> &'static str {
        "diagnostic_study_order"
    }

    fn query_spec(&self, ctx: &RequestContext) -> QuerySpec {
        event_query(self.name(), "diagnostic_study_order", ctx, ORDERED, &[])
    }

    fn make_model(&self, record: &RawRecord, cx: &ConversionContext<'_>) -> Conversion {
        event(DataElementKind::DiagnosticStudyOrder, record, cx, ORDERED).into()
    }
}
