//! Procedures, performed and recommended

use super::extractors::{RESULT_UNITS, RESULT_VALUE, Timing, event, event_query, result_value};
use super::{CategorySource, Conversion, ConversionContext};
use crate::models::DataElementKind;
use crate::query::{QuerySpec, RawRecord};
use crate::request::RequestContext;

const PERFORMED: Timing = Timing::Period {
    start: "date",
    end: "end_date",
};
const RECOMMENDED: Timing = Timing::Authored("date");

/// Source for `QDM::ProcedurePerformed`
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcedureSource;

impl CategorySource for ProcedureSource {
    fn name(&self) -> &'static str {
        "procedure"
    }

    fn query_spec(&self, ctx: &RequestContext) -> QuerySpec {
        event_query(
            self.name(),
            "procedure",
            ctx,
            PERFORMED,
            &[RESULT_VALUE, RESULT_UNITS],
        )
    }

    fn make_model(&self, record: &RawRecord, cx: &ConversionContext<'_>) -> Conversion {
        event(DataElementKind::ProcedurePerformed, record, cx, PERFORMED)
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

/// Source for `QDM::ProcedureRecommended`
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcedureRecommendedSource;

impl CategorySource for ProcedureRecommendedSource {
    fn name(&self) -> &'static str {
        "procedure_recommended"
    }

    fn query_spec(&self, ctx: &RequestContext) -> QuerySpec {
        event_query(self.name(), "procedure_recommended", ctx, RECOMMENDED, &[])
    }

    fn make_model(&self, record: &RawRecord, cx: &ConversionContext<'_>) -> Conversion {
        event(DataElementKind::ProcedureRecommended, record, cx, RECOMMENDED).into()
    }
}
