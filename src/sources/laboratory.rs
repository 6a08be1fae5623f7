//! Laboratory tests, performed and ordered
//!
//! Results live in the `lab_result` table, orders in `lab_order`.

use super::extractors::{RESULT_UNITS, RESULT_VALUE, Timing, event, event_query, result_value};
use super::{CategorySource, Conversion, ConversionContext};
use crate::models::DataElementKind;
use crate::query::{QuerySpec, RawRecord};
use crate::request::RequestContext;

const PERFORMED: Timing = Timing::Period {
    start: "date",
    end: "result_date",
};
const ORDERED: Timing = Timing::Authored("date");

/// Source for `QDM::LaboratoryTestPerformed`
#[derive(Debug, Default, Clone, Copy)]
pub struct LaboratoryTestSource;

impl CategorySource for LaboratoryTestSource {
    fn name(&self) -> &'static str {
        "laboratory_test"
    }

    fn query_spec(&self, ctx: &RequestContext) -> QuerySpec {
        event_query(
            self.name(),
            "lab_result",
            ctx,
            PERFORMED,
            &[RESULT_VALUE, RESULT_UNITS],
        )
    }

    fn make_model(&self, record: &RawRecord, cx: &ConversionContext<'_>) -> Conversion {
        event(DataElementKind::LaboratoryTestPerformed, record, cx, PERFORMED)
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

/// Source for `QDM::LaboratoryTestOrder`
#[derive(Debug, Default, Clone, Copy)]
pub struct LaboratoryTestOrderSource;

impl CategorySource for LaboratoryTestOrderSource {
    fn name(&self) -> &'static str {
        "laboratory_test_order"
    }

    fn query_spec(&self, ctx: &RequestContext) -> QuerySpec {
        event_query(self.name(), "lab_order", ctx, ORDERED, &[])
    }

    fn make_model(&self, record: &RawRecord, cx: &ConversionContext<'_>) -> Conversion {
        event(DataElementKind::LaboratoryTestOrder, record, cx, ORDERED).into()
    }
}
