//! Interventions, performed and ordered

use super::extractors::{Timing, event, event_query};
use super::{CategorySource, Conversion, ConversionContext};
use crate::models::DataElementKind;
use crate::query::{QuerySpec, RawRecord};
use crate::request::RequestContext;

const PERFORMED: Timing = Timing::Period {
    start: "date",
    end: "end_date",
};
const ORDERED: Timing = Timing::Authored("date");

/// Source for `QDM::InterventionPerformed`
#[derive(Debug, Default, Clone, Copy)]
pub struct InterventionSource;

impl CategorySource for InterventionSource {
    fn name(&self) -> &'static str {
        "intervention"
    }

    fn query_spec(&self, ctx: &RequestContext) -> QuerySpec {
        event_query(self.name(), "intervention", ctx, PERFORMED, &[])
    }

    fn make_model(&self, record: &RawRecord, cx: &ConversionContext<'_>) -> Conversion {
        event(DataElementKind::InterventionPerformed, record, cx, PERFORMED).into()
    }
}

/// Source for `QDM::InterventionOrder`
#[derive(Debug, Default, Clone, Copy)]
pub struct InterventionOrderSource;

impl CategorySource for InterventionOrderSource {
    fn name(&self) -> &'static str {
        "intervention_order"
    }

    fn query_spec(&self, ctx: &RequestContext) -> QuerySpec {
        event_query(self.name(), "intervention_order", ctx, ORDERED, &[])
    }

    fn make_model(&self, record: &RawRecord, cx: &ConversionContext<'_>) -> Conversion {
        event(DataElementKind::InterventionOrder, record, cx, ORDERED).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::NoCodeLookup;
    use crate::config::DateFormatConfig;

    #[test]
    fn test_counseling_not_done() {
        let dates = DateFormatConfig::default();
        let cx = ConversionContext::new(&NoCodeLookup, &dates);
        let record = RawRecord::new()
            .with("pid", "5")
            .with("code", "SNOMED:171055003")
            .with("date", "2023-09-12")
            .with("reason_status", "negated")
            .with("reason_code", "SNOMED:183944003");

        let Conversion::Model(element) = InterventionSource.make_model(&record, &cx) else {
            panic!("expected a model");
        };
        assert!(element.is_negated());
        assert!(element.relevant_period.is_none());

        let Conversion::Model(order) = InterventionOrderSource.make_model(&record, &cx) else {
            panic!("expected a model");
        };
        assert_eq!(order.kind, DataElementKind::InterventionOrder);
        assert!(order.is_negated());
    }
}
