//! Encounters performed

use super::extractors::{Timing, event, event_query, optional_code};
use super::{CategorySource, Conversion, ConversionContext};
use crate::error::ConversionError;
use crate::models::{DataElement, DataElementKind};
use crate::query::{QuerySpec, RawRecord};
use crate::request::RequestContext;

const TIMING: Timing = Timing::Period {
    start: "date",
    end: "end_date",
};
const DISCHARGE_DISPOSITION: &str = "discharge_disposition";

/// Source for `QDM::EncounterPerformed`
#[derive(Debug, Default, Clone, Copy)]
pub struct EncounterSource;

impl EncounterSource {
    fn convert(
        record: &RawRecord,
        cx: &ConversionContext<'_>,
    ) -> Result<Option<DataElement>, ConversionError> {
        let disposition = optional_code(record, DISCHARGE_DISPOSITION, cx)?;
        let element = event(DataElementKind::EncounterPerformed, record, cx, TIMING)?;
        Ok(element.map(|element| element.with_discharge_disposition(disposition)))
    }
}

impl CategorySource for EncounterSource {
    fn name(&self) -> &'static str {
        "encounter"
    }

    fn query_spec(&self, ctx: &RequestContext) -> QuerySpec {
        event_query(self.name(), "encounter", ctx, TIMING, &[DISCHARGE_DISPOSITION])
    }

    fn make_model(&self, record: &RawRecord, cx: &ConversionContext<'_>) -> Conversion {
        Self::convert(record, cx).into()
    }
}
