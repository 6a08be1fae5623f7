//! Recommended substances, such as dietary supplements

use super::extractors::{DOSAGE, DOSAGE_UNITS, Timing, event, event_query, quantity};
use super::{CategorySource, Conversion, ConversionContext};
use crate::error::ConversionError;
use crate::models::{DataElement, DataElementKind};
use crate::query::{QuerySpec, RawRecord};
use crate::request::RequestContext;

const TIMING: Timing = Timing::Authored("date");

/// Source for `QDM::SubstanceRecommended`
#[derive(Debug, Default, Clone, Copy)]
pub struct SubstanceRecommendedSource;

impl SubstanceRecommendedSource {
    fn convert(
        record: &RawRecord,
        cx: &ConversionContext<'_>,
    ) -> Result<Option<DataElement>, ConversionError> {
        let dosage = quantity(record, DOSAGE, DOSAGE_UNITS)?;
        let element = event(DataElementKind::SubstanceRecommended, record, cx, TIMING)?;
        Ok(element.map(|element| element.with_dosage(dosage)))
    }
}

impl CategorySource for SubstanceRecommendedSource {
    fn name(&self) -> &'static str {
        "substance_recommended"
    }

    fn query_spec(&self, ctx: &RequestContext) -> QuerySpec {
        event_query(
            self.name(),
            "substance_recommended",
            ctx,
            TIMING,
            &[DOSAGE, DOSAGE_UNITS],
        )
    }

    fn make_model(&self, record: &RawRecord, cx: &ConversionContext<'_>) -> Conversion {
        Self::convert(record, cx).into()
    }
}
