//! Medications, active and ordered
//!
//! Active medications come from the `medication` list, orders from the
//! `prescription` table.

use super::extractors::{
    CODE, DOSAGE, DOSAGE_UNITS, REASON_CODE, REASON_STATUS, Timing, datetime, event, interval,
    quantity, required_codes,
};
use super::{CategorySource, Conversion, ConversionContext};
use crate::error::ConversionError;
use crate::models::{DataElement, DataElementKind};
use crate::query::{QuerySpec, RawRecord};
use crate::request::RequestContext;

const ACTIVE_START: &str = "begdate";
const ACTIVE_END: &str = "enddate";

const DATE_ADDED: &str = "date_added";
const START_DATE: &str = "start_date";
const END_DATE: &str = "end_date";

/// Source for `QDM::MedicationActive`
#[derive(Debug, Default, Clone, Copy)]
pub struct MedicationActiveSource;

impl MedicationActiveSource {
    fn convert(
        record: &RawRecord,
        cx: &ConversionContext<'_>,
    ) -> Result<Option<DataElement>, ConversionError> {
        let codes = required_codes(record, CODE, cx)?;
        let dosage = quantity(record, DOSAGE, DOSAGE_UNITS)?;
        let Some(start) = datetime(record, ACTIVE_START, cx) else {
            return Ok(None);
        };

        Ok(Some(
            DataElement::new(DataElementKind::MedicationActive, codes)
                .with_relevant_period(interval(record, start, ACTIVE_END, cx)?)
                .with_dosage(dosage),
        ))
    }
}

impl CategorySource for MedicationActiveSource {
    fn name(&self) -> &'static str {
        "medication_active"
    }

    fn query_spec(&self, ctx: &RequestContext) -> QuerySpec {
        QuerySpec::for_request(self.name(), "medication", ctx)
            .select(&[CODE, ACTIVE_START, ACTIVE_END, DOSAGE, DOSAGE_UNITS])
            .period_columns(ACTIVE_START, Some(ACTIVE_END))
    }

    fn make_model(&self, record: &RawRecord, cx: &ConversionContext<'_>) -> Conversion {
        Self::convert(record, cx).into()
    }
}

/// Source for `QDM::MedicationOrder`
///
/// The order is authored on `date_added`; `start_date` and `end_date`, when
/// present, give the period the medication was prescribed for.
#[derive(Debug, Default, Clone, Copy)]
pub struct MedicationOrderSource;

impl MedicationOrderSource {
    fn convert(
        record: &RawRecord,
        cx: &ConversionContext<'_>,
    ) -> Result<Option<DataElement>, ConversionError> {
        let dosage = quantity(record, DOSAGE, DOSAGE_UNITS)?;
        let Some(element) = event(
            DataElementKind::MedicationOrder,
            record,
            cx,
            Timing::Authored(DATE_ADDED),
        )?
        else {
            return Ok(None);
        };

        if element.is_negated() {
            return Ok(Some(element));
        }

        let element = match datetime(record, START_DATE, cx) {
            Some(start) => element.with_relevant_period(interval(record, start, END_DATE, cx)?),
            None => element,
        };
        Ok(Some(element.with_dosage(dosage)))
    }
}

impl CategorySource for MedicationOrderSource {
    fn name(&self) -> &'static str {
        "medication_order"
    }

    fn query_spec(&self, ctx: &RequestContext) -> QuerySpec {
        QuerySpec::for_request(self.name(), "prescription", ctx)
            .select(&[
                CODE,
                DATE_ADDED,
                START_DATE,
                END_DATE,
                DOSAGE,
                DOSAGE_UNITS,
                REASON_STATUS,
                REASON_CODE,
            ])
            .period_columns(DATE_ADDED, None)
    }

    fn make_model(&self, record: &RawRecord, cx: &ConversionContext<'_>) -> Conversion {
        Self::convert(record, cx).into()
    }
}
