//! Administered vaccines
//!
//! Vaccine codes are stored as bare CVX codes (`140`), a `SYSTEM:CODE` pair
//! is accepted as well.

use super::extractors::{REASON_CODE, REASON_STATUS, Reason, code_in_system, datetime, reason};
use super::{CategorySource, Conversion, ConversionContext};
use crate::codes::CodeSystem;
use crate::error::ConversionError;
use crate::models::{DataElement, DataElementKind};
use crate::query::{QuerySpec, RawRecord};
use crate::request::RequestContext;

const CVX_CODE: &str = "cvx_code";
const DATE: &str = "date";

/// Source for `QDM::ImmunizationAdministered`
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmunizationSource;

impl ImmunizationSource {
    fn convert(
        record: &RawRecord,
        cx: &ConversionContext<'_>,
    ) -> Result<Option<DataElement>, ConversionError> {
        let code = code_in_system(record, CVX_CODE, CodeSystem::Cvx, cx)?
            .ok_or(ConversionError::MissingField(CVX_CODE))?;
        let reason = reason(record, cx)?;
        let Some(administered) = datetime(record, DATE, cx) else {
            return Ok(None);
        };

        let mut element = DataElement::new(DataElementKind::ImmunizationAdministered, vec![code]);
        let element = match reason {
            Some(Reason::Negated(rationale)) => {
                element.negation_rationale = Some(rationale);
                element.with_author_datetime(administered)
            }
            Some(Reason::Given(code)) => {
                element.reason = Some(code);
                element.with_relevant_datetime(administered)
            }
            None => element.with_relevant_datetime(administered),
        };
        Ok(Some(element))
    }
}

impl CategorySource for ImmunizationSource {
    fn name(&self) -> &'static str {
        "immunization"
    }

    fn query_spec(&self, ctx: &RequestContext) -> QuerySpec {
        QuerySpec::for_request(self.name(), "immunization", ctx)
            .select(&[CVX_CODE, DATE, REASON_STATUS, REASON_CODE])
            .period_columns(DATE, None)
    }

    fn make_model(&self, record: &RawRecord, cx: &ConversionContext<'_>) -> Conversion {
        Self::convert(record, cx).into()
    }
}
