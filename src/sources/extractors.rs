//! Field extractors shared by the category sources
//!
//! Every function here is a pure function of the record and the conversion
//! context, so sources can combine them freely.

use chrono::NaiveDateTime;

use super::ConversionContext;
use crate::codes::{Code, CodeSystem, parse_code, parse_codes};
use crate::error::ConversionError;
use crate::models::{DataElement, DataElementKind, Interval, Quantity, ResultValue};
use crate::query::{QuerySpec, RawRecord};
use crate::request::RequestContext;

pub const CODE: &str = "code";
pub const REASON_STATUS: &str = "reason_status";
pub const REASON_CODE: &str = "reason_code";
pub const RESULT_VALUE: &str = "result_value";
pub const RESULT_UNITS: &str = "result_units";
pub const DOSAGE: &str = "dosage";
pub const DOSAGE_UNITS: &str = "dosage_units";

/// `reason_status` value marking an action that did not happen
pub const NEGATED: &str = "negated";

/// Where an event's timing comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timing {
    /// `relevantPeriod` from a start column and an optional end column
    Period {
        start: &'static str,
        end: &'static str,
    },
    /// `relevantDatetime`
    Instant(&'static str),
    /// `authorDatetime`
    Authored(&'static str),
}

impl Timing {
    #[must_use]
    pub const fn start_column(self) -> &'static str {
        match self {
            Self::Period { start, .. } => start,
            Self::Instant(column) | Self::Authored(column) => column,
        }
    }

    #[must_use]
    pub const fn end_column(self) -> Option<&'static str> {
        match self {
            Self::Period { end, .. } => Some(end),
            Self::Instant(_) | Self::Authored(_) => None,
        }
    }
}

/// Why an action was taken, or why it was not
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    Negated(Code),
    Given(Code),
}

/// Query for an event category: code, timing and reason columns plus `extra`
pub fn event_query(
    category: &str,
    table: &str,
    ctx: &RequestContext,
    timing: Timing,
    extra: &[&str],
) -> QuerySpec {
    let mut columns = vec![CODE, timing.start_column()];
    columns.extend(timing.end_column());
    columns.extend([REASON_STATUS, REASON_CODE]);
    columns.extend_from_slice(extra);

    QuerySpec::for_request(category, table, ctx)
        .select(&columns)
        .period_columns(timing.start_column(), timing.end_column())
}

/// Codes in `field`; a missing, empty or unparseable value fails the record
pub fn required_codes(
    record: &RawRecord,
    field: &'static str,
    cx: &ConversionContext<'_>,
) -> Result<Vec<Code>, ConversionError> {
    let text = record
        .get(field)
        .and_then(|value| value.to_text())
        .ok_or(ConversionError::MissingField(field))?;

    let codes = parse_codes(&text)?;
    if codes.is_empty() {
        return Err(ConversionError::MalformedCode(text));
    }

    Ok(codes.into_iter().map(|code| code.resolved(cx.codes)).collect())
}

/// Single code in `field`, if present
pub fn optional_code(
    record: &RawRecord,
    field: &'static str,
    cx: &ConversionContext<'_>,
) -> Result<Option<Code>, ConversionError> {
    record
        .get(field)
        .and_then(|value| value.to_text())
        .map(|text| parse_code(&text).map(|code| code.resolved(cx.codes)))
        .transpose()
}

/// Code in `field` that may be stored bare, without a system prefix
pub fn code_in_system(
    record: &RawRecord,
    field: &'static str,
    system: CodeSystem,
    cx: &ConversionContext<'_>,
) -> Result<Option<Code>, ConversionError> {
    let Some(text) = record.get(field).and_then(|value| value.to_text()) else {
        return Ok(None);
    };

    let code = if text.contains(':') {
        parse_code(&text)?
    } else {
        Code::new(system, text)
    };
    Ok(Some(code.resolved(cx.codes)))
}

/// Date-time in `field`; absent, unparseable and zero dates are `None`
#[must_use]
pub fn datetime(
    record: &RawRecord,
    field: &str,
    cx: &ConversionContext<'_>,
) -> Option<NaiveDateTime> {
    record
        .get(field)
        .and_then(|value| value.to_datetime(cx.dates))
}

/// Interval from `start` to an optional `end`
///
/// An end before the start fails the record.
pub fn interval(
    record: &RawRecord,
    start: NaiveDateTime,
    end_field: &'static str,
    cx: &ConversionContext<'_>,
) -> Result<Interval, ConversionError> {
    let end = datetime(record, end_field, cx);
    if let Some(end) = end.filter(|end| *end < start) {
        return Err(ConversionError::InvalidValue {
            field: end_field,
            value: end.to_string(),
        });
    }
    Ok(Interval::new(Some(start), end))
}

/// Numeric quantity in `value_field` with the unit in `unit_field`
pub fn quantity(
    record: &RawRecord,
    value_field: &'static str,
    unit_field: &str,
) -> Result<Option<Quantity>, ConversionError> {
    let Some(value) = record.get(value_field) else {
        return Ok(None);
    };

    let Some(number) = value.as_f64() else {
        return Err(ConversionError::InvalidValue {
            field: value_field,
            value: value.to_string(),
        });
    };

    Ok(Some(Quantity {
        value: number,
        unit: record.get(unit_field).and_then(|unit| unit.to_text()),
    }))
}

/// Result of a performed test, exam or assessment
///
/// Numbers become quantities, `SYSTEM:CODE` text becomes a code and anything
/// else is kept as text.
#[must_use]
pub fn result_value(record: &RawRecord, cx: &ConversionContext<'_>) -> Option<ResultValue> {
    let value = record.get(RESULT_VALUE)?;

    if let Some(number) = value.as_f64() {
        return Some(ResultValue::Quantity(Quantity {
            value: number,
            unit: record.get(RESULT_UNITS).and_then(|unit| unit.to_text()),
        }));
    }

    let text = value.to_text()?;
    match parse_code(&text) {
        Ok(code) => Some(ResultValue::Code(code.resolved(cx.codes))),
        Err(_) => Some(ResultValue::Text(text)),
    }
}

/// Reason or negation rationale of the record
pub fn reason(
    record: &RawRecord,
    cx: &ConversionContext<'_>,
) -> Result<Option<Reason>, ConversionError> {
    let negated = record
        .get(REASON_STATUS)
        .and_then(|value| value.as_text())
        .is_some_and(|status| status.eq_ignore_ascii_case(NEGATED));

    let code = optional_code(record, REASON_CODE, cx)?;
    match (negated, code) {
        (true, Some(code)) => Ok(Some(Reason::Negated(code))),
        (true, None) => Err(ConversionError::MissingField(REASON_CODE)),
        (false, Some(code)) => Ok(Some(Reason::Given(code))),
        (false, None) => Ok(None),
    }
}

/// Convert an event record: codes, timing and reason
///
/// A record without its start date yields no element. A negated record keeps
/// only the author date-time.
pub fn event(
    kind: DataElementKind,
    record: &RawRecord,
    cx: &ConversionContext<'_>,
    timing: Timing,
) -> Result<Option<DataElement>, ConversionError> {
    let codes = required_codes(record, CODE, cx)?;
    let reason = reason(record, cx)?;
    let Some(start) = datetime(record, timing.start_column(), cx) else {
        return Ok(None);
    };

    let mut element = DataElement::new(kind, codes);
    match reason {
        Some(Reason::Negated(rationale)) => {
            element.negation_rationale = Some(rationale);
            return Ok(Some(element.with_author_datetime(start)));
        }
        Some(Reason::Given(code)) => element.reason = Some(code),
        None => {}
    }

    let element = match timing {
        Timing::Period { end, .. } => element.with_relevant_period(interval(record, start, end, cx)?),
        Timing::Instant(_) => element.with_relevant_datetime(start),
        Timing::Authored(_) => element.with_author_datetime(start),
    };
    Ok(Some(element))
}

/// Convert a condition-like record with a prevalence period
pub fn prevalence(
    kind: DataElementKind,
    record: &RawRecord,
    cx: &ConversionContext<'_>,
    start_field: &'static str,
    end_field: &'static str,
) -> Result<Option<DataElement>, ConversionError> {
    let codes = required_codes(record, CODE, cx)?;
    let Some(start) = datetime(record, start_field, cx) else {
        return Ok(None);
    };

    let period = interval(record, start, end_field, cx)?;
    Ok(Some(
        DataElement::new(kind, codes)
            .with_prevalence_period(period)
            .with_author_datetime(start),
    ))
}
