//! Subject enumeration and patient characteristics
//!
//! The `patient` table holds one row per subject. Its demographics become the
//! patient's birth date-time and a set of characteristic elements placed ahead
//! of every clinical element.

use super::extractors::{code_in_system, datetime};
use super::{ConversionContext, SubjectSource};
use crate::codes::{Code, CodeSystem};
use crate::error::ConversionError;
use crate::models::{DataElement, DataElementKind, QdmPatient};
use crate::query::{QuerySpec, RawRecord};
use crate::request::RequestContext;

const DOB: &str = "dob";
const SEX: &str = "sex";
const RACE: &str = "race";
const ETHNICITY: &str = "ethnicity";
const DECEASED_DATE: &str = "deceased_date";
const PAYER: &str = "payer";

const BIRTHDATE_LOINC: &str = "21112-8";
const DEAD_SNOMED: &str = "419099009";

/// Answers that mean the value was not given
const NOT_GIVEN: [&str; 3] = ["decline_to_specify", "declne_to_specfy", "unknown"];

/// Race list options and their CDC Race & Ethnicity codes
const RACES: [(&str, &str); 6] = [
    ("white", "2106-3"),
    ("black_or_afri_amer", "2054-5"),
    ("amer_ind_or_alaska_native", "1002-5"),
    ("asian", "2028-9"),
    ("native_hawai_or_pac_island", "2076-8"),
    ("other", "2131-1"),
];

/// Ethnicity list options and their CDC Race & Ethnicity codes
const ETHNICITIES: [(&str, &str); 2] = [("hisp_or_latin", "2135-2"), ("not_hisp_or_latin", "2186-5")];

/// Source enumerating subjects from the `patient` table
#[derive(Debug, Default, Clone, Copy)]
pub struct PatientSource;

impl SubjectSource for PatientSource {
    fn name(&self) -> &'static str {
        "patient"
    }

    fn query_spec(&self, ctx: &RequestContext) -> QuerySpec {
        QuerySpec::for_request(self.name(), "patient", ctx)
            .select(&[DOB, SEX, RACE, ETHNICITY, DECEASED_DATE, PAYER])
    }

    fn make_patient(
        &self,
        subject_id: &str,
        record: &RawRecord,
        cx: &ConversionContext<'_>,
    ) -> Result<QdmPatient, ConversionError> {
        let birth = datetime(record, DOB, cx);
        let mut patient = QdmPatient::new(subject_id).with_birth_datetime(birth);

        for element in characteristics(record, cx)? {
            patient.add_data_element(element);
        }
        Ok(patient)
    }
}

fn characteristics(
    record: &RawRecord,
    cx: &ConversionContext<'_>,
) -> Result<Vec<DataElement>, ConversionError> {
    let mut elements = Vec::new();

    if let Some(birth) = datetime(record, DOB, cx) {
        elements.push(
            characteristic(
                DataElementKind::PatientCharacteristicBirthdate,
                Code::new(CodeSystem::Loinc, BIRTHDATE_LOINC),
                cx,
            )
            .with_relevant_datetime(birth),
        );
    }

    if let Some(sex) = given(record, SEX) {
        elements.push(characteristic(
            DataElementKind::PatientCharacteristicSex,
            Code::new(CodeSystem::AdministrativeGender, gender_code(&sex)),
            cx,
        ));
    }

    if let Some(race) = given(record, RACE) {
        let code = cdc_code(RACE, &race, &RACES)?;
        elements.push(characteristic(DataElementKind::PatientCharacteristicRace, code, cx));
    }

    if let Some(ethnicity) = given(record, ETHNICITY) {
        let code = cdc_code(ETHNICITY, &ethnicity, &ETHNICITIES)?;
        elements.push(characteristic(
            DataElementKind::PatientCharacteristicEthnicity,
            code,
            cx,
        ));
    }

    if let Some(deceased) = datetime(record, DECEASED_DATE, cx) {
        elements.push(
            characteristic(
                DataElementKind::PatientCharacteristicExpired,
                Code::new(CodeSystem::SnomedCt, DEAD_SNOMED),
                cx,
            )
            .with_relevant_datetime(deceased),
        );
    }

    if let Some(payer) = code_in_system(record, PAYER, CodeSystem::SourceOfPayment, cx)? {
        elements.push(DataElement::new(
            DataElementKind::PatientCharacteristicPayer,
            vec![payer],
        ));
    }

    Ok(elements)
}

fn characteristic(kind: DataElementKind, code: Code, cx: &ConversionContext<'_>) -> DataElement {
    DataElement::new(kind, vec![code.resolved(cx.codes)])
}

/// Text of `field` unless it is absent or one of the "not given" answers
fn given(record: &RawRecord, field: &str) -> Option<String> {
    record
        .get(field)
        .and_then(|value| value.to_text())
        .filter(|text| !NOT_GIVEN.iter().any(|n| text.eq_ignore_ascii_case(n)))
}

fn gender_code(sex: &str) -> &'static str {
    match sex.to_ascii_lowercase().as_str() {
        "m" | "male" => "M",
        "f" | "female" => "F",
        _ => "UN",
    }
}

/// CDC code of a list option; raw CDC codes, with or without prefix, pass through
fn cdc_code(
    field: &'static str,
    value: &str,
    options: &[(&str, &'static str)],
) -> Result<Code, ConversionError> {
    let bare = value
        .split_once(':')
        .map_or(value, |(_, code)| code)
        .trim();

    options
        .iter()
        .find(|(option, code)| value.eq_ignore_ascii_case(option) || bare == *code)
        .map(|(_, code)| Code::new(CodeSystem::CdcRaceEthnicity, *code))
        .ok_or_else(|| ConversionError::InvalidValue {
            field,
            value: value.to_string(),
        })
}
