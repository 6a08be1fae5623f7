//! QDM data elements, the normalized form of one clinical fact

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};

use crate::codes::Code;

/// QDM datatype of a data element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataElementKind {
    AllergyIntolerance,
    AssessmentPerformed,
    Diagnosis,
    DiagnosticStudyPerformed,
    DiagnosticStudyOrder,
    EncounterPerformed,
    ImmunizationAdministered,
    InterventionPerformed,
    InterventionOrder,
    LaboratoryTestPerformed,
    LaboratoryTestOrder,
    MedicationActive,
    MedicationOrder,
    PhysicalExamPerformed,
    ProcedurePerformed,
    ProcedureRecommended,
    SubstanceRecommended,
    PatientCharacteristicBirthdate,
    PatientCharacteristicSex,
    PatientCharacteristicRace,
    PatientCharacteristicEthnicity,
    PatientCharacteristicExpired,
    PatientCharacteristicPayer,
}

impl DataElementKind {
    /// Qualified QDM type name, e.g. `QDM::Diagnosis`
    #[must_use]
    pub const fn qdm_type(self) -> &'static str {
        match self {
            Self::AllergyIntolerance => "QDM::AllergyIntolerance",
            Self::AssessmentPerformed => "QDM::AssessmentPerformed",
            Self::Diagnosis => "QDM::Diagnosis",
            Self::DiagnosticStudyPerformed => "QDM::DiagnosticStudyPerformed",
            Self::DiagnosticStudyOrder => "QDM::DiagnosticStudyOrder",
            Self::EncounterPerformed => "QDM::EncounterPerformed",
            Self::ImmunizationAdministered => "QDM::ImmunizationAdministered",
            Self::InterventionPerformed => "QDM::InterventionPerformed",
            Self::InterventionOrder => "QDM::InterventionOrder",
            Self::LaboratoryTestPerformed => "QDM::LaboratoryTestPerformed",
            Self::LaboratoryTestOrder => "QDM::LaboratoryTestOrder",
            Self::MedicationActive => "QDM::MedicationActive",
            Self::MedicationOrder => "QDM::MedicationOrder",
            Self::PhysicalExamPerformed => "QDM::PhysicalExamPerformed",
            Self::ProcedurePerformed => "QDM::ProcedurePerformed",
            Self::ProcedureRecommended => "QDM::ProcedureRecommended",
            Self::SubstanceRecommended => "QDM::SubstanceRecommended",
            Self::PatientCharacteristicBirthdate => "QDM::PatientCharacteristicBirthdate",
            Self::PatientCharacteristicSex => "QDM::PatientCharacteristicSex",
            Self::PatientCharacteristicRace => "QDM::PatientCharacteristicRace",
            Self::PatientCharacteristicEthnicity => "QDM::PatientCharacteristicEthnicity",
            Self::PatientCharacteristicExpired => "QDM::PatientCharacteristicExpired",
            Self::PatientCharacteristicPayer => "QDM::PatientCharacteristicPayer",
        }
    }

    /// Whether the element describes the patient rather than a clinical event
    #[must_use]
    pub const fn is_patient_characteristic(self) -> bool {
        matches!(
            self,
            Self::PatientCharacteristicBirthdate
                | Self::PatientCharacteristicSex
                | Self::PatientCharacteristicRace
                | Self::PatientCharacteristicEthnicity
                | Self::PatientCharacteristicExpired
                | Self::PatientCharacteristicPayer
        )
    }
}

impl fmt::Display for DataElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.qdm_type())
    }
}

impl Serialize for DataElementKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.qdm_type())
    }
}

/// Closed or half-open time interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub low: Option<NaiveDateTime>,
    pub high: Option<NaiveDateTime>,
}

impl Interval {
    #[must_use]
    pub const fn new(low: Option<NaiveDateTime>, high: Option<NaiveDateTime>) -> Self {
        Self { low, high }
    }

    /// Interval that starts and ends at the same instant
    #[must_use]
    pub const fn point(at: NaiveDateTime) -> Self {
        Self::new(Some(at), Some(at))
    }
}

/// Numeric value with an optional UCUM unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quantity {
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Result attached to a performed test, exam or assessment
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultValue {
    Quantity(Quantity),
    Code(Code),
    Text(String),
}

/// One QDM data element
///
/// Only the attributes that make sense for the element's kind are set; the
/// category that built it decides which.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataElement {
    #[serde(rename = "_type")]
    pub kind: DataElementKind,
    pub codes: Vec<Code>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevant_period: Option<Interval>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevant_datetime: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_datetime: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prevalence_period: Option<Interval>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dosage: Option<Quantity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negation_rationale: Option<Code>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Code>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discharge_disposition: Option<Code>,
}

impl DataElement {
    #[must_use]
    pub const fn new(kind: DataElementKind, codes: Vec<Code>) -> Self {
        Self {
            kind,
            codes,
            relevant_period: None,
            relevant_datetime: None,
            author_datetime: None,
            prevalence_period: None,
            result: None,
            dosage: None,
            negation_rationale: None,
            reason: None,
            discharge_disposition: None,
        }
    }

    #[must_use]
    pub fn with_relevant_period(mut self, period: Interval) -> Self {
        self.relevant_period = Some(period);
        self
    }

    #[must_use]
    pub fn with_relevant_datetime(mut self, at: NaiveDateTime) -> Self {
        self.relevant_datetime = Some(at);
        self
    }

    #[must_use]
    pub fn with_author_datetime(mut self, at: NaiveDateTime) -> Self {
        self.author_datetime = Some(at);
        self
    }

    #[must_use]
    pub fn with_prevalence_period(mut self, period: Interval) -> Self {
        self.prevalence_period = Some(period);
        self
    }

    #[must_use]
    pub fn with_result(mut self, result: Option<ResultValue>) -> Self {
        self.result = result;
        self
    }

    #[must_use]
    pub fn with_dosage(mut self, dosage: Option<Quantity>) -> Self {
        self.dosage = dosage;
        self
    }

    #[must_use]
    pub fn with_discharge_disposition(mut self, code: Option<Code>) -> Self {
        self.discharge_disposition = code;
        self
    }

    /// First code of the element
    #[must_use]
    pub fn primary_code(&self) -> Option<&Code> {
        self.codes.first()
    }

    /// Whether the element records that the action did not happen
    #[must_use]
    pub const fn is_negated(&self) -> bool {
        self.negation_rationale.is_some()
    }

    /// Earliest instant the element is anchored at
    #[must_use]
    pub fn start_time(&self) -> Option<NaiveDateTime> {
        self.relevant_period
            .and_then(|p| p.low)
            .or(self.relevant_datetime)
            .or_else(|| self.prevalence_period.and_then(|p| p.low))
            .or(self.author_datetime)
    }
}
