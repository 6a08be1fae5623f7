//! Clinical codes and the code systems they come from
//!
//! Codes arrive from the backing store as `SYSTEM:CODE` pairs, several of
//! them separated by `;` (for example `ICD10:E11.9;SNOMED-CT:44054006`).
//! Each system is identified by its OID in the produced models.

pub mod lookup;

pub use lookup::{CodeLookup, CodeTable, CodeTableEntry, NoCodeLookup};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConversionError;

/// Code systems understood by the category conversions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CodeSystem {
    Icd9Cm,
    Icd10Cm,
    Icd10Pcs,
    SnomedCt,
    Loinc,
    RxNorm,
    Cpt,
    Hcpcs,
    Cvx,
    AdministrativeGender,
    CdcRaceEthnicity,
    SourceOfPayment,
}

impl CodeSystem {
    pub const ALL: [Self; 12] = [
        Self::Icd9Cm,
        Self::Icd10Cm,
        Self::Icd10Pcs,
        Self::SnomedCt,
        Self::Loinc,
        Self::RxNorm,
        Self::Cpt,
        Self::Hcpcs,
        Self::Cvx,
        Self::AdministrativeGender,
        Self::CdcRaceEthnicity,
        Self::SourceOfPayment,
    ];

    /// Object identifier of the code system
    #[must_use]
    pub const fn oid(self) -> &'static str {
        match self {
            Self::Icd9Cm => "2.16.840.1.113883.6.103",
            Self::Icd10Cm => "2.16.840.1.113883.6.90",
            Self::Icd10Pcs => "2.16.840.1.113883.6.4",
            Self::SnomedCt => "2.16.840.1.113883.6.96",
            Self::Loinc => "2.16.840.1.113883.6.1",
            Self::RxNorm => "2.16.840.1.113883.6.88",
            Self::Cpt => "2.16.840.1.113883.6.12",
            Self::Hcpcs => "2.16.840.1.113883.6.285",
            Self::Cvx => "2.16.840.1.113883.12.292",
            Self::AdministrativeGender => "2.16.840.1.113883.5.1",
            Self::CdcRaceEthnicity => "2.16.840.1.113883.6.238",
            Self::SourceOfPayment => "2.16.840.1.113883.3.221.5",
        }
    }

    /// Human readable name of the code system
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Icd9Cm => "ICD-9-CM",
            Self::Icd10Cm => "ICD-10-CM",
            Self::Icd10Pcs => "ICD-10-PCS",
            Self::SnomedCt => "SNOMED-CT",
            Self::Loinc => "LOINC",
            Self::RxNorm => "RXNORM",
            Self::Cpt => "CPT",
            Self::Hcpcs => "HCPCS",
            Self::Cvx => "CVX",
            Self::AdministrativeGender => "AdministrativeGender",
            Self::CdcRaceEthnicity => "CDCREC",
            Self::SourceOfPayment => "SOP",
        }
    }
}

impl fmt::Display for CodeSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CodeSystem {
    type Err = ConversionError;

    /// Accepts the usual prefixes found in stored code strings, and OIDs
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let prefix = s.trim();
        if let Some(system) = Self::ALL.into_iter().find(|system| system.oid() == prefix) {
            return Ok(system);
        }

        let system = match prefix.to_ascii_uppercase().replace('_', "-").as_str() {
            "ICD9" | "ICD9-CM" | "ICD-9-CM" => Self::Icd9Cm,
            "ICD10" | "ICD10-CM" | "ICD-10-CM" => Self::Icd10Cm,
            "ICD10-PCS" | "ICD-10-PCS" => Self::Icd10Pcs,
            "SNOMED" | "SNOMED-CT" | "SNOMEDCT" | "SNOMED-PR" => Self::SnomedCt,
            "LOINC" => Self::Loinc,
            "RXNORM" | "RXCUI" => Self::RxNorm,
            "CPT" | "CPT4" => Self::Cpt,
            "HCPCS" => Self::Hcpcs,
            "CVX" => Self::Cvx,
            "ADMINISTRATIVEGENDER" | "HL7-GENDER" => Self::AdministrativeGender,
            "CDCREC" | "CDC-RACE" => Self::CdcRaceEthnicity,
            "SOP" => Self::SourceOfPayment,
            _ => return Err(ConversionError::UnknownCodeSystem(prefix.to_string())),
        };
        Ok(system)
    }
}

impl Serialize for CodeSystem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.oid())
    }
}

impl<'de> Deserialize<'de> for CodeSystem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// A code from a code system, with its display term when known
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Code {
    pub code: String,
    pub system: CodeSystem,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Code {
    pub fn new(system: CodeSystem, code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            system,
            display: None,
        }
    }

    /// Fill in the display term from reference data if it is missing
    #[must_use]
    pub fn resolved(mut self, lookup: &dyn CodeLookup) -> Self {
        if self.display.is_none() {
            self.display = lookup.lookup(self.system, &self.code);
        }
        self
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.system, self.code)
    }
}

/// Parse one `SYSTEM:CODE` pair
pub fn parse_code(text: &str) -> Result<Code, ConversionError> {
    let text = text.trim();
    let Some((system, code)) = text.split_once(':') else {
        return Err(ConversionError::MalformedCode(text.to_string()));
    };
    let code = code.trim();
    if code.is_empty() {
        return Err(ConversionError::MalformedCode(text.to_string()));
    }
    Ok(Code::new(system.parse()?, code))
}

/// Parse a `;` separated list of `SYSTEM:CODE` pairs, ignoring empty entries
pub fn parse_codes(text: &str) -> Result<Vec<Code>, ConversionError> {
    text.split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(parse_code)
        .collect()
}
