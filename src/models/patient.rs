//! The per-subject composite model

use chrono::NaiveDateTime;
use serde::Serialize;

use super::{DataElement, DataElementKind};

/// QDM patient: the subject's own attributes plus every attached data element
///
/// Data elements are append-only and keep the order they were attached in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QdmPatient {
    subject_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    birth_datetime: Option<NaiveDateTime>,
    data_elements: Vec<DataElement>,
}

impl QdmPatient {
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            birth_datetime: None,
            data_elements: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_birth_datetime(mut self, birth_datetime: Option<NaiveDateTime>) -> Self {
        self.birth_datetime = birth_datetime;
        self
    }

    #[must_use]
    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    #[must_use]
    pub const fn birth_datetime(&self) -> Option<NaiveDateTime> {
        self.birth_datetime
    }

    /// Append a data element
    pub fn add_data_element(&mut self, element: DataElement) {
        self.data_elements.push(element);
    }

    #[must_use]
    pub fn data_elements(&self) -> &[DataElement] {
        &self.data_elements
    }

    /// Elements of one QDM type, in attachment order
    pub fn elements_of(&self, kind: DataElementKind) -> impl Iterator<Item = &DataElement> {
        self.data_elements.iter().filter(move |element| element.kind == kind)
    }

    /// Elements that came from clinical categories rather than demographics
    pub fn clinical_elements(&self) -> impl Iterator<Item = &DataElement> {
        self.data_elements
            .iter()
            .filter(|element| !element.kind.is_patient_characteristic())
    }
}
