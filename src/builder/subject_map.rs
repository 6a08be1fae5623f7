//! Arena of patients keyed by subject identifier
//!
//! Patients are inserted during subject enumeration only; a repeated subject
//! replaces the earlier patient in place. Afterwards the index
//! is read-only and each patient sits behind its own lock, so concurrent
//! category sweeps serialize on a single patient and never on the whole map.

use std::collections::hash_map::Entry;
use std::sync::Mutex;

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::models::{DataElement, QdmPatient};

#[derive(Debug, Default)]
pub struct SubjectMap {
    slots: Vec<Mutex<QdmPatient>>,
    index: FxHashMap<String, usize>,
}

impl SubjectMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the patient of `subject_id`, returning `false` if it replaced one
    ///
    /// A replacement takes over the slot of the earlier patient, so subjects
    /// keep the position of their first insertion.
    pub fn insert(&mut self, subject_id: String, patient: QdmPatient) -> bool {
        match self.index.entry(subject_id) {
            Entry::Occupied(entry) => {
                self.slots[*entry.get()] = Mutex::new(patient);
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(self.slots.len());
                self.slots.push(Mutex::new(patient));
                true
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Append `element` to the patient of `subject_id`
    ///
    /// Returns `Ok(false)` when no such subject was enumerated.
    pub fn attach(&self, subject_id: &str, element: DataElement) -> Result<bool> {
        let Some(&slot) = self.index.get(subject_id) else {
            return Ok(false);
        };

        let mut patient = self.slots[slot].lock().map_err(|_| {
            Error::InvalidOperation(format!("Failed to acquire lock on patient {subject_id}"))
        })?;
        patient.add_data_element(element);
        Ok(true)
    }

    /// Patients in the order they were inserted
    pub fn into_patients(self) -> Result<Vec<QdmPatient>> {
        self.slots
            .into_iter()
            .map(|slot| {
                slot.into_inner().map_err(|_| {
                    Error::InvalidOperation("Patient lock poisoned during build".to_string())
                })
            })
            .collect()
    }
}
