//! QDM domain models
//!
//! A build produces one [`QdmPatient`] per subject; every clinical fact the
//! category sources convert becomes a [`DataElement`] attached to it.

pub mod data_element;
pub mod patient;

pub use data_element::{DataElement, DataElementKind, Interval, Quantity, ResultValue};
pub use patient::QdmPatient;
