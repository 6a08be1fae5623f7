//! Category sources: one per clinical category, plus the subject source
//!
//! Each source owns the shape of its query and the rules that turn one raw
//! record into a [`DataElement`]. Sources hold no per-build state; the
//! conversion of a record depends only on the record and the read-only
//! reference data in the [`ConversionContext`].
//!
//! Available categories, in sweep order:
//! - `allergy_intolerance`: allergies and intolerances
//! - `assessment`: assessments performed
//! - `diagnosis`: problem list diagnoses
//! - `diagnostic_study` / `diagnostic_study_order`
//! - `encounter`: encounters performed
//! - `immunization`: administered vaccines (CVX)
//! - `intervention` / `intervention_order`
//! - `laboratory_test` / `laboratory_test_order`
//! - `medication_active` / `medication_order`
//! - `physical_exam`
//! - `procedure` / `procedure_recommended`
//! - `substance_recommended`

pub mod allergy;
pub mod assessment;
pub mod diagnosis;
pub mod diagnostic_study;
pub mod encounter;
pub mod extractors;
pub mod factory;
pub mod immunization;
pub mod intervention;
pub mod laboratory;
pub mod medication;
pub mod patient;
pub mod physical_exam;
pub mod procedure;
pub mod registry;
pub mod substance;

pub use factory::{STANDARD_CATEGORIES, category_from_name};
pub use patient::PatientSource;
pub use registry::SourceRegistry;

use crate::codes::CodeLookup;
use crate::config::DateFormatConfig;
use crate::error::{ConversionError, Result};
use crate::models::{DataElement, QdmPatient};
use crate::query::{QueryExecutor, QuerySpec, RawRecord, RecordStream};
use crate::request::RequestContext;

/// Read-only reference data available while converting records
#[derive(Clone, Copy)]
pub struct ConversionContext<'a> {
    pub codes: &'a dyn CodeLookup,
    pub dates: &'a DateFormatConfig,
}

impl<'a> ConversionContext<'a> {
    pub fn new(codes: &'a dyn CodeLookup, dates: &'a DateFormatConfig) -> Self {
        Self { codes, dates }
    }
}

/// Outcome of converting one record
#[derive(Debug, Clone, PartialEq)]
pub enum Conversion {
    /// The record became a data element
    Model(DataElement),
    /// The record carries nothing worth a data element
    NoModel,
    /// The record could not be converted
    Failed(ConversionError),
}

impl From<std::result::Result<Option<DataElement>, ConversionError>> for Conversion {
    fn from(result: std::result::Result<Option<DataElement>, ConversionError>) -> Self {
        match result {
            Ok(Some(element)) => Self::Model(element),
            Ok(None) => Self::NoModel,
            Err(err) => Self::Failed(err),
        }
    }
}

/// A clinical category that contributes data elements to patients
pub trait CategorySource: Send + Sync {
    /// Unique category name used in logs and reports
    fn name(&self) -> &'static str;

    /// The query answering this category for a request
    fn query_spec(&self, ctx: &RequestContext) -> QuerySpec;

    /// Run the category's query
    ///
    /// Must not write to the backing store.
    fn execute_query<'a>(
        &self,
        ctx: &RequestContext,
        executor: &'a dyn QueryExecutor,
    ) -> Result<RecordStream<'a>> {
        executor.run(&self.query_spec(ctx))
    }

    /// Convert one raw record
    fn make_model(&self, record: &RawRecord, cx: &ConversionContext<'_>) -> Conversion;
}

/// The source that enumerates subjects and builds their root models
pub trait SubjectSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn query_spec(&self, ctx: &RequestContext) -> QuerySpec;

    fn execute_query<'a>(
        &self,
        ctx: &RequestContext,
        executor: &'a dyn QueryExecutor,
    ) -> Result<RecordStream<'a>> {
        executor.run(&self.query_spec(ctx))
    }

    /// Build the root patient model of `subject_id` from its subject record
    fn make_patient(
        &self,
        subject_id: &str,
        record: &RawRecord,
        cx: &ConversionContext<'_>,
    ) -> std::result::Result<QdmPatient, ConversionError>;
}
