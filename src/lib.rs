//! A Rust library for assembling per-patient QDM models from clinical
//! category tables, with pluggable query executors and parallel category
//! sweeps.

pub mod builder;
pub mod codes;
pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod request;
pub mod sources;
pub mod utils;

// Re-export the most common types for easier use
// Core types
pub use builder::{BuildOutput, BuildReport, CategoryReport, QdmBuilder};
pub use config::{BuilderConfig, DateFormatConfig, OrphanPolicy};
pub use error::{ConversionError, Error, Result};
pub use request::{MeasurementPeriod, RequestContext, SubjectSelection};

// Models
pub use models::{DataElement, DataElementKind, Interval, QdmPatient, Quantity, ResultValue};

// Codes and reference data
pub use codes::{Code, CodeLookup, CodeSystem, CodeTable, NoCodeLookup};

// Queries and sources
pub use query::{
    FieldValue, InMemoryQueryExecutor, ParquetQueryExecutor, QueryExecutor, QuerySpec, RawRecord,
    RecordEnvelope, RecordStream,
};
pub use sources::{CategorySource, Conversion, ConversionContext, SourceRegistry, SubjectSource};
