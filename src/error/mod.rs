//! Error handling for the QDM builder.
//!
//! Two families of errors exist. [`Error`] is returned from a build and always
//! terminates it. [`ConversionError`] describes a single record that could not
//! be turned into a data element; it is logged and the record is skipped.

pub mod util;

use std::io;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

/// Errors that terminate a build
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A record handed to the builder has no subject identifier
    #[error(
        "record from `{category}` is missing subject identifier field `{field}`; \
         the category query must select it"
    )]
    MissingSubjectId { category: String, field: String },

    /// A registered source breaks the source contract
    #[error("category source `{category}` does not conform to the source contract: {reason}")]
    NonConformingSource { category: String, reason: String },

    /// The subject source could not build the root model for a subject
    #[error("failed to build subject model for `{subject_id}`: {reason}")]
    SubjectConversion { subject_id: String, reason: String },

    /// A category record names a subject that was never enumerated
    #[error("record from `{category}` references unknown subject `{subject_id}`")]
    OrphanedRecord { category: String, subject_id: String },

    /// The backing store could not answer a query
    #[error("query on table `{table}` failed: {message}")]
    Query { table: String, message: String },

    /// Error opening or reading a file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error processing Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Error processing Arrow data
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error reading or writing JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration or request parameters
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal state could not be accessed
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// The build was stopped because another sweep failed
    #[error("build cancelled")]
    Cancelled,
}

impl Error {
    /// Create a query error for a table
    pub fn query(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Whether this error indicates a broken contract between components
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::MissingSubjectId { .. }
                | Self::NonConformingSource { .. }
                | Self::SubjectConversion { .. }
        )
    }
}

/// Result type for builder operations
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a single record could not be converted into a data element
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    /// A field the category needs is absent or null
    #[error("required field `{0}` is missing")]
    MissingField(&'static str),

    /// A code string is not of the form `SYSTEM:CODE`
    #[error("malformed code `{0}`")]
    MalformedCode(String),

    /// The code system prefix is not known
    #[error("unknown code system `{0}`")]
    UnknownCodeSystem(String),

    /// A field holds a value of the wrong shape
    #[error("invalid value `{value}` in field `{field}`")]
    InvalidValue { field: &'static str, value: String },
}
