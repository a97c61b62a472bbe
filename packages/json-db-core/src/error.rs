//! Database error types.

use thiserror::Error;

use crate::types::FieldType;

/// Reason a row or patch was rejected by the validator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Violation {
    /// Key is not a column of the table
    #[error("unknown key")]
    UnknownKey,

    /// Required column has no value and no default
    #[error("missing required value")]
    MissingRequired,

    /// Value does not conform to the declared type
    #[error("expected {expected}")]
    TypeMismatch { expected: FieldType },

    /// Value is not one of the declared enum members
    #[error("value not in enum")]
    NotInEnum,
}

/// Database operation errors.
#[derive(Error, Debug, Clone)]
pub enum DbError {
    /// Table not found
    #[error("Table '{table}' not found")]
    TableNotFound { table: String },

    /// Column referenced by a predicate or patch is not in the schema
    #[error("Unknown column '{column}' in table '{table}'")]
    UnknownColumn { table: String, column: String },

    /// Insert or update payload rejected
    #[error("Validation failed for '{table}'.'{column}': {violation}")]
    Validation {
        table: String,
        column: String,
        violation: Violation,
    },

    /// Extend names a table with no relationship to this one
    #[error("Relation '{relation}' undefined for table '{table}'")]
    RelationUndefined { table: String, relation: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Data corruption detected
    #[error("Data corruption detected: {0}")]
    DataCorruption(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Disk full error during persistence
    #[error("Disk full: {0}")]
    DiskFull(String),

    /// I/O error during persistence
    #[error("I/O error: {0}")]
    IoError(String),

    /// Transient I/O error that may succeed on retry
    #[error("Transient I/O error: {0}")]
    TransientIoError(String),
}

impl DbError {
    /// Returns true for errors raised while writing or reading table files.
    pub fn is_persistence_failure(&self) -> bool {
        matches!(
            self,
            DbError::DiskFull(_) | DbError::IoError(_) | DbError::TransientIoError(_)
        )
    }
}
