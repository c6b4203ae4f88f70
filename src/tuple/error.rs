//! Error types for the tuple module.

use thiserror::Error;

use crate::datum::{SerializationError, Type};

/// Errors from schema and record operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TupleError {
    /// Type and name lists differ in length, or are empty.
    #[error("schema needs a name per type and at least one field: {types} types, {names} names")]
    SchemaSizeMismatch {
        /// Number of types given.
        types: usize,
        /// Number of names given.
        names: usize,
    },

    /// Field index is out of range.
    #[error("field index {index} out of range for {len} fields")]
    FieldIndex {
        /// Requested index.
        index: usize,
        /// Number of fields.
        len: usize,
    },

    /// No field carries the requested name.
    #[error("no field named \"{0}\"")]
    FieldNotFound(String),

    /// A value does not match the type of the field it is stored into.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Field type.
        expected: Type,
        /// Value type.
        found: Type,
    },

    /// Field encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] SerializationError),
}
