//! Executor-specific errors.

use thiserror::Error;

use crate::datum::Type;
use crate::heap::HeapError;
use crate::tuple::TupleError;

/// Errors that can occur while driving an operator tree.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// `has_next` or `next` was called on an iterator that is not open.
    #[error("iterator is not open")]
    NotOpen,

    /// `next` was called on an exhausted iterator.
    #[error("no more records")]
    NoSuchElement,

    /// The aggregate operator is not defined for the field type.
    #[error("{op} is not supported over {ty} fields")]
    UnsupportedOperator {
        /// Requested operator, rendered.
        op: String,
        /// Aggregated field type.
        ty: Type,
    },

    /// A value had a different type than the operator expected.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Expected type.
        expected: Type,
        /// Actual type.
        found: Type,
    },

    /// An aggregate result does not fit in a 32-bit integer.
    #[error("integer overflow")]
    IntegerOverflow,

    /// Heap or page cache error.
    #[error("{0}")]
    Heap(#[from] HeapError),

    /// Schema or record error.
    #[error("{0}")]
    Tuple(#[from] TupleError),
}
