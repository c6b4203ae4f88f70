//! Error types for the heap module.

use thiserror::Error;

use crate::storage::{PageId, StorageError, TableId};
use crate::tuple::{RecordId, TupleError};

/// Errors from heap page and heap file operations.
#[derive(Debug, Error)]
pub enum HeapError {
    /// Page has no free slot.
    #[error("page {page_id} is full")]
    PageFull {
        /// Page that was full.
        page_id: PageId,
    },

    /// Locator does not name a live record on this page.
    ///
    /// Raised for a foreign page id, a slot index past the page's capacity,
    /// or a slot that is already empty.
    #[error("record {rid} is not stored on page {page_id}")]
    InvalidLocator {
        /// Page the delete was attempted on.
        page_id: PageId,
        /// Offending locator.
        rid: RecordId,
    },

    /// Record schema differs from the schema of the page or file.
    #[error("record schema ({found}) does not match table schema ({expected})")]
    SchemaMismatch {
        /// Rendered schema of the page or file.
        expected: String,
        /// Rendered schema of the record.
        found: String,
    },

    /// A single record of this schema does not fit in a page.
    #[error("record of {width} bytes does not fit in a {page_size}-byte page")]
    RecordTooLarge {
        /// Serialized record width.
        width: usize,
        /// Page size.
        page_size: usize,
    },

    /// Delete was requested for a record that was never stored.
    #[error("record has no locator")]
    MissingRecordId,

    /// No heap file is registered for the table.
    #[error("unknown table {0}")]
    UnknownTable(TableId),

    /// Page cache is at capacity and every cached page is dirty.
    #[error("page cache full: all {capacity} cached pages are dirty")]
    CacheFull {
        /// Configured capacity.
        capacity: usize,
    },

    /// Storage error while reading or writing pages.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Record encoding or decoding error.
    #[error("tuple error: {0}")]
    Tuple(#[from] TupleError),
}
