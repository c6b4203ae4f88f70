//! Storage layer errors.

use thiserror::Error;

use crate::storage::{PageId, TableId};

/// Storage layer errors.
///
/// `TableMismatch`, `PageOutOfRange` and `Truncated` together describe an
/// invalid page request.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The page belongs to a different table than the file being accessed.
    #[error("page {page_id} does not belong to table {expected}")]
    TableMismatch {
        /// Table id of the file.
        expected: TableId,
        /// Offending page.
        page_id: PageId,
    },

    /// The page number is past the end of the file.
    #[error("page {page_id} out of range: file has {page_count} pages")]
    PageOutOfRange {
        /// Offending page.
        page_id: PageId,
        /// Number of pages in the file.
        page_count: usize,
    },

    /// The file ended before a full page could be read.
    #[error("page {page_id} is truncated in the backing file")]
    Truncated {
        /// Offending page.
        page_id: PageId,
    },

    /// Invalid buffer size provided to a page read or write.
    ///
    /// Buffers must be exactly one page long.
    #[error("invalid buffer size: expected {expected}, got {actual}")]
    InvalidBufferSize {
        /// Expected buffer size (the file's page size).
        expected: usize,
        /// Actual buffer size provided.
        actual: usize,
    },

    /// The file does not have a valid page layout.
    ///
    /// This occurs when the file length is not a multiple of the page size.
    #[error("data corruption: {0}")]
    Corrupted(String),

    /// I/O error from the underlying file system.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
