//! Page identifiers and page size configuration.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Default page size in bytes.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

static PAGE_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_PAGE_SIZE);

/// Returns the process-wide page size.
pub fn page_size() -> usize {
    PAGE_SIZE.load(Ordering::Acquire)
}

/// Sets the process-wide page size.
///
/// Only files opened afterwards pick up the new size; open files keep the
/// size captured in their [`StorageConfig`].
///
/// # Panics
///
/// Panics if `size` is 0.
pub fn set_page_size(size: usize) {
    assert!(size > 0, "page size must be > 0");
    PAGE_SIZE.store(size, Ordering::Release);
}

/// Restores the process-wide page size to [`DEFAULT_PAGE_SIZE`].
pub fn reset_page_size() {
    PAGE_SIZE.store(DEFAULT_PAGE_SIZE, Ordering::Release);
}

/// Configuration captured when a table file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageConfig {
    /// Size of every page in the file, in bytes.
    pub page_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            page_size: page_size(),
        }
    }
}

impl StorageConfig {
    /// Creates a configuration with an explicit page size.
    pub const fn with_page_size(page_size: usize) -> Self {
        Self { page_size }
    }
}

/// Stable identifier of a table.
///
/// Derived from the canonical path of the table's backing file, so a table
/// keeps its id across process restarts as long as the file does not move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u32);

impl TableId {
    /// Computes the id of the table stored at `path` (expected canonical).
    pub fn from_path(path: &Path) -> Self {
        Self(crc32fast::hash(path.to_string_lossy().as_bytes()))
    }

    /// Returns the raw identifier.
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a page: the owning table plus the page's position in the file.
///
/// The identity of a page never changes; only its contents do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId {
    /// Table the page belongs to.
    pub table_id: TableId,
    /// Zero-based page number within the table's file.
    pub page_num: usize,
}

impl PageId {
    /// Creates a new page identifier.
    pub const fn new(table_id: TableId, page_num: usize) -> Self {
        Self { table_id, page_num }
    }

    /// Calculates the byte offset of this page in its table file.
    pub const fn byte_offset(&self, page_size: usize) -> u64 {
        self.page_num as u64 * page_size as u64
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table_id, self.page_num)
    }
}
