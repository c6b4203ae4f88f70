//! Storage layer for page-granular file I/O.
//!
//! All persistent data lives in fixed-size pages. A table's backing file is
//! nothing but a sequence of pages; there is no file header.
//!
//! # Architecture
//!
//! ```text
//! +-------------------+
//! | HeapFile          |  <- heap
//! +-------------------+
//!          |
//!          v
//! +-------------------+
//! | FileStorage       |  <- raw page reads / writes / appends
//! +-------------------+
//! ```
//!
//! The page size is a process-wide setting (see [`page_size`]). Components
//! capture it once through [`StorageConfig`] so that a file never sees two
//! page sizes during its lifetime.

pub mod error;
pub mod file;
pub mod page;

pub use error::StorageError;
pub use file::FileStorage;
pub use page::{
    page_size, reset_page_size, set_page_size, PageId, StorageConfig, TableId, DEFAULT_PAGE_SIZE,
};
