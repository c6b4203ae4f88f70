//! Heap storage for fixed-width records.
//!
//! A heap file stores a table's records in slotted pages, with no ordering
//! among them. The term "heap" refers to an unordered collection of records,
//! as opposed to indexed structures like B+trees.
//!
//! - [`HeapPage`]: page-level record storage with an occupancy bitmap
//! - [`HeapFile`]: a table as a sequence of heap pages in one file
//! - [`HeapScan`]: sequential scan over a heap file

mod error;
mod file;
mod page;
mod scan;

pub use error::HeapError;
pub use file::HeapFile;
pub use page::{HeapPage, SlotLayout};
pub use scan::HeapScan;
