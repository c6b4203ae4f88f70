//! Page cache interface and a reference buffer pool.
//!
//! The heap file and the operators never keep pages of their own: every page
//! they touch is obtained from a [`PageCache`], which owns the authoritative
//! in-memory instance and decides when it reaches disk.
//!
//! # Components
//!
//! - [`PageCache`]: the interface consumed by heap files and operators
//! - [`SharedPage`]: a cached page shared between the cache and its callers
//! - [`BufferPool`]: a simple cache implementing [`PageCache`]
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use heapstore::buffer::{BufferPool, BufferPoolConfig, PageCache};
//! use heapstore::datum::{Type, Value};
//! use heapstore::heap::HeapFile;
//! use heapstore::tuple::{Record, Schema};
//! use heapstore::tx::TransactionId;
//!
//! # fn example() -> Result<(), heapstore::heap::HeapError> {
//! let schema = Arc::new(Schema::named([(Type::Int, "id")])?);
//! let file = Arc::new(HeapFile::open("people.dat", schema.clone())?);
//! let pool = BufferPool::new(BufferPoolConfig::default());
//! pool.register_table(file.clone());
//!
//! let tid = TransactionId::allocate();
//! let mut record = Record::from_values(schema, vec![Value::Int(1)])?;
//! pool.insert_tuple(tid, file.id(), &mut record)?;
//! pool.flush_all_pages()?;
//! # Ok(())
//! # }
//! ```

mod pool;

use std::sync::Arc;

use parking_lot::RwLock;

use crate::heap::{HeapError, HeapPage};
use crate::storage::{PageId, TableId};
use crate::tuple::Record;
use crate::tx::{Permission, TransactionId};

pub use pool::{BufferPool, BufferPoolConfig};

/// A cached page. The cache and every caller share the same instance.
pub type SharedPage = Arc<RwLock<HeapPage>>;

/// Source of pages for heap files and operators.
///
/// Implementations may add locking, eviction and logging; callers only rely
/// on getting the single authoritative instance of a page.
pub trait PageCache: Send + Sync {
    /// Returns the page `page_id`, loading it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is unknown, the page cannot be read, or
    /// the cache has no room for it.
    fn get_page(
        &self,
        tid: TransactionId,
        page_id: PageId,
        perm: Permission,
    ) -> Result<SharedPage, HeapError>;

    /// Inserts `record` into table `table_id` on behalf of `tid`.
    ///
    /// The record is stamped with its locator and the modified page is
    /// marked dirty.
    fn insert_tuple(
        &self,
        tid: TransactionId,
        table_id: TableId,
        record: &mut Record,
    ) -> Result<(), HeapError>;

    /// Deletes the stored `record` on behalf of `tid`.
    ///
    /// The modified page is marked dirty.
    fn delete_tuple(&self, tid: TransactionId, record: &Record) -> Result<(), HeapError>;
}
