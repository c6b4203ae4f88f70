//! Reference buffer pool.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::heap::{HeapError, HeapFile};
use crate::storage::{PageId, TableId};
use crate::tuple::Record;
use crate::tx::{Permission, TransactionId};

use super::{PageCache, SharedPage};

/// Configuration for the buffer pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPoolConfig {
    /// Maximum number of cached pages.
    ///
    /// Common values:
    /// - 64 pages (for testing)
    /// - 1024 pages = 4MB at the default page size
    pub pool_size: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self { pool_size: 1024 }
    }
}

/// Pages and tables known to the pool.
#[derive(Default)]
struct PoolState {
    pages: HashMap<PageId, SharedPage>,
    tables: HashMap<TableId, Arc<HeapFile>>,
}

/// An in-memory page cache over registered heap files.
///
/// # Architecture
///
/// ```text
/// +------------------+     +--------------------+
/// | get_page()       |---->| Page Map           |
/// | insert_tuple()   |     | (PageId -> page)   |
/// | delete_tuple()   |     +--------------------+
/// +------------------+              | miss
///          |                        v
///          |               +--------------------+
///          +-------------->| Table Registry     |
///                          | (TableId -> file)  |
///                          +--------------------+
/// ```
///
/// One instance of each page lives in the pool; callers receive shared
/// handles to it. Pages dirtied through `insert_tuple`/`delete_tuple` stay in
/// memory until flushed. When the pool is full, a clean page is evicted; if
/// every page is dirty the request fails with `HeapError::CacheFull`.
///
/// Permissions are accepted but not enforced: the pool implements no
/// transaction locking.
///
/// # Latch Hierarchy
///
/// The state mutex is never held while reading or writing a file or while
/// waiting on a page latch. Eviction only considers clean pages that no
/// caller holds a handle to.
pub struct BufferPool {
    state: Mutex<PoolState>,
    config: BufferPoolConfig,
}

impl BufferPool {
    /// Creates an empty pool.
    pub fn new(config: BufferPoolConfig) -> Self {
        Self {
            state: Mutex::new(PoolState::default()),
            config,
        }
    }

    /// Returns the pool configuration.
    pub fn config(&self) -> BufferPoolConfig {
        self.config
    }

    /// Makes a heap file's pages available through the pool.
    ///
    /// Registering a second file with the same table id replaces the first.
    pub fn register_table(&self, file: Arc<HeapFile>) {
        let mut state = self.state.lock();
        state.tables.insert(file.id(), file);
    }

    /// Returns the heap file registered for `table_id`.
    ///
    /// # Errors
    ///
    /// Returns `HeapError::UnknownTable` if no file is registered.
    pub fn table(&self, table_id: TableId) -> Result<Arc<HeapFile>, HeapError> {
        let state = self.state.lock();
        state
            .tables
            .get(&table_id)
            .cloned()
            .ok_or(HeapError::UnknownTable(table_id))
    }

    /// Returns the number of cached pages.
    pub fn cached_pages(&self) -> usize {
        self.state.lock().pages.len()
    }

    /// Returns true if `page_id` is cached.
    pub fn is_cached(&self, page_id: PageId) -> bool {
        self.state.lock().pages.contains_key(&page_id)
    }

    /// Writes a cached page back to its file if it is dirty.
    ///
    /// Uncached pages are ignored.
    pub fn flush_page(&self, page_id: PageId) -> Result<(), HeapError> {
        let page = match self.state.lock().pages.get(&page_id) {
            Some(page) => page.clone(),
            None => return Ok(()),
        };
        let file = self.table(page_id.table_id)?;

        let mut guard = page.write();
        if guard.is_dirty() {
            file.write_page(&guard)?;
            guard.mark_dirty(None);
            debug!(%page_id, "flushed page");
        }
        Ok(())
    }

    /// Writes every dirty cached page back to its file.
    pub fn flush_all_pages(&self) -> Result<(), HeapError> {
        let mut page_ids: Vec<PageId> = self.state.lock().pages.keys().copied().collect();
        page_ids.sort();
        for page_id in page_ids {
            self.flush_page(page_id)?;
        }
        Ok(())
    }

    /// Drops a page from the pool without writing it.
    pub fn discard_page(&self, page_id: PageId) {
        if self.state.lock().pages.remove(&page_id).is_some() {
            debug!(%page_id, "discarded page");
        }
    }

    /// Removes one clean page to make room, failing if every page is dirty.
    fn evict(state: &mut PoolState, capacity: usize) -> Result<(), HeapError> {
        let victim = state
            .pages
            .iter()
            .find(|(_, page)| {
                Arc::strong_count(page) == 1 && page.try_read().is_some_and(|p| !p.is_dirty())
            })
            .map(|(page_id, _)| *page_id);

        match victim {
            Some(page_id) => {
                state.pages.remove(&page_id);
                debug!(%page_id, "evicted page");
                Ok(())
            }
            None => Err(HeapError::CacheFull { capacity }),
        }
    }

    fn mark_dirty(pages: &[SharedPage], tid: TransactionId) {
        for page in pages {
            page.write().mark_dirty(Some(tid));
        }
    }
}

impl PageCache for BufferPool {
    fn get_page(
        &self,
        _tid: TransactionId,
        page_id: PageId,
        _perm: Permission,
    ) -> Result<SharedPage, HeapError> {
        let file = {
            let state = self.state.lock();
            if let Some(page) = state.pages.get(&page_id) {
                return Ok(page.clone());
            }
            state
                .tables
                .get(&page_id.table_id)
                .cloned()
                .ok_or(HeapError::UnknownTable(page_id.table_id))?
        };

        let loaded = file.read_page(page_id)?;

        let mut state = self.state.lock();
        // Another caller may have loaded the page while the lock was released.
        if let Some(page) = state.pages.get(&page_id) {
            return Ok(page.clone());
        }
        if state.pages.len() >= self.config.pool_size {
            Self::evict(&mut state, self.config.pool_size)?;
        }
        let page = Arc::new(RwLock::new(loaded));
        state.pages.insert(page_id, page.clone());
        Ok(page)
    }

    fn insert_tuple(
        &self,
        tid: TransactionId,
        table_id: TableId,
        record: &mut Record,
    ) -> Result<(), HeapError> {
        let file = self.table(table_id)?;
        let pages = file.insert_record(tid, record, self)?;
        Self::mark_dirty(&pages, tid);
        Ok(())
    }

    fn delete_tuple(&self, tid: TransactionId, record: &Record) -> Result<(), HeapError> {
        let rid = record.record_id().ok_or(HeapError::MissingRecordId)?;
        let file = self.table(rid.page_id.table_id)?;
        let pages = file.delete_record(tid, record, self)?;
        Self::mark_dirty(&pages, tid);
        Ok(())
    }
}
