//! Sequential scan over a heap file.
//!
//! [`HeapScan`] walks pages in page-number order, fetching each through the
//! page cache with read permission, and yields the live records of a page in
//! slot order before moving on. Empty pages are skipped.

use std::sync::Arc;

use tracing::trace;

use crate::buffer::PageCache;
use crate::executor::{Cursor, ExecutorError, OpIterator};
use crate::storage::PageId;
use crate::tuple::{Record, Schema};
use crate::tx::{Permission, TransactionId};

use super::file::HeapFile;

/// Restartable full-table scan.
///
/// Records of one page are buffered at a time, so memory use is bounded by
/// the slot count of a page. The page count is captured by `open`, so pages
/// appended during the scan (for example by an insert reading its own table)
/// are not visited until the next `open` or `rewind`.
pub struct HeapScan {
    file: Arc<HeapFile>,
    tid: TransactionId,
    cache: Arc<dyn PageCache>,
    /// Next page to load.
    next_page: usize,
    /// Number of pages when the scan was opened.
    page_count: usize,
    /// Remaining records of the current page.
    buffered: std::vec::IntoIter<Record>,
    cursor: Cursor,
}

impl HeapScan {
    pub(super) fn new(file: Arc<HeapFile>, tid: TransactionId, cache: Arc<dyn PageCache>) -> Self {
        Self {
            file,
            tid,
            cache,
            next_page: 0,
            page_count: 0,
            buffered: Vec::new().into_iter(),
            cursor: Cursor::new(),
        }
    }

    /// Returns the transaction the scan reads on behalf of.
    pub fn transaction(&self) -> TransactionId {
        self.tid
    }

    /// Loads the next page into the buffer.
    ///
    /// Returns false once every page has been loaded.
    fn load_next_page(&mut self) -> Result<bool, ExecutorError> {
        if self.next_page >= self.page_count {
            return Ok(false);
        }
        let page_id = PageId::new(self.file.id(), self.next_page);
        let page = self.cache.get_page(self.tid, page_id, Permission::Read)?;
        let records = page.read().records()?;
        trace!(%page_id, records = records.len(), "scan loaded page");

        self.buffered = records.into_iter();
        self.next_page += 1;
        Ok(true)
    }
}

impl OpIterator for HeapScan {
    fn open(&mut self) -> Result<(), ExecutorError> {
        self.cursor.close();
        self.next_page = 0;
        self.page_count = self.file.num_pages()?;
        self.buffered = Vec::new().into_iter();
        self.load_next_page()?;
        self.cursor.open();
        Ok(())
    }

    fn close(&mut self) {
        self.cursor.close();
        self.buffered = Vec::new().into_iter();
    }

    fn schema(&self) -> &Arc<Schema> {
        self.file.schema()
    }

    fn fetch_next(&mut self) -> Result<Option<Record>, ExecutorError> {
        loop {
            if let Some(record) = self.buffered.next() {
                return Ok(Some(record));
            }
            if !self.load_next_page()? {
                return Ok(None);
            }
        }
    }

    fn cursor(&mut self) -> &mut Cursor {
        &mut self.cursor
    }
}
