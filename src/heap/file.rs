//! Heap file: a table stored as a flat sequence of heap pages.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::buffer::{PageCache, SharedPage};
use crate::storage::{FileStorage, PageId, StorageConfig, StorageError, TableId};
use crate::tuple::{Record, Schema};
use crate::tx::{Permission, TransactionId};

use super::error::HeapError;
use super::page::{HeapPage, SlotLayout};
use super::scan::HeapScan;

/// A table backed by a single file of fixed-size heap pages.
///
/// Pages are only ever appended, never removed. Reads and writes go through
/// [`read_page`](Self::read_page) and [`write_page`](Self::write_page);
/// record-level mutations go through a [`PageCache`] so that the cache keeps
/// the authoritative copy of every page it has handed out.
///
/// # Page Allocation
///
/// ```text
/// insert_record:
///   for page in 0..num_pages:
///       fetch page (ReadWrite) -> free slot? insert, done
///   append empty page to file
///   fetch new page (ReadWrite) -> free slot? insert, done
///   otherwise search again
/// ```
///
/// Finding a free slot is a linear search from page 0. Concurrent growth is
/// not coordinated here; two inserters that both find every page full will
/// each append a page.
#[derive(Debug)]
pub struct HeapFile {
    storage: FileStorage,
    schema: Arc<Schema>,
    layout: SlotLayout,
}

impl HeapFile {
    /// Opens or creates the heap file at `path` with the process-wide page size.
    ///
    /// # Errors
    ///
    /// See [`open_with_config`](Self::open_with_config).
    pub fn open(path: impl AsRef<Path>, schema: Arc<Schema>) -> Result<Self, HeapError> {
        Self::open_with_config(path, schema, StorageConfig::default())
    }

    /// Opens or creates the heap file at `path` with an explicit configuration.
    ///
    /// # Errors
    ///
    /// - `HeapError::RecordTooLarge` if no record of `schema` fits in a page
    /// - `HeapError::Storage` if the file cannot be opened
    pub fn open_with_config(
        path: impl AsRef<Path>,
        schema: Arc<Schema>,
        config: StorageConfig,
    ) -> Result<Self, HeapError> {
        let layout = SlotLayout::new(&schema, config.page_size);
        if layout.slot_count == 0 {
            return Err(HeapError::RecordTooLarge {
                width: layout.slot_width,
                page_size: config.page_size,
            });
        }
        let storage = FileStorage::open(path, config)?;
        Ok(Self {
            storage,
            schema,
            layout,
        })
    }

    /// Returns the table id.
    pub fn id(&self) -> TableId {
        self.storage.table_id()
    }

    /// Returns the schema of records in this table.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the canonical path of the backing file.
    pub fn path(&self) -> &Path {
        self.storage.path()
    }

    /// Returns the page size of this file.
    pub fn page_size(&self) -> usize {
        self.storage.page_size()
    }

    /// Returns the number of record slots per page.
    pub fn slots_per_page(&self) -> usize {
        self.layout.slot_count
    }

    /// Returns the number of pages in the file.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Corrupted` (wrapped) if the file length is not a
    /// multiple of the page size.
    pub fn num_pages(&self) -> Result<usize, HeapError> {
        Ok(self.storage.page_count()?)
    }

    /// Reads a page directly from the file, bypassing any cache.
    ///
    /// # Errors
    ///
    /// Returns a wrapped `StorageError::TableMismatch`, `PageOutOfRange` or
    /// `Truncated` for a page this file cannot supply.
    pub fn read_page(&self, page_id: PageId) -> Result<HeapPage, HeapError> {
        let mut buf = HeapPage::empty_page_data(self.page_size());
        self.storage.read_page(page_id, &mut buf)?;
        HeapPage::new(page_id, self.schema.clone(), buf)
    }

    /// Writes a page back to its position in the file.
    ///
    /// # Errors
    ///
    /// Returns a wrapped `StorageError::TableMismatch` if the page belongs to
    /// another table.
    pub fn write_page(&self, page: &HeapPage) -> Result<(), HeapError> {
        self.storage.write_page(page.id(), page.as_bytes())?;
        Ok(())
    }

    /// Syncs the backing file to disk.
    pub fn sync(&self) -> Result<(), HeapError> {
        Ok(self.storage.sync_all()?)
    }

    /// Inserts a record into the first page with a free slot, appending a new
    /// page if every existing page is full.
    ///
    /// The record is stamped with its locator. Returns the page that was
    /// modified; the caller is responsible for marking it dirty.
    ///
    /// # Errors
    ///
    /// - `HeapError::SchemaMismatch` if the record's schema differs from the table's
    /// - any error from the page cache or the file
    pub fn insert_record(
        &self,
        tid: TransactionId,
        record: &mut Record,
        cache: &dyn PageCache,
    ) -> Result<Vec<SharedPage>, HeapError> {
        if **record.schema() != *self.schema {
            return Err(HeapError::SchemaMismatch {
                expected: self.schema.to_string(),
                found: record.schema().to_string(),
            });
        }

        loop {
            for page_num in 0..self.num_pages()? {
                let page_id = PageId::new(self.id(), page_num);
                let page = cache.get_page(tid, page_id, Permission::ReadWrite)?;
                if Self::try_insert(&page, record)? {
                    return Ok(vec![page]);
                }
            }

            let page_id = self
                .storage
                .append_page(&HeapPage::empty_page_data(self.page_size()))?;
            debug!(%page_id, path = %self.path().display(), "heap file grew");

            // Another writer may fill the new page before it is refetched.
            let page = cache.get_page(tid, page_id, Permission::ReadWrite)?;
            if Self::try_insert(&page, record)? {
                return Ok(vec![page]);
            }
        }
    }

    fn try_insert(page: &SharedPage, record: &mut Record) -> Result<bool, HeapError> {
        let mut guard = page.write();
        if guard.empty_slot_count() == 0 {
            return Ok(false);
        }
        guard.insert(record)?;
        Ok(true)
    }

    /// Deletes a stored record.
    ///
    /// Returns the page that was modified; the caller is responsible for
    /// marking it dirty.
    ///
    /// # Errors
    ///
    /// - `HeapError::MissingRecordId` if the record has no locator
    /// - `StorageError::TableMismatch` (wrapped) if the locator names another table
    /// - `HeapError::InvalidLocator` if the slot is already empty
    pub fn delete_record(
        &self,
        tid: TransactionId,
        record: &Record,
        cache: &dyn PageCache,
    ) -> Result<Vec<SharedPage>, HeapError> {
        let rid = record.record_id().ok_or(HeapError::MissingRecordId)?;
        if rid.page_id.table_id != self.id() {
            return Err(StorageError::TableMismatch {
                expected: self.id(),
                page_id: rid.page_id,
            }
            .into());
        }

        let page = cache.get_page(tid, rid.page_id, Permission::ReadWrite)?;
        page.write().delete(rid)?;
        Ok(vec![page])
    }

    /// Returns a restartable scan over every record, in page then slot order.
    ///
    /// Pages are fetched through `cache` with [`Permission::Read`].
    pub fn scan(self: &Arc<Self>, tid: TransactionId, cache: Arc<dyn PageCache>) -> HeapScan {
        HeapScan::new(Arc::clone(self), tid, cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{BufferPool, BufferPoolConfig, PageCache};
    use crate::datum::{Type, Value};
    use crate::tuple::RecordId;
    use tempfile::tempdir;

    const PAGE: usize = 64;

    fn schema() -> Arc<Schema> {
        Arc::new(Schema::named([(Type::Int, "a"), (Type::Int, "b")]).unwrap())
    }

    fn record(schema: &Arc<Schema>, a: i32) -> Record {
        Record::from_values(schema.clone(), vec![Value::Int(a), Value::Int(a * 10)]).unwrap()
    }

    fn setup() -> (tempfile::TempDir, Arc<HeapFile>, Arc<BufferPool>) {
        let dir = tempdir().unwrap();
        let file = Arc::new(
            HeapFile::open_with_config(
                dir.path().join("t.dat"),
                schema(),
                StorageConfig::with_page_size(PAGE),
            )
            .unwrap(),
        );
        let pool = Arc::new(BufferPool::new(BufferPoolConfig::default()));
        pool.register_table(file.clone());
        (dir, file, pool)
    }

    #[test]
    fn test_new_file_is_empty() {
        let (_dir, file, _pool) = setup();
        assert_eq!(file.num_pages().unwrap(), 0);
        assert_eq!(file.slots_per_page(), 7);
        assert_eq!(file.page_size(), PAGE);
    }

    #[test]
    fn test_record_too_large() {
        let dir = tempdir().unwrap();
        let wide = Arc::new(Schema::anonymous(vec![Type::Text]).unwrap());
        let result = HeapFile::open_with_config(
            dir.path().join("t.dat"),
            wide,
            StorageConfig::with_page_size(PAGE),
        );
        assert!(matches!(result, Err(HeapError::RecordTooLarge { .. })));
    }

    #[test]
    fn test_insert_grows_only_when_full() {
        let (_dir, file, pool) = setup();
        let schema = schema();
        let tid = TransactionId::allocate();

        for i in 0..7 {
            file.insert_record(tid, &mut record(&schema, i), pool.as_ref())
                .unwrap();
        }
        assert_eq!(file.num_pages().unwrap(), 1);

        let mut eighth = record(&schema, 7);
        let pages = file.insert_record(tid, &mut eighth, pool.as_ref()).unwrap();
        assert_eq!(file.num_pages().unwrap(), 2);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].read().id().page_num, 1);
        assert_eq!(
            eighth.record_id(),
            Some(RecordId::new(PageId::new(file.id(), 1), 0))
        );
    }

    #[test]
    fn test_insert_reuses_freed_slot() {
        let (_dir, file, pool) = setup();
        let schema = schema();
        let tid = TransactionId::allocate();

        let mut records: Vec<_> = (0..8).map(|i| record(&schema, i)).collect();
        for r in &mut records {
            file.insert_record(tid, r, pool.as_ref()).unwrap();
        }
        file.delete_record(tid, &records[3], pool.as_ref()).unwrap();

        let mut again = record(&schema, 100);
        file.insert_record(tid, &mut again, pool.as_ref()).unwrap();
        assert_eq!(again.record_id(), records[3].record_id());
        assert_eq!(file.num_pages().unwrap(), 2);
    }

    #[test]
    fn test_insert_schema_mismatch() {
        let (_dir, file, pool) = setup();
        let other = Arc::new(Schema::anonymous(vec![Type::Int]).unwrap());
        let mut rec = Record::new(other);
        let result = file.insert_record(TransactionId::allocate(), &mut rec, pool.as_ref());
        assert!(matches!(result, Err(HeapError::SchemaMismatch { .. })));
        assert_eq!(file.num_pages().unwrap(), 0);
    }

    #[test]
    fn test_delete_requires_locator() {
        let (_dir, file, pool) = setup();
        let result = file.delete_record(
            TransactionId::allocate(),
            &record(&schema(), 1),
            pool.as_ref(),
        );
        assert!(matches!(result, Err(HeapError::MissingRecordId)));
    }

    #[test]
    fn test_delete_stale_locator() {
        let (_dir, file, pool) = setup();
        let tid = TransactionId::allocate();
        let mut rec = record(&schema(), 1);
        file.insert_record(tid, &mut rec, pool.as_ref()).unwrap();
        file.delete_record(tid, &rec, pool.as_ref()).unwrap();

        assert!(matches!(
            file.delete_record(tid, &rec, pool.as_ref()),
            Err(HeapError::InvalidLocator { .. })
        ));
    }

    #[test]
    fn test_delete_foreign_table() {
        let (_dir, file, pool) = setup();
        let mut rec = record(&schema(), 1);
        let foreign = TableId(file.id().as_u32().wrapping_add(1));
        rec.set_record_id(Some(RecordId::new(PageId::new(foreign, 0), 0)));

        assert!(matches!(
            file.delete_record(TransactionId::allocate(), &rec, pool.as_ref()),
            Err(HeapError::Storage(StorageError::TableMismatch { .. }))
        ));
    }

    #[test]
    fn test_read_page_errors() {
        let (_dir, file, _pool) = setup();
        assert!(matches!(
            file.read_page(PageId::new(file.id(), 0)),
            Err(HeapError::Storage(StorageError::PageOutOfRange { .. }))
        ));
        let foreign = TableId(file.id().as_u32().wrapping_add(1));
        assert!(matches!(
            file.read_page(PageId::new(foreign, 0)),
            Err(HeapError::Storage(StorageError::TableMismatch { .. }))
        ));
    }

    #[test]
    fn test_write_then_read_page() {
        let (_dir, file, pool) = setup();
        let schema = schema();
        let tid = TransactionId::allocate();
        file.insert_record(tid, &mut record(&schema, 1), pool.as_ref())
            .unwrap();

        // The insert went to the cached copy; the file still holds an empty page.
        let page_id = PageId::new(file.id(), 0);
        assert_eq!(file.read_page(page_id).unwrap().empty_slot_count(), 7);

        let cached = pool.get_page(tid, page_id, Permission::Read).unwrap();
        file.write_page(&cached.read()).unwrap();
        let on_disk = file.read_page(page_id).unwrap();
        assert_eq!(on_disk.to_bytes(), cached.read().to_bytes());
    }
}
