//! Data modification operators (INSERT, DELETE).
//!
//! Both operators pull every record from their child, route it through the
//! page cache, and produce a single record holding the number of affected
//! records:
//!
//! ```text
//! Insert -> cache.insert_tuple(tid, table, record)   => ["Inserted Tuples": n]
//! Delete -> cache.delete_tuple(tid, record)          => ["Deleted Tuples": n]
//! ```
//!
//! A pass runs once per `open`/`rewind`; opening an already open operator
//! does nothing. An error aborts the pass and leaves the records already
//! processed modified.

use std::sync::Arc;

use tracing::debug;

use crate::buffer::PageCache;
use crate::datum::{Type, Value};
use crate::storage::TableId;
use crate::tuple::{Record, Schema};
use crate::tx::TransactionId;

use super::error::ExecutorError;
use super::node::{Cursor, OpIterator};

/// Whether the count record of the current pass is still to be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Pending,
    Exhausted,
}

/// Opens `child`, applies `apply` to every record, closes `child` and
/// returns the count record.
fn run_pass(
    child: &mut dyn OpIterator,
    schema: &Arc<Schema>,
    mut apply: impl FnMut(&mut Record) -> Result<(), ExecutorError>,
) -> Result<Record, ExecutorError> {
    let mut count: i64 = 0;
    let mut drain = || -> Result<(), ExecutorError> {
        child.open()?;
        while child.has_next()? {
            let mut record = child.next()?;
            apply(&mut record)?;
            count += 1;
        }
        Ok(())
    };
    let drained = drain();
    child.close();
    drained?;

    let count = i32::try_from(count).map_err(|_| ExecutorError::IntegerOverflow)?;
    Ok(Record::from_values(schema.clone(), vec![Value::Int(count)])?)
}

/// Inserts every record of its child into a table.
pub struct Insert {
    tid: TransactionId,
    child: Box<dyn OpIterator>,
    table_id: TableId,
    cache: Arc<dyn PageCache>,
    schema: Arc<Schema>,
    pass: Pass,
    cursor: Cursor,
}

impl Insert {
    /// Creates an insert of `child`'s records into `table_id` on behalf of `tid`.
    pub fn new(
        tid: TransactionId,
        child: Box<dyn OpIterator>,
        table_id: TableId,
        cache: Arc<dyn PageCache>,
    ) -> Self {
        Self {
            tid,
            child,
            table_id,
            cache,
            schema: Arc::new(Schema::single(Type::Int, "Inserted Tuples")),
            pass: Pass::Pending,
            cursor: Cursor::new(),
        }
    }

    /// Returns the target table.
    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    /// Returns the operator producing the records to insert.
    pub fn child(&self) -> &dyn OpIterator {
        self.child.as_ref()
    }
}

impl OpIterator for Insert {
    fn open(&mut self) -> Result<(), ExecutorError> {
        if self.cursor.is_open() {
            return Ok(());
        }
        self.cursor.open();
        self.pass = Pass::Pending;
        Ok(())
    }

    fn close(&mut self) {
        self.cursor.close();
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn fetch_next(&mut self) -> Result<Option<Record>, ExecutorError> {
        if self.pass == Pass::Exhausted {
            return Ok(None);
        }
        self.pass = Pass::Exhausted;

        let (tid, table_id, cache) = (self.tid, self.table_id, &self.cache);
        let result = run_pass(self.child.as_mut(), &self.schema, |record| {
            cache
                .insert_tuple(tid, table_id, record)
                .map_err(ExecutorError::from)
        })?;
        debug!(%tid, %table_id, inserted = %result, "insert pass complete");
        Ok(Some(result))
    }

    fn cursor(&mut self) -> &mut Cursor {
        &mut self.cursor
    }
}

/// Deletes every record of its child from the table it was read from.
///
/// Child records must carry locators, as records from a heap scan do.
pub struct Delete {
    tid: TransactionId,
    child: Box<dyn OpIterator>,
    cache: Arc<dyn PageCache>,
    schema: Arc<Schema>,
    pass: Pass,
    cursor: Cursor,
}

impl Delete {
    /// Creates a delete of `child`'s records on behalf of `tid`.
    pub fn new(tid: TransactionId, child: Box<dyn OpIterator>, cache: Arc<dyn PageCache>) -> Self {
        Self {
            tid,
            child,
            cache,
            schema: Arc::new(Schema::single(Type::Int, "Deleted Tuples")),
            pass: Pass::Pending,
            cursor: Cursor::new(),
        }
    }

    /// Returns the operator producing the records to delete.
    pub fn child(&self) -> &dyn OpIterator {
        self.child.as_ref()
    }
}

impl OpIterator for Delete {
    fn open(&mut self) -> Result<(), ExecutorError> {
        if self.cursor.is_open() {
            return Ok(());
        }
        self.cursor.open();
        self.pass = Pass::Pending;
        Ok(())
    }

    fn close(&mut self) {
        self.cursor.close();
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn fetch_next(&mut self) -> Result<Option<Record>, ExecutorError> {
        if self.pass == Pass::Exhausted {
            return Ok(None);
        }
        self.pass = Pass::Exhausted;

        let (tid, cache) = (self.tid, &self.cache);
        let result = run_pass(self.child.as_mut(), &self.schema, |record| {
            cache.delete_tuple(tid, record).map_err(ExecutorError::from)
        })?;
        debug!(%tid, deleted = %result, "delete pass complete");
        Ok(Some(result))
    }

    fn cursor(&mut self) -> &mut Cursor {
        &mut self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{BufferPool, BufferPoolConfig};
    use crate::executor::{collect_records, ValuesScan};
    use crate::heap::{HeapError, HeapFile};
    use crate::storage::StorageConfig;
    use tempfile::{tempdir, TempDir};

    fn setup() -> (TempDir, Arc<HeapFile>, Arc<BufferPool>) {
        let dir = tempdir().unwrap();
        let schema = Arc::new(Schema::named([(Type::Int, "id")]).unwrap());
        let file = Arc::new(
            HeapFile::open_with_config(
                dir.path().join("dml.dat"),
                schema,
                StorageConfig::with_page_size(64),
            )
            .unwrap(),
        );
        let pool = Arc::new(BufferPool::new(BufferPoolConfig::default()));
        pool.register_table(file.clone());
        (dir, file, pool)
    }

    fn values(file: &HeapFile, ids: &[i32]) -> Box<dyn OpIterator> {
        let records = ids
            .iter()
            .map(|&id| Record::from_values(file.schema().clone(), vec![Value::Int(id)]).unwrap())
            .collect();
        Box::new(ValuesScan::new(file.schema().clone(), records))
    }

    fn count(file: &Arc<HeapFile>, pool: &Arc<BufferPool>) -> usize {
        let mut scan = file.scan(TransactionId::allocate(), pool.clone());
        scan.open().unwrap();
        collect_records(&mut scan).unwrap().len()
    }

    #[test]
    fn test_insert_returns_count_once() {
        let (_dir, file, pool) = setup();
        let mut insert = Insert::new(
            TransactionId::allocate(),
            values(&file, &[1, 2, 3]),
            file.id(),
            pool.clone(),
        );
        assert_eq!(insert.schema().field_name(0).unwrap(), Some("Inserted Tuples"));

        insert.open().unwrap();
        assert_eq!(insert.next().unwrap().values(), &[Value::Int(3)]);
        assert!(!insert.has_next().unwrap());
        assert_eq!(count(&file, &pool), 3);
    }

    #[test]
    fn test_insert_rewind_runs_again() {
        let (_dir, file, pool) = setup();
        let mut insert = Insert::new(
            TransactionId::allocate(),
            values(&file, &[1, 2]),
            file.id(),
            pool.clone(),
        );
        insert.open().unwrap();
        insert.next().unwrap();
        insert.rewind().unwrap();
        assert_eq!(insert.next().unwrap().values(), &[Value::Int(2)]);
        assert_eq!(count(&file, &pool), 4);
    }

    #[test]
    fn test_insert_second_open_is_noop() {
        let (_dir, file, pool) = setup();
        let mut insert = Insert::new(
            TransactionId::allocate(),
            values(&file, &[1]),
            file.id(),
            pool.clone(),
        );
        assert_eq!(insert.child().schema(), file.schema());
        insert.open().unwrap();
        assert_eq!(insert.next().unwrap().values(), &[Value::Int(1)]);
        insert.open().unwrap();
        assert!(!insert.has_next().unwrap());
        assert_eq!(count(&file, &pool), 1);
    }

    #[test]
    fn test_insert_from_scan_of_own_table() {
        let (_dir, file, pool) = setup();
        let tid = TransactionId::allocate();
        // w = 4, P = 64: 15 slots, so 15 rows fill page 0 exactly.
        let ids: Vec<i32> = (0..15).collect();
        let mut fill = Insert::new(tid, values(&file, &ids), file.id(), pool.clone());
        fill.open().unwrap();
        fill.next().unwrap();
        assert_eq!(file.num_pages().unwrap(), 1);

        let scan = file.scan(tid, pool.clone());
        let mut insert = Insert::new(tid, Box::new(scan), file.id(), pool.clone());
        insert.open().unwrap();
        assert_eq!(insert.next().unwrap().values(), &[Value::Int(15)]);
        assert_eq!(file.num_pages().unwrap(), 2);
        assert_eq!(count(&file, &pool), 30);
    }

    #[test]
    fn test_delete_second_open_is_noop() {
        let (_dir, file, pool) = setup();
        let tid = TransactionId::allocate();
        let mut fill = Insert::new(tid, values(&file, &[1, 2]), file.id(), pool.clone());
        fill.open().unwrap();
        fill.next().unwrap();

        let mut delete = Delete::new(tid, Box::new(file.scan(tid, pool.clone())), pool.clone());
        assert_eq!(delete.child().schema(), file.schema());
        delete.open().unwrap();
        assert_eq!(delete.next().unwrap().values(), &[Value::Int(2)]);
        delete.open().unwrap();
        assert!(!delete.has_next().unwrap());
        assert_eq!(count(&file, &pool), 0);
    }

    #[test]
    fn test_insert_error_aborts_pass() {
        let (_dir, file, pool) = setup();
        let unknown = TableId(file.id().as_u32().wrapping_add(1));
        let mut insert = Insert::new(
            TransactionId::allocate(),
            values(&file, &[1]),
            unknown,
            pool.clone(),
        );
        insert.open().unwrap();
        assert!(matches!(
            insert.next(),
            Err(ExecutorError::Heap(HeapError::UnknownTable(_)))
        ));
        assert!(!insert.has_next().unwrap());
    }

    #[test]
    fn test_delete_scanned_records() {
        let (_dir, file, pool) = setup();
        let tid = TransactionId::allocate();
        let mut insert = Insert::new(
            tid,
            values(&file, &[1, 2, 3, 4, 5, 6, 7, 8]),
            file.id(),
            pool.clone(),
        );
        insert.open().unwrap();
        insert.next().unwrap();

        let scan = file.scan(tid, pool.clone());
        let mut delete = Delete::new(tid, Box::new(scan), pool.clone());
        assert_eq!(delete.schema().field_name(0).unwrap(), Some("Deleted Tuples"));
        delete.open().unwrap();
        assert_eq!(delete.next().unwrap().values(), &[Value::Int(8)]);
        assert!(!delete.has_next().unwrap());
        assert_eq!(count(&file, &pool), 0);
    }

    #[test]
    fn test_delete_without_locator() {
        let (_dir, file, pool) = setup();
        let mut delete = Delete::new(TransactionId::allocate(), values(&file, &[1]), pool);
        delete.open().unwrap();
        assert!(matches!(
            delete.next(),
            Err(ExecutorError::Heap(HeapError::MissingRecordId))
        ));
    }
}
