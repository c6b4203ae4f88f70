//! The pull-based iterator protocol shared by all operators.
//!
//! Each operator produces records one at a time. Operators are composed into
//! a tree (e.g., Insert -> HeapScan) where each parent pulls records from its
//! child.
//!
//! # Lifecycle
//!
//! ```text
//!            open()                 close()
//! Closed ------------> Open ------------------> Closed
//!                       |  ^
//!                       |  | rewind() = close() + open()
//!                       +--+
//! ```
//!
//! Operators only implement [`OpIterator::fetch_next`]; one record of
//! lookahead for [`has_next`](OpIterator::has_next) and
//! [`next`](OpIterator::next) is provided on top of it using the operator's
//! [`Cursor`].

use std::sync::Arc;

use crate::tuple::{Record, Schema};

use super::error::ExecutorError;

/// Open/closed state and lookahead slot of an operator.
#[derive(Debug, Default)]
pub struct Cursor {
    open: bool,
    peeked: Option<Record>,
}

impl Cursor {
    /// Creates a closed cursor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the cursor open and drops any lookahead.
    pub fn open(&mut self) {
        self.open = true;
        self.peeked = None;
    }

    /// Marks the cursor closed and drops any lookahead.
    pub fn close(&mut self) {
        self.open = false;
        self.peeked = None;
    }

    /// Returns true between `open` and `close`.
    pub fn is_open(&self) -> bool {
        self.open
    }
}

/// A pull-based record iterator.
///
/// Implementors must call [`Cursor::open`] from `open` and [`Cursor::close`]
/// from `close`. `fetch_next` is only invoked while the cursor is open and
/// returns `Ok(None)` at end of stream.
pub trait OpIterator {
    /// Prepares the iterator for reading. May do eager work.
    fn open(&mut self) -> Result<(), ExecutorError>;

    /// Releases iteration state. Never touches storage.
    fn close(&mut self);

    /// Returns the schema of produced records.
    fn schema(&self) -> &Arc<Schema>;

    /// Produces the next record, or `None` at end of stream.
    fn fetch_next(&mut self) -> Result<Option<Record>, ExecutorError>;

    /// Returns the operator's cursor.
    fn cursor(&mut self) -> &mut Cursor;

    /// Restarts iteration from the beginning.
    fn rewind(&mut self) -> Result<(), ExecutorError> {
        self.close();
        self.open()
    }

    /// Returns true if another record is available.
    ///
    /// # Errors
    ///
    /// Returns `ExecutorError::NotOpen` if the iterator is closed.
    fn has_next(&mut self) -> Result<bool, ExecutorError> {
        if !self.cursor().is_open() {
            return Err(ExecutorError::NotOpen);
        }
        if self.cursor().peeked.is_none() {
            let next = self.fetch_next()?;
            self.cursor().peeked = next;
        }
        Ok(self.cursor().peeked.is_some())
    }

    /// Returns the next record.
    ///
    /// # Errors
    ///
    /// - `ExecutorError::NotOpen` if the iterator is closed
    /// - `ExecutorError::NoSuchElement` if the iterator is exhausted
    fn next(&mut self) -> Result<Record, ExecutorError> {
        if !self.has_next()? {
            return Err(ExecutorError::NoSuchElement);
        }
        self.cursor()
            .peeked
            .take()
            .ok_or(ExecutorError::NoSuchElement)
    }
}

/// Drains an open iterator into a vector.
pub fn collect_records(iter: &mut dyn OpIterator) -> Result<Vec<Record>, ExecutorError> {
    let mut records = Vec::new();
    while iter.has_next()? {
        records.push(iter.next()?);
    }
    Ok(records)
}

/// Scan over a fixed list of in-memory records.
///
/// Used to feed operators from memory and to expose aggregate results.
#[derive(Debug)]
pub struct ValuesScan {
    schema: Arc<Schema>,
    records: Vec<Record>,
    position: usize,
    cursor: Cursor,
}

impl ValuesScan {
    /// Creates a scan that yields `records` in order.
    pub fn new(schema: Arc<Schema>, records: Vec<Record>) -> Self {
        Self {
            schema,
            records,
            position: 0,
            cursor: Cursor::new(),
        }
    }

    /// Returns the number of records the scan yields per pass.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the scan yields nothing.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl OpIterator for ValuesScan {
    fn open(&mut self) -> Result<(), ExecutorError> {
        self.cursor.open();
        self.position = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.cursor.close();
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn fetch_next(&mut self) -> Result<Option<Record>, ExecutorError> {
        let record = self.records.get(self.position).cloned();
        if record.is_some() {
            self.position += 1;
        }
        Ok(record)
    }

    fn cursor(&mut self) -> &mut Cursor {
        &mut self.cursor
    }
}
