//! Grouped aggregation operator.

use std::sync::Arc;

use tracing::debug;

use crate::tuple::{Record, Schema};

use super::aggregator::{new_aggregator, AggregateOp, Aggregator, Grouping};
use super::error::ExecutorError;
use super::node::{Cursor, OpIterator, ValuesScan};

/// Computes one aggregate over its child, optionally grouped by a field.
///
/// `open` drains the child completely into a fresh aggregator, then yields
/// one record per group. Opening an already open operator does nothing;
/// `rewind` closes and reopens it, draining the child again.
pub struct Aggregate {
    child: Box<dyn OpIterator>,
    agg_field: usize,
    grouping: Grouping,
    op: AggregateOp,
    schema: Arc<Schema>,
    results: Option<ValuesScan>,
    cursor: Cursor,
}

impl Aggregate {
    /// Creates an aggregate of `op` over field `agg_field` of `child`.
    ///
    /// # Errors
    ///
    /// - `ExecutorError::Tuple` if a field index is out of range
    /// - `ExecutorError::UnsupportedOperator` if `op` is not defined for the
    ///   field's type
    pub fn new(
        child: Box<dyn OpIterator>,
        agg_field: usize,
        grouping: Grouping,
        op: AggregateOp,
    ) -> Result<Self, ExecutorError> {
        let schema = new_aggregator(child.schema(), grouping, agg_field, op)?
            .output_schema()
            .clone();
        Ok(Self {
            child,
            agg_field,
            grouping,
            op,
            schema,
            results: None,
            cursor: Cursor::new(),
        })
    }

    /// Returns the group-by field index, `None` without grouping.
    pub fn group_field(&self) -> Option<usize> {
        self.grouping.field()
    }

    /// Returns the group-by field name, `None` without grouping or for an
    /// unnamed field.
    pub fn group_field_name(&self) -> Option<&str> {
        let index = self.grouping.field()?;
        self.child.schema().field_name(index).ok().flatten()
    }

    /// Returns the aggregated field index.
    pub fn aggregate_field(&self) -> usize {
        self.agg_field
    }

    /// Returns the aggregated field name, `None` for an unnamed field.
    pub fn aggregate_field_name(&self) -> Option<&str> {
        self.child
            .schema()
            .field_name(self.agg_field)
            .ok()
            .flatten()
    }

    /// Returns the aggregate operator.
    pub fn aggregate_op(&self) -> AggregateOp {
        self.op
    }

    /// Returns the operator being aggregated.
    pub fn child(&self) -> &dyn OpIterator {
        self.child.as_ref()
    }

    fn drain_child(&mut self, aggregator: &mut dyn Aggregator) -> Result<(), ExecutorError> {
        self.child.open()?;
        while self.child.has_next()? {
            let record = self.child.next()?;
            aggregator.merge(&record)?;
        }
        Ok(())
    }
}

impl OpIterator for Aggregate {
    fn open(&mut self) -> Result<(), ExecutorError> {
        if self.cursor.is_open() {
            return Ok(());
        }

        let mut aggregator =
            new_aggregator(self.child.schema(), self.grouping, self.agg_field, self.op)?;
        let drained = self.drain_child(aggregator.as_mut());
        self.child.close();
        drained?;

        let mut results = aggregator.results()?;
        results.open()?;
        debug!(op = %self.op, groups = aggregator.group_count(), "aggregate drained child");

        self.results = Some(results);
        self.cursor.open();
        Ok(())
    }

    fn close(&mut self) {
        self.cursor.close();
        self.results = None;
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn fetch_next(&mut self) -> Result<Option<Record>, ExecutorError> {
        match self.results.as_mut() {
            Some(results) => results.fetch_next(),
            None => Ok(None),
        }
    }

    fn cursor(&mut self) -> &mut Cursor {
        &mut self.cursor
    }
}
