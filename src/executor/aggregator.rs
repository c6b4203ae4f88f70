//! Aggregate operators and grouping accumulators.
//!
//! This module provides the building blocks for grouped aggregation:
//!
//! - [`AggregateOp`]: enum of supported aggregate operators
//! - [`Grouping`]: whether and by which field records are grouped
//! - [`Aggregator`]: trait for stateful grouped computation
//! - [`IntegerAggregator`] / [`TextAggregator`]: accumulators for `Int` and
//!   `Text` fields
//!
//! # Output Layout
//!
//! ```text
//! GroupBy(i):  [group value, aggregate]   named  [field i name, "OP(field name)"]
//! NoGrouping:  [aggregate]                named  ["OP(field name)"]
//! ```
//!
//! Groups are emitted in the order their key was first seen.

use std::fmt;
use std::sync::Arc;

use hashlink::LinkedHashMap;

use crate::datum::{Type, Value};
use crate::tuple::{Record, Schema};

use super::error::ExecutorError;
use super::node::ValuesScan;

/// Supported aggregate operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateOp {
    /// MIN: minimum value.
    Min,
    /// MAX: maximum value.
    Max,
    /// SUM: sum of values.
    Sum,
    /// AVG: integer average, truncated toward zero.
    Avg,
    /// COUNT: number of records.
    Count,
}

impl AggregateOp {
    /// Resolves an operator name (case-insensitive).
    ///
    /// Returns `None` for unknown names.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "min" => Some(AggregateOp::Min),
            "max" => Some(AggregateOp::Max),
            "sum" => Some(AggregateOp::Sum),
            "avg" => Some(AggregateOp::Avg),
            "count" => Some(AggregateOp::Count),
            _ => None,
        }
    }
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateOp::Min => write!(f, "MIN"),
            AggregateOp::Max => write!(f, "MAX"),
            AggregateOp::Sum => write!(f, "SUM"),
            AggregateOp::Avg => write!(f, "AVG"),
            AggregateOp::Count => write!(f, "COUNT"),
        }
    }
}

/// How records are partitioned before aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    /// All records form a single group.
    NoGrouping,
    /// Records are grouped by the value of this field.
    GroupBy(usize),
}

impl Grouping {
    /// Returns the group field index, if any.
    pub fn field(&self) -> Option<usize> {
        match self {
            Grouping::NoGrouping => None,
            Grouping::GroupBy(index) => Some(*index),
        }
    }

    /// Returns the group key of `record`; `None` under `NoGrouping`.
    fn key(&self, record: &Record) -> Result<Option<Value>, ExecutorError> {
        match self {
            Grouping::NoGrouping => Ok(None),
            Grouping::GroupBy(index) => Ok(Some(record.field(*index)?.clone())),
        }
    }
}

/// Stateful grouped aggregation over one field.
///
/// Follows a two-phase lifecycle: every input record is fed through
/// [`merge`](Self::merge), then [`results`](Self::results) exposes one record
/// per group.
pub trait Aggregator {
    /// Folds one input record into its group.
    fn merge(&mut self, record: &Record) -> Result<(), ExecutorError>;

    /// Returns a scan over one result record per group.
    fn results(&self) -> Result<ValuesScan, ExecutorError>;

    /// Returns the schema of result records.
    fn output_schema(&self) -> &Arc<Schema>;

    /// Returns the number of groups seen so far.
    fn group_count(&self) -> usize;
}

/// Creates the aggregator matching the type of the aggregated field.
///
/// # Errors
///
/// - `ExecutorError::Tuple` if a field index is out of range
/// - `ExecutorError::UnsupportedOperator` for anything but COUNT over text
pub fn new_aggregator(
    input: &Schema,
    grouping: Grouping,
    agg_field: usize,
    op: AggregateOp,
) -> Result<Box<dyn Aggregator>, ExecutorError> {
    match input.field_type(agg_field)? {
        Type::Int => Ok(Box::new(IntegerAggregator::new(
            input, grouping, agg_field, op,
        )?)),
        Type::Text => Ok(Box::new(TextAggregator::new(
            input, grouping, agg_field, op,
        )?)),
    }
}

/// Builds the result schema: the group field (if any), then `OP(name)`.
fn output_schema(
    input: &Schema,
    grouping: Grouping,
    agg_field: usize,
    op: AggregateOp,
) -> Result<Arc<Schema>, ExecutorError> {
    let agg_name = format!("{}({})", op, input.field_name(agg_field)?.unwrap_or(""));

    let mut types = Vec::with_capacity(2);
    let mut names = Vec::with_capacity(2);
    if let Grouping::GroupBy(index) = grouping {
        types.push(input.field_type(index)?);
        names.push(input.field_name(index)?.map(str::to_string));
    }
    types.push(Type::Int);
    names.push(Some(agg_name));

    Ok(Arc::new(Schema::new(types, names)?))
}

/// Builds one result record from a group key and its aggregate.
fn result_record(
    schema: &Arc<Schema>,
    key: &Option<Value>,
    aggregate: i32,
) -> Result<Record, ExecutorError> {
    let mut values = Vec::with_capacity(2);
    if let Some(key) = key {
        values.push(key.clone());
    }
    values.push(Value::Int(aggregate));
    Ok(Record::from_values(schema.clone(), values)?)
}

fn to_i32(n: i64) -> Result<i32, ExecutorError> {
    i32::try_from(n).map_err(|_| ExecutorError::IntegerOverflow)
}

/// Running state of one integer group.
#[derive(Debug, Clone, Copy)]
struct IntState {
    /// Running sum, minimum or maximum.
    value: i64,
    /// Number of merged records.
    count: i64,
}

impl IntState {
    fn new(op: AggregateOp) -> Self {
        let value = match op {
            AggregateOp::Min => i64::from(i32::MAX),
            AggregateOp::Max => i64::from(i32::MIN),
            AggregateOp::Sum | AggregateOp::Avg | AggregateOp::Count => 0,
        };
        Self { value, count: 0 }
    }
}

/// Aggregator over an `Int` field supporting every [`AggregateOp`].
///
/// Sums are accumulated in 64 bits and checked when narrowed to the 32-bit
/// result, so intermediate sums may exceed `i32` as long as the final
/// aggregate fits.
#[derive(Debug)]
pub struct IntegerAggregator {
    grouping: Grouping,
    agg_field: usize,
    op: AggregateOp,
    schema: Arc<Schema>,
    groups: LinkedHashMap<Option<Value>, IntState>,
}

impl IntegerAggregator {
    /// Creates an aggregator computing `op` over `agg_field` of `input` records.
    ///
    /// # Errors
    ///
    /// - `ExecutorError::Tuple` if a field index is out of range
    /// - `ExecutorError::TypeMismatch` if `agg_field` is not an `Int` field
    pub fn new(
        input: &Schema,
        grouping: Grouping,
        agg_field: usize,
        op: AggregateOp,
    ) -> Result<Self, ExecutorError> {
        let found = input.field_type(agg_field)?;
        if found != Type::Int {
            return Err(ExecutorError::TypeMismatch {
                expected: Type::Int,
                found,
            });
        }
        Ok(Self {
            grouping,
            agg_field,
            op,
            schema: output_schema(input, grouping, agg_field, op)?,
            groups: LinkedHashMap::new(),
        })
    }

    /// Returns the final aggregate of one group.
    fn finish(&self, state: &IntState) -> Result<i32, ExecutorError> {
        match self.op {
            AggregateOp::Count => to_i32(state.count),
            AggregateOp::Avg => to_i32(state.value / state.count.max(1)),
            AggregateOp::Sum | AggregateOp::Min | AggregateOp::Max => to_i32(state.value),
        }
    }
}

impl Aggregator for IntegerAggregator {
    fn merge(&mut self, record: &Record) -> Result<(), ExecutorError> {
        let key = self.grouping.key(record)?;
        let field = record.field(self.agg_field)?;
        let value = i64::from(field.as_int().ok_or(ExecutorError::TypeMismatch {
            expected: Type::Int,
            found: field.data_type(),
        })?);

        let op = self.op;
        let state = self.groups.entry(key).or_insert_with(|| IntState::new(op));
        match op {
            AggregateOp::Min => state.value = state.value.min(value),
            AggregateOp::Max => state.value = state.value.max(value),
            AggregateOp::Sum | AggregateOp::Avg => {
                state.value = state
                    .value
                    .checked_add(value)
                    .ok_or(ExecutorError::IntegerOverflow)?;
            }
            AggregateOp::Count => {}
        }
        state.count += 1;
        Ok(())
    }

    fn results(&self) -> Result<ValuesScan, ExecutorError> {
        let records = self
            .groups
            .iter()
            .map(|(key, state)| result_record(&self.schema, key, self.finish(state)?))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ValuesScan::new(self.schema.clone(), records))
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn group_count(&self) -> usize {
        self.groups.len()
    }
}

/// Aggregator over a `Text` field. Only COUNT is defined.
#[derive(Debug)]
pub struct TextAggregator {
    grouping: Grouping,
    schema: Arc<Schema>,
    counts: LinkedHashMap<Option<Value>, i64>,
}

impl TextAggregator {
    /// Creates a COUNT aggregator over `agg_field` of `input` records.
    ///
    /// # Errors
    ///
    /// - `ExecutorError::UnsupportedOperator` if `op` is not COUNT
    /// - `ExecutorError::Tuple` if a field index is out of range
    /// - `ExecutorError::TypeMismatch` if `agg_field` is not a `Text` field
    pub fn new(
        input: &Schema,
        grouping: Grouping,
        agg_field: usize,
        op: AggregateOp,
    ) -> Result<Self, ExecutorError> {
        if op != AggregateOp::Count {
            return Err(ExecutorError::UnsupportedOperator {
                op: op.to_string(),
                ty: Type::Text,
            });
        }
        let found = input.field_type(agg_field)?;
        if found != Type::Text {
            return Err(ExecutorError::TypeMismatch {
                expected: Type::Text,
                found,
            });
        }
        Ok(Self {
            grouping,
            schema: output_schema(input, grouping, agg_field, op)?,
            counts: LinkedHashMap::new(),
        })
    }
}

impl Aggregator for TextAggregator {
    fn merge(&mut self, record: &Record) -> Result<(), ExecutorError> {
        let key = self.grouping.key(record)?;
        *self.counts.entry(key).or_insert(0) += 1;
        Ok(())
    }

    fn results(&self) -> Result<ValuesScan, ExecutorError> {
        let records = self
            .counts
            .iter()
            .map(|(key, &count)| result_record(&self.schema, key, to_i32(count)?))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ValuesScan::new(self.schema.clone(), records))
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn group_count(&self) -> usize {
        self.counts.len()
    }
}
