//! Record representation and fixed-width serialization.
//!
//! A [`Record`] is bound to one [`Schema`] for its whole life and holds
//! exactly one value per field. Records read from a page additionally carry
//! the [`RecordId`] of the slot they came from.

use std::fmt;
use std::sync::Arc;

use crate::datum::{Type, Value};
use crate::storage::PageId;

use super::error::TupleError;
use super::schema::Schema;

/// Location of a stored record: a page and a slot within it.
///
/// A locator is stamped onto a record when it is inserted into a page and
/// becomes stale once that slot is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    /// Page containing the record.
    pub page_id: PageId,
    /// Slot within the page.
    pub slot: usize,
}

impl RecordId {
    /// Creates a new record identifier.
    pub const fn new(page_id: PageId, slot: usize) -> Self {
        Self { page_id, slot }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.page_id, self.slot)
    }
}

/// A record (tuple/row) bound to a schema.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use heapstore::datum::{Type, Value};
/// use heapstore::tuple::{Record, Schema};
///
/// let schema = Arc::new(Schema::named([(Type::Int, "id"), (Type::Text, "name")]).unwrap());
/// let mut record = Record::new(schema);
/// record.set_field(0, Value::Int(7)).unwrap();
/// record.set_field(1, Value::Text("ann".into())).unwrap();
/// assert_eq!(record.to_string(), "7\tann");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: Arc<Schema>,
    values: Vec<Value>,
    rid: Option<RecordId>,
}

impl Record {
    /// Creates a record holding each field type's default value.
    pub fn new(schema: Arc<Schema>) -> Self {
        let values = schema.types().map(|ty| ty.default_value()).collect();
        Self {
            schema,
            values,
            rid: None,
        }
    }

    /// Creates a record from a full list of values.
    ///
    /// # Errors
    ///
    /// - `TupleError::FieldIndex` if `values` has a different length than
    ///   the schema
    /// - `TupleError::TypeMismatch` if a value's type differs from its field
    pub fn from_values(schema: Arc<Schema>, values: Vec<Value>) -> Result<Self, TupleError> {
        if values.len() != schema.num_fields() {
            return Err(TupleError::FieldIndex {
                index: values.len(),
                len: schema.num_fields(),
            });
        }
        for (ty, value) in schema.types().zip(&values) {
            check_type(ty, value)?;
        }
        Ok(Self {
            schema,
            values,
            rid: None,
        })
    }

    /// Returns the schema this record is bound to.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Re-binds the record to another schema.
    ///
    /// Stored values are left untouched.
    pub fn reset_schema(&mut self, schema: Arc<Schema>) {
        self.schema = schema;
    }

    /// Returns the value of field `index`.
    ///
    /// # Errors
    ///
    /// Returns `TupleError::FieldIndex` if `index` is out of range.
    pub fn field(&self, index: usize) -> Result<&Value, TupleError> {
        self.values.get(index).ok_or(TupleError::FieldIndex {
            index,
            len: self.values.len(),
        })
    }

    /// Replaces the value of field `index`.
    ///
    /// # Errors
    ///
    /// - `TupleError::FieldIndex` if `index` is out of range
    /// - `TupleError::TypeMismatch` if `value` has the wrong type
    pub fn set_field(&mut self, index: usize, value: Value) -> Result<(), TupleError> {
        let ty = self.schema.field_type(index)?;
        check_type(ty, &value)?;
        let len = self.values.len();
        let slot = self
            .values
            .get_mut(index)
            .ok_or(TupleError::FieldIndex { index, len })?;
        *slot = value;
        Ok(())
    }

    /// Returns all values in field order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consumes the record and returns its values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Returns the locator, `None` for a record that was never stored.
    pub fn record_id(&self) -> Option<RecordId> {
        self.rid
    }

    /// Sets or clears the locator.
    pub fn set_record_id(&mut self, rid: Option<RecordId>) {
        self.rid = rid;
    }

    /// Serializes the record's fields back to back into `buf`.
    ///
    /// Returns the number of bytes written, always `schema.byte_size()`.
    ///
    /// # Errors
    ///
    /// Returns `TupleError::Serialization` if `buf` is too small.
    pub fn serialize_into(&self, buf: &mut [u8]) -> Result<usize, TupleError> {
        let mut offset = 0;
        for value in &self.values {
            offset += value.serialize(&mut buf[offset..])?;
        }
        Ok(offset)
    }

    /// Deserializes a record of `schema` from the start of `buf`.
    ///
    /// # Errors
    ///
    /// Returns `TupleError::Serialization` if `buf` is too small or holds a
    /// malformed field.
    pub fn deserialize(schema: Arc<Schema>, buf: &[u8]) -> Result<Self, TupleError> {
        let mut values = Vec::with_capacity(schema.num_fields());
        let mut offset = 0;
        for ty in schema.types() {
            let (value, read) = Value::deserialize(&buf[offset..], ty)?;
            values.push(value);
            offset += read;
        }
        Ok(Self {
            schema,
            values,
            rid: None,
        })
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, "\t")?;
            }
            write!(f, "{}", value)?;
        }
        Ok(())
    }
}

fn check_type(expected: Type, value: &Value) -> Result<(), TupleError> {
    let found = value.data_type();
    if found != expected {
        return Err(TupleError::TypeMismatch { expected, found });
    }
    Ok(())
}
