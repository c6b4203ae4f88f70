//! Schema descriptors.

use std::fmt;

use crate::datum::Type;

use super::error::TupleError;

/// A single schema field: its type and an optional name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field data type.
    pub ty: Type,
    /// Field name, if any.
    pub name: Option<String>,
}

impl Field {
    /// Creates a field.
    pub fn new(ty: Type, name: Option<String>) -> Self {
        Self { ty, name }
    }
}

/// Ordered list of fields describing the layout of a record.
///
/// A schema always has at least one field and never changes after
/// construction. Equality compares field types position by position and
/// ignores names, so two differently-named projections of the same layout
/// are interchangeable on a page.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    /// Creates a schema from parallel type and name lists.
    ///
    /// # Errors
    ///
    /// Returns `TupleError::SchemaSizeMismatch` if the lists differ in length
    /// or are empty.
    pub fn new(types: Vec<Type>, names: Vec<Option<String>>) -> Result<Self, TupleError> {
        if types.len() != names.len() || types.is_empty() {
            return Err(TupleError::SchemaSizeMismatch {
                types: types.len(),
                names: names.len(),
            });
        }
        let fields = types
            .into_iter()
            .zip(names)
            .map(|(ty, name)| Field::new(ty, name))
            .collect();
        Ok(Self { fields })
    }

    /// Creates a schema with unnamed fields.
    ///
    /// # Errors
    ///
    /// Returns `TupleError::SchemaSizeMismatch` if `types` is empty.
    pub fn anonymous(types: Vec<Type>) -> Result<Self, TupleError> {
        let names = vec![None; types.len()];
        Self::new(types, names)
    }

    /// Creates a schema with every field named.
    ///
    /// # Errors
    ///
    /// Returns `TupleError::SchemaSizeMismatch` if `fields` is empty.
    pub fn named<S: Into<String>>(
        fields: impl IntoIterator<Item = (Type, S)>,
    ) -> Result<Self, TupleError> {
        let (types, names): (Vec<_>, Vec<_>) = fields
            .into_iter()
            .map(|(ty, name)| (ty, Some(name.into())))
            .unzip();
        Self::new(types, names)
    }

    /// Creates a schema with one named field.
    pub fn single(ty: Type, name: impl Into<String>) -> Self {
        Self {
            fields: vec![Field::new(ty, Some(name.into()))],
        }
    }

    /// Concatenates two schemas, `a`'s fields first.
    pub fn merge(a: &Schema, b: &Schema) -> Schema {
        let fields = a.fields.iter().chain(b.fields.iter()).cloned().collect();
        Schema { fields }
    }

    /// Returns the number of fields.
    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// Returns an iterator over the fields in order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Returns the field at `index`.
    ///
    /// # Errors
    ///
    /// Returns `TupleError::FieldIndex` if `index` is out of range.
    pub fn field(&self, index: usize) -> Result<&Field, TupleError> {
        self.fields.get(index).ok_or(TupleError::FieldIndex {
            index,
            len: self.fields.len(),
        })
    }

    /// Returns the type of the field at `index`.
    ///
    /// # Errors
    ///
    /// Returns `TupleError::FieldIndex` if `index` is out of range.
    pub fn field_type(&self, index: usize) -> Result<Type, TupleError> {
        self.field(index).map(|f| f.ty)
    }

    /// Returns the name of the field at `index`, `None` for an unnamed field.
    ///
    /// # Errors
    ///
    /// Returns `TupleError::FieldIndex` if `index` is out of range.
    pub fn field_name(&self, index: usize) -> Result<Option<&str>, TupleError> {
        self.field(index).map(|f| f.name.as_deref())
    }

    /// Returns the index of the first field named `name`.
    ///
    /// # Errors
    ///
    /// Returns `TupleError::FieldNotFound` if no field has that name.
    pub fn index_of(&self, name: &str) -> Result<usize, TupleError> {
        self.fields
            .iter()
            .position(|f| f.name.as_deref() == Some(name))
            .ok_or_else(|| TupleError::FieldNotFound(name.to_string()))
    }

    /// Returns the byte size of one serialized record.
    pub fn byte_size(&self) -> usize {
        self.fields.iter().map(|f| f.ty.byte_len()).sum()
    }

    /// Returns the field types in order.
    pub fn types(&self) -> impl Iterator<Item = Type> + '_ {
        self.fields.iter().map(|f| f.ty)
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.fields.len() == other.fields.len() && self.types().eq(other.types())
    }
}

impl Eq for Schema {}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}({})", field.ty, field.name.as_deref().unwrap_or(""))?;
        }
        Ok(())
    }
}
