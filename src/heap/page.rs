//! Heap page implementation using a fixed-width slotted page structure.
//!
//! Every record of a schema has the same serialized width, so a page is a
//! simple array of equal-size slots preceded by an occupancy bitmap:
//!
//! ```text
//! +--------------------+ offset 0
//! | Bitmap (h bytes)   | bit i set => slot i holds a record
//! +--------------------+ offset h
//! | Slot 0  (w bytes)  |
//! | Slot 1  (w bytes)  |
//! | ...                |
//! | Slot n-1           |
//! +--------------------+ offset h + n*w
//! | unused tail        |
//! +--------------------+ offset P (page size)
//! ```
//!
//! For record width `w` and page size `P`, the slot count is
//! `n = floor(P*8 / (w*8 + 1))` (each slot costs `w` bytes plus one bitmap
//! bit) and the bitmap takes `h = ceil(n / 8)` bytes. Bits are LSB-first:
//! slot `i` is bit `i % 8` of byte `i / 8`.
//!
//! An all-zero buffer is a valid page with no records, which is exactly what
//! the heap file appends when it grows.

use std::sync::Arc;

use crate::storage::PageId;
use crate::tuple::{Record, RecordId, Schema};
use crate::tx::TransactionId;

use super::error::HeapError;

/// Slot geometry for a (schema, page size) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLayout {
    /// Number of record slots.
    pub slot_count: usize,
    /// Bitmap length in bytes.
    pub header_len: usize,
    /// Serialized record width in bytes.
    pub slot_width: usize,
    /// Total page size in bytes.
    pub page_size: usize,
}

impl SlotLayout {
    /// Computes the layout of pages of `page_size` bytes holding `schema` records.
    pub fn new(schema: &Schema, page_size: usize) -> Self {
        let slot_width = schema.byte_size();
        let slot_count = (page_size * 8) / (slot_width * 8 + 1);
        Self {
            slot_count,
            header_len: slot_count.div_ceil(8),
            slot_width,
            page_size,
        }
    }

    /// Byte offset of slot `slot` from the start of the page.
    fn slot_offset(&self, slot: usize) -> usize {
        self.header_len + slot * self.slot_width
    }
}

/// An in-memory heap page holding fixed-width records.
///
/// The page owns a copy of its bytes; the occupancy bitmap and slot contents
/// are read from and written to that buffer directly, so
/// [`to_bytes`](Self::to_bytes) returns exactly what will be persisted.
#[derive(Debug, Clone)]
pub struct HeapPage {
    id: PageId,
    schema: Arc<Schema>,
    layout: SlotLayout,
    data: Vec<u8>,
    dirtied_by: Option<TransactionId>,
}

impl HeapPage {
    /// Creates a page view over `data`, whose length is the page size.
    ///
    /// # Errors
    ///
    /// Returns `HeapError::RecordTooLarge` if not even one record of `schema`
    /// fits in `data.len()` bytes.
    pub fn new(id: PageId, schema: Arc<Schema>, data: Vec<u8>) -> Result<Self, HeapError> {
        let layout = SlotLayout::new(&schema, data.len());
        if layout.slot_count == 0 {
            return Err(HeapError::RecordTooLarge {
                width: layout.slot_width,
                page_size: data.len(),
            });
        }
        Ok(Self {
            id,
            schema,
            layout,
            data,
            dirtied_by: None,
        })
    }

    /// Creates an empty page of `page_size` bytes.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn empty(id: PageId, schema: Arc<Schema>, page_size: usize) -> Result<Self, HeapError> {
        Self::new(id, schema, Self::empty_page_data(page_size))
    }

    /// Returns the bytes of a page with no records.
    pub fn empty_page_data(page_size: usize) -> Vec<u8> {
        vec![0u8; page_size]
    }

    /// Returns the page identifier.
    pub fn id(&self) -> PageId {
        self.id
    }

    /// Returns the schema of records on this page.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the number of record slots.
    pub fn slot_count(&self) -> usize {
        self.layout.slot_count
    }

    /// Returns the bitmap length in bytes.
    pub fn header_len(&self) -> usize {
        self.layout.header_len
    }

    /// Returns true if slot `slot` holds a record.
    ///
    /// Slots past the page's capacity are reported as unused.
    pub fn is_slot_used(&self, slot: usize) -> bool {
        if slot >= self.layout.slot_count {
            return false;
        }
        self.data[slot / 8] & (1 << (slot % 8)) != 0
    }

    fn set_slot(&mut self, slot: usize, used: bool) {
        let mask = 1u8 << (slot % 8);
        if used {
            self.data[slot / 8] |= mask;
        } else {
            self.data[slot / 8] &= !mask;
        }
    }

    /// Returns the number of empty slots.
    pub fn empty_slot_count(&self) -> usize {
        (0..self.layout.slot_count)
            .filter(|&slot| !self.is_slot_used(slot))
            .count()
    }

    /// Inserts a record into the first empty slot.
    ///
    /// On success the record is stamped with its new locator.
    ///
    /// # Errors
    ///
    /// - `HeapError::SchemaMismatch` if the record's schema differs from the page's
    /// - `HeapError::PageFull` if every slot is in use
    pub fn insert(&mut self, record: &mut Record) -> Result<RecordId, HeapError> {
        if **record.schema() != *self.schema {
            return Err(HeapError::SchemaMismatch {
                expected: self.schema.to_string(),
                found: record.schema().to_string(),
            });
        }

        let slot = (0..self.layout.slot_count)
            .find(|&slot| !self.is_slot_used(slot))
            .ok_or(HeapError::PageFull { page_id: self.id })?;

        let offset = self.layout.slot_offset(slot);
        let end = offset + self.layout.slot_width;
        record.serialize_into(&mut self.data[offset..end])?;
        self.set_slot(slot, true);

        let rid = RecordId::new(self.id, slot);
        record.set_record_id(Some(rid));
        Ok(rid)
    }

    /// Deletes the record at `rid`.
    ///
    /// Only the occupancy bit is cleared; the slot bytes are left in place and
    /// overwritten by the next insert into that slot.
    ///
    /// # Errors
    ///
    /// Returns `HeapError::InvalidLocator` if `rid` names another page, a slot
    /// past the page's capacity, or an empty slot.
    pub fn delete(&mut self, rid: RecordId) -> Result<(), HeapError> {
        if rid.page_id != self.id || !self.is_slot_used(rid.slot) {
            return Err(HeapError::InvalidLocator {
                page_id: self.id,
                rid,
            });
        }
        self.set_slot(rid.slot, false);
        Ok(())
    }

    /// Returns the record in `slot`, or `None` if the slot is empty.
    ///
    /// # Errors
    ///
    /// Returns `HeapError::Tuple` if the slot bytes do not decode.
    pub fn record(&self, slot: usize) -> Result<Option<Record>, HeapError> {
        if !self.is_slot_used(slot) {
            return Ok(None);
        }
        let offset = self.layout.slot_offset(slot);
        let end = offset + self.layout.slot_width;
        let mut record = Record::deserialize(self.schema.clone(), &self.data[offset..end])?;
        record.set_record_id(Some(RecordId::new(self.id, slot)));
        Ok(Some(record))
    }

    /// Returns every live record in increasing slot order.
    ///
    /// Each record carries its locator.
    ///
    /// # Errors
    ///
    /// Returns `HeapError::Tuple` if a used slot does not decode.
    pub fn records(&self) -> Result<Vec<Record>, HeapError> {
        let mut records = Vec::new();
        for slot in 0..self.layout.slot_count {
            if let Some(record) = self.record(slot)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Returns the raw page bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns a copy of the raw page bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.data.clone()
    }

    /// Marks the page dirty on behalf of `tid`, or clean with `None`.
    pub fn mark_dirty(&mut self, tid: Option<TransactionId>) {
        self.dirtied_by = tid;
    }

    /// Returns the transaction that last dirtied the page, `None` if clean.
    pub fn dirtied_by(&self) -> Option<TransactionId> {
        self.dirtied_by
    }

    /// Returns true if the page has unflushed changes.
    pub fn is_dirty(&self) -> bool {
        self.dirtied_by.is_some()
    }
}
