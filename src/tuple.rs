//! Schema descriptors, records and record locators.
//!
//! This module provides:
//! - [`Schema`]: ordered `(type, optional name)` fields describing a record
//! - [`Record`]: one value per schema field, optionally tagged with a locator
//! - [`RecordId`]: the `(page, slot)` location of a stored record
//!
//! # Record Serialization
//!
//! A record serializes to the concatenation of its fields' fixed-width
//! encodings, so every record of a schema occupies exactly
//! [`Schema::byte_size`] bytes:
//!
//! ```text
//! +-----------+-----------+-----+-----------+
//! | Field[0]  | Field[1]  | ... | Field[n]  |
//! +-----------+-----------+-----+-----------+
//! ```

mod error;
mod record;
mod schema;

pub use error::TupleError;
pub use record::{Record, RecordId};
pub use schema::{Field, Schema};
