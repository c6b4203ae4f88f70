//! Transaction identifiers and page access permissions.
//!
//! Transaction management itself (commit, abort, locking) lives outside this
//! crate. The storage and execution layers only need to name the transaction
//! on whose behalf a page is requested and what access it asks for.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Transaction ID (64-bit).
///
/// IDs from [`allocate`](Self::allocate) are unique within the process and
/// start from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Create a transaction ID from a raw value.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocate a fresh, process-unique transaction ID.
    pub fn allocate() -> Self {
        Self(NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw u64 value.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Access a transaction requests on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Shared read access.
    Read,
    /// Exclusive access for modification.
    ReadWrite,
}
