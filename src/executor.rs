//! Query operators implementing the pull-based iterator model.
//!
//! # Architecture
//!
//! ```text
//! Aggregate                 Insert / Delete
//!   └── HeapScan              └── ValuesScan | HeapScan
//!         |                         |
//!         v                         v
//!     PageCache.get_page      PageCache.insert_tuple / delete_tuple
//! ```
//!
//! # Components
//!
//! - [`OpIterator`]: the open / has_next / next / rewind / close protocol
//! - [`ValuesScan`]: in-memory record source
//! - [`Aggregate`]: grouped aggregation over a child
//! - [`Insert`], [`Delete`]: table modification through the page cache
//! - [`IntegerAggregator`], [`TextAggregator`]: grouping accumulators

mod aggregate;
mod aggregator;
mod dml;
mod error;
mod node;

pub use aggregate::Aggregate;
pub use aggregator::{
    new_aggregator, AggregateOp, Aggregator, Grouping, IntegerAggregator, TextAggregator,
};
pub use dml::{Delete, Insert};
pub use error::ExecutorError;
pub use node::{collect_records, Cursor, OpIterator, ValuesScan};
