//! Heap-file record manager: slotted pages, a persisted schema, and
//! predicate-filtered sequential scans, layered on [`bufpool::BufferPool`]
//! and [`pagestore::PagedFile`].
//!
//! # Concurrency model
//!
//! Single-threaded cooperative, same as `bufpool` below it: every
//! mutating operation takes `&mut Table`, and [`Scan`] borrows the table
//! for its whole lifetime, so the type system rules out a scan running
//! concurrently with a write against the same table. There is no
//! internal locking.

#[cfg(test)]
mod tests;

mod page;
mod record;
mod schema;
mod scan;
mod table;

pub use predicate::{BinaryOp, Expr, Predicate, UnaryOp, Value};
pub use record::Record;
pub use schema::{Attribute, DataType, Schema};
pub use scan::Scan;
pub use table::Table;

pub use dbcore::{PageNum, Rid, StoreError, StoreResult};
