//! RangeIndex - the sorted key-value substrate under every tuple index
//!
//! An ordered container of fixed-width [`Record`]s keyed by their key
//! bytes. Range scans are the performance-critical path: logarithmic
//! descent to the start key, then sequential delivery.
//!
//! ## Cursors
//!
//! Scans are lazy pull-based cursors, restartable per call. A cursor
//! must release its resources on [`close`](RangeCursor::close), on
//! exhaustion, and on drop; abandoning a partially-consumed cursor is
//! the normal cancellation path.
//!
//! The index itself does not implement MVCC. The surrounding layer
//! provides single-writer/multi-reader discipline; implementations
//! only guarantee that an interleaved reader never observes a torn
//! record.

use std::fmt;
use tupelo_core::{Record, RecordFactory, Result};

/// A lazy, closeable, ascending scan over records.
///
/// Exhaustion (`next() == None`) releases scan state; `close` does the
/// same for early termination. Pulling after close yields `None`.
pub trait RangeCursor: Iterator<Item = Record> + Send {
    /// Release scan state. Idempotent.
    fn close(&mut self);
}

/// Ordered container of fixed-width records.
pub trait RangeIndex: Send + Sync + fmt::Debug {
    /// The record widths this index stores.
    fn factory(&self) -> &RecordFactory;

    /// Upsert a record; an existing record with the same key has its
    /// value overwritten. Returns `true` if the key was new.
    fn insert(&self, record: Record) -> Result<bool>;

    /// Delete by key. Returns `true` if the key was present.
    fn delete(&self, record: &Record) -> Result<bool>;

    /// Point lookup by key, returning the stored record (including its
    /// value payload).
    fn find(&self, record: &Record) -> Result<Option<Record>>;

    /// Existence test by key.
    fn contains(&self, record: &Record) -> Result<bool> {
        Ok(self.find(record)?.is_some())
    }

    /// Ascending scan over `[min_inclusive, max_exclusive)`; `None`
    /// bounds are open.
    fn iter_range(
        &self,
        min_inclusive: Option<&Record>,
        max_exclusive: Option<&Record>,
    ) -> Result<Box<dyn RangeCursor>>;

    /// Ascending scan over every record.
    fn iter_all(&self) -> Result<Box<dyn RangeCursor>> {
        self.iter_range(None, None)
    }

    /// The first record whose key is `>= key`, if any.
    ///
    /// This is the seek primitive behind distinct-by-key-prefix scans:
    /// walking only distinct leading keys instead of every record.
    fn first_at_or_after(&self, key: &[u8]) -> Result<Option<Record>>;

    /// Number of records.
    fn len(&self) -> usize;

    /// Returns `true` if the index holds no records.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every record.
    fn clear(&self);
}
