//! TupleIndex - one column permutation over one range index
//!
//! A tuple index owns a [`RangeIndex`] plus a [`ColumnMap`]; it
//! translates between the tuple's natural column order and this
//! index's physical order, and turns patterns into the narrowest
//! possible scan:
//!
//! 1. Permute the pattern into physical order.
//! 2. Accumulate the *leading run* of concrete slots; the first
//!    wildcard ends it — a concrete slot after a wildcard cannot
//!    narrow the range and becomes a residual filter instead.
//! 3. Full cover → a single existence probe. Partial cover → a prefix
//!    range scan bounded by the run bytes and the run incremented by
//!    one unit. No cover → a full scan, flagged on the result.
//!
//! `weight(pattern)` is the leading-run length; the tuple table uses
//! it to pick the index that needs the least residual filtering.

use crate::range_index::{RangeCursor, RangeIndex};
use std::fmt;
use std::sync::Arc;
use tupelo_core::{ColumnMap, Error, NodeId, Record, RecordFactory, Result, Tuple};

/// Increment a big-endian byte string by one unit, in place.
///
/// Returns `false` when the value was all `0xFF` (the increment
/// overflows and no exclusive upper bound exists).
pub(crate) fn increment_prefix(bytes: &mut [u8]) -> bool {
    for b in bytes.iter_mut().rev() {
        let (next, overflow) = b.overflowing_add(1);
        *b = next;
        if !overflow {
            return true;
        }
    }
    false
}

/// One sorted view of the tuple set under a fixed column permutation.
pub struct TupleIndex {
    cmap: ColumnMap,
    factory: RecordFactory,
    index: Arc<dyn RangeIndex>,
}

impl TupleIndex {
    /// Wrap a range index in a column permutation.
    ///
    /// The range index must store key-only records of exactly
    /// `arity * 8` bytes.
    pub fn new(cmap: ColumnMap, index: Arc<dyn RangeIndex>) -> Result<Self> {
        let factory = *index.factory();
        let want = cmap.arity() * NodeId::SIZE;
        if factory.key_len() != want {
            return Err(Error::record_size(want, factory.key_len()));
        }
        if factory.has_value() {
            return Err(Error::record_size(0, factory.value_len()));
        }
        Ok(Self {
            cmap,
            factory,
            index,
        })
    }

    /// The index name: its physical-order label, e.g. `"POS"`.
    pub fn name(&self) -> &str {
        self.cmap.label()
    }

    /// Tuple arity this index stores.
    pub fn arity(&self) -> usize {
        self.cmap.arity()
    }

    /// The column permutation.
    pub fn column_map(&self) -> &ColumnMap {
        &self.cmap
    }

    /// The underlying range index.
    pub fn range_index(&self) -> &Arc<dyn RangeIndex> {
        &self.index
    }

    /// Number of stored tuples.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if no tuples are stored.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn check_arity(&self, tuple: &Tuple) -> Result<()> {
        if tuple.arity() != self.cmap.arity() {
            return Err(Error::arity_mismatch(self.cmap.arity(), tuple.arity()));
        }
        Ok(())
    }

    /// Build the physical-order key record for a concrete tuple.
    fn key_for(&self, tuple: &Tuple) -> Result<Record> {
        self.check_arity(tuple)?;
        if !tuple.is_concrete() {
            return Err(Error::out_of_range(format!(
                "cannot build an index key from a wildcard tuple {tuple}"
            )));
        }
        let permuted = self.cmap.map_tuple(tuple);
        let mut key = Vec::with_capacity(self.factory.key_len());
        for id in permuted.slots() {
            key.extend_from_slice(&id.to_bytes());
        }
        self.factory.key_record(&key)
    }

    /// Store a tuple. Returns `true` if it was not already present.
    pub fn add(&self, tuple: &Tuple) -> Result<bool> {
        let record = self.key_for(tuple)?;
        self.index.insert(record)
    }

    /// Remove a tuple. Returns `true` if it was present.
    pub fn delete(&self, tuple: &Tuple) -> Result<bool> {
        let record = self.key_for(tuple)?;
        self.index.delete(&record)
    }

    /// Existence test for a concrete tuple.
    pub fn contains(&self, tuple: &Tuple) -> Result<bool> {
        let record = self.key_for(tuple)?;
        self.index.contains(&record)
    }

    /// Score a pattern for this index: the length of its leading run of
    /// concrete slots in this index's physical order.
    pub fn weight(&self, pattern: &Tuple) -> usize {
        if pattern.arity() != self.cmap.arity() {
            return 0;
        }
        let permuted = self.cmap.map_tuple(pattern);
        permuted
            .slots()
            .iter()
            .take_while(|id| id.is_concrete())
            .count()
    }

    /// Find every tuple matching `pattern` (natural order, wildcards
    /// allowed). Zero matches yields an empty scan, not an error.
    pub fn find(&self, pattern: &Tuple) -> Result<TupleScan> {
        self.check_arity(pattern)?;
        // A does-not-exist sentinel can never match anything.
        if pattern.slots().iter().any(|id| id.is_does_not_exist()) {
            return Ok(TupleScan::exact(None, false));
        }

        let arity = self.cmap.arity();
        let permuted = self.cmap.map_tuple(pattern);
        let run = permuted
            .slots()
            .iter()
            .take_while(|id| id.is_concrete())
            .count();

        if run == arity {
            // Fully concrete: a single existence probe.
            let found = self.contains(pattern)?;
            return Ok(TupleScan::exact(found.then_some(*pattern), false));
        }

        // Any concrete slot after the run needs post-scan filtering.
        let residual = permuted.slots()[run..].iter().any(|id| !id.is_any());
        let filter = residual.then_some(*pattern);

        let cursor = if run == 0 {
            tracing::trace!(index = self.name(), "pattern has no leading run, full scan");
            self.index.iter_all()?
        } else {
            let key_len = self.factory.key_len();
            let mut min = vec![0u8; key_len];
            for (j, id) in permuted.slots()[..run].iter().enumerate() {
                min[j * NodeId::SIZE..(j + 1) * NodeId::SIZE].copy_from_slice(&id.to_bytes());
            }
            let mut max = min.clone();
            let bounded = increment_prefix(&mut max[..run * NodeId::SIZE]);
            let min_rec = self.factory.key_record(&min)?;
            let max_rec = if bounded {
                Some(self.factory.key_record(&max)?)
            } else {
                None
            };
            tracing::trace!(index = self.name(), run, residual, "prefix range scan");
            self.index.iter_range(Some(&min_rec), max_rec.as_ref())?
        };

        Ok(TupleScan::range(cursor, self.cmap.clone(), filter, run == 0))
    }

    /// Unbounded ascending scan of every tuple, in natural order.
    pub fn all(&self) -> Result<TupleScan> {
        let cursor = self.index.iter_all()?;
        Ok(TupleScan::range(cursor, self.cmap.clone(), None, true))
    }
}

impl fmt::Debug for TupleIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TupleIndex")
            .field("name", &self.name())
            .field("len", &self.len())
            .finish()
    }
}

enum ScanInner {
    /// Zero-or-one result from a fully-concrete pattern.
    Exact(Option<Tuple>),
    /// Range or full scan, decoded and residual-filtered lazily.
    Range {
        cursor: Box<dyn RangeCursor>,
        cmap: ColumnMap,
        /// Natural-order pattern for residual filtering, if needed.
        filter: Option<Tuple>,
    },
}

/// Lazy scan of matching tuples, delivered in natural column order.
///
/// Cancellation is "stop pulling and call [`close`](TupleScan::close)";
/// dropping the scan releases its state as well.
pub struct TupleScan {
    inner: ScanInner,
    full_scan: bool,
}

impl TupleScan {
    fn exact(result: Option<Tuple>, full_scan: bool) -> Self {
        Self {
            inner: ScanInner::Exact(result),
            full_scan,
        }
    }

    fn range(
        cursor: Box<dyn RangeCursor>,
        cmap: ColumnMap,
        filter: Option<Tuple>,
        full_scan: bool,
    ) -> Self {
        Self {
            inner: ScanInner::Range {
                cursor,
                cmap,
                filter,
            },
            full_scan,
        }
    }

    /// Returns `true` if the pattern could not be narrowed at all and
    /// this scan walks the whole index. Cost-sensitive callers can
    /// reject before pulling.
    pub fn is_full_scan(&self) -> bool {
        self.full_scan
    }

    /// Release scan state. Idempotent; pulling afterwards yields `None`.
    pub fn close(&mut self) {
        match &mut self.inner {
            ScanInner::Exact(result) => *result = None,
            ScanInner::Range { cursor, .. } => cursor.close(),
        }
    }

    fn decode(cmap: &ColumnMap, record: &Record) -> Tuple {
        let arity = cmap.arity();
        let mut slots = [NodeId::ANY; tupelo_core::MAX_TUPLE_ARITY];
        for (j, slot) in slots[..arity].iter_mut().enumerate() {
            let bytes: [u8; NodeId::SIZE] = record.key()[j * NodeId::SIZE..(j + 1) * NodeId::SIZE]
                .try_into()
                .expect("key width is arity * id size");
            *slot = NodeId::from_u64(u64::from_be_bytes(bytes));
        }
        let permuted = Tuple::from_slots(&slots[..arity]).expect("arity validated at construction");
        cmap.unmap_tuple(&permuted)
    }
}

impl Iterator for TupleScan {
    type Item = Tuple;

    fn next(&mut self) -> Option<Tuple> {
        match &mut self.inner {
            ScanInner::Exact(result) => result.take(),
            ScanInner::Range {
                cursor,
                cmap,
                filter,
            } => {
                for record in cursor.by_ref() {
                    let tuple = Self::decode(cmap, &record);
                    match filter {
                        Some(pattern) if !tuple.matches(pattern) => continue,
                        _ => return Some(tuple),
                    }
                }
                None
            }
        }
    }
}

impl fmt::Debug for TupleScan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.inner {
            ScanInner::Exact(_) => "exact",
            ScanInner::Range { .. } => "range",
        };
        f.debug_struct("TupleScan")
            .field("kind", &kind)
            .field("full_scan", &self.full_scan)
            .finish()
    }
}
