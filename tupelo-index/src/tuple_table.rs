//! TupleTable - N permuted indexes over one logical tuple set
//!
//! A tuple table owns every [`TupleIndex`] for one arity (three for
//! triples, four for quads); the first index is the primary. Mutations
//! fan out to every index so that all of them always hold the same
//! logical tuple set — atomicity across indexes is the surrounding
//! transaction layer's responsibility, so the first failing index
//! aborts the fan-out and the transaction must roll back.
//!
//! `find` scores the pattern against every index and delegates to the
//! highest weight; equal weights go to the first-declared index, so
//! selection is deterministic and follows declaration order.

use crate::tuple_index::{increment_prefix, TupleIndex, TupleScan};
use crate::range_index::RangeIndex;
use std::fmt;
use std::sync::Arc;
use tupelo_core::{Error, NodeId, Result, Tuple};

/// A set of same-arity tuple indexes over one logical tuple set.
pub struct TupleTable {
    arity: usize,
    indexes: Vec<TupleIndex>,
}

impl TupleTable {
    /// Build a table from its indexes. The first index is primary.
    pub fn new(arity: usize, indexes: Vec<TupleIndex>) -> Result<Self> {
        if indexes.is_empty() {
            return Err(Error::storage("a tuple table needs at least one index"));
        }
        for index in &indexes {
            if index.arity() != arity {
                return Err(Error::arity_mismatch(arity, index.arity()));
            }
        }
        Ok(Self { arity, indexes })
    }

    /// Tuple arity this table stores.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// The primary index (first declared).
    pub fn primary(&self) -> &TupleIndex {
        &self.indexes[0]
    }

    /// Every owned index, in declaration order.
    pub fn indexes(&self) -> &[TupleIndex] {
        &self.indexes
    }

    /// Number of stored tuples.
    pub fn len(&self) -> usize {
        self.primary().len()
    }

    /// Returns `true` if the table holds no tuples.
    pub fn is_empty(&self) -> bool {
        self.primary().is_empty()
    }

    fn check_arity(&self, tuple: &Tuple) -> Result<()> {
        if tuple.arity() != self.arity {
            return Err(Error::arity_mismatch(self.arity, tuple.arity()));
        }
        Ok(())
    }

    /// Store a tuple in every index. Returns `true` if it was new.
    ///
    /// A mid-fan-out failure leaves the indexes inconsistent; the
    /// surrounding transaction must abort.
    pub fn add(&self, tuple: &Tuple) -> Result<bool> {
        self.check_arity(tuple)?;
        let mut added = false;
        for (i, index) in self.indexes.iter().enumerate() {
            let fresh = index.add(tuple)?;
            if i == 0 {
                added = fresh;
            }
        }
        Ok(added)
    }

    /// Remove a tuple from every index. Returns `true` if it was present.
    pub fn delete(&self, tuple: &Tuple) -> Result<bool> {
        self.check_arity(tuple)?;
        let mut removed = false;
        for (i, index) in self.indexes.iter().enumerate() {
            let present = index.delete(tuple)?;
            if i == 0 {
                removed = present;
            }
        }
        Ok(removed)
    }

    /// Existence test against the primary index.
    pub fn contains(&self, tuple: &Tuple) -> Result<bool> {
        self.primary().contains(tuple)
    }

    /// Find every tuple matching `pattern`, via the best index.
    pub fn find(&self, pattern: &Tuple) -> Result<TupleScan> {
        self.check_arity(pattern)?;
        let mut best = 0usize;
        let mut best_weight = self.indexes[0].weight(pattern);
        for (i, index) in self.indexes.iter().enumerate().skip(1) {
            let weight = index.weight(pattern);
            // Strictly greater: equal weights keep the first declared.
            if weight > best_weight {
                best = i;
                best_weight = weight;
            }
        }
        tracing::debug!(
            index = self.indexes[best].name(),
            weight = best_weight,
            %pattern,
            "selected tuple index"
        );
        self.indexes[best].find(pattern)
    }

    /// Scan every tuple via the primary index.
    pub fn find_all(&self) -> Result<TupleScan> {
        self.primary().all()
    }

    /// Walk only the distinct values of natural slot 0 (the graph
    /// column of a quad table), using an index that leads with it.
    ///
    /// Returns `None` when no owned index is slot-0-leading; callers
    /// fall back to a full scan plus deduplication.
    pub fn distinct_leading(&self) -> Result<Option<DistinctLeadingScan>> {
        let Some(index) = self
            .indexes
            .iter()
            .find(|index| index.column_map().map_slot(0) == 0)
        else {
            return Ok(None);
        };
        tracing::debug!(index = index.name(), "distinct leading-slot scan");
        Ok(Some(DistinctLeadingScan {
            index: Arc::clone(index.range_index()),
            next_key: Some(vec![0u8; index.range_index().factory().key_len()]),
        }))
    }
}

impl fmt::Debug for TupleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.indexes.iter().map(|i| i.name()).collect();
        f.debug_struct("TupleTable")
            .field("arity", &self.arity)
            .field("indexes", &names)
            .finish()
    }
}

/// Scan yielding each distinct leading slot value exactly once.
///
/// Each pull seeks to the first key at or after the cursor position,
/// reports its leading id, and re-seeks past that id's whole prefix —
/// tuples sharing a leading value are physically adjacent, so the walk
/// touches one record per distinct value.
pub struct DistinctLeadingScan {
    index: Arc<dyn RangeIndex>,
    /// Next seek target; `None` once exhausted or closed.
    next_key: Option<Vec<u8>>,
}

impl DistinctLeadingScan {
    /// Release scan state. Idempotent.
    pub fn close(&mut self) {
        self.next_key = None;
    }
}

impl Iterator for DistinctLeadingScan {
    type Item = Result<NodeId>;

    fn next(&mut self) -> Option<Result<NodeId>> {
        let seek = self.next_key.take()?;
        match self.index.first_at_or_after(&seek) {
            Ok(Some(record)) => {
                let bytes: [u8; NodeId::SIZE] = record.key()[..NodeId::SIZE]
                    .try_into()
                    .expect("key holds at least one id");
                let id = NodeId::from_u64(u64::from_be_bytes(bytes));
                let mut next = record.key().to_vec();
                next[NodeId::SIZE..].fill(0);
                if increment_prefix(&mut next[..NodeId::SIZE]) {
                    self.next_key = Some(next);
                }
                Some(Ok(id))
            }
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
