//! In-memory RangeIndex over an ordered map
//!
//! `MemRangeIndex` keeps records in a `BTreeMap` behind a
//! `parking_lot::RwLock`. Cursors do not hold the lock between pulls:
//! each refill re-seeks from the last delivered key and copies out a
//! bounded batch under a short read lock, so a long scan never blocks
//! the writer and a cursor stays valid across interleaved mutations
//! (under the external single-writer discipline).

use crate::range_index::{RangeCursor, RangeIndex};
use parking_lot::RwLock;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::ops::Bound;
use std::sync::Arc;
use tupelo_core::{Error, Record, RecordFactory, Result};

/// Records copied out per lock acquisition.
const SCAN_BATCH: usize = 256;

type Tree = BTreeMap<Box<[u8]>, Box<[u8]>>;

/// In-memory sorted range index.
#[derive(Clone)]
pub struct MemRangeIndex {
    factory: RecordFactory,
    inner: Arc<RwLock<Tree>>,
}

impl MemRangeIndex {
    /// Create an empty index for the given record widths.
    pub fn new(factory: RecordFactory) -> Self {
        Self {
            factory,
            inner: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    fn check_key(&self, key: &[u8]) -> Result<()> {
        if key.len() != self.factory.key_len() {
            return Err(Error::record_size(self.factory.key_len(), key.len()));
        }
        Ok(())
    }

    fn rebuild(&self, key: &[u8], value: &[u8]) -> Record {
        let value = if value.is_empty() { None } else { Some(value) };
        self.factory
            .create(key, value)
            .expect("stored records match factory widths")
    }
}

impl fmt::Debug for MemRangeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemRangeIndex")
            .field("factory", &self.factory)
            .field("len", &self.inner.read().len())
            .finish()
    }
}

impl RangeIndex for MemRangeIndex {
    fn factory(&self) -> &RecordFactory {
        &self.factory
    }

    fn insert(&self, record: Record) -> Result<bool> {
        self.factory.check(&record)?;
        let mut tree = self.inner.write();
        Ok(tree
            .insert(record.key().into(), record.value().into())
            .is_none())
    }

    fn delete(&self, record: &Record) -> Result<bool> {
        self.check_key(record.key())?;
        let mut tree = self.inner.write();
        Ok(tree.remove(record.key()).is_some())
    }

    fn find(&self, record: &Record) -> Result<Option<Record>> {
        self.check_key(record.key())?;
        let tree = self.inner.read();
        Ok(tree
            .get(record.key())
            .map(|value| self.rebuild(record.key(), value)))
    }

    fn iter_range(
        &self,
        min_inclusive: Option<&Record>,
        max_exclusive: Option<&Record>,
    ) -> Result<Box<dyn RangeCursor>> {
        if let Some(min) = min_inclusive {
            self.check_key(min.key())?;
        }
        if let Some(max) = max_exclusive {
            self.check_key(max.key())?;
        }
        let lower = match min_inclusive {
            Some(min) => Bound::Included(Box::from(min.key())),
            None => Bound::Unbounded,
        };
        Ok(Box::new(MemCursor {
            index: self.clone(),
            lower,
            upper: max_exclusive.map(|max| Box::from(max.key())),
            batch: VecDeque::new(),
            done: false,
        }))
    }

    fn first_at_or_after(&self, key: &[u8]) -> Result<Option<Record>> {
        self.check_key(key)?;
        let tree = self.inner.read();
        Ok(tree
            .range::<[u8], _>((Bound::Included(key), Bound::Unbounded))
            .next()
            .map(|(k, v)| self.rebuild(k, v)))
    }

    fn len(&self) -> usize {
        self.inner.read().len()
    }

    fn clear(&self) {
        self.inner.write().clear();
    }
}

/// Batch-refilling cursor over a [`MemRangeIndex`].
struct MemCursor {
    index: MemRangeIndex,
    /// Resume position: exclusive after the last delivered key.
    lower: Bound<Box<[u8]>>,
    /// Exclusive upper bound, if any.
    upper: Option<Box<[u8]>>,
    batch: VecDeque<Record>,
    done: bool,
}

impl MemCursor {
    fn refill(&mut self) {
        let tree = self.index.inner.read();
        let lower: Bound<&[u8]> = match &self.lower {
            Bound::Included(k) => Bound::Included(k.as_ref()),
            Bound::Excluded(k) => Bound::Excluded(k.as_ref()),
            Bound::Unbounded => Bound::Unbounded,
        };
        let upper: Bound<&[u8]> = match &self.upper {
            Some(k) => Bound::Excluded(k.as_ref()),
            None => Bound::Unbounded,
        };
        let mut last: Option<Box<[u8]>> = None;
        for (key, value) in tree.range::<[u8], _>((lower, upper)).take(SCAN_BATCH) {
            self.batch.push_back(self.index.rebuild(key, value));
            last = Some(key.clone());
        }
        match last {
            Some(key) => self.lower = Bound::Excluded(key),
            None => self.done = true,
        }
    }
}

impl Iterator for MemCursor {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        if self.batch.is_empty() && !self.done {
            self.refill();
        }
        self.batch.pop_front()
    }
}

impl RangeCursor for MemCursor {
    fn close(&mut self) {
        self.batch.clear();
        self.done = true;
    }
}
