//! LRU cache layers over a node table
//!
//! `CachingNodeTable` composes three bounded caches in front of a
//! slower table: term → id, id → term, and a small negative cache of
//! terms known to be absent. Allocation writes through both forward
//! caches and purges the negative entry, so a transaction always reads
//! its own writes. Inline-encodable terms skip the caches — encoding
//! them is cheaper than a cache probe.

use crate::node_table::NodeTable;
use crate::params::StoreParams;
use lru::LruCache;
use parking_lot::Mutex;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tupelo_core::{Node, NodeId, Result};

/// Decorating cache over any [`NodeTable`].
pub struct CachingNodeTable {
    inner: Arc<dyn NodeTable>,
    node_to_id: Mutex<LruCache<Node, NodeId>>,
    id_to_node: Mutex<LruCache<NodeId, Node>>,
    misses: Mutex<LruCache<Node, ()>>,
}

fn cap(size: usize) -> NonZeroUsize {
    NonZeroUsize::new(size).unwrap_or(NonZeroUsize::MIN)
}

impl CachingNodeTable {
    /// Wrap `inner` with cache sizes from `params`.
    pub fn new(inner: Arc<dyn NodeTable>, params: &StoreParams) -> Self {
        Self {
            inner,
            node_to_id: Mutex::new(LruCache::new(cap(params.node_to_id_cache_size))),
            id_to_node: Mutex::new(LruCache::new(cap(params.id_to_node_cache_size))),
            misses: Mutex::new(LruCache::new(cap(params.node_miss_cache_size))),
        }
    }

    fn remember(&self, node: &Node, id: NodeId) {
        self.node_to_id.lock().put(node.clone(), id);
        self.id_to_node.lock().put(id, node.clone());
    }
}

impl fmt::Debug for CachingNodeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachingNodeTable")
            .field("node_to_id", &self.node_to_id.lock().len())
            .field("id_to_node", &self.id_to_node.lock().len())
            .field("misses", &self.misses.lock().len())
            .finish()
    }
}

impl NodeTable for CachingNodeTable {
    fn get_or_alloc_id(&self, node: &Node) -> Result<NodeId> {
        if let Some(id) = node.try_inline() {
            return Ok(id);
        }
        if let Some(&id) = self.node_to_id.lock().get(node) {
            return Ok(id);
        }
        let id = self.inner.get_or_alloc_id(node)?;
        // The term exists now; a stale negative entry must not shadow it.
        self.misses.lock().pop(node);
        self.remember(node, id);
        Ok(id)
    }

    fn lookup_id(&self, node: &Node) -> Result<NodeId> {
        if let Some(id) = node.try_inline() {
            return Ok(id);
        }
        if let Some(&id) = self.node_to_id.lock().get(node) {
            return Ok(id);
        }
        if self.misses.lock().get(node).is_some() {
            return Ok(NodeId::DOES_NOT_EXIST);
        }
        let id = self.inner.lookup_id(node)?;
        if id.is_does_not_exist() {
            self.misses.lock().put(node.clone(), ());
        } else {
            self.remember(node, id);
        }
        Ok(id)
    }

    fn lookup_node(&self, id: NodeId) -> Result<Node> {
        if let Some(node) = Node::from_inline(id) {
            return Ok(node);
        }
        if let Some(node) = self.id_to_node.lock().get(&id) {
            return Ok(node.clone());
        }
        let node = self.inner.lookup_node(id)?;
        self.remember(&node, id);
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_table::{NativeNodeTable, NODE_HASH_FACTORY};
    use crate::object_file::MemObjectFile;
    use tupelo_index::MemRangeIndex;

    fn cached() -> (CachingNodeTable, Arc<NativeNodeTable>) {
        let native = Arc::new(
            NativeNodeTable::new(
                Arc::new(MemObjectFile::new()),
                Arc::new(MemRangeIndex::new(NODE_HASH_FACTORY)),
            )
            .unwrap(),
        );
        let params = StoreParams {
            node_to_id_cache_size: 8,
            id_to_node_cache_size: 8,
            node_miss_cache_size: 4,
            ..StoreParams::default()
        };
        (CachingNodeTable::new(native.clone(), &params), native)
    }

    #[test]
    fn test_cached_roundtrip() {
        let (cache, _native) = cached();
        let node = Node::iri("http://example.org/x");
        let id = cache.get_or_alloc_id(&node).unwrap();
        // Served from cache on repeat.
        assert_eq!(cache.get_or_alloc_id(&node).unwrap(), id);
        assert_eq!(cache.lookup_id(&node).unwrap(), id);
        assert_eq!(cache.lookup_node(id).unwrap(), node);
    }

    #[test]
    fn test_negative_cache_purged_on_alloc() {
        let (cache, _native) = cached();
        let node = Node::iri("http://example.org/late");
        // First lookup records the miss.
        assert!(cache.lookup_id(&node).unwrap().is_does_not_exist());
        // Allocation must purge the negative entry...
        let id = cache.get_or_alloc_id(&node).unwrap();
        // ...so this lookup sees the writer's own write.
        assert_eq!(cache.lookup_id(&node).unwrap(), id);
    }

    #[test]
    fn test_negative_cache_avoids_backend() {
        let (cache, native) = cached();
        let node = Node::iri("http://example.org/ghost");
        assert!(cache.lookup_id(&node).unwrap().is_does_not_exist());
        // Allocate behind the cache's back to prove the negative
        // cache answers: the stale DOES_NOT_EXIST is expected until
        // the entry ages out or the cache itself allocates.
        native.get_or_alloc_id(&node).unwrap();
        assert!(cache.lookup_id(&node).unwrap().is_does_not_exist());
    }

    #[test]
    fn test_cache_eviction_falls_back() {
        let (cache, _native) = cached();
        let first = Node::iri("http://example.org/0");
        let first_id = cache.get_or_alloc_id(&first).unwrap();
        // Evict `first` from the 8-entry caches.
        for i in 1..=16 {
            cache
                .get_or_alloc_id(&Node::iri(format!("http://example.org/{i}")))
                .unwrap();
        }
        // Still resolvable through the backing table, same id.
        assert_eq!(cache.lookup_id(&first).unwrap(), first_id);
        assert_eq!(cache.lookup_node(first_id).unwrap(), first);
    }

    #[test]
    fn test_inline_skips_caches() {
        let (cache, _native) = cached();
        let id = cache.get_or_alloc_id(&Node::integer(7)).unwrap();
        assert!(id.is_inline());
        assert_eq!(cache.node_to_id.lock().len(), 0);
        assert_eq!(cache.lookup_node(id).unwrap(), Node::integer(7));
        assert_eq!(cache.id_to_node.lock().len(), 0);
    }
}
