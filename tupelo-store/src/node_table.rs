//! NodeTable - bijective mapping between terms and node ids
//!
//! Forward direction (id → term): the id's payload is literally the
//! byte offset of the encoded term in the object file. Reverse
//! direction (term → id): a range index from the term's 16-byte
//! content hash to the id.
//!
//! Entries are created on first allocation, never mutated, never
//! deleted. Inline-encodable literals bypass both structures entirely:
//! their value lives in the id bits.

use crate::object_file::ObjectFile;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tupelo_core::{Error, Node, NodeId, RecordFactory, Result, NODE_HASH_SIZE};
use tupelo_index::RangeIndex;

/// Record widths of the hash → id reverse index.
pub const NODE_HASH_FACTORY: RecordFactory = RecordFactory::new(NODE_HASH_SIZE, NodeId::SIZE);

/// Bidirectional term ↔ id mapping.
///
/// `get_or_alloc_id` is idempotent: equal terms always yield the same
/// id for the lifetime of the table. `lookup_id` never allocates; an
/// unknown term is [`NodeId::DOES_NOT_EXIST`], not an error.
pub trait NodeTable: Send + Sync + fmt::Debug {
    /// Look up the id for a term, allocating one on first sight.
    fn get_or_alloc_id(&self, node: &Node) -> Result<NodeId>;

    /// Look up the id for a term without allocating.
    fn lookup_id(&self, node: &Node) -> Result<NodeId>;

    /// Resolve an id back to its term.
    fn lookup_node(&self, id: NodeId) -> Result<Node>;
}

/// Node table over an object file and a hash → id range index.
pub struct NativeNodeTable {
    objects: Arc<dyn ObjectFile>,
    index: Arc<dyn RangeIndex>,
    /// Serializes allocations. Racing lookups of the same unseen term
    /// are legitimate; the first holder allocates, later holders
    /// re-check under the lock and reuse the winning id.
    alloc: Mutex<()>,
}

impl NativeNodeTable {
    /// Build a table from its two storage parts.
    ///
    /// The index must use [`NODE_HASH_FACTORY`] widths.
    pub fn new(objects: Arc<dyn ObjectFile>, index: Arc<dyn RangeIndex>) -> Result<Self> {
        let factory = index.factory();
        if *factory != NODE_HASH_FACTORY {
            return Err(Error::record_size(
                NODE_HASH_FACTORY.key_len(),
                factory.key_len(),
            ));
        }
        Ok(Self {
            objects,
            index,
            alloc: Mutex::new(()),
        })
    }

    /// The hash → id index, e.g. for run-file persistence.
    pub fn hash_index(&self) -> &Arc<dyn RangeIndex> {
        &self.index
    }

    /// The object file holding encoded terms.
    pub fn object_file(&self) -> &Arc<dyn ObjectFile> {
        &self.objects
    }

    fn find_by_hash(&self, hash: &[u8; NODE_HASH_SIZE]) -> Result<Option<NodeId>> {
        let probe = NODE_HASH_FACTORY.key_record(hash)?;
        match self.index.find(&probe)? {
            Some(record) => Ok(Some(NodeId::from_bytes(record.value())?)),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for NativeNodeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeNodeTable")
            .field("terms", &self.index.len())
            .field("object_bytes", &self.objects.length())
            .finish()
    }
}

impl NodeTable for NativeNodeTable {
    fn get_or_alloc_id(&self, node: &Node) -> Result<NodeId> {
        if let Some(id) = node.try_inline() {
            return Ok(id);
        }
        let hash = node.hash128();
        if let Some(id) = self.find_by_hash(&hash)? {
            return Ok(id);
        }
        let _guard = self.alloc.lock();
        // Re-check: another allocator may have won while we waited.
        if let Some(id) = self.find_by_hash(&hash)? {
            return Ok(id);
        }
        let offset = self.objects.append(&node.encode())?;
        let id = NodeId::from_offset(offset)?;
        self.index
            .insert(NODE_HASH_FACTORY.create(&hash, Some(&id.to_bytes()))?)?;
        tracing::debug!(term = %node, %id, "allocated node id");
        Ok(id)
    }

    fn lookup_id(&self, node: &Node) -> Result<NodeId> {
        if let Some(id) = node.try_inline() {
            return Ok(id);
        }
        Ok(self
            .find_by_hash(&node.hash128())?
            .unwrap_or(NodeId::DOES_NOT_EXIST))
    }

    fn lookup_node(&self, id: NodeId) -> Result<Node> {
        if let Some(node) = Node::from_inline(id) {
            return Ok(node);
        }
        let Some(offset) = id.as_offset() else {
            return Err(Error::out_of_range(format!("{id} does not denote a term")));
        };
        let bytes = self.objects.read(offset)?;
        Node::decode(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_file::MemObjectFile;
    use tupelo_core::xsd;
    use tupelo_index::MemRangeIndex;

    fn table() -> NativeNodeTable {
        NativeNodeTable::new(
            Arc::new(MemObjectFile::new()),
            Arc::new(MemRangeIndex::new(NODE_HASH_FACTORY)),
        )
        .unwrap()
    }

    #[test]
    fn test_alloc_is_idempotent() {
        let table = table();
        let node = Node::iri("http://example.org/alice");
        let id = table.get_or_alloc_id(&node).unwrap();
        assert_eq!(table.get_or_alloc_id(&node).unwrap(), id);
        assert_eq!(table.lookup_id(&node).unwrap(), id);
        assert_eq!(table.lookup_node(id).unwrap(), node);
    }

    #[test]
    fn test_roundtrip_every_term_kind() {
        let table = table();
        let nodes = [
            Node::iri("http://example.org/p"),
            Node::blank("b12"),
            Node::literal("plain"),
            Node::lang_literal("chat", "fr"),
            Node::typed_literal("xyz", "http://example.org/dt"),
        ];
        let ids: Vec<NodeId> = nodes
            .iter()
            .map(|n| table.get_or_alloc_id(n).unwrap())
            .collect();
        for (node, id) in nodes.iter().zip(&ids) {
            assert_eq!(&table.lookup_node(*id).unwrap(), node);
        }
        // Distinct terms get distinct ids.
        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len());
    }

    #[test]
    fn test_same_lexical_different_datatype() {
        let table = table();
        let int = Node::typed_literal("1", xsd::INTEGER);
        let string = Node::typed_literal("1", xsd::STRING);
        let a = table.get_or_alloc_id(&int).unwrap();
        let b = table.get_or_alloc_id(&string).unwrap();
        assert_ne!(a, b);
        assert_eq!(table.lookup_node(a).unwrap(), int);
        assert_eq!(table.lookup_node(b).unwrap(), string);
    }

    #[test]
    fn test_inline_bypasses_object_file() {
        let table = table();
        let before = table.objects.length();
        let id = table.get_or_alloc_id(&Node::integer(42)).unwrap();
        assert!(id.is_inline());
        assert_eq!(table.objects.length(), before);
        assert_eq!(table.lookup_node(id).unwrap(), Node::integer(42));
        // lookup_id also resolves without the table having seen it.
        assert_eq!(table.lookup_id(&Node::boolean(true)).unwrap(), NodeId::inline_boolean(true));
    }

    #[test]
    fn test_unknown_term_is_not_an_error() {
        let table = table();
        let id = table.lookup_id(&Node::iri("http://nowhere/")).unwrap();
        assert!(id.is_does_not_exist());
    }

    #[test]
    fn test_bad_ids_are_errors() {
        let table = table();
        assert!(table.lookup_node(NodeId::ANY).is_err());
        assert!(table.lookup_node(NodeId::DOES_NOT_EXIST).is_err());
        // An offset pointing into nowhere is corruption.
        let bogus = NodeId::from_offset(1_000_000).unwrap();
        assert!(matches!(
            table.lookup_node(bogus),
            Err(Error::Corruption(_))
        ));
    }

    #[test]
    fn test_rejects_wrong_index_widths() {
        let result = NativeNodeTable::new(
            Arc::new(MemObjectFile::new()),
            Arc::new(MemRangeIndex::new(RecordFactory::new(8, 8))),
        );
        assert!(result.is_err());
    }
}
