//! Node table durability: file-backed object file plus run-file
//! persistence of the hash index.

use std::sync::Arc;
use tupelo_core::{Node, NodeId};
use tupelo_index::{run_file, MemRangeIndex, RangeIndex};
use tupelo_store::{FileObjectFile, NativeNodeTable, NodeTable, NODE_HASH_FACTORY};

fn sample_terms() -> Vec<Node> {
    vec![
        Node::iri("http://example.org/alice"),
        Node::iri("http://example.org/knows"),
        Node::blank("gen-1"),
        Node::lang_literal("hello", "en"),
        Node::typed_literal("not-a-number", "http://example.org/custom"),
    ]
}

#[test]
fn reopened_table_keeps_ids_and_terms() {
    let dir = tempfile::tempdir().unwrap();
    let objects_path = dir.path().join("nodes.dat");
    let index_path = dir.path().join("nodes.idx");
    let terms = sample_terms();

    let ids: Vec<NodeId> = {
        let objects = Arc::new(FileObjectFile::open(&objects_path).unwrap());
        let index: Arc<MemRangeIndex> = Arc::new(MemRangeIndex::new(NODE_HASH_FACTORY));
        let table = NativeNodeTable::new(objects, index.clone()).unwrap();
        let ids = terms
            .iter()
            .map(|t| table.get_or_alloc_id(t).unwrap())
            .collect();
        table.object_file().sync().unwrap();
        run_file::save_to_path(index.as_ref(), &index_path).unwrap();
        ids
    };

    // Reopen both halves and verify the bijection survived.
    let objects = Arc::new(FileObjectFile::open(&objects_path).unwrap());
    let index = Arc::new(run_file::load_from_path(NODE_HASH_FACTORY, &index_path).unwrap());
    let table = NativeNodeTable::new(objects, index).unwrap();

    for (term, id) in terms.iter().zip(&ids) {
        assert_eq!(table.lookup_id(term).unwrap(), *id, "{term}");
        assert_eq!(table.lookup_node(*id).unwrap(), *term);
        // Idempotent allocation after reopen: no fresh id.
        assert_eq!(table.get_or_alloc_id(term).unwrap(), *id);
    }

    // New allocations continue past the persisted content.
    let fresh = Node::iri("http://example.org/after-reopen");
    let fresh_id = table.get_or_alloc_id(&fresh).unwrap();
    assert!(!ids.contains(&fresh_id));
    assert_eq!(table.lookup_node(fresh_id).unwrap(), fresh);
}

#[test]
fn hash_index_run_file_is_sorted_and_complete() {
    let index = MemRangeIndex::new(NODE_HASH_FACTORY);
    let objects = Arc::new(tupelo_store::MemObjectFile::new());
    let table = NativeNodeTable::new(objects, Arc::new(index)).unwrap();
    for term in sample_terms() {
        table.get_or_alloc_id(&term).unwrap();
    }
    let mut buf = Vec::new();
    let written = run_file::write_run(table.hash_index().as_ref(), &mut buf).unwrap();
    assert_eq!(written, sample_terms().len() as u64);
    let reloaded = run_file::read_run(NODE_HASH_FACTORY, buf.as_slice()).unwrap();
    assert_eq!(reloaded.len(), sample_terms().len());
}
