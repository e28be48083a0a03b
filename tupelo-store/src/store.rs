//! DatasetStore - the assembled storage engine
//!
//! Owns the cached node table, one triple table, and one quad table,
//! all built from [`StoreParams`]. This is the narrow contract the
//! rest of a database consumes: insert / delete / find in term space,
//! allocate-or-lookup and resolve for ids, plus direct access to the
//! id-space tables for the solver.
//!
//! Insertion flow: term → node table (allocate id) → id tuple → tuple
//! table → fan-out to every permuted index. Query flow: term pattern →
//! ids (no allocation; unknown term short-circuits) → best index scan
//! → id tuples → terms materialized lazily per result.

use crate::node_cache::CachingNodeTable;
use crate::node_table::{NativeNodeTable, NodeTable, NODE_HASH_FACTORY};
use crate::object_file::{MemObjectFile, ObjectFile};
use crate::params::{StoreParams, QUAD_NATURAL_ORDER, TRIPLE_NATURAL_ORDER};
use crate::solver::{solve, Binding, BindingScan, TermPattern};
use crate::txn::TxnCoordinator;
use rustc_hash::FxHashSet;
use std::fmt;
use std::sync::Arc;
use tupelo_core::{ColumnMap, Error, Node, NodeId, RecordFactory, Result, Tuple};
use tupelo_index::{DistinctLeadingScan, MemRangeIndex, TupleIndex, TupleScan, TupleTable};

/// The assembled storage engine.
pub struct DatasetStore {
    params: StoreParams,
    nodes: Arc<dyn NodeTable>,
    triples: TupleTable,
    quads: TupleTable,
    txn: TxnCoordinator,
}

impl DatasetStore {
    /// Fully in-memory store.
    pub fn memory(params: StoreParams) -> Result<Self> {
        Self::with_object_file(Arc::new(MemObjectFile::new()), params)
    }

    /// Store with term payloads on the given object file and in-memory
    /// indexes (rebuildable from run files; see `tupelo_index::run_file`).
    pub fn with_object_file(objects: Arc<dyn ObjectFile>, params: StoreParams) -> Result<Self> {
        let hash_index = Arc::new(MemRangeIndex::new(NODE_HASH_FACTORY));
        let native = NativeNodeTable::new(objects, hash_index)?;
        let nodes: Arc<dyn NodeTable> =
            Arc::new(CachingNodeTable::new(Arc::new(native), &params));
        let triples = Self::build_table(TRIPLE_NATURAL_ORDER, &params.triple_indexes)?;
        let quads = Self::build_table(QUAD_NATURAL_ORDER, &params.quad_indexes)?;
        Ok(Self {
            params,
            nodes,
            triples,
            quads,
            txn: TxnCoordinator::new(),
        })
    }

    fn build_table(natural: &str, labels: &[String]) -> Result<TupleTable> {
        let arity = natural.len();
        let factory = RecordFactory::new(arity * NodeId::SIZE, 0);
        let indexes = labels
            .iter()
            .map(|label| {
                TupleIndex::new(
                    ColumnMap::new(natural, label)?,
                    Arc::new(MemRangeIndex::new(factory)),
                )
            })
            .collect::<Result<Vec<_>>>()?;
        TupleTable::new(arity, indexes)
    }

    /// Store configuration.
    pub fn params(&self) -> &StoreParams {
        &self.params
    }

    /// The (cached) node table.
    pub fn node_table(&self) -> &Arc<dyn NodeTable> {
        &self.nodes
    }

    /// The triple table (arity 3).
    pub fn triples(&self) -> &TupleTable {
        &self.triples
    }

    /// The quad table (arity 4).
    pub fn quads(&self) -> &TupleTable {
        &self.quads
    }

    /// The transaction coordinator bracketing this store.
    pub fn txn(&self) -> &TxnCoordinator {
        &self.txn
    }

    // ------------------------------------------------------------------
    // Id-space contract
    // ------------------------------------------------------------------

    /// Allocate-or-lookup the id for a term.
    pub fn allocate(&self, node: &Node) -> Result<NodeId> {
        self.nodes.get_or_alloc_id(node)
    }

    /// Resolve an id back to its term.
    pub fn resolve(&self, id: NodeId) -> Result<Node> {
        self.nodes.lookup_node(id)
    }

    /// Solve a term-space pattern against the arity-matching table.
    pub fn solve_pattern(
        &self,
        pattern: &[TermPattern],
        binding: &Binding,
    ) -> Result<BindingScan> {
        let table = match pattern.len() {
            3 => &self.triples,
            4 => &self.quads,
            n => {
                return Err(Error::out_of_range(format!(
                    "pattern arity must be 3 or 4, got {n}"
                )))
            }
        };
        solve(table, self.nodes.as_ref(), pattern, binding)
    }

    // ------------------------------------------------------------------
    // Term-space contract
    // ------------------------------------------------------------------

    /// Insert a triple, allocating ids as needed. Returns `true` if new.
    pub fn insert_triple(&self, s: &Node, p: &Node, o: &Node) -> Result<bool> {
        let tuple = Tuple::triple(self.allocate(s)?, self.allocate(p)?, self.allocate(o)?);
        self.triples.add(&tuple)
    }

    /// Delete a triple. Unknown terms mean the triple was never stored;
    /// deletion never allocates. Returns `true` if it was present.
    pub fn delete_triple(&self, s: &Node, p: &Node, o: &Node) -> Result<bool> {
        match self.concrete_tuple(&[s, p, o])? {
            Some(tuple) => self.triples.delete(&tuple),
            None => Ok(false),
        }
    }

    /// Find triples matching the pattern; `None` slots are wildcards.
    pub fn find_triples(
        &self,
        s: Option<&Node>,
        p: Option<&Node>,
        o: Option<&Node>,
    ) -> Result<NodeScan> {
        match self.pattern_tuple(&[s, p, o])? {
            Some(pattern) => Ok(NodeScan::open(
                self.triples.find(&pattern)?,
                Arc::clone(&self.nodes),
            )),
            None => Ok(NodeScan::empty(Arc::clone(&self.nodes))),
        }
    }

    /// Insert a quad, allocating ids as needed. Returns `true` if new.
    pub fn insert_quad(&self, g: &Node, s: &Node, p: &Node, o: &Node) -> Result<bool> {
        let tuple = Tuple::quad(
            self.allocate(g)?,
            self.allocate(s)?,
            self.allocate(p)?,
            self.allocate(o)?,
        );
        self.quads.add(&tuple)
    }

    /// Delete a quad without allocating. Returns `true` if present.
    pub fn delete_quad(&self, g: &Node, s: &Node, p: &Node, o: &Node) -> Result<bool> {
        match self.concrete_tuple(&[g, s, p, o])? {
            Some(tuple) => self.quads.delete(&tuple),
            None => Ok(false),
        }
    }

    /// Find quads matching the pattern; `None` slots are wildcards.
    pub fn find_quads(
        &self,
        g: Option<&Node>,
        s: Option<&Node>,
        p: Option<&Node>,
        o: Option<&Node>,
    ) -> Result<NodeScan> {
        match self.pattern_tuple(&[g, s, p, o])? {
            Some(pattern) => Ok(NodeScan::open(
                self.quads.find(&pattern)?,
                Arc::clone(&self.nodes),
            )),
            None => Ok(NodeScan::empty(Arc::clone(&self.nodes))),
        }
    }

    /// The distinct graph terms of the quad table.
    ///
    /// Uses the distinct-leading-key walk when a graph-leading index
    /// exists (touching one record per graph); otherwise falls back to
    /// a primary scan plus deduplication.
    pub fn distinct_graph_nodes(&self) -> Result<GraphScan> {
        if let Some(scan) = self.quads.distinct_leading()? {
            return Ok(GraphScan {
                inner: GraphScanInner::Seek(scan),
                nodes: Arc::clone(&self.nodes),
            });
        }
        let mut seen = FxHashSet::default();
        for tuple in self.quads.find_all()? {
            seen.insert(tuple.get(0));
        }
        let mut ids: Vec<NodeId> = seen.into_iter().collect();
        ids.sort();
        Ok(GraphScan {
            inner: GraphScanInner::Collected(ids.into_iter()),
            nodes: Arc::clone(&self.nodes),
        })
    }

    /// Resolve a fully-concrete tuple without allocating; `None` when
    /// any term is unknown.
    fn concrete_tuple(&self, terms: &[&Node]) -> Result<Option<Tuple>> {
        let mut slots = Vec::with_capacity(terms.len());
        for term in terms {
            let id = self.nodes.lookup_id(term)?;
            if id.is_does_not_exist() {
                return Ok(None);
            }
            slots.push(id);
        }
        Ok(Some(Tuple::from_slots(&slots)?))
    }

    /// Resolve a pattern without allocating; `None` when a concrete
    /// term is unknown (the pattern can never match).
    fn pattern_tuple(&self, terms: &[Option<&Node>]) -> Result<Option<Tuple>> {
        let mut slots = Vec::with_capacity(terms.len());
        for term in terms {
            let id = match term {
                None => NodeId::ANY,
                Some(node) => {
                    let id = self.nodes.lookup_id(node)?;
                    if id.is_does_not_exist() {
                        tracing::debug!(term = %node, "pattern term unknown, empty result");
                        return Ok(None);
                    }
                    id
                }
            };
            slots.push(id);
        }
        Ok(Some(Tuple::from_slots(&slots)?))
    }
}

impl fmt::Debug for DatasetStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetStore")
            .field("triples", &self.triples.len())
            .field("quads", &self.quads.len())
            .finish()
    }
}

/// Lazy scan of matching tuples materialized back into terms.
///
/// Each pull resolves the result tuple's ids through the (cached) node
/// table; resolution failure there is a corruption error, surfaced per
/// item.
pub struct NodeScan {
    scan: Option<TupleScan>,
    nodes: Arc<dyn NodeTable>,
}

impl NodeScan {
    fn open(scan: TupleScan, nodes: Arc<dyn NodeTable>) -> Self {
        Self {
            scan: Some(scan),
            nodes,
        }
    }

    fn empty(nodes: Arc<dyn NodeTable>) -> Self {
        Self { scan: None, nodes }
    }

    /// Returns `true` if the underlying scan walks a whole index.
    pub fn is_full_scan(&self) -> bool {
        self.scan.as_ref().is_some_and(TupleScan::is_full_scan)
    }

    /// Release the underlying cursor. Idempotent.
    pub fn close(&mut self) {
        if let Some(scan) = &mut self.scan {
            scan.close();
        }
        self.scan = None;
    }
}

impl Iterator for NodeScan {
    type Item = Result<Vec<Node>>;

    fn next(&mut self) -> Option<Self::Item> {
        let tuple = self.scan.as_mut()?.next()?;
        let resolved: Result<Vec<Node>> = tuple
            .slots()
            .iter()
            .map(|&id| self.nodes.lookup_node(id))
            .collect();
        Some(resolved)
    }
}

enum GraphScanInner {
    Seek(DistinctLeadingScan),
    Collected(std::vec::IntoIter<NodeId>),
}

/// Distinct graph terms, materialized lazily.
pub struct GraphScan {
    inner: GraphScanInner,
    nodes: Arc<dyn NodeTable>,
}

impl GraphScan {
    /// Release scan state. Idempotent.
    pub fn close(&mut self) {
        match &mut self.inner {
            GraphScanInner::Seek(scan) => scan.close(),
            GraphScanInner::Collected(iter) => {
                for _ in iter.by_ref() {}
            }
        }
    }
}

impl Iterator for GraphScan {
    type Item = Result<Node>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = match &mut self.inner {
            GraphScanInner::Seek(scan) => match scan.next()? {
                Ok(id) => id,
                Err(e) => return Some(Err(e)),
            },
            GraphScanInner::Collected(iter) => iter.next()?,
        };
        Some(self.nodes.lookup_node(id))
    }
}
