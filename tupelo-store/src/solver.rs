//! Pattern solver - term-space matching over id-space storage
//!
//! The solver bridges query execution (terms and variables) with the
//! tuple tables (ids):
//!
//! 1. Substitute the current partial [`Binding`] into the pattern.
//! 2. Resolve concrete terms to ids *without allocating*; a term the
//!    node table has never seen means the pattern cannot match, and
//!    the solver short-circuits to an empty result without touching
//!    the tuple table.
//! 3. Delegate to [`TupleTable::find`].
//! 4. Extend the binding per result tuple, variable slot → result id.
//!
//! Bindings hold ids, not terms: intermediate join results never pay a
//! node-table read. [`Binding::node`] materializes a term only when a
//! consumer asks for it.

use crate::node_table::NodeTable;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use tupelo_core::{Error, Node, NodeId, Result, Tuple};
use tupelo_index::{TupleScan, TupleTable};

/// A named query variable.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Var(Arc<str>);

impl Var {
    pub fn new(name: impl AsRef<str>) -> Self {
        Var(Arc::from(name.as_ref()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

/// One slot of a term-space pattern.
#[derive(Clone, Debug)]
pub enum TermPattern {
    /// A concrete term that must match exactly.
    Term(Node),
    /// A variable: bound values substitute, unbound values match
    /// anything and capture the result.
    Var(Var),
    /// Anonymous wildcard: matches anything, captures nothing.
    Any,
}

impl TermPattern {
    pub fn term(node: Node) -> Self {
        TermPattern::Term(node)
    }

    pub fn var(name: impl AsRef<str>) -> Self {
        TermPattern::Var(Var::new(name))
    }
}

/// A partial solution: variable → id.
#[derive(Clone, Debug, Default)]
pub struct Binding {
    values: FxHashMap<Var, NodeId>,
}

impl Binding {
    /// The empty root binding.
    pub fn new() -> Self {
        Self::default()
    }

    /// The id bound to `var`, if any.
    pub fn id(&self, var: &Var) -> Option<NodeId> {
        self.values.get(var).copied()
    }

    /// Bind `var` to `id`.
    pub fn set(&mut self, var: Var, id: NodeId) {
        self.values.insert(var, id);
    }

    /// Materialize the term bound to `var`, reading the node table
    /// only now.
    pub fn node(&self, var: &Var, table: &dyn NodeTable) -> Result<Option<Node>> {
        match self.id(var) {
            Some(id) => Ok(Some(table.lookup_node(id)?)),
            None => Ok(None),
        }
    }

    /// Number of bound variables.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over (variable, id) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Var, NodeId)> {
        self.values.iter().map(|(v, &id)| (v, id))
    }
}

/// Match `pattern` against `table`, extending `binding` per result.
///
/// The pattern length must equal the table arity. The returned scan is
/// lazy; abandoning it (with or without [`BindingScan::close`])
/// releases the underlying cursor.
pub fn solve(
    table: &TupleTable,
    nodes: &dyn NodeTable,
    pattern: &[TermPattern],
    binding: &Binding,
) -> Result<BindingScan> {
    if pattern.len() != table.arity() {
        return Err(Error::arity_mismatch(table.arity(), pattern.len()));
    }
    let mut slots = Vec::with_capacity(pattern.len());
    let mut unbound: Vec<(usize, Var)> = Vec::new();
    for (i, slot) in pattern.iter().enumerate() {
        let id = match slot {
            TermPattern::Any => NodeId::ANY,
            TermPattern::Var(var) => match binding.id(var) {
                Some(id) => id,
                None => {
                    unbound.push((i, var.clone()));
                    NodeId::ANY
                }
            },
            TermPattern::Term(node) => {
                let id = nodes.lookup_id(node)?;
                if id.is_does_not_exist() {
                    tracing::debug!(term = %node, "pattern term unknown, empty match");
                    return Ok(BindingScan::empty(binding.clone()));
                }
                id
            }
        };
        slots.push(id);
    }
    let scan = table.find(&Tuple::from_slots(&slots)?)?;
    Ok(BindingScan {
        scan: Some(scan),
        unbound,
        parent: binding.clone(),
    })
}

/// Lazy stream of extended bindings, one per matching tuple.
pub struct BindingScan {
    scan: Option<TupleScan>,
    /// Pattern positions captured by still-unbound variables.
    unbound: Vec<(usize, Var)>,
    parent: Binding,
}

impl BindingScan {
    fn empty(parent: Binding) -> Self {
        Self {
            scan: None,
            unbound: Vec::new(),
            parent,
        }
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

impl Iterator for BindingScan {
    type Item = Binding;

    fn next(&mut self) -> Option<Binding> {
        let scan = self.scan.as_mut()?;
        'rows: while let Some(tuple) = scan.next() {
            let mut out = self.parent.clone();
            for (pos, var) in &self.unbound {
                let id = tuple.get(*pos);
                // The same variable in two slots must capture one value.
                match out.id(var) {
                    Some(existing) if existing != id => continue 'rows,
                    Some(_) => {}
                    None => out.set(var.clone(), id),
                }
            }
            return Some(out);
        }
        self.scan = None;
        None
    }
}

impl fmt::Debug for BindingScan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingScan")
            .field("open", &self.scan.is_some())
            .field("unbound", &self.unbound)
            .finish()
    }
}
