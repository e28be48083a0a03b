//! # Tupelo Store
//!
//! The storage-engine glue of the tupelo tuple store:
//!
//! - [`ObjectFile`]: append-only, offset-addressed term payload store
//!   (memory and file implementations)
//! - [`NodeTable`]/[`NativeNodeTable`]: bijective term ↔ id mapping
//!   over an object file and a hash → id range index
//! - [`CachingNodeTable`]: LRU term→id / id→term / negative caches
//! - [`StoreParams`]: the one configuration struct, passed by reference
//! - [`TxnCoordinator`]: the begin/commit/abort/end bracket with
//!   single-writer admission
//! - [`solver`]: term-space pattern matching with lazy bindings
//! - [`DatasetStore`]: the assembled engine — node table plus triple
//!   and quad tables
//!
//! ## Concurrency
//!
//! The engine is synchronous and runs no threads of its own. Multiple
//! readers and at most one writer are admitted by the transaction
//! bracket; scans are lazy pull-based cursors with deterministic
//! release on close, exhaustion, and drop.

pub mod node_cache;
pub mod node_table;
pub mod object_file;
pub mod params;
pub mod solver;
pub mod store;
pub mod txn;

pub use node_cache::CachingNodeTable;
pub use node_table::{NativeNodeTable, NodeTable, NODE_HASH_FACTORY};
pub use object_file::{FileObjectFile, MemObjectFile, ObjectFile};
pub use params::{StoreParams, QUAD_NATURAL_ORDER, TRIPLE_NATURAL_ORDER};
pub use solver::{solve, Binding, BindingScan, TermPattern, Var};
pub use store::{DatasetStore, GraphScan, NodeScan};
pub use txn::{Txn, TxnCoordinator, TxnMode};
