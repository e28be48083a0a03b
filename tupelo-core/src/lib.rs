//! # Tupelo Core
//!
//! Value-level types for the tupelo tuple store:
//!
//! - [`NodeId`]: fixed-width 8-byte term identifier with inline
//!   encodings for common literals
//! - [`Node`]: the RDF term model and its binary codec
//! - [`Record`]/[`RecordFactory`]: fixed-width key(+value) slots with
//!   pure-function byte comparators
//! - [`Tuple`]: arity-3/4 NodeId tuples and wildcard patterns
//! - [`ColumnMap`]: validated slot permutations for index orderings
//!
//! ## Design Principles
//!
//! 1. **Fixed widths everywhere**: every index key is a concatenation
//!    of 8-byte ids; comparison is raw unsigned byte order
//! 2. **Sentinels over options**: wildcard and negative-lookup results
//!    are reserved id bit patterns, never stored
//! 3. **One error type**: storage-technology errors are wrapped before
//!    they cross into query code

pub mod column_map;
pub mod error;
pub mod node;
pub mod node_id;
pub mod record;
pub mod tuple;

pub use column_map::ColumnMap;
pub use error::{Error, Result};
pub use node::{xsd, Node, NODE_HASH_SIZE};
pub use node_id::NodeId;
pub use record::{compare_by_key, compare_by_key_value, compare_keys, Record, RecordFactory};
pub use tuple::{Tuple, MAX_TUPLE_ARITY};
