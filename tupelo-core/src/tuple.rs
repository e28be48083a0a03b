//! Tuple - fixed-arity sequence of NodeIds (triple or quad)
//!
//! A `Tuple` holds 3 or 4 [`NodeId`] slots inline; it is `Copy` and
//! never allocates. A *pattern* is a tuple in which any slot may hold
//! the [`NodeId::ANY`] wildcard.

use crate::error::{Error, Result};
use crate::node_id::NodeId;
use std::fmt;
use std::ops::Index;

/// Maximum tuple arity the engine stores (quads).
pub const MAX_TUPLE_ARITY: usize = 4;

/// A fixed-arity ordered sequence of NodeIds.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Tuple {
    len: u8,
    slots: [NodeId; MAX_TUPLE_ARITY],
}

impl Tuple {
    /// Create a triple (arity 3).
    pub fn triple(s: NodeId, p: NodeId, o: NodeId) -> Self {
        Self {
            len: 3,
            slots: [s, p, o, NodeId::ANY],
        }
    }

    /// Create a quad (arity 4).
    pub fn quad(g: NodeId, s: NodeId, p: NodeId, o: NodeId) -> Self {
        Self {
            len: 4,
            slots: [g, s, p, o],
        }
    }

    /// Create from a slice of slots. Arity must be 1..=[`MAX_TUPLE_ARITY`].
    pub fn from_slots(slots: &[NodeId]) -> Result<Self> {
        if slots.is_empty() || slots.len() > MAX_TUPLE_ARITY {
            return Err(Error::arity_mismatch(MAX_TUPLE_ARITY, slots.len()));
        }
        let mut buf = [NodeId::ANY; MAX_TUPLE_ARITY];
        buf[..slots.len()].copy_from_slice(slots);
        Ok(Self {
            len: slots.len() as u8,
            slots: buf,
        })
    }

    /// Number of slots.
    #[inline]
    pub fn arity(&self) -> usize {
        self.len as usize
    }

    /// The populated slots.
    #[inline]
    pub fn slots(&self) -> &[NodeId] {
        &self.slots[..self.len as usize]
    }

    /// Slot at position `i` (panics on out-of-range, as slices do).
    #[inline]
    pub fn get(&self, i: usize) -> NodeId {
        self.slots()[i]
    }

    /// Returns `true` if no slot is a wildcard.
    pub fn is_concrete(&self) -> bool {
        self.slots().iter().all(|id| id.is_concrete())
    }

    /// Returns `true` if the tuple matches `pattern` slot-by-slot,
    /// with [`NodeId::ANY`] in the pattern matching anything.
    ///
    /// This is the residual filter applied to scanned tuples for
    /// pattern slots the index's range bound could not cover.
    pub fn matches(&self, pattern: &Tuple) -> bool {
        self.arity() == pattern.arity()
            && self
                .slots()
                .iter()
                .zip(pattern.slots())
                .all(|(slot, want)| want.is_any() || slot == want)
    }
}

impl Index<usize> for Tuple {
    type Output = NodeId;

    fn index(&self, i: usize) -> &NodeId {
        &self.slots()[i]
    }
}

impl fmt::Debug for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, id) in self.slots().iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{id}")?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> NodeId {
        NodeId::from_offset(n).unwrap()
    }

    #[test]
    fn test_arity() {
        assert_eq!(Tuple::triple(id(1), id(2), id(3)).arity(), 3);
        assert_eq!(Tuple::quad(id(1), id(2), id(3), id(4)).arity(), 4);
        assert!(Tuple::from_slots(&[]).is_err());
        assert!(Tuple::from_slots(&[id(1); 5]).is_err());
    }

    #[test]
    fn test_matches() {
        let t = Tuple::triple(id(1), id(2), id(3));
        assert!(t.matches(&Tuple::triple(id(1), id(2), id(3))));
        assert!(t.matches(&Tuple::triple(NodeId::ANY, id(2), NodeId::ANY)));
        assert!(t.matches(&Tuple::triple(NodeId::ANY, NodeId::ANY, NodeId::ANY)));
        assert!(!t.matches(&Tuple::triple(id(1), NodeId::ANY, id(4))));
        assert!(!t.matches(&Tuple::quad(id(1), id(2), id(3), NodeId::ANY)));
    }

    #[test]
    fn test_is_concrete() {
        assert!(Tuple::triple(id(1), id(2), id(3)).is_concrete());
        assert!(!Tuple::triple(id(1), NodeId::ANY, id(3)).is_concrete());
    }
}
