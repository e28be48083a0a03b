//! ColumnMap - permutation between natural and physical slot order
//!
//! Each tuple index stores tuples under one column permutation (e.g.
//! natural order `SPO` stored as `POS`). A `ColumnMap` is built from
//! the two labels; construction validates an exact bijection over
//! `{0..arity-1}` and precomputes both directions.
//!
//! One generic map parameterized by its permutation replaces a class
//! per named ordering; an index ordering is data, not a type.

use crate::error::{Error, Result};
use crate::tuple::{Tuple, MAX_TUPLE_ARITY};
use std::fmt;

/// A validated slot permutation with its inverse.
#[derive(Clone, PartialEq, Eq)]
pub struct ColumnMap {
    natural: String,
    label: String,
    /// `map[i]` = physical position of natural slot `i`.
    map: [usize; MAX_TUPLE_ARITY],
    /// `unmap[j]` = natural position of physical slot `j`.
    unmap: [usize; MAX_TUPLE_ARITY],
    arity: usize,
}

impl ColumnMap {
    /// Build a map from a natural-order label to a physical-order label,
    /// e.g. `ColumnMap::new("SPO", "POS")`.
    ///
    /// The labels must be the same length (at most
    /// [`MAX_TUPLE_ARITY`]), contain no repeated characters, and the
    /// physical label must be an exact permutation of the natural one.
    pub fn new(natural: &str, label: &str) -> Result<Self> {
        let n: Vec<char> = natural.chars().collect();
        let x: Vec<char> = label.chars().collect();
        if n.is_empty() || n.len() > MAX_TUPLE_ARITY {
            return Err(Error::invalid_column_map(format!(
                "natural order {natural:?} must have 1..={MAX_TUPLE_ARITY} columns"
            )));
        }
        if n.len() != x.len() {
            return Err(Error::invalid_column_map(format!(
                "{natural:?} and {label:?} differ in length"
            )));
        }
        let mut map = [0usize; MAX_TUPLE_ARITY];
        let mut unmap = [0usize; MAX_TUPLE_ARITY];
        let mut seen = [false; MAX_TUPLE_ARITY];
        for (i, c) in n.iter().enumerate() {
            let Some(j) = x.iter().position(|d| d == c) else {
                return Err(Error::invalid_column_map(format!(
                    "column {c:?} of {natural:?} missing from {label:?}"
                )));
            };
            if seen[j] {
                return Err(Error::invalid_column_map(format!(
                    "column {c:?} repeated in {natural:?}"
                )));
            }
            seen[j] = true;
            map[i] = j;
            unmap[j] = i;
        }
        Ok(Self {
            natural: natural.to_string(),
            label: label.to_string(),
            map,
            unmap,
            arity: n.len(),
        })
    }

    /// The physical-order label, e.g. `"POS"`. Used as the index name.
    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The natural-order label, e.g. `"SPO"`.
    #[inline]
    pub fn natural(&self) -> &str {
        &self.natural
    }

    /// Number of columns.
    #[inline]
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Physical position of natural slot `i`.
    #[inline]
    pub fn map_slot(&self, i: usize) -> usize {
        debug_assert!(i < self.arity);
        self.map[i]
    }

    /// Natural position of physical slot `j`.
    #[inline]
    pub fn unmap_slot(&self, j: usize) -> usize {
        debug_assert!(j < self.arity);
        self.unmap[j]
    }

    /// Permute a natural-order tuple into physical order.
    pub fn map_tuple(&self, tuple: &Tuple) -> Tuple {
        debug_assert_eq!(tuple.arity(), self.arity);
        let mut out = [crate::NodeId::ANY; MAX_TUPLE_ARITY];
        for i in 0..self.arity {
            out[self.map[i]] = tuple.get(i);
        }
        Tuple::from_slots(&out[..self.arity]).expect("arity validated at construction")
    }

    /// Permute a physical-order tuple back into natural order.
    pub fn unmap_tuple(&self, tuple: &Tuple) -> Tuple {
        debug_assert_eq!(tuple.arity(), self.arity);
        let mut out = [crate::NodeId::ANY; MAX_TUPLE_ARITY];
        for i in 0..self.arity {
            out[i] = tuple.get(self.map[i]);
        }
        Tuple::from_slots(&out[..self.arity]).expect("arity validated at construction")
    }
}

impl fmt::Debug for ColumnMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ColumnMap({} -> {})", self.natural, self.label)
    }
}
