//! StoreParams - one configuration struct, passed by reference
//!
//! Everything tunable about a store lives here: cache sizes and the
//! index ordering sets. The struct is built once at startup and handed
//! to the components that need it; there is no global registry.

/// Natural column order of triples: subject, predicate, object.
pub const TRIPLE_NATURAL_ORDER: &str = "SPO";

/// Natural column order of quads: graph, subject, predicate, object.
pub const QUAD_NATURAL_ORDER: &str = "GSPO";

/// Store configuration.
///
/// The first entry of each index list is that table's primary index,
/// and declaration order breaks ties in index selection.
#[derive(Debug, Clone)]
pub struct StoreParams {
    /// Capacity of the term → id cache.
    pub node_to_id_cache_size: usize,
    /// Capacity of the id → term cache.
    pub id_to_node_cache_size: usize,
    /// Capacity of the known-missing negative cache.
    pub node_miss_cache_size: usize,
    /// Triple index orderings (permutations of `SPO`).
    pub triple_indexes: Vec<String>,
    /// Quad index orderings (permutations of `GSPO`).
    pub quad_indexes: Vec<String>,
}

impl Default for StoreParams {
    fn default() -> Self {
        Self {
            node_to_id_cache_size: 100_000,
            id_to_node_cache_size: 500_000,
            node_miss_cache_size: 100,
            triple_indexes: vec!["SPO".into(), "POS".into(), "OSP".into()],
            quad_indexes: vec![
                "GSPO".into(),
                "GPOS".into(),
                "GOSP".into(),
                "SPOG".into(),
                "POSG".into(),
                "OSPG".into(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_orderings() {
        let params = StoreParams::default();
        assert_eq!(params.triple_indexes[0], "SPO");
        assert_eq!(params.quad_indexes[0], "GSPO");
        assert_eq!(params.triple_indexes.len(), 3);
        assert_eq!(params.quad_indexes.len(), 6);
    }
}
