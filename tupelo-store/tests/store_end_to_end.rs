//! End-to-end term-space tests: insert, pattern find, solver joins

use tupelo_core::{xsd, Node};
use tupelo_store::{
    Binding, DatasetStore, StoreParams, TermPattern, TxnMode, Var,
};

fn store() -> DatasetStore {
    DatasetStore::memory(StoreParams::default()).unwrap()
}

fn iri(s: &str) -> Node {
    Node::iri(format!("http://example.org/{s}"))
}

#[test]
fn insert_find_delete_roundtrip() {
    let store = store();
    let (alice, knows, bob) = (iri("alice"), iri("knows"), iri("bob"));
    assert!(store.insert_triple(&alice, &knows, &bob).unwrap());
    assert!(!store.insert_triple(&alice, &knows, &bob).unwrap());

    let results: Vec<Vec<Node>> = store
        .find_triples(Some(&alice), None, None)
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(results, vec![vec![alice.clone(), knows.clone(), bob.clone()]]);

    assert!(store.delete_triple(&alice, &knows, &bob).unwrap());
    assert!(!store.delete_triple(&alice, &knows, &bob).unwrap());
    assert_eq!(store.find_triples(None, None, None).unwrap().count(), 0);
}

#[test]
fn unknown_term_short_circuits() {
    let store = store();
    store
        .insert_triple(&iri("a"), &iri("p"), &iri("b"))
        .unwrap();
    // "ghost" was never allocated: empty result, no error, and the
    // lookup must not have allocated it either.
    let scan = store.find_triples(Some(&iri("ghost")), None, None).unwrap();
    assert_eq!(scan.count(), 0);
    assert!(store
        .node_table()
        .lookup_id(&iri("ghost"))
        .unwrap()
        .is_does_not_exist());
}

#[test]
fn deletion_never_allocates() {
    let store = store();
    assert!(!store
        .delete_triple(&iri("never"), &iri("seen"), &iri("terms"))
        .unwrap());
    assert!(store
        .node_table()
        .lookup_id(&iri("never"))
        .unwrap()
        .is_does_not_exist());
}

#[test]
fn typed_literals_stay_distinct() {
    let store = store();
    let subject = iri("n");
    let value = iri("value");
    let one_int = Node::typed_literal("1", xsd::INTEGER);
    let one_str = Node::typed_literal("1", xsd::STRING);
    store.insert_triple(&subject, &value, &one_int).unwrap();
    store.insert_triple(&subject, &value, &one_str).unwrap();

    let by_int: Vec<Vec<Node>> = store
        .find_triples(None, None, Some(&one_int))
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(by_int.len(), 1);
    assert_eq!(by_int[0][2], one_int);

    let all = store.find_triples(Some(&subject), None, None).unwrap();
    assert_eq!(all.count(), 2);
}

#[test]
fn inline_literals_roundtrip_through_store() {
    let store = store();
    let (counter, has_count) = (iri("counter"), iri("hasCount"));
    store
        .insert_triple(&counter, &has_count, &Node::integer(-3))
        .unwrap();
    let results: Vec<Vec<Node>> = store
        .find_triples(Some(&counter), None, None)
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(results[0][2], Node::integer(-3));
}

#[test]
fn quads_and_distinct_graphs() {
    let store = store();
    let (g1, g2) = (iri("graph1"), iri("graph2"));
    let p = iri("p");
    for (g, n) in [(&g1, 1), (&g1, 2), (&g2, 3)] {
        store
            .insert_quad(g, &iri(&format!("s{n}")), &p, &Node::integer(n))
            .unwrap();
    }

    let in_g1 = store.find_quads(Some(&g1), None, None, None).unwrap();
    assert_eq!(in_g1.count(), 2);

    // Default params carry GSPO, so the distinct walk takes the
    // seek path: one record per graph.
    let graphs: Vec<Node> = store
        .distinct_graph_nodes()
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(graphs.len(), 2);
    assert!(graphs.contains(&g1));
    assert!(graphs.contains(&g2));
}

#[test]
fn distinct_graphs_without_graph_leading_index() {
    // Strip the G-leading orderings; the store must fall back to scan
    // plus dedup and produce the same set.
    let params = StoreParams {
        quad_indexes: vec!["SPOG".into(), "POSG".into(), "OSPG".into()],
        ..StoreParams::default()
    };
    let store = DatasetStore::memory(params).unwrap();
    let p = iri("p");
    for g in ["g1", "g2", "g3"] {
        for s in ["a", "b"] {
            store
                .insert_quad(&iri(g), &iri(s), &p, &Node::integer(1))
                .unwrap();
        }
    }
    let graphs: Vec<Node> = store
        .distinct_graph_nodes()
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(graphs.len(), 3);
}

#[test]
fn solver_binds_variables() {
    let store = store();
    let (alice, bob, carol) = (iri("alice"), iri("bob"), iri("carol"));
    let knows = iri("knows");
    store.insert_triple(&alice, &knows, &bob).unwrap();
    store.insert_triple(&bob, &knows, &carol).unwrap();

    let who = Var::new("who");
    let pattern = [
        TermPattern::term(alice.clone()),
        TermPattern::term(knows.clone()),
        TermPattern::var("who"),
    ];
    let bindings: Vec<Binding> = store
        .solve_pattern(&pattern, &Binding::new())
        .unwrap()
        .collect();
    assert_eq!(bindings.len(), 1);
    // Deferred materialization: the term is read only on request.
    let bound = bindings[0]
        .node(&who, store.node_table().as_ref())
        .unwrap()
        .unwrap();
    assert_eq!(bound, bob);
}

#[test]
fn solver_joins_through_bindings() {
    // ?x knows ?y . ?y knows ?z — substitution of ?y in the second
    // pattern narrows the scan.
    let store = store();
    let knows = iri("knows");
    store.insert_triple(&iri("alice"), &knows, &iri("bob")).unwrap();
    store.insert_triple(&iri("bob"), &knows, &iri("carol")).unwrap();
    store.insert_triple(&iri("dave"), &knows, &iri("erin")).unwrap();

    let first = [
        TermPattern::var("x"),
        TermPattern::term(knows.clone()),
        TermPattern::var("y"),
    ];
    let second = [
        TermPattern::var("y"),
        TermPattern::term(knows.clone()),
        TermPattern::var("z"),
    ];
    let mut joined = Vec::new();
    for binding in store.solve_pattern(&first, &Binding::new()).unwrap() {
        for extended in store.solve_pattern(&second, &binding).unwrap() {
            joined.push(extended);
        }
    }
    assert_eq!(joined.len(), 1);
    let z = joined[0]
        .node(&Var::new("z"), store.node_table().as_ref())
        .unwrap()
        .unwrap();
    assert_eq!(z, iri("carol"));
}

#[test]
fn solver_repeated_variable_requires_equality() {
    let store = store();
    let p = iri("ref");
    store.insert_triple(&iri("a"), &p, &iri("a")).unwrap();
    store.insert_triple(&iri("a"), &p, &iri("b")).unwrap();

    let pattern = [
        TermPattern::var("x"),
        TermPattern::term(p.clone()),
        TermPattern::var("x"),
    ];
    let bindings: Vec<Binding> = store
        .solve_pattern(&pattern, &Binding::new())
        .unwrap()
        .collect();
    // Only (a, ref, a) has both slots equal.
    assert_eq!(bindings.len(), 1);
    let x = bindings[0]
        .node(&Var::new("x"), store.node_table().as_ref())
        .unwrap()
        .unwrap();
    assert_eq!(x, iri("a"));
}

#[test]
fn solver_unknown_term_is_empty_without_error() {
    let store = store();
    store
        .insert_triple(&iri("a"), &iri("p"), &iri("b"))
        .unwrap();
    let pattern = [
        TermPattern::term(iri("nowhere")),
        TermPattern::Any,
        TermPattern::Any,
    ];
    let mut scan = store.solve_pattern(&pattern, &Binding::new()).unwrap();
    assert!(scan.next().is_none());
}

#[test]
fn abandoned_scans_release_cleanly() {
    let store = store();
    for n in 0..50 {
        store
            .insert_triple(&iri(&format!("s{n}")), &iri("p"), &Node::integer(n))
            .unwrap();
    }
    let mut scan = store.find_triples(None, Some(&iri("p")), None).unwrap();
    assert!(scan.next().is_some());
    scan.close();
    assert!(scan.next().is_none());
    // Writes proceed normally after the abandoned scan.
    assert!(store
        .insert_triple(&iri("late"), &iri("p"), &Node::integer(99))
        .unwrap());
}

#[test]
fn write_transactions_are_exclusive() {
    let store = store();
    let mut writer = store.txn().begin(TxnMode::Write).unwrap();
    assert!(store.txn().begin(TxnMode::Write).is_err());
    let reader = store.txn().begin(TxnMode::Read).unwrap();
    drop(reader);
    writer.commit().unwrap();
    drop(writer);
    assert!(store.txn().begin(TxnMode::Write).is_ok());
}
