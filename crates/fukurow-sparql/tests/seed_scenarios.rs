//! The seven end-to-end scenarios a conformant evaluation pipeline must
//! answer correctly: basic projection, filter pushdown, aggregation,
//! `HAVING`, `FILTER NOT EXISTS`, nested `MINUS` combined with `FILTER
//! EXISTS`, and `AVG` over an empty group.

use fukurow_core::model::{Literal, Quad, Term};
use fukurow_sparql::{evaluate_query, EngineConfig, ExecutionResult};
use fukurow_store::QuadStore;

const EX: &str = "http://example.org/";

fn iri(local: &str) -> Term {
    Term::iri(&format!("{EX}{local}"))
}

fn integer(n: i64) -> Term {
    Term::Literal(Literal::typed(&n.to_string(), "http://www.w3.org/2001/XMLSchema#integer"))
}

/// Alice (30), Bob (25), Charlie (35); Alice knows Bob. Seven triples total,
/// matching the seed scenarios' `COUNT(?o) = 7` and `FILTER NOT EXISTS`
/// results together (a second `knows` edge out of Bob would also remove Bob
/// from scenario 5's result, which the seed data rules out).
fn seed_store() -> QuadStore {
    let store = QuadStore::new();
    for (person, age) in [("alice", 30), ("bob", 25), ("charlie", 35)] {
        store.add_current(Quad::new(iri(person), iri("name"), Term::Literal(Literal::plain(person)))).unwrap();
        store.add_current(Quad::new(iri(person), iri("age"), integer(age))).unwrap();
    }
    store.add_current(Quad::new(iri("alice"), iri("knows"), iri("bob"))).unwrap();
    store
}

fn run(store: &QuadStore, query: &str) -> ExecutionResult {
    evaluate_query(store, query, &EngineConfig::default()).unwrap()
}

#[test]
fn scenario_1_selects_every_named_subject() {
    let store = seed_store();
    let result = run(&store, "PREFIX ex: <http://example.org/> SELECT ?s WHERE { ?s ex:name ?n }");
    match result {
        ExecutionResult::Select { rows, .. } => assert_eq!(rows.len(), 3),
        other => panic!("expected Select, got {other:?}"),
    }
}

#[test]
fn scenario_2_filter_excludes_everyone_under_the_age_threshold() {
    let store = seed_store();
    let result = run(&store, "PREFIX ex: <http://example.org/> SELECT ?s WHERE { ?s ex:age ?a . FILTER(?a > 100) }");
    match result {
        ExecutionResult::Select { rows, .. } => assert_eq!(rows.len(), 0),
        other => panic!("expected Select, got {other:?}"),
    }
}

#[test]
fn scenario_3_counts_every_triple_in_the_store() {
    let store = seed_store();
    let result = run(&store, "SELECT (COUNT(?o) AS ?c) WHERE { ?s ?p ?o }");
    match result {
        ExecutionResult::Select { vars, rows } => {
            assert_eq!(rows.len(), 1);
            let (id, _) = vars[0];
            assert_eq!(rows[0].get(id), Some(&integer(7)));
        }
        other => panic!("expected Select, got {other:?}"),
    }
}

#[test]
fn scenario_4_having_keeps_only_predicates_with_at_least_three_triples() {
    let store = seed_store();
    let result = run(
        &store,
        "PREFIX ex: <http://example.org/> SELECT ?p (COUNT(?o) AS ?c) WHERE { ?s ?p ?o } GROUP BY ?p HAVING (?c >= 3)",
    );
    match result {
        ExecutionResult::Select { vars, rows } => {
            assert_eq!(rows.len(), 2);
            let (p_id, _) = vars[0];
            let predicates: Vec<String> = rows.iter().filter_map(|r| r.get(p_id)).map(|t| t.display_string()).collect();
            assert!(predicates.contains(&iri("name").display_string()));
            assert!(predicates.contains(&iri("age").display_string()));
            assert!(!predicates.contains(&iri("knows").display_string()));
        }
        other => panic!("expected Select, got {other:?}"),
    }
}

#[test]
fn scenario_5_filter_not_exists_finds_people_who_know_no_one() {
    let store = seed_store();
    let result = run(
        &store,
        "PREFIX ex: <http://example.org/> SELECT ?person WHERE { ?person ex:name ?n FILTER NOT EXISTS { ?person ex:knows ?x } }",
    );
    match result {
        ExecutionResult::Select { vars, rows } => {
            assert_eq!(rows.len(), 2);
            let (id, _) = vars[0];
            let people: Vec<String> = rows.iter().filter_map(|r| r.get(id)).map(|t| t.display_string()).collect();
            assert!(people.contains(&iri("bob").display_string()));
            assert!(people.contains(&iri("charlie").display_string()));
            assert!(!people.contains(&iri("alice").display_string()));
        }
        other => panic!("expected Select, got {other:?}"),
    }
}

/// Sets a={1,2,3}, b={1,9}, c={1,2}, d={1,9}, e={1,2}, empty={}. A set `x` is
/// a proper subset of `y` when the nested `MINUS` below finds no member of
/// `x` missing from `y`, and the `FILTER EXISTS` finds at least one member
/// of `y` missing from `x`.
fn subset_store() -> QuadStore {
    let store = QuadStore::new();
    let sets: &[(&str, &[i64])] = &[("a", &[1, 2, 3]), ("b", &[1, 9]), ("c", &[1, 2]), ("d", &[1, 9]), ("e", &[1, 2]), ("empty", &[])];
    for (name, members) in sets {
        store.add_current(Quad::new(iri(name), iri("type"), iri("Set"))).unwrap();
        for m in *members {
            store.add_current(Quad::new(iri(name), iri("member"), integer(*m))).unwrap();
        }
    }
    store
}

#[test]
fn scenario_6_nested_minus_finds_exactly_the_seven_proper_subset_pairs() {
    let store = subset_store();
    let query = "PREFIX ex: <http://example.org/>
        SELECT ?x ?y WHERE {
            ?x ex:type ex:Set .
            ?y ex:type ex:Set .
            MINUS {
                ?x ex:member ?m1 .
                ?y ex:type ex:Set .
                MINUS { ?y ex:member ?m1 }
            }
            FILTER EXISTS {
                ?y ex:member ?m2 .
                MINUS { ?x ex:member ?m2 }
            }
        }";
    let result = run(&store, query);
    match result {
        ExecutionResult::Select { vars, rows } => {
            let (x_id, _) = vars[0];
            let (y_id, _) = vars[1];
            let mut pairs: Vec<(String, String)> = rows
                .iter()
                .map(|r| (r.get(x_id).unwrap().display_string(), r.get(y_id).unwrap().display_string()))
                .collect();
            pairs.sort();

            let mut expected: Vec<(String, String)> = vec![
                ("empty", "a"),
                ("empty", "b"),
                ("empty", "c"),
                ("empty", "d"),
                ("empty", "e"),
                ("c", "a"),
                ("e", "a"),
            ]
            .into_iter()
            .map(|(x, y)| (iri(x).display_string(), iri(y).display_string()))
            .collect();
            expected.sort();

            assert_eq!(pairs, expected);
        }
        other => panic!("expected Select, got {other:?}"),
    }
}

#[test]
fn scenario_7_avg_over_an_empty_group_is_zero_not_unbound() {
    let store = seed_store();
    let result = run(&store, "PREFIX ex: <http://example.org/> SELECT (AVG(?o) AS ?avg) WHERE { ?s ex:nonexistent ?o }");
    match result {
        ExecutionResult::Select { vars, rows } => {
            assert_eq!(rows.len(), 1);
            let (id, _) = vars[0];
            assert_eq!(rows[0].get(id), Some(&integer(0)));
        }
        other => panic!("expected Select, got {other:?}"),
    }
}
