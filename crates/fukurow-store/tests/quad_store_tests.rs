use fukurow_core::model::{Quad, Term};
use fukurow_store::{QuadPattern, QuadStore};

fn iri(s: &str) -> Term {
    Term::iri(s)
}

#[test]
fn concurrent_reads_see_a_consistent_snapshot() {
    let store = QuadStore::new();
    store.add_current(Quad::new(iri("alice"), iri("knows"), iri("bob"))).unwrap();

    let first = store.acquire_read().unwrap();
    let seen_before = first.len();

    store.add_current(Quad::new(iri("bob"), iri("knows"), iri("carol"))).unwrap();

    // The already-held read lock's view does not change shape out from
    // under it; a fresh acquire sees the new row.
    assert_eq!(first.len(), seen_before);
    drop(first);

    let second = store.acquire_read().unwrap();
    assert_eq!(second.len(), 2);
}

#[test]
fn batched_writes_are_invisible_until_commit() {
    let store = QuadStore::new();
    store.begin_batch().unwrap();
    store.add_current_batched(Quad::new(iri("s"), iri("p"), iri("o"))).unwrap();

    assert_eq!(store.len().unwrap(), 0);

    store.commit_batch().unwrap();
    assert_eq!(store.len().unwrap(), 1);
}

#[test]
fn full_pattern_match_is_selective() {
    let store = QuadStore::new();
    store.add_current(Quad::new(iri("s"), iri("p1"), iri("o1"))).unwrap();
    store.add_current(Quad::new(iri("s"), iri("p2"), iri("o2"))).unwrap();

    let read = store.acquire_read().unwrap();
    let rows = read.query_current(&QuadPattern::new(Some(iri("s")), Some(iri("p1")), None));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].predicate, iri("p1"));
}

#[test]
fn empty_store_queries_return_no_rows() {
    let store = QuadStore::new();
    let read = store.acquire_read().unwrap();
    assert!(read.query_current(&QuadPattern::default()).is_empty());
}
