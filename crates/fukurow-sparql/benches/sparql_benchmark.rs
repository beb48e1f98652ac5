use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fukurow_core::model::{Literal, Quad, Term};
use fukurow_sparql::{evaluate_query, parser, EngineConfig};
use fukurow_store::QuadStore;

/// A social-network-like dataset: `size` people, each with a name, an age,
/// a `knows` edge to the previous person, and three interests.
fn generate_test_data(size: usize) -> QuadStore {
    let store = QuadStore::new();

    for i in 0..size {
        let person = Term::iri(&format!("http://example.org/person{i}"));

        store
            .add_current(Quad::new(
                person.clone(),
                Term::iri("http://www.w3.org/1999/02/22-rdf-syntax-ns#type"),
                Term::iri("http://example.org/Person"),
            ))
            .unwrap();
        store
            .add_current(Quad::new(
                person.clone(),
                Term::iri("http://example.org/name"),
                Term::Literal(Literal::plain(&format!("Person {i}"))),
            ))
            .unwrap();
        store
            .add_current(Quad::new(
                person.clone(),
                Term::iri("http://example.org/age"),
                Term::Literal(Literal::typed(&(i % 100 + 18).to_string(), "http://www.w3.org/2001/XMLSchema#integer")),
            ))
            .unwrap();

        if i > 0 {
            store
                .add_current(Quad::new(
                    person.clone(),
                    Term::iri("http://example.org/knows"),
                    Term::iri(&format!("http://example.org/person{}", i - 1)),
                ))
                .unwrap();
        }

        for j in 0..3 {
            store
                .add_current(Quad::new(
                    person.clone(),
                    Term::iri("http://example.org/interestedIn"),
                    Term::iri(&format!("http://example.org/interest{}", (i + j) % 50)),
                ))
                .unwrap();
        }
    }

    store
}

const QUERIES: &[(&str, &str)] = &[
    ("simple_select", "SELECT ?s ?p ?o WHERE { ?s ?p ?o } LIMIT 100"),
    (
        "filter_query",
        "SELECT ?person ?name WHERE { ?person <http://example.org/name> ?name . ?person <http://example.org/age> ?age . FILTER(?age > 25) }",
    ),
    (
        "join_query",
        "SELECT ?person1 ?person2 WHERE { ?person1 <http://example.org/knows> ?person2 . ?person2 <http://example.org/name> ?name }",
    ),
    (
        "aggregate_query",
        "SELECT (COUNT(?person) AS ?count) WHERE { ?person <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://example.org/Person> }",
    ),
    (
        "nested_optional",
        "SELECT ?person ?name WHERE { ?person <http://example.org/name> ?name OPTIONAL { ?person <http://example.org/age> ?age } OPTIONAL { ?person <http://example.org/knows> ?friend } }",
    ),
];

fn benchmark_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("sparql_parsing");
    for (name, query) in QUERIES {
        group.bench_with_input(BenchmarkId::from_parameter(name), query, |b, query| {
            b.iter(|| parser::parse(black_box(query)).unwrap());
        });
    }
    group.finish();
}

fn benchmark_execution(c: &mut Criterion) {
    let mut group = c.benchmark_group("sparql_execution");
    let cfg = EngineConfig::default();

    for (size_name, data_size) in [("small", 100usize), ("medium", 1000), ("large", 5000)] {
        let store = generate_test_data(data_size);

        for (name, query) in QUERIES {
            group.bench_with_input(BenchmarkId::from_parameter(format!("{size_name}_{name}")), query, |b, query| {
                b.iter(|| evaluate_query(black_box(&store), black_box(query), &cfg).unwrap());
            });
        }
    }
    group.finish();
}

fn benchmark_result_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("sparql_results");
    let store = generate_test_data(5000);
    let cfg = EngineConfig::default();

    let queries = [
        ("small_result_set", "SELECT ?person WHERE { ?person <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://example.org/Person> } LIMIT 10"),
        ("medium_result_set", "SELECT ?person ?name WHERE { ?person <http://example.org/name> ?name } LIMIT 100"),
        ("large_result_set", "SELECT ?person ?name ?age WHERE { ?person <http://example.org/name> ?name . ?person <http://example.org/age> ?age } LIMIT 1000"),
    ];

    for (name, query) in queries {
        group.bench_with_input(BenchmarkId::from_parameter(name), query, |b, query| {
            b.iter(|| {
                let result = evaluate_query(black_box(&store), black_box(query), &cfg).unwrap();
                black_box(result);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_parsing, benchmark_execution, benchmark_result_sizes);
criterion_main!(benches);
