//! Cross-cutting invariants that should hold for any query the parser
//! accepts and any pair of terms the value module compares, rather than
//! for one specific input.

use fukurow_core::model::{Literal, Term};
use fukurow_sparql::value::compare_terms;
use fukurow_sparql::{bindings::BindingRow, parser};
use proptest::prelude::*;

fn integer(n: i64) -> Term {
    Term::Literal(Literal::typed(&n.to_string(), "http://www.w3.org/2001/XMLSchema#integer"))
}

/// Builds a syntactically valid query around one numeric `FILTER`
/// threshold, so the generator can vary the threshold without risking an
/// unparseable query.
fn query_with_filter_threshold(threshold: i64) -> String {
    format!("PREFIX ex: <http://example.org/> SELECT ?s WHERE {{ ?s ex:age ?a . FILTER(?a > {threshold}) }} ORDER BY ?a")
}

proptest! {
    #[test]
    fn filter_and_order_by_spans_stay_in_bounds(threshold in -1_000_000i64..1_000_000) {
        let source = query_with_filter_threshold(threshold);
        let query = parser::parse(&source).unwrap();

        for filter in &query.where_clause.filters {
            prop_assert!(filter.span.is_in_bounds(source.len()));
            prop_assert!(filter.span.start <= filter.span.end());
        }
        for order in &query.modifier.order_by {
            prop_assert!(order.span.is_in_bounds(source.len()));
        }
    }

    #[test]
    fn numeric_comparison_is_a_total_preorder(a in -1000i64..1000, b in -1000i64..1000, c in -1000i64..1000) {
        let (ta, tb, tc) = (integer(a), integer(b), integer(c));

        // Reflexive.
        prop_assert_eq!(compare_terms(&ta, &ta), Some(std::cmp::Ordering::Equal));

        // Antisymmetric: if a <= b and b <= a then a == b.
        let a_le_b = compare_terms(&ta, &tb) != Some(std::cmp::Ordering::Greater);
        let b_le_a = compare_terms(&tb, &ta) != Some(std::cmp::Ordering::Greater);
        if a_le_b && b_le_a {
            prop_assert_eq!(a, b);
        }

        // Transitive.
        let a_le_b = compare_terms(&ta, &tb) != Some(std::cmp::Ordering::Greater);
        let b_le_c = compare_terms(&tb, &tc) != Some(std::cmp::Ordering::Greater);
        let a_le_c = compare_terms(&ta, &tc) != Some(std::cmp::Ordering::Greater);
        if a_le_b && b_le_c {
            prop_assert!(a_le_c);
        }
    }

    #[test]
    fn find_binding_returns_the_same_index_across_repeated_calls(names in prop::collection::vec("[a-z]{1,6}", 1..8)) {
        let mut row = BindingRow::new();
        let mut ids = Vec::new();
        for (i, name) in names.iter().enumerate() {
            let var = fukurow_core::model::VarId::from_name(name);
            row.bind(var, Term::iri(&format!("http://example.org/{i}")));
            ids.push(var);
        }

        for var in ids {
            let first = row.find(var);
            let second = row.find(var);
            prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn distinct_fingerprints_are_order_independent(x in 0i64..50, y in 0i64..50) {
        let mut a = BindingRow::new();
        a.bind(fukurow_core::model::VarId::from_name("x"), integer(x));
        a.bind(fukurow_core::model::VarId::from_name("y"), integer(y));

        let mut b = BindingRow::new();
        b.bind(fukurow_core::model::VarId::from_name("y"), integer(y));
        b.bind(fukurow_core::model::VarId::from_name("x"), integer(x));

        prop_assert_eq!(a.fingerprint(), b.fingerprint());
    }
}
