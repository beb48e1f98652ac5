//! Pattern planner: decides a join order for a basic graph pattern's triple
//! patterns and attaches the filter analyzer's per-level buckets to it.
//! `OPTIONAL`/`MINUS`/`UNION` blocks and aggregation are anchored by the
//! evaluator directly off the parsed `GraphPattern`/`SolutionModifier`
//! structure rather than through a separate plan node for each, since
//! their evaluation order (after the basic graph pattern, in the order
//! they appear) is fixed by the query rather than cost-based.

use crate::analyzer;
use crate::ast::{FilterExpr, TriplePattern};

pub struct Plan {
    pub triples: Vec<TriplePattern>,
    pub level_filters: Vec<Vec<FilterExpr>>,
    pub post_join_filters: Vec<FilterExpr>,
}

/// Orders triple patterns bound-terms-first (a pattern with more constant
/// positions is assumed more selective), breaking ties by predicate IRI so
/// the order is deterministic across otherwise-equivalent plans.
pub fn order_triples(triples: &[TriplePattern]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..triples.len()).collect();
    indices.sort_by(|&a, &b| {
        let ka = selectivity_key(&triples[a]);
        let kb = selectivity_key(&triples[b]);
        ka.cmp(&kb)
    });
    indices
}

fn selectivity_key(pattern: &TriplePattern) -> (i32, String) {
    use crate::ast::PatternTerm::Bound;
    let bound_count = [&pattern.subject, &pattern.predicate, &pattern.object]
        .iter()
        .filter(|t| matches!(t, Bound(_)))
        .count();
    let predicate_key = match &pattern.predicate {
        Bound(term) => term.display_string(),
        _ => String::new(),
    };
    (-(bound_count as i32), predicate_key)
}

pub fn build_plan(triples: &[TriplePattern], filters: &[FilterExpr], source: &str) -> Plan {
    let order = order_triples(triples);
    let ordered: Vec<TriplePattern> = order.iter().map(|&i| triples[i].clone()).collect();
    let level_filters = analyzer::build_level_filters(filters, source, &ordered);
    let post_join_filters = analyzer::unpushable_filters(filters, source, &ordered);
    Plan { triples: ordered, level_filters, post_join_filters }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::PatternTerm;
    use fukurow_core::model::{Term, VarId};

    fn bound(iri: &str) -> PatternTerm {
        PatternTerm::Bound(Term::iri(iri))
    }

    fn var(name: &str) -> PatternTerm {
        PatternTerm::Var(VarId::from_name(name), name.to_string())
    }

    #[test]
    fn more_bound_positions_sort_first() {
        let triples = vec![
            TriplePattern { subject: var("s"), predicate: var("p"), object: var("o") },
            TriplePattern { subject: bound("s1"), predicate: bound("p1"), object: var("o") },
        ];
        let order = order_triples(&triples);
        assert_eq!(order, vec![1, 0]);
    }
}
