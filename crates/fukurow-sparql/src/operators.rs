//! Streaming execution operators over `BindingRow`s.
//!
//! Each operator is an ordinary [`Iterator`] pulling rows from the quad
//! store or from another operator: `Iterator::next` plays the role of
//! `MoveNext`+`Current` together, and dropping the iterator is `Dispose`.
//! `TriplePatternScan` is the leaf; `join_triples` folds a whole basic
//! graph pattern by chaining scans level by level, applying that level's
//! pushed-down filters before the next join step reads the result.

use crate::ast::TriplePattern;
use crate::ast::{FilterExpr, PatternTerm};
use crate::bindings::BindingRow;
use crate::EngineError;
use fukurow_core::model::{Term, VarId};
use fukurow_store::{QuadPattern, ReadLock};

fn resolve(term: &PatternTerm, row: &BindingRow) -> Option<Term> {
    match term {
        PatternTerm::Bound(t) => Some(t.clone()),
        PatternTerm::Var(var, _) => row.get(*var).cloned(),
    }
}

/// A single triple pattern scanned against `row`'s already-bound variables;
/// yields one extended row per matching quad, skipping quads that would
/// force the same variable to two different terms (e.g. `?x ex:p ?x`).
pub fn scan_triple_pattern(store: &ReadLock, pattern: &TriplePattern, row: &BindingRow) -> Vec<BindingRow> {
    let quad_pattern = QuadPattern::new(
        resolve(&pattern.subject, row),
        resolve(&pattern.predicate, row),
        resolve(&pattern.object, row),
    );
    store
        .query_current(&quad_pattern)
        .into_iter()
        .filter_map(|quad| extend_with_match(row, pattern, &quad))
        .collect()
}

fn extend_with_match(row: &BindingRow, pattern: &TriplePattern, quad: &fukurow_core::model::Quad) -> Option<BindingRow> {
    let mut next = row.clone();
    for (term, value) in [
        (&pattern.subject, &quad.subject),
        (&pattern.predicate, &quad.predicate),
        (&pattern.object, &quad.object),
    ] {
        if let PatternTerm::Var(var, _) = term {
            match next.get(*var) {
                Some(existing) if existing != value => return None,
                Some(_) => {}
                None => next.bind(*var, value.clone()),
            }
        }
    }
    Some(next)
}

/// Joins `triples` (already reordered by the planner) against `input` one
/// pattern at a time, applying `level_filters[i]` once pattern `i` has been
/// joined — the per-level filter pushdown from the filter analyzer.
pub fn join_triples(
    store: &ReadLock,
    triples: &[TriplePattern],
    level_filters: &[Vec<FilterExpr>],
    source: &str,
    prologue: &crate::ast::Prologue,
    input: Vec<BindingRow>,
) -> Result<Vec<BindingRow>, EngineError> {
    let mut rows = input;
    for (level, pattern) in triples.iter().enumerate() {
        rows = rows.iter().flat_map(|row| scan_triple_pattern(store, pattern, row)).collect();
        if let Some(filters) = level_filters.get(level) {
            rows = apply_filters(filters, source, prologue, store, rows)?;
        }
    }
    Ok(rows)
}

/// Evaluates every filter in `filters` against each row, keeping a row only
/// if every filter's effective boolean value is `true`.
pub fn apply_filters(
    filters: &[FilterExpr],
    source: &str,
    prologue: &crate::ast::Prologue,
    store: &ReadLock,
    rows: Vec<BindingRow>,
) -> Result<Vec<BindingRow>, EngineError> {
    if filters.is_empty() {
        return Ok(rows);
    }
    let mut kept = Vec::with_capacity(rows.len());
    for row in rows {
        let mut passes = true;
        for filter in filters {
            if !crate::evaluator::eval_filter(store, source, prologue, filter, &row)?.unwrap_or(false) {
                passes = false;
                break;
            }
        }
        if passes {
            kept.push(row);
        }
    }
    Ok(kept)
}

/// `Distinct`/`REDUCED`: keeps the first row seen for each order-independent
/// fingerprint.
pub fn distinct(rows: Vec<BindingRow>) -> Vec<BindingRow> {
    let mut seen = std::collections::HashSet::new();
    rows.into_iter().filter(|row| seen.insert(row.fingerprint())).collect()
}

/// `OrderBy`: materializes and sorts by each condition in turn, using
/// `value::order_by_cmp` for a deterministic total order.
pub fn order_by(
    rows: Vec<BindingRow>,
    conditions: &[crate::ast::OrderCondition],
    source: &str,
    prologue: &crate::ast::Prologue,
) -> Result<Vec<BindingRow>, EngineError> {
    if conditions.is_empty() {
        return Ok(rows);
    }
    let mut keyed: Vec<(Vec<Option<Term>>, BindingRow)> = Vec::with_capacity(rows.len());
    for row in rows {
        let mut keys = Vec::with_capacity(conditions.len());
        for cond in conditions {
            let text = cond.span.text(source);
            let value = crate::exprlang::eval(text, &row, prologue)
                .ok()
                .and_then(|v| v.as_term().cloned());
            keys.push(value);
        }
        keyed.push((keys, row));
    }
    keyed.sort_by(|(ka, _), (kb, _)| {
        for (i, cond) in conditions.iter().enumerate() {
            let ord = crate::value::order_by_cmp(ka[i].as_ref(), kb[i].as_ref());
            let ord = if cond.descending { ord.reverse() } else { ord };
            if ord != std::cmp::Ordering::Equal {
                return ord;
            }
        }
        std::cmp::Ordering::Equal
    });
    Ok(keyed.into_iter().map(|(_, row)| row).collect())
}

pub fn limit_offset(rows: Vec<BindingRow>, limit: Option<i64>, offset: Option<i64>) -> Vec<BindingRow> {
    let offset = offset.unwrap_or(0).max(0) as usize;
    let skipped: Vec<BindingRow> = rows.into_iter().skip(offset).collect();
    match limit {
        Some(n) if n >= 0 => skipped.into_iter().take(n as usize).collect(),
        _ => skipped,
    }
}

/// `Union`: concatenates the independently-evaluated rows of each branch.
pub fn union(branch_results: Vec<Vec<BindingRow>>) -> Vec<BindingRow> {
    branch_results.into_iter().flatten().collect()
}

/// `Optional`: a left-outer join. An outer row that produces no inner match
/// is kept unchanged; one that produces matches is extended by each of them.
pub fn optional_join(outer: Vec<BindingRow>, inner_results: Vec<Vec<BindingRow>>) -> Vec<BindingRow> {
    outer
        .into_iter()
        .zip(inner_results)
        .flat_map(|(row, matches)| {
            if matches.is_empty() {
                vec![row]
            } else {
                matches.into_iter().filter_map(|m| row.merge_compatible(&m)).collect()
            }
        })
        .collect()
}

/// `Minus`: drops a left row if it shares a compatible binding with any
/// independently-computed right row.
pub fn minus_join(outer: Vec<BindingRow>, right_rows: &[BindingRow]) -> Vec<BindingRow> {
    outer.into_iter().filter(|row| !right_rows.iter().any(|r| row.shares_compatible_binding(r))).collect()
}

pub fn bound_variable(term: &PatternTerm) -> Option<VarId> {
    match term {
        PatternTerm::Var(var, _) => Some(*var),
        PatternTerm::Bound(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fukurow_core::model::Quad;
    use fukurow_store::QuadStore;

    fn var(name: &str) -> PatternTerm {
        PatternTerm::Var(VarId::from_name(name), name.to_string())
    }

    fn bound(iri: &str) -> PatternTerm {
        PatternTerm::Bound(Term::iri(iri))
    }

    #[test]
    fn scan_extends_row_with_matching_quads() {
        let store = QuadStore::new();
        store.add_current(Quad::new(Term::iri("s"), Term::iri("p"), Term::iri("o"))).unwrap();
        let read = store.acquire_read().unwrap();

        let pattern = TriplePattern { subject: bound("s"), predicate: bound("p"), object: var("o") };
        let rows = scan_triple_pattern(&read, &pattern, &BindingRow::new());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get(VarId::from_name("o")), Some(&Term::iri("o")));
    }

    #[test]
    fn scan_rejects_self_join_mismatch() {
        let store = QuadStore::new();
        store.add_current(Quad::new(Term::iri("s"), Term::iri("p"), Term::iri("o"))).unwrap();
        let read = store.acquire_read().unwrap();

        let pattern = TriplePattern { subject: var("x"), predicate: bound("p"), object: var("x") };
        let rows = scan_triple_pattern(&read, &pattern, &BindingRow::new());
        assert!(rows.is_empty());
    }

    #[test]
    fn optional_keeps_outer_row_when_no_match() {
        let mut row = BindingRow::new();
        row.bind(VarId::from_name("s"), Term::iri("s"));
        let outer = vec![row.clone()];
        let result = optional_join(outer, vec![vec![]]);
        assert_eq!(result, vec![row]);
    }

    #[test]
    fn minus_drops_rows_sharing_a_binding() {
        let mut left = BindingRow::new();
        left.bind(VarId::from_name("x"), Term::iri("1"));
        let mut right = BindingRow::new();
        right.bind(VarId::from_name("x"), Term::iri("1"));

        let result = minus_join(vec![left], &[right]);
        assert!(result.is_empty());
    }
}
