//! Filter analyzer: decides, for each `FILTER` in a graph pattern, the
//! earliest triple-pattern level at which every variable it reads is
//! already bound, so the planner can push it down instead of waiting for
//! the whole basic graph pattern to finish joining.

use crate::ast::{FilterExpr, TriplePattern};
use fukurow_core::model::VarId;
use std::collections::HashSet;

/// `GetFilterVariables`: every `?var`/`$var` mentioned in `text`, skipping
/// occurrences inside quoted string literals so a `"?not-a-var"` inside a
/// `REGEX` pattern argument isn't mistaken for a variable reference.
pub fn filter_variables(text: &str) -> HashSet<VarId> {
    let mut vars = HashSet::new();
    let bytes = text.as_bytes();
    let mut i = 0;
    let mut in_string: Option<u8> = None;
    while i < bytes.len() {
        let c = bytes[i];
        match in_string {
            Some(quote) => {
                if c == b'\\' {
                    i += 1;
                } else if c == quote {
                    in_string = None;
                }
            }
            None => match c {
                b'"' | b'\'' => in_string = Some(c),
                b'?' | b'$' => {
                    let start = i + 1;
                    let mut end = start;
                    while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
                        end += 1;
                    }
                    if end > start {
                        vars.insert(VarId::from_name(&text[start..end]));
                        i = end - 1;
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    vars
}

/// `ContainsExists`: a compound filter references `EXISTS`/`NOT EXISTS`
/// when the parser recorded any `ExistsRef`s for it.
pub fn contains_exists(filter: &FilterExpr) -> bool {
    !filter.exists_refs.is_empty()
}

/// `GetEarliestApplicablePattern`: the index (into `triples`, already in
/// planner order) of the first pattern after which every variable `filter`
/// reads is bound. A filter referencing no variables is a constant and can
/// run at level 0; a filter with a compound `EXISTS`, or one referencing a
/// variable no pattern ever binds, is unpushable and reported as
/// `triples.len()` (applied once the whole basic graph pattern has joined).
pub fn earliest_applicable_level(filter: &FilterExpr, source: &str, triples: &[TriplePattern]) -> usize {
    if contains_exists(filter) {
        return triples.len();
    }
    let vars = filter_variables(filter.span.text(source));
    if vars.is_empty() {
        return 0;
    }
    let mut latest = 0usize;
    for var in &vars {
        match triples.iter().position(|t| pattern_binds(t, *var)) {
            Some(idx) => latest = latest.max(idx + 1),
            None => return triples.len(),
        }
    }
    latest
}

fn pattern_binds(pattern: &TriplePattern, var: VarId) -> bool {
    use crate::ast::PatternTerm::Var;
    [&pattern.subject, &pattern.predicate, &pattern.object]
        .iter()
        .any(|t| matches!(t, Var(v, _) if *v == var))
}

/// `BuildLevelFilters`: buckets pushable filters by `earliest_applicable_level`,
/// one bucket per triple-pattern level. Unpushable filters (including every
/// compound-`EXISTS` filter) are returned separately by
/// [`unpushable_filters`] and applied after the full join.
pub fn build_level_filters(filters: &[FilterExpr], source: &str, triples: &[TriplePattern]) -> Vec<Vec<FilterExpr>> {
    let mut levels = vec![Vec::new(); triples.len()];
    for filter in filters {
        let level = earliest_applicable_level(filter, source, triples);
        if level < triples.len() {
            levels[level].push(filter.clone());
        }
    }
    levels
}

/// `GetUnpushableFilters`: filters whose earliest applicable level is past
/// the end of the pattern list (no patterns at all, a compound `EXISTS`, or
/// a variable reference that's never bound in this basic graph pattern).
pub fn unpushable_filters(filters: &[FilterExpr], source: &str, triples: &[TriplePattern]) -> Vec<FilterExpr> {
    filters
        .iter()
        .filter(|f| earliest_applicable_level(f, source, triples) >= triples.len())
        .cloned()
        .collect()
}
