//! Aggregation: groups rows by `GROUP BY` variables and computes each
//! `SELECT`-clause aggregate per group, then applies `HAVING`.

use crate::ast::{AggFunction, AggregateDescriptor};
use crate::bindings::BindingRow;
use crate::value;
use crate::EngineError;
use fukurow_core::model::{Literal, Term, VarId, XSD};
use std::collections::HashMap;

fn group_key(row: &BindingRow, group_by: &[VarId]) -> Vec<Option<Term>> {
    group_by.iter().map(|v| row.get(*v).cloned()).collect()
}

/// Groups `rows` by `group_by` (a single, all-rows group when empty) and
/// emits one output row per group: the group's own bindings plus one
/// binding per aggregate, keyed by its alias.
pub fn evaluate(rows: Vec<BindingRow>, group_by: &[VarId], aggregates: &[AggregateDescriptor]) -> Vec<BindingRow> {
    let mut groups: HashMap<Vec<Option<Term>>, Vec<BindingRow>> = HashMap::new();
    if rows.is_empty() {
        groups.entry(vec![None; group_by.len()]).or_default();
    } else {
        for row in rows {
            groups.entry(group_key(&row, group_by)).or_default().push(row);
        }
    }

    groups
        .into_values()
        .map(|group_rows| {
            let mut out = group_rows.first().cloned().unwrap_or_default();
            // Keep only the GROUP BY bindings in the representative row;
            // non-grouped variables from an arbitrary member would be
            // misleading once rows have been collapsed into one.
            let mut projected = BindingRow::new();
            for var in group_by {
                if let Some(term) = out.get(*var) {
                    projected.bind(*var, term.clone());
                }
            }
            out = projected;
            for agg in aggregates {
                if let Some(value) = compute(agg, &group_rows) {
                    out.bind(agg.alias, value);
                }
            }
            out
        })
        .collect()
}

fn bound_values(agg: &AggregateDescriptor, rows: &[BindingRow]) -> Vec<Term> {
    let Some(var) = agg.variable else { return Vec::new() };
    let values: Vec<Term> = rows.iter().filter_map(|r| r.get(var).cloned()).collect();
    if agg.distinct {
        distinct_values(values)
    } else {
        values
    }
}

fn distinct_values(values: Vec<Term>) -> Vec<Term> {
    let mut kept: Vec<Term> = Vec::new();
    for value in values {
        let already_present = kept.iter().any(|k| match value::compare_terms(k, &value) {
            Some(ord) => ord == std::cmp::Ordering::Equal,
            None => value::terms_equal(k, &value),
        });
        if !already_present {
            kept.push(value);
        }
    }
    kept
}

fn compute(agg: &AggregateDescriptor, rows: &[BindingRow]) -> Option<Term> {
    match agg.function {
        AggFunction::CountStar => Some(integer(rows.len() as i64)),
        AggFunction::Count => Some(integer(bound_values(agg, rows).len() as i64)),
        AggFunction::Sum => {
            let values = bound_values(agg, rows);
            let total: f64 = values.iter().filter_map(|t| t.as_numeric_literal()).filter_map(value::numeric_value).sum();
            Some(decimal_or_integer(total, values.is_empty()))
        }
        AggFunction::Avg => {
            let values = bound_values(agg, rows);
            if values.is_empty() {
                return Some(integer(0));
            }
            let total: f64 = values.iter().filter_map(|t| t.as_numeric_literal()).filter_map(value::numeric_value).sum();
            Some(Term::Literal(Literal::typed(&format!("{}", total / values.len() as f64), &format!("{XSD}decimal"))))
        }
        AggFunction::Min => bound_values(agg, rows)
            .into_iter()
            .min_by(|a, b| value::compare_terms(a, b).unwrap_or(std::cmp::Ordering::Equal)),
        AggFunction::Max => bound_values(agg, rows)
            .into_iter()
            .max_by(|a, b| value::compare_terms(a, b).unwrap_or(std::cmp::Ordering::Equal)),
        AggFunction::Sample => bound_values(agg, rows).into_iter().next(),
        AggFunction::GroupConcat => {
            let separator = agg.separator.clone().unwrap_or_else(|| " ".to_string());
            let joined = bound_values(agg, rows)
                .iter()
                .map(|t| match t {
                    Term::Literal(lit) => lit.lexical.to_string(),
                    other => other.display_string(),
                })
                .collect::<Vec<_>>()
                .join(&separator);
            Some(Term::Literal(Literal::plain(&joined)))
        }
    }
}

fn integer(n: i64) -> Term {
    Term::Literal(Literal::typed(&n.to_string(), &format!("{XSD}integer")))
}

fn decimal_or_integer(total: f64, empty: bool) -> Term {
    if empty {
        return integer(0);
    }
    if total.fract() == 0.0 {
        integer(total as i64)
    } else {
        Term::Literal(Literal::typed(&format!("{total}"), &format!("{XSD}decimal")))
    }
}

/// Rewrites a `HAVING` expression by substituting each aggregate's raw call
/// text (e.g. `COUNT(?o)`) with its computed literal value, then evaluates
/// the result as an ordinary boolean expression. A `HAVING` that instead
/// references an aggregate's alias needs no substitution: the group row
/// already binds that alias.
pub fn evaluate_having(
    having_text: &str,
    aggregates: &[AggregateDescriptor],
    source: &str,
    row: &BindingRow,
    prologue: &crate::ast::Prologue,
) -> Result<Option<bool>, EngineError> {
    let mut text = having_text.to_string();
    for agg in aggregates {
        let call_text = agg.call_span.text(source);
        if let Some(value) = row.get(agg.alias) {
            let substitute = match value {
                Term::Literal(lit) => lit.lexical.to_string(),
                other => other.display_string(),
            };
            text = text.replace(call_text, &substitute);
        }
    }
    crate::exprlang::eval(&text, row, prologue)
        .map(|v| v.ebv())
        .map_err(|e| EngineError::Evaluation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;

    fn row_with(var: &str, value: i64) -> BindingRow {
        let mut row = BindingRow::new();
        row.bind(VarId::from_name(var), integer(value));
        row
    }

    #[test]
    fn count_star_counts_all_rows_regardless_of_bindings() {
        let rows = vec![row_with("x", 1), row_with("x", 2)];
        let agg = AggregateDescriptor {
            function: AggFunction::CountStar,
            distinct: false,
            variable: None,
            variable_span: None,
            alias: VarId::from_name("n"),
            alias_name: "n".into(),
            separator: None,
            call_span: Span::new(0, 0),
        };
        assert_eq!(compute(&agg, &rows), Some(integer(2)));
    }

    #[test]
    fn avg_of_empty_group_is_zero_not_unbound() {
        let agg = AggregateDescriptor {
            function: AggFunction::Avg,
            distinct: false,
            variable: Some(VarId::from_name("x")),
            variable_span: None,
            alias: VarId::from_name("avg"),
            alias_name: "avg".into(),
            separator: None,
            call_span: Span::new(0, 0),
        };
        assert_eq!(compute(&agg, &[]), Some(integer(0)));
    }

    #[test]
    fn sum_with_distinct_dedupes_equal_numeric_values() {
        let rows = vec![row_with("x", 5), row_with("x", 5), row_with("x", 3)];
        let agg = AggregateDescriptor {
            function: AggFunction::Sum,
            distinct: true,
            variable: Some(VarId::from_name("x")),
            variable_span: None,
            alias: VarId::from_name("total"),
            alias_name: "total".into(),
            separator: None,
            call_span: Span::new(0, 0),
        };
        assert_eq!(compute(&agg, &rows), Some(integer(8)));
    }
}
