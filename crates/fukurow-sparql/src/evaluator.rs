//! Ties the parser, filter analyzer, pattern planner, streaming operators
//! and aggregator together into one `evaluate_query` entry point.
//!
//! Compound `EXISTS` is resolved the way the design note calls for:
//! each `ExistsRef`'s nested pattern is evaluated first, and its boolean
//! result is substituted as literal `true`/`false` text into the filter's
//! expression before that expression is parsed and evaluated — no second,
//! persisted expression tree is ever built for it.

use crate::aggregate;
use crate::ast::{ExistsFilter, FilterExpr, GraphPattern, PatternTerm, ProjectVar, QueryType, SparqlQuery};
use crate::bindings::BindingRow;
use crate::config::{self, EngineConfig};
use crate::exprlang;
use crate::operators;
use crate::parser::{self, ParseError};
use crate::planner;
use fukurow_core::model::{Quad, Term, VarId};
use fukurow_store::{QuadStore, StoreError};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("evaluation error: {0}")]
    Evaluation(String),
}

#[derive(Debug, Clone)]
pub enum ExecutionResult {
    Select { vars: Vec<(VarId, String)>, rows: Vec<BindingRow> },
    Ask(bool),
    Construct(Vec<Quad>),
}

pub fn evaluate_query(store: &QuadStore, source: &str, cfg: &EngineConfig) -> Result<ExecutionResult, EngineError> {
    let span = tracing::info_span!("evaluate_query");
    let _enter = span.enter();

    let query = parser::parse(source)?;

    let read = store.acquire_read()?;
    let rows = {
        let span = tracing::debug_span!("eval_where_clause");
        let _enter = span.enter();
        config::execute_on_scoped_thread(cfg.worker_stack_size, || {
            eval_graph_pattern(&read, &query.where_clause, source, &query.prologue, vec![BindingRow::new()], cfg)
        })?
    };

    match query.query_type {
        QueryType::Ask => Ok(ExecutionResult::Ask(!rows.is_empty())),
        QueryType::Construct => Ok(ExecutionResult::Construct(construct(&query.construct_template, &rows))),
        QueryType::Describe => Ok(ExecutionResult::Select { vars: Vec::new(), rows }),
        QueryType::Select => {
            let select = query.select.as_ref().ok_or_else(|| EngineError::Evaluation("SELECT query missing select clause".into()))?;
            let mut rows = rows;

            if !select.aggregates.is_empty() || !query.modifier.group_by.is_empty() {
                let span = tracing::debug_span!("aggregate");
                let _enter = span.enter();
                rows = aggregate::evaluate(rows, &query.modifier.group_by, &select.aggregates);
            }

            if let Some(having) = &query.modifier.having {
                let text = having.text(source);
                let mut kept = Vec::with_capacity(rows.len());
                for row in rows {
                    if aggregate::evaluate_having(text, &select.aggregates, source, &row, &query.prologue)?.unwrap_or(false) {
                        kept.push(row);
                    }
                }
                rows = kept;
            }

            if let Some(cap) = cfg.materialize_soft_cap {
                if rows.len() > cap {
                    tracing::warn!(rows = rows.len(), cap, "row count materialized for ORDER BY/DISTINCT exceeds the configured soft cap");
                }
            }

            rows = operators::order_by(rows, &query.modifier.order_by, source, &query.prologue)?;

            if select.distinct || select.reduced {
                rows = operators::distinct(rows);
            }

            rows = operators::limit_offset(rows, query.modifier.limit, query.modifier.offset);
            let rows = project(select, source, &query.prologue, rows)?;
            let vars = projected_vars(select);
            Ok(ExecutionResult::Select { vars, rows })
        }
    }
}

fn projected_vars(select: &crate::ast::SelectClause) -> Vec<(VarId, String)> {
    let mut vars: Vec<(VarId, String)> = select
        .vars
        .iter()
        .map(|v| match v {
            ProjectVar::Var(id, name) => (*id, name.clone()),
            ProjectVar::Expr { alias, alias_name, .. } => (*alias, alias_name.clone()),
        })
        .collect();
    for agg in &select.aggregates {
        vars.push((agg.alias, agg.alias_name.clone()));
    }
    vars
}

fn project(
    select: &crate::ast::SelectClause,
    source: &str,
    prologue: &crate::ast::Prologue,
    rows: Vec<BindingRow>,
) -> Result<Vec<BindingRow>, EngineError> {
    if select.star {
        return Ok(rows);
    }
    let mut projected = Vec::with_capacity(rows.len());
    for row in rows {
        let mut out = BindingRow::new();
        for var in &select.vars {
            match var {
                ProjectVar::Var(id, _) => {
                    if let Some(value) = row.get(*id) {
                        out.bind(*id, value.clone());
                    }
                }
                ProjectVar::Expr { span, alias, .. } => {
                    let text = span.text(source);
                    let value = exprlang::eval(text, &row, prologue).map_err(|e| EngineError::Evaluation(e.to_string()))?;
                    if let Some(term) = value.as_term() {
                        out.bind(*alias, term.clone());
                    }
                }
            }
        }
        for agg in &select.aggregates {
            if let Some(value) = row.get(agg.alias) {
                out.bind(agg.alias, value.clone());
            }
        }
        projected.push(out);
    }
    Ok(projected)
}

fn construct(template: &[crate::ast::TriplePattern], rows: &[BindingRow]) -> Vec<Quad> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for row in rows {
        for pattern in template {
            let (Some(s), Some(p), Some(o)) =
                (resolve_term(&pattern.subject, row), resolve_term(&pattern.predicate, row), resolve_term(&pattern.object, row))
            else {
                continue;
            };
            let quad = Quad::new(s, p, o);
            if seen.insert(quad.clone()) {
                out.push(quad);
            }
        }
    }
    out
}

fn resolve_term(term: &PatternTerm, row: &BindingRow) -> Option<Term> {
    match term {
        PatternTerm::Bound(t) => Some(t.clone()),
        PatternTerm::Var(var, _) => row.get(*var).cloned(),
    }
}

/// Evaluates one graph pattern against `input` rows: joins its basic graph
/// pattern (with analyzer-pushed-down filters), then applies `OPTIONAL`,
/// `MINUS`, `UNION`, compound/standalone `EXISTS` and sub-`SELECT`s in the
/// order they appear.
pub fn eval_graph_pattern(
    store: &fukurow_store::ReadLock,
    pattern: &GraphPattern,
    source: &str,
    prologue: &crate::ast::Prologue,
    input: Vec<BindingRow>,
    cfg: &EngineConfig,
) -> Result<Vec<BindingRow>, EngineError> {
    let plan = planner::build_plan(&pattern.triples, &pattern.filters, source);
    let mut rows = operators::join_triples(store, &plan.triples, &plan.level_filters, source, prologue, input)?;
    rows = operators::apply_filters(&plan.post_join_filters, source, prologue, store, rows)?;

    for exists in &pattern.exists_filters {
        rows = filter_by_exists_block(store, exists, source, prologue, rows, cfg)?;
    }

    for optional in &pattern.optionals {
        let inner_results: Result<Vec<Vec<BindingRow>>, EngineError> = rows
            .iter()
            .map(|row| eval_graph_pattern(store, optional, source, prologue, vec![row.clone()], cfg))
            .collect();
        rows = operators::optional_join(rows, inner_results?);
    }

    for minus in &pattern.minus_blocks {
        let right_rows = eval_graph_pattern(store, &minus.pattern, source, prologue, vec![BindingRow::new()], cfg)?;
        rows = operators::minus_join(rows, &right_rows);
    }

    for union in &pattern.unions {
        let mut branch_outputs = Vec::with_capacity(union.branches.len());
        for branch in &union.branches {
            branch_outputs.push(eval_graph_pattern(store, branch, source, prologue, rows.clone(), cfg)?);
        }
        rows = operators::union(branch_outputs);
    }

    for subselect in &pattern.subselects {
        let cfg_default = EngineConfig::default();
        let result = evaluate_subquery(store, &subselect.query, source, prologue, &cfg_default)?;
        rows = rows
            .iter()
            .flat_map(|row| result.iter().filter_map(move |s| row.merge_compatible(s)))
            .collect();
    }

    Ok(rows)
}

/// Evaluates a `SELECT` sub-query's `WHERE` clause independently (a
/// sub-`SELECT` establishes its own scope) and returns its projected rows,
/// ready to be joined against the outer pattern's rows.
fn evaluate_subquery(
    store: &fukurow_store::ReadLock,
    query: &SparqlQuery,
    source: &str,
    _outer_prologue: &crate::ast::Prologue,
    cfg: &EngineConfig,
) -> Result<Vec<BindingRow>, EngineError> {
    let rows = eval_graph_pattern(store, &query.where_clause, source, &query.prologue, vec![BindingRow::new()], cfg)?;
    let Some(select) = &query.select else { return Ok(rows) };
    let mut rows = rows;
    if !select.aggregates.is_empty() || !query.modifier.group_by.is_empty() {
        rows = aggregate::evaluate(rows, &query.modifier.group_by, &select.aggregates);
    }
    rows = operators::order_by(rows, &query.modifier.order_by, source, &query.prologue)?;
    if select.distinct || select.reduced {
        rows = operators::distinct(rows);
    }
    rows = operators::limit_offset(rows, query.modifier.limit, query.modifier.offset);
    project(select, source, &query.prologue, rows)
}

fn filter_by_exists_block(
    store: &fukurow_store::ReadLock,
    exists: &ExistsFilter,
    source: &str,
    prologue: &crate::ast::Prologue,
    rows: Vec<BindingRow>,
    cfg: &EngineConfig,
) -> Result<Vec<BindingRow>, EngineError> {
    let mut kept = Vec::with_capacity(rows.len());
    for row in rows {
        let matches = eval_graph_pattern(store, &exists.pattern, source, prologue, vec![row.clone()], cfg)?;
        let exists_truth = !matches.is_empty();
        if exists_truth != exists.negated {
            kept.push(row);
        }
    }
    Ok(kept)
}

/// Evaluates a single `FilterExpr`: compound `EXISTS` clauses are resolved
/// and textually substituted first, then the (now EXISTS-free) expression
/// text is evaluated.
pub fn eval_filter(
    store: &fukurow_store::ReadLock,
    source: &str,
    prologue: &crate::ast::Prologue,
    filter: &FilterExpr,
    row: &BindingRow,
) -> Result<Option<bool>, EngineError> {
    let cfg = EngineConfig::default();
    let text = if filter.exists_refs.is_empty() {
        filter.span.text(source).to_string()
    } else {
        let mut text = filter.span.text(source).to_string();
        let mut refs: Vec<&crate::ast::ExistsRef> = filter.exists_refs.iter().collect();
        refs.sort_by(|a, b| b.offset.cmp(&a.offset));
        for exists_ref in refs {
            let matches = eval_graph_pattern(store, &exists_ref.pattern, source, prologue, vec![row.clone()], &cfg)?;
            let exists_truth = !matches.is_empty();
            let substituted = if exists_ref.negated { !exists_truth } else { exists_truth };
            let replacement = if substituted { "true" } else { "false" };
            text.replace_range(exists_ref.offset..exists_ref.offset + exists_ref.length, replacement);
        }
        text
    };
    exprlang::eval(&text, row, prologue).map(|v| v.ebv()).map_err(|e| EngineError::Evaluation(e.to_string()))
}
