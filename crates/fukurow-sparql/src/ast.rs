//! The parsed query tree.
//!
//! Triple-pattern positions and graph-pattern structure are resolved
//! eagerly into `Term`/`VarId` values as the parser walks the source
//! (interning is cheap and the store boundary needs owned terms anyway).
//! `FILTER` and solution-modifier expressions keep a positional
//! design: each is a `Span` into the shared source text, re-evaluated by
//! walking that text rather than a separately built expression tree — the
//! one place this AST stays truly zero-copy, because it is the one place
//! that needs to be (compound `EXISTS` substitution and `REGEX`/
//! `GROUP_CONCAT` read the exact source bytes).

use crate::span::Span;
use fukurow_core::model::{Term, VarId};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternTerm {
    Var(VarId, String),
    Bound(Term),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriplePattern {
    pub subject: PatternTerm,
    pub predicate: PatternTerm,
    pub object: PatternTerm,
}

/// A `FILTER` expression: the raw span of its boolean expression, plus any
/// `EXISTS`/`NOT EXISTS` clauses found inside it (empty for a plain
/// expression, non-empty for a "compound EXISTS" per §4.4).
#[derive(Debug, Clone)]
pub struct FilterExpr {
    pub span: Span,
    pub exists_refs: Vec<ExistsRef>,
}

/// A recorded `EXISTS { ... }` / `NOT EXISTS { ... }` occurrence inside a
/// `FilterExpr`'s text: `offset`/`length` are relative to the enclosing
/// `FilterExpr.span`, matching exactly the `EXISTS { ... }` token so its
/// boolean result can be substituted back into that byte range.
#[derive(Debug, Clone)]
pub struct ExistsRef {
    pub offset: usize,
    pub length: usize,
    pub negated: bool,
    pub pattern: GraphPattern,
}

/// A standalone `FILTER EXISTS { ... }` / `FILTER NOT EXISTS { ... }`: the
/// parser classifies these as `ExistsFilter`, never also as a `FilterExpr`.
#[derive(Debug, Clone)]
pub struct ExistsFilter {
    pub negated: bool,
    pub pattern: GraphPattern,
}

#[derive(Debug, Clone)]
pub struct MinusBlock {
    pub pattern: GraphPattern,
}

#[derive(Debug, Clone)]
pub struct UnionBlock {
    pub branches: Vec<GraphPattern>,
}

#[derive(Debug, Clone)]
pub struct SubSelect {
    pub query: Box<SparqlQuery>,
}

#[derive(Debug, Clone, Default)]
pub struct GraphPattern {
    pub triples: Vec<TriplePattern>,
    pub filters: Vec<FilterExpr>,
    pub exists_filters: Vec<ExistsFilter>,
    pub optionals: Vec<GraphPattern>,
    pub minus_blocks: Vec<MinusBlock>,
    pub unions: Vec<UnionBlock>,
    pub subselects: Vec<SubSelect>,
}

impl GraphPattern {
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
            && self.filters.is_empty()
            && self.exists_filters.is_empty()
            && self.optionals.is_empty()
            && self.minus_blocks.is_empty()
            && self.unions.is_empty()
            && self.subselects.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFunction {
    Count,
    CountStar,
    Sum,
    Min,
    Max,
    Avg,
    Sample,
    GroupConcat,
}

#[derive(Debug, Clone)]
pub struct AggregateDescriptor {
    pub function: AggFunction,
    pub distinct: bool,
    pub variable: Option<VarId>,
    pub variable_span: Option<Span>,
    pub alias: VarId,
    pub alias_name: String,
    pub separator: Option<String>,
    /// The source span of the whole aggregate call (e.g. `COUNT(?o)`), used
    /// to substitute its computed value into a `HAVING` expression by
    /// lexical match when the call isn't referenced by alias.
    pub call_span: Span,
}

#[derive(Debug, Clone)]
pub enum ProjectVar {
    Var(VarId, String),
    Expr { span: Span, alias: VarId, alias_name: String },
}

#[derive(Debug, Clone, Default)]
pub struct SelectClause {
    pub distinct: bool,
    pub reduced: bool,
    pub star: bool,
    pub vars: Vec<ProjectVar>,
    pub aggregates: Vec<AggregateDescriptor>,
}

#[derive(Debug, Clone, Copy)]
pub struct OrderCondition {
    pub span: Span,
    pub descending: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SolutionModifier {
    pub group_by: Vec<VarId>,
    pub having: Option<Span>,
    pub order_by: Vec<OrderCondition>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Select,
    Ask,
    Construct,
    Describe,
}

#[derive(Debug, Clone, Default)]
pub struct Prologue {
    pub prefixes: HashMap<String, String>,
    pub base: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SparqlQuery {
    pub prologue: Prologue,
    pub query_type: QueryType,
    pub select: Option<SelectClause>,
    pub construct_template: Vec<TriplePattern>,
    pub where_clause: GraphPattern,
    pub modifier: SolutionModifier,
}
