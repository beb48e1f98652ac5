//! Hand-written recursive-descent SPARQL parser.
//!
//! Builds a [`crate::ast::SparqlQuery`] in a single pass over the source
//! text, recording `FILTER`/`HAVING`/`ORDER BY` expressions as
//! [`crate::span::Span`]s rather than copying them, and resolving prefixed
//! names and literals eagerly into `fukurow_core::model::Term` values. See
//! [`crate::ast`] for why the split is made there.
//!
//! Supports the grammar subset named in scope: prologue, `SELECT`
//! (`DISTINCT`/`REDUCED`, bare/aggregate/`AS` projections), `ASK`, `WHERE`,
//! triple patterns with `;`/`,` lists and the `a` shorthand, `OPTIONAL`,
//! `MINUS` (arbitrarily nested), `UNION`, sub-`SELECT`, `FILTER` including
//! `EXISTS`/`NOT EXISTS` (standalone and compound-inside-a-larger-
//! expression), `GROUP BY`/`HAVING`, `ORDER BY` (`ASC`/`DESC`),
//! `LIMIT`/`OFFSET`. Property paths are limited to a direct predicate or
//! `a`, matching the grammar this engine supports.

use crate::ast::*;
use crate::lexer::{classify, is_reserved};
use crate::span::Span;
use fukurow_core::model::{Literal, Term, VarId, XSD};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("syntax error at offset {offset}: {reason}")]
    Syntax { offset: usize, reason: String },
    #[error("unknown prefix '{prefix}' at offset {offset}")]
    UnknownPrefix { offset: usize, prefix: String },
}

const AGGREGATE_NAMES: &[(&str, AggFunction)] = &[
    ("COUNT", AggFunction::Count),
    ("SUM", AggFunction::Sum),
    ("MIN", AggFunction::Min),
    ("MAX", AggFunction::Max),
    ("AVG", AggFunction::Avg),
    ("SAMPLE", AggFunction::Sample),
    ("GROUP_CONCAT", AggFunction::GroupConcat),
];

pub struct Parser<'a> {
    source: &'a str,
    pos: usize,
    prologue: Prologue,
}

type PResult<T> = Result<T, ParseError>;

pub fn parse(source: &str) -> PResult<SparqlQuery> {
    let mut parser = Parser { source, pos: 0, prologue: Prologue::default() };
    parser.parse_query()
}

impl<'a> Parser<'a> {
    fn err(&self, reason: impl Into<String>) -> ParseError {
        ParseError::Syntax { offset: self.pos, reason: reason.into() }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.source.get(offset..)?.chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn is_ident_char(c: char) -> bool {
        c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
    }

    fn word_at(&self, start: usize) -> Option<(&'a str, usize)> {
        let mut end = start;
        for c in self.source[start..].chars() {
            if c.is_alphanumeric() || c == '_' {
                end += c.len_utf8();
            } else {
                break;
            }
        }
        if end == start {
            None
        } else {
            Some((&self.source[start..end], end))
        }
    }

    /// True if the upcoming (already-skipped-whitespace) token is `word`.
    /// Reserved words classify case-insensitively via the keyword
    /// pre-pass; anything the pre-pass doesn't recognize (a prefix label,
    /// a variable name) falls back to plain comparison so callers can
    /// still probe for non-keyword tokens (e.g. `true`/`false`).
    fn looks_like(&self, word: &str) -> bool {
        match self.word_at(self.pos) {
            Some((found, _)) => match (classify(word), classify(found)) {
                (Some(expected), Some(actual)) => expected == actual,
                _ => found.eq_ignore_ascii_case(word),
            },
            None => false,
        }
    }

    fn consume_keyword(&mut self, word: &str) -> bool {
        self.skip_ws();
        if self.looks_like(word) {
            if let Some((_, end)) = self.word_at(self.pos) {
                self.pos = end;
                return true;
            }
        }
        false
    }

    fn expect_char(&mut self, c: char) -> PResult<()> {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("expected '{c}'")))
        }
    }

    fn try_char(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.advance();
            true
        } else {
            false
        }
    }

    // ---- top level ----

    fn parse_query(&mut self) -> PResult<SparqlQuery> {
        self.parse_prologue()?;
        self.skip_ws();
        let query_type = if self.consume_keyword("SELECT") {
            QueryType::Select
        } else if self.consume_keyword("ASK") {
            QueryType::Ask
        } else if self.consume_keyword("CONSTRUCT") {
            QueryType::Construct
        } else if self.consume_keyword("DESCRIBE") {
            QueryType::Describe
        } else {
            return Err(self.err("expected SELECT, ASK, CONSTRUCT, or DESCRIBE"));
        };

        let select = if query_type == QueryType::Select {
            Some(self.parse_select_clause()?)
        } else {
            None
        };

        let construct_template = if query_type == QueryType::Construct {
            self.expect_char('{')?;
            let tpl = self.parse_triple_block()?;
            self.expect_char('}')?;
            tpl
        } else if query_type == QueryType::Describe {
            // Skip the resource list; DESCRIBE's variable binding rides on WHERE.
            loop {
                self.skip_ws();
                match self.peek() {
                    Some('?') | Some('$') => {
                        self.parse_term()?;
                    }
                    Some('<') => {
                        self.parse_term()?;
                    }
                    Some(_) if !self.looks_like("WHERE") => {
                        self.parse_term()?;
                    }
                    _ => break,
                }
            }
            Vec::new()
        } else {
            Vec::new()
        };

        self.skip_ws();
        let where_clause = if self.consume_keyword("WHERE") || self.peek() == Some('{') {
            self.parse_group_graph_pattern()?
        } else {
            GraphPattern::default()
        };

        let modifier = self.parse_solution_modifier()?;

        Ok(SparqlQuery {
            prologue: self.prologue.clone(),
            query_type,
            select,
            construct_template,
            where_clause,
            modifier,
        })
    }

    fn parse_prologue(&mut self) -> PResult<()> {
        loop {
            self.skip_ws();
            if self.consume_keyword("PREFIX") {
                self.skip_ws();
                let prefix = self.read_prefix_label()?;
                if is_reserved(&prefix) {
                    return Err(self.err(&format!("'{prefix}' is a reserved word and cannot be used as a prefix label")));
                }
                self.expect_char(':')?;
                self.skip_ws();
                let iri = self.read_iri_ref()?;
                self.prologue.prefixes.insert(prefix, iri);
            } else if self.consume_keyword("BASE") {
                self.skip_ws();
                let iri = self.read_iri_ref()?;
                self.prologue.base = Some(iri);
            } else {
                break;
            }
        }
        Ok(())
    }

    fn read_prefix_label(&mut self) -> PResult<String> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_' || c == '-') {
            self.advance();
        }
        Ok(self.source[start..self.pos].to_string())
    }

    fn read_iri_ref(&mut self) -> PResult<String> {
        self.expect_char('<')?;
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '>' {
                break;
            }
            self.advance();
        }
        let iri = self.source[start..self.pos].to_string();
        self.expect_char('>')?;
        Ok(iri)
    }

    // ---- SELECT clause ----

    fn parse_select_clause(&mut self) -> PResult<SelectClause> {
        let mut clause = SelectClause::default();
        self.skip_ws();
        if self.consume_keyword("DISTINCT") {
            clause.distinct = true;
        } else if self.consume_keyword("REDUCED") {
            clause.reduced = true;
        }
        self.skip_ws();
        if self.peek() == Some('*') {
            self.advance();
            clause.star = true;
            return Ok(clause);
        }

        loop {
            self.skip_ws();
            if self.looks_like("WHERE") || self.peek() == Some('{') {
                break;
            }
            match self.peek() {
                Some('?') | Some('$') => {
                    let (var, name) = self.read_variable()?;
                    clause.vars.push(ProjectVar::Var(var, name));
                }
                Some('(') => {
                    self.advance();
                    self.skip_ws();
                    if let Some(agg) = self.try_parse_aggregate()? {
                        self.skip_ws();
                        if !self.consume_keyword("AS") {
                            return Err(self.err("expected AS after aggregate"));
                        }
                        self.skip_ws();
                        let (alias, alias_name) = self.read_variable()?;
                        self.expect_char(')')?;
                        clause.aggregates.push(AggregateDescriptor { alias, alias_name, ..agg });
                    } else {
                        let expr_start = self.pos;
                        self.skip_balanced_until_keyword("AS")?;
                        let expr_span = Span::new(expr_start, self.pos - expr_start);
                        if !self.consume_keyword("AS") {
                            return Err(self.err("expected AS in projection expression"));
                        }
                        self.skip_ws();
                        let (alias, alias_name) = self.read_variable()?;
                        self.expect_char(')')?;
                        clause.vars.push(ProjectVar::Expr { span: expr_span, alias, alias_name });
                    }
                }
                _ => return Err(self.err("expected variable or (expr AS ?var) in SELECT")),
            }
        }
        Ok(clause)
    }

    /// Attempts to parse `FUNC([DISTINCT] arg|* [; SEPARATOR="sep"])` right
    /// after an already-consumed `(`. Returns `None` (without consuming
    /// anything meaningful) if the upcoming word isn't a known aggregate
    /// name.
    fn try_parse_aggregate(&mut self) -> PResult<Option<AggregateDescriptor>> {
        let call_start = self.pos;
        let Some((word, _)) = self.word_at(self.pos) else { return Ok(None) };
        let Some((_, function)) = AGGREGATE_NAMES.iter().find(|(n, _)| n.eq_ignore_ascii_case(word))
        else {
            return Ok(None);
        };
        let function = *function;
        self.consume_keyword(word);
        self.expect_char('(')?;
        self.skip_ws();
        let distinct = self.consume_keyword("DISTINCT");
        self.skip_ws();

        let (variable, variable_span) = if function == AggFunction::Count && self.peek() == Some('*')
        {
            self.advance();
            (None, None)
        } else {
            let start = self.pos;
            let (var, _) = self.read_variable()?;
            (Some(var), Some(Span::new(start, self.pos - start)))
        };
        let function = if function == AggFunction::Count && variable.is_none() {
            AggFunction::CountStar
        } else {
            function
        };

        let separator = if self.try_char(';') {
            self.skip_ws();
            if !self.consume_keyword("SEPARATOR") {
                return Err(self.err("expected SEPARATOR after ';' in GROUP_CONCAT"));
            }
            self.expect_char('=')?;
            self.skip_ws();
            let lit = self.read_string_literal()?;
            Some(lit.lexical.to_string())
        } else {
            None
        };
        self.expect_char(')')?;
        let call_span = Span::new(call_start, self.pos - call_start);

        Ok(Some(AggregateDescriptor {
            function,
            distinct,
            variable,
            variable_span,
            alias: VarId(0),
            alias_name: String::new(),
            separator,
            call_span,
        }))
    }

    /// Scans forward, respecting quotes/parens, until a top-level
    /// occurrence of `keyword`, without consuming it.
    fn skip_balanced_until_keyword(&mut self, keyword: &str) -> PResult<()> {
        let mut depth = 0i32;
        loop {
            self.skip_ws();
            if depth == 0 && self.looks_like(keyword) {
                return Ok(());
            }
            match self.peek() {
                None => return Err(self.err(format!("unterminated expression looking for {keyword}"))),
                Some('"') | Some('\'') => self.skip_string_literal()?,
                Some('(') => {
                    depth += 1;
                    self.advance();
                }
                Some(')') => {
                    if depth == 0 {
                        return Err(self.err(format!("unexpected ')' looking for {keyword}")));
                    }
                    depth -= 1;
                    self.advance();
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    // ---- graph patterns ----

    fn parse_group_graph_pattern(&mut self) -> PResult<GraphPattern> {
        self.expect_char('{')?;
        let mut pattern = GraphPattern::default();
        loop {
            self.skip_ws();
            match self.peek() {
                Some('}') => {
                    self.advance();
                    break;
                }
                None => return Err(self.err("unterminated graph pattern, expected '}'")),
                Some('{') => self.parse_group_or_union_or_subselect(&mut pattern)?,
                _ if self.looks_like("OPTIONAL") => {
                    self.consume_keyword("OPTIONAL");
                    let inner = self.parse_group_graph_pattern()?;
                    pattern.optionals.push(inner);
                }
                _ if self.looks_like("MINUS") => {
                    self.consume_keyword("MINUS");
                    let inner = self.parse_group_graph_pattern()?;
                    pattern.minus_blocks.push(MinusBlock { pattern: inner });
                }
                _ if self.looks_like("FILTER") => {
                    self.consume_keyword("FILTER");
                    self.parse_filter_clause(&mut pattern)?;
                }
                _ => {
                    self.parse_triple_sequence_into(&mut pattern.triples)?;
                }
            }
            self.skip_ws();
            if self.peek() == Some('.') {
                self.advance();
            }
        }
        Ok(pattern)
    }

    fn parse_group_or_union_or_subselect(&mut self, pattern: &mut GraphPattern) -> PResult<()> {
        let save = self.pos;
        self.advance(); // consume '{'
        self.skip_ws();
        let is_subselect = self.looks_like("SELECT");
        self.pos = save;

        if is_subselect {
            self.advance();
            let inner = Box::new(self.parse_query_inline()?);
            self.expect_char('}')?;
            pattern.subselects.push(SubSelect { query: inner });
            return Ok(());
        }

        let mut branches = vec![self.parse_group_graph_pattern()?];
        loop {
            self.skip_ws();
            if self.looks_like("UNION") {
                self.consume_keyword("UNION");
                self.skip_ws();
                branches.push(self.parse_group_graph_pattern()?);
            } else {
                break;
            }
        }
        if branches.len() == 1 {
            let only = branches.pop().unwrap();
            pattern.triples.extend(only.triples);
            pattern.filters.extend(only.filters);
            pattern.exists_filters.extend(only.exists_filters);
            pattern.optionals.extend(only.optionals);
            pattern.minus_blocks.extend(only.minus_blocks);
            pattern.unions.extend(only.unions);
            pattern.subselects.extend(only.subselects);
        } else {
            pattern.unions.push(UnionBlock { branches });
        }
        Ok(())
    }

    /// Parses a `SELECT ... WHERE { ... } <modifiers>` body for a
    /// sub-SELECT, without a prologue of its own (it inherits the outer
    /// query's prefixes, already accumulated in `self.prologue`).
    fn parse_query_inline(&mut self) -> PResult<SparqlQuery> {
        self.skip_ws();
        if !self.consume_keyword("SELECT") {
            return Err(self.err("expected SELECT in sub-select"));
        }
        let select = self.parse_select_clause()?;
        self.skip_ws();
        if !self.consume_keyword("WHERE") && self.peek() != Some('{') {
            return Err(self.err("expected WHERE in sub-select"));
        }
        let where_clause = self.parse_group_graph_pattern()?;
        let modifier = self.parse_solution_modifier()?;
        Ok(SparqlQuery {
            prologue: self.prologue.clone(),
            query_type: QueryType::Select,
            select: Some(select),
            construct_template: Vec::new(),
            where_clause,
            modifier,
        })
    }

    fn parse_filter_clause(&mut self, pattern: &mut GraphPattern) -> PResult<()> {
        self.skip_ws();
        let pos0 = self.pos;
        let has_paren = self.peek() == Some('(');
        if has_paren {
            self.advance();
            self.skip_ws();
        }

        if let Some(negated) = self.peek_exists_negation() {
            let exists_start = self.pos;
            if negated {
                self.consume_keyword("NOT");
                self.skip_ws();
            }
            self.consume_keyword("EXISTS");
            self.skip_ws();
            let inner = self.parse_group_graph_pattern()?;
            let exists_end = self.pos;
            self.skip_ws();

            if !has_paren {
                pattern.exists_filters.push(ExistsFilter { negated, pattern: inner });
                return Ok(());
            }
            if self.peek() == Some(')') {
                self.advance();
                pattern.exists_filters.push(ExistsFilter { negated, pattern: inner });
                return Ok(());
            }
            // A compound expression like `(EXISTS {...} && ?x)`: backtrack
            // and fall through to the generic expression scanner, passing
            // along the EXISTS we already parsed to avoid redoing the work.
            let pre_parsed = (exists_start - pos0 - 1, exists_end - exists_start, negated, inner);
            self.pos = pos0;
            return self.parse_compound_filter_expr(pattern, Some(pre_parsed));
        }

        self.pos = pos0;
        self.parse_compound_filter_expr(pattern, None)
    }

    fn peek_exists_negation(&mut self) -> Option<bool> {
        if self.looks_like("EXISTS") {
            return Some(false);
        }
        if self.looks_like("NOT") {
            let save = self.pos;
            self.consume_keyword("NOT");
            self.skip_ws();
            let is_exists = self.looks_like("EXISTS");
            self.pos = save;
            if is_exists {
                return Some(true);
            }
        }
        None
    }

    /// Parses `FILTER(...)` as a boolean expression, recording its span and
    /// any `EXISTS`/`NOT EXISTS` occurrences found at the top level inside.
    fn parse_compound_filter_expr(
        &mut self,
        pattern: &mut GraphPattern,
        pre_parsed: Option<(usize, usize, bool, GraphPattern)>,
    ) -> PResult<()> {
        self.expect_char('(')?;
        let expr_start = self.pos;
        let mut exists_refs = Vec::new();
        if let Some((offset, length, negated, inner)) = pre_parsed {
            exists_refs.push(ExistsRef { offset, length, negated, pattern: inner });
            self.pos = expr_start + offset + length;
        }

        let mut depth = 0usize;
        loop {
            match self.peek() {
                None => return Err(self.err("unterminated FILTER expression")),
                Some('"') | Some('\'') => self.skip_string_literal()?,
                Some(')') if depth == 0 => break,
                Some(')') => {
                    depth -= 1;
                    self.advance();
                }
                Some('(') => {
                    depth += 1;
                    self.advance();
                }
                _ if self.looks_like("EXISTS") || self.looks_like("NOT") => {
                    let ref_start = self.pos;
                    let negated = if self.looks_like("NOT") {
                        self.consume_keyword("NOT");
                        self.skip_ws();
                        true
                    } else {
                        false
                    };
                    if self.looks_like("EXISTS") {
                        self.consume_keyword("EXISTS");
                        self.skip_ws();
                        let inner = self.parse_group_graph_pattern()?;
                        exists_refs.push(ExistsRef {
                            offset: ref_start - expr_start,
                            length: self.pos - ref_start,
                            negated,
                            pattern: inner,
                        });
                    }
                }
                Some(c) if Self::is_ident_char(c) => {
                    self.advance();
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
        let expr_end = self.pos;
        self.expect_char(')')?;
        pattern.filters.push(FilterExpr { span: Span::new(expr_start, expr_end - expr_start), exists_refs });
        Ok(())
    }

    fn skip_string_literal(&mut self) -> PResult<()> {
        self.read_string_literal().map(|_| ())
    }

    fn parse_triple_sequence_into(&mut self, triples: &mut Vec<TriplePattern>) -> PResult<()> {
        let subject = self.parse_term()?;
        loop {
            let predicate = self.parse_predicate()?;
            let object = self.parse_term()?;
            triples.push(TriplePattern { subject: subject.clone(), predicate, object });
            self.skip_ws();
            if self.peek() == Some(',') {
                self.advance();
                continue;
            }
            if self.peek() == Some(';') {
                self.advance();
                continue;
            }
            break;
        }
        Ok(())
    }

    fn parse_triple_block(&mut self) -> PResult<Vec<TriplePattern>> {
        let mut out = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') || self.peek().is_none() {
                break;
            }
            self.parse_triple_sequence_into(&mut out)?;
            self.skip_ws();
            if self.peek() == Some('.') {
                self.advance();
            }
        }
        Ok(out)
    }

    fn parse_predicate(&mut self) -> PResult<PatternTerm> {
        self.skip_ws();
        if self.peek() == Some('a') && !matches!(self.peek_at(self.pos + 1), Some(c) if Self::is_ident_char(c))
        {
            self.advance();
            return Ok(PatternTerm::Bound(Term::iri(
                "http://www.w3.org/1999/02/22-rdf-syntax-ns#type",
            )));
        }
        self.parse_term()
    }

    fn parse_term(&mut self) -> PResult<PatternTerm> {
        self.skip_ws();
        match self.peek() {
            Some('?') | Some('$') => {
                let (var, name) = self.read_variable()?;
                Ok(PatternTerm::Var(var, name))
            }
            Some('<') => {
                let iri = self.read_iri_ref()?;
                Ok(PatternTerm::Bound(Term::iri(&iri)))
            }
            Some('_') if self.peek_at(self.pos + 1) == Some(':') => {
                self.advance();
                self.advance();
                let start = self.pos;
                while matches!(self.peek(), Some(c) if Self::is_ident_char(c)) {
                    self.advance();
                }
                Ok(PatternTerm::Bound(Term::blank(&self.source[start..self.pos])))
            }
            Some('"') | Some('\'') => {
                let lit = self.read_string_literal()?;
                Ok(PatternTerm::Bound(Term::Literal(lit)))
            }
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' => {
                let lit = self.read_numeric_literal()?;
                Ok(PatternTerm::Bound(Term::Literal(lit)))
            }
            Some(_) => {
                if self.looks_like("true") || self.looks_like("false") {
                    let (word, end) = self.word_at(self.pos).unwrap();
                    let value = word.to_ascii_lowercase();
                    self.pos = end;
                    return Ok(PatternTerm::Bound(Term::Literal(Literal::typed(
                        &value,
                        &format!("{XSD}boolean"),
                    ))));
                }
                let iri = self.read_prefixed_name_iri()?;
                Ok(PatternTerm::Bound(Term::iri(&iri)))
            }
            None => Err(self.err("expected a term")),
        }
    }

    fn read_variable(&mut self) -> PResult<(VarId, String)> {
        self.skip_ws();
        if !matches!(self.peek(), Some('?') | Some('$')) {
            return Err(self.err("expected a variable"));
        }
        self.advance();
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.advance();
        }
        let name = self.source[start..self.pos].to_string();
        if name.is_empty() {
            return Err(self.err("empty variable name"));
        }
        Ok((VarId::from_name(&name), name))
    }

    fn read_prefixed_name_iri(&mut self) -> PResult<String> {
        let ref_start = self.pos;
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_' || c == '-') {
            self.advance();
        }
        let prefix = self.source[start..self.pos].to_string();
        if self.peek() != Some(':') {
            return Err(self.err("expected ':' in prefixed name"));
        }
        self.advance();
        let local_start = self.pos;
        while matches!(self.peek(), Some(c) if Self::is_ident_char(c)) {
            self.advance();
        }
        let local = self.source[local_start..self.pos].to_string();
        match self.prologue.prefixes.get(&prefix) {
            Some(base) => Ok(format!("{base}{local}")),
            None => Err(ParseError::UnknownPrefix { offset: ref_start, prefix }),
        }
    }

    fn read_string_literal(&mut self) -> PResult<Literal> {
        let quote = self.peek().ok_or_else(|| self.err("expected string literal"))?;
        self.advance();
        let triple = self.peek() == Some(quote) && self.peek_at(self.pos + quote.len_utf8()) == Some(quote);
        if triple {
            self.advance();
            self.advance();
        }
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(self.err("unterminated string literal")),
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some(other) => value.push(other),
                        None => return Err(self.err("unterminated escape in string literal")),
                    }
                }
                Some(c) if c == quote => {
                    if !triple {
                        self.advance();
                        break;
                    }
                    if self.peek_at(self.pos + quote.len_utf8()) == Some(quote)
                        && self.peek_at(self.pos + 2 * quote.len_utf8()) == Some(quote)
                    {
                        self.advance();
                        self.advance();
                        self.advance();
                        break;
                    }
                    value.push(c);
                    self.advance();
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        if self.peek() == Some('@') {
            self.advance();
            let start = self.pos;
            while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '-') {
                self.advance();
            }
            let lang = self.source[start..self.pos].to_string();
            Ok(Literal::lang(&value, &lang))
        } else if self.peek() == Some('^') && self.peek_at(self.pos + 1) == Some('^') {
            self.advance();
            self.advance();
            let dt = if self.peek() == Some('<') {
                self.read_iri_ref()?
            } else {
                self.read_prefixed_name_iri()?
            };
            Ok(Literal::typed(&value, &dt))
        } else {
            Ok(Literal::plain(&value))
        }
    }

    fn read_numeric_literal(&mut self) -> PResult<Literal> {
        let start = self.pos;
        if matches!(self.peek(), Some('-') | Some('+')) {
            self.advance();
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        let mut is_decimal = false;
        if self.peek() == Some('.') {
            is_decimal = true;
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        let mut is_double = false;
        if matches!(self.peek(), Some('e') | Some('E')) {
            is_double = true;
            self.advance();
            if matches!(self.peek(), Some('-') | Some('+')) {
                self.advance();
            }
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        let text = &self.source[start..self.pos];
        let datatype = if is_double {
            "double"
        } else if is_decimal {
            "decimal"
        } else {
            "integer"
        };
        Ok(Literal::typed(text, &format!("{XSD}{datatype}")))
    }

    // ---- solution modifier ----

    fn parse_solution_modifier(&mut self) -> PResult<SolutionModifier> {
        let mut modifier = SolutionModifier::default();
        self.skip_ws();
        if self.consume_keyword("GROUP") {
            self.skip_ws();
            if !self.consume_keyword("BY") {
                return Err(self.err("expected BY after GROUP"));
            }
            loop {
                self.skip_ws();
                if !matches!(self.peek(), Some('?') | Some('$')) {
                    break;
                }
                let (var, _) = self.read_variable()?;
                modifier.group_by.push(var);
            }
        }

        self.skip_ws();
        if self.consume_keyword("HAVING") {
            self.skip_ws();
            self.expect_char('(')?;
            let start = self.pos;
            self.skip_balanced_until_close_paren()?;
            modifier.having = Some(Span::new(start, self.pos - start));
            self.expect_char(')')?;
        }

        self.skip_ws();
        if self.consume_keyword("ORDER") {
            self.skip_ws();
            if !self.consume_keyword("BY") {
                return Err(self.err("expected BY after ORDER"));
            }
            loop {
                self.skip_ws();
                let descending = if self.consume_keyword("DESC") {
                    true
                } else {
                    self.consume_keyword("ASC");
                    false
                };
                self.skip_ws();
                let wrapped = self.try_char('(');
                let start = self.pos;
                if wrapped {
                    self.skip_balanced_until_close_paren()?;
                } else {
                    match self.peek() {
                        Some('?') | Some('$') => {
                            self.read_variable()?;
                        }
                        _ => break,
                    }
                }
                modifier.order_by.push(OrderCondition { span: Span::new(start, self.pos - start), descending });
                if wrapped {
                    self.expect_char(')')?;
                }
                self.skip_ws();
                if !matches!(self.peek(), Some('?') | Some('$')) && !self.looks_like("ASC") && !self.looks_like("DESC")
                {
                    break;
                }
            }
        }

        self.skip_ws();
        if self.consume_keyword("LIMIT") {
            modifier.limit = Some(self.read_integer()?);
        }
        self.skip_ws();
        if self.consume_keyword("OFFSET") {
            modifier.offset = Some(self.read_integer()?);
        }
        Ok(modifier)
    }

    fn skip_balanced_until_close_paren(&mut self) -> PResult<()> {
        let mut depth = 0i32;
        loop {
            match self.peek() {
                None => return Err(self.err("unterminated expression")),
                Some('"') | Some('\'') => self.skip_string_literal()?,
                Some('(') => {
                    depth += 1;
                    self.advance();
                }
                Some(')') => {
                    if depth == 0 {
                        return Ok(());
                    }
                    depth -= 1;
                    self.advance();
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    fn read_integer(&mut self) -> PResult<i64> {
        self.skip_ws();
        let start = self.pos;
        if matches!(self.peek(), Some('-') | Some('+')) {
            self.advance();
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        self.source[start..self.pos]
            .parse()
            .map_err(|_| self.err("expected an integer"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_select() {
        let q = parse("SELECT ?s WHERE { ?s <http://example.org/name> ?n }").unwrap();
        assert_eq!(q.query_type, QueryType::Select);
        assert_eq!(q.where_clause.triples.len(), 1);
    }

    #[test]
    fn parses_prefixed_names_and_filter() {
        let q = parse(
            "PREFIX ex: <http://example.org/>\nSELECT ?s WHERE { ?s ex:age ?a . FILTER(?a > 100) }",
        )
        .unwrap();
        assert_eq!(q.where_clause.triples.len(), 1);
        assert_eq!(q.where_clause.filters.len(), 1);
    }

    #[test]
    fn unknown_prefix_is_reported_with_offset() {
        let err = parse("SELECT ?s WHERE { ?s ex:age ?a }").unwrap_err();
        assert!(matches!(err, ParseError::UnknownPrefix { .. }));
    }

    #[test]
    fn reserved_word_cannot_be_used_as_a_prefix_label() {
        let err = parse("PREFIX select: <http://example.org/>\nSELECT ?s WHERE { ?s select:age ?a }").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }

    #[test]
    fn parses_filter_not_exists() {
        let q = parse(
            "PREFIX ex: <http://example.org/>\nSELECT ?person WHERE { ?person ex:name ?n FILTER NOT EXISTS { ?person ex:knows ?x } }",
        )
        .unwrap();
        assert_eq!(q.where_clause.exists_filters.len(), 1);
        assert!(q.where_clause.exists_filters[0].negated);
    }

    #[test]
    fn parses_group_by_having_and_count_aggregate() {
        let q = parse(
            "SELECT ?p (COUNT(?o) AS ?c) WHERE { ?s ?p ?o } GROUP BY ?p HAVING (?c >= 3)",
        )
        .unwrap();
        let select = q.select.unwrap();
        assert_eq!(select.aggregates.len(), 1);
        assert_eq!(q.modifier.group_by.len(), 1);
        assert!(q.modifier.having.is_some());
    }

    #[test]
    fn parses_nested_minus() {
        let q = parse(
            "SELECT ?x ?y WHERE { ?x ?p ?y MINUS { ?x ?p ?y MINUS { ?y ?p ?x } } }",
        )
        .unwrap();
        assert_eq!(q.where_clause.minus_blocks.len(), 1);
        assert_eq!(q.where_clause.minus_blocks[0].pattern.minus_blocks.len(), 1);
    }

    #[test]
    fn span_invariant_holds_for_filter_expression() {
        let source = "SELECT ?s WHERE { ?s <http://example.org/age> ?a . FILTER(?a > 100) }";
        let q = parse(source).unwrap();
        let filter = &q.where_clause.filters[0];
        assert!(filter.span.is_in_bounds(source.len()));
    }

    #[test]
    fn filter_with_nested_parens_keeps_its_full_span() {
        let source = "SELECT ?s WHERE { ?s <http://example.org/age> ?a . FILTER((?a > 1) && (?a < 100)) }";
        let q = parse(source).unwrap();
        assert_eq!(q.where_clause.filters.len(), 1);
        let filter = &q.where_clause.filters[0];
        assert!(filter.span.is_in_bounds(source.len()));
        assert_eq!(filter.span.text(source), "(?a > 1) && (?a < 100)");
    }
}
