//! The `FILTER`/`HAVING`/`ORDER BY` expression language: a small
//! precedence-climbing parser-evaluator that walks an expression's source
//! text and produces a value in one pass, rather than building a second,
//! persisted expression tree alongside the positional AST (see the
//! "Compound EXISTS substitution" design note this engine follows: `EXISTS`
//! clauses are resolved to `true`/`false` text *before* this evaluator ever
//! sees the expression, so this module never needs to know about them).

use crate::ast::Prologue;
use crate::bindings::BindingRow;
use crate::value::{self, ArithOp};
use fukurow_core::model::{Literal, Term, VarId, XSD};
use std::fmt;

#[derive(Debug, Clone)]
pub enum ExprValue {
    Term(Term),
    Unbound,
}

impl ExprValue {
    pub fn as_term(&self) -> Option<&Term> {
        match self {
            ExprValue::Term(t) => Some(t),
            ExprValue::Unbound => None,
        }
    }

    fn bool(b: bool) -> Self {
        ExprValue::Term(Term::Literal(Literal::typed(if b { "true" } else { "false" }, &format!("{XSD}boolean"))))
    }

    pub fn ebv(&self) -> Option<bool> {
        self.as_term().and_then(value::effective_boolean_value)
    }
}

#[derive(Debug, Clone)]
pub struct ExprError(pub String);

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type EResult<T> = Result<T, ExprError>;

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
    row: &'a BindingRow,
    prologue: &'a Prologue,
}

pub fn eval(text: &str, row: &BindingRow, prologue: &Prologue) -> EResult<ExprValue> {
    let mut cursor = Cursor { text, pos: 0, row, prologue };
    let value = cursor.or_expr()?;
    cursor.skip_ws();
    if cursor.pos != cursor.text.len() {
        return Err(ExprError(format!("unexpected trailing input at {}", cursor.pos)));
    }
    Ok(value)
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
    }

    fn word_at(&self, start: usize) -> Option<(&'a str, usize)> {
        let mut end = start;
        for c in self.text[start..].chars() {
            if c.is_alphanumeric() || c == '_' {
                end += c.len_utf8();
            } else {
                break;
            }
        }
        if end == start {
            None
        } else {
            Some((&self.text[start..end], end))
        }
    }

    fn try_word(&mut self, word: &str) -> bool {
        self.skip_ws();
        if let Some((found, end)) = self.word_at(self.pos) {
            if found.eq_ignore_ascii_case(word) {
                self.pos = end;
                return true;
            }
        }
        false
    }

    fn try_op(&mut self, op: &str) -> bool {
        self.skip_ws();
        if self.text[self.pos..].starts_with(op) {
            self.pos += op.len();
            true
        } else {
            false
        }
    }

    // ---- grammar ----

    fn or_expr(&mut self) -> EResult<ExprValue> {
        let mut left = self.and_expr()?;
        loop {
            if self.try_op("||") {
                let right = self.and_expr()?;
                let lb = left.ebv().unwrap_or(false);
                let rb = right.ebv().unwrap_or(false);
                left = ExprValue::bool(lb || rb);
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> EResult<ExprValue> {
        let mut left = self.equality_expr()?;
        loop {
            if self.try_op("&&") {
                let right = self.equality_expr()?;
                let lb = left.ebv().unwrap_or(false);
                let rb = right.ebv().unwrap_or(false);
                left = ExprValue::bool(lb && rb);
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn equality_expr(&mut self) -> EResult<ExprValue> {
        let left = self.relational_expr()?;
        self.skip_ws();
        if self.try_op("!=") {
            let right = self.relational_expr()?;
            return Ok(ExprValue::bool(!terms_equal_loose(&left, &right)));
        }
        if self.text[self.pos..].starts_with('=') && !self.text[self.pos..].starts_with("=>") {
            self.pos += 1;
            let right = self.relational_expr()?;
            return Ok(ExprValue::bool(terms_equal_loose(&left, &right)));
        }
        Ok(left)
    }

    fn relational_expr(&mut self) -> EResult<ExprValue> {
        let left = self.additive_expr()?;
        self.skip_ws();

        if self.try_word("NOT") {
            self.skip_ws();
            if !self.try_word("IN") {
                return Err(ExprError("expected 'IN' after 'NOT'".into()));
            }
            return self.in_expr(left, true);
        }
        if self.try_word("IN") {
            return self.in_expr(left, false);
        }

        let op = if self.try_op("<=") {
            Some("<=")
        } else if self.try_op(">=") {
            Some(">=")
        } else if self.try_op("<") {
            Some("<")
        } else if self.try_op(">") {
            Some(">")
        } else {
            None
        };
        if let Some(op) = op {
            let right = self.additive_expr()?;
            let (Some(lt), Some(rt)) = (left.as_term(), right.as_term()) else {
                return Ok(ExprValue::Unbound);
            };
            let ord = value::compare_terms(lt, rt);
            let Some(ord) = ord else { return Ok(ExprValue::Unbound) };
            use std::cmp::Ordering::*;
            let result = match op {
                "<" => ord == Less,
                "<=" => ord != Greater,
                ">" => ord == Greater,
                ">=" => ord != Less,
                _ => unreachable!(),
            };
            return Ok(ExprValue::bool(result));
        }
        Ok(left)
    }

    /// `?x IN (a, b, c)` / `?x NOT IN (a, b, c)`: true (resp. false) if `left`
    /// equals any list member; false (resp. true) if every comparison was
    /// determinate and none matched; `Unbound` if a comparison involving an
    /// unbound operand leaves the result indeterminate.
    fn in_expr(&mut self, left: ExprValue, negated: bool) -> EResult<ExprValue> {
        self.skip_ws();
        if self.peek() != Some('(') {
            return Err(ExprError("expected '(' after IN".into()));
        }
        self.advance();
        self.skip_ws();

        let mut matched = false;
        let mut indeterminate = false;
        if self.peek() != Some(')') {
            loop {
                let candidate = self.or_expr()?;
                if terms_equal_loose(&left, &candidate) {
                    matched = true;
                } else if left.as_term().is_none() || candidate.as_term().is_none() {
                    indeterminate = true;
                }
                self.skip_ws();
                if self.peek() == Some(',') {
                    self.advance();
                    self.skip_ws();
                    continue;
                }
                break;
            }
        }
        self.skip_ws();
        if self.peek() != Some(')') {
            return Err(ExprError("expected ')' closing IN list".into()));
        }
        self.advance();

        if matched {
            Ok(ExprValue::bool(!negated))
        } else if indeterminate {
            Ok(ExprValue::Unbound)
        } else {
            Ok(ExprValue::bool(negated))
        }
    }

    fn additive_expr(&mut self) -> EResult<ExprValue> {
        let mut left = self.multiplicative_expr()?;
        loop {
            self.skip_ws();
            let op = if self.try_op("+") {
                Some(ArithOp::Add)
            } else if self.peek() == Some('-') {
                self.advance();
                Some(ArithOp::Sub)
            } else {
                None
            };
            match op {
                Some(op) => {
                    let right = self.multiplicative_expr()?;
                    left = self.apply_arith(op, left, right);
                }
                None => break,
            }
        }
        Ok(left)
    }

    fn multiplicative_expr(&mut self) -> EResult<ExprValue> {
        let mut left = self.unary_expr()?;
        loop {
            self.skip_ws();
            let op = if self.try_op("*") {
                Some(ArithOp::Mul)
            } else if self.try_op("/") {
                Some(ArithOp::Div)
            } else {
                None
            };
            match op {
                Some(op) => {
                    let right = self.unary_expr()?;
                    left = self.apply_arith(op, left, right);
                }
                None => break,
            }
        }
        Ok(left)
    }

    fn apply_arith(&self, op: ArithOp, left: ExprValue, right: ExprValue) -> ExprValue {
        match (left.as_term(), right.as_term()) {
            (Some(lt), Some(rt)) => match value::arith(op, lt, rt) {
                Some(t) => ExprValue::Term(t),
                None => ExprValue::Unbound,
            },
            _ => ExprValue::Unbound,
        }
    }

    fn unary_expr(&mut self) -> EResult<ExprValue> {
        self.skip_ws();
        if self.try_op("!") {
            let inner = self.unary_expr()?;
            return Ok(ExprValue::bool(!inner.ebv().unwrap_or(false)));
        }
        if self.peek() == Some('-') && !self.text[self.pos..].starts_with("->") {
            self.advance();
            let inner = self.unary_expr()?;
            return Ok(match inner.as_term() {
                Some(t) => value::arith(
                    ArithOp::Sub,
                    &Term::Literal(Literal::typed("0", &format!("{XSD}integer"))),
                    t,
                )
                .map(ExprValue::Term)
                .unwrap_or(ExprValue::Unbound),
                None => ExprValue::Unbound,
            });
        }
        self.primary_expr()
    }

    fn primary_expr(&mut self) -> EResult<ExprValue> {
        self.skip_ws();
        match self.peek() {
            Some('(') => {
                self.advance();
                let value = self.or_expr()?;
                self.skip_ws();
                if self.peek() != Some(')') {
                    return Err(ExprError("expected ')'".into()));
                }
                self.advance();
                Ok(value)
            }
            Some('?') | Some('$') => {
                self.advance();
                let start = self.pos;
                while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
                    self.advance();
                }
                let name = &self.text[start..self.pos];
                let var = VarId::from_name(name);
                match self.row.get(var) {
                    Some(term) => Ok(ExprValue::Term(term.clone())),
                    None => Ok(ExprValue::Unbound),
                }
            }
            Some('"') | Some('\'') => self.string_literal(),
            Some(c) if c.is_ascii_digit() => self.numeric_literal(),
            Some('<') => self.iri_literal(),
            Some(_) => self.ident_or_call(),
            None => Err(ExprError("unexpected end of expression".into())),
        }
    }

    fn string_literal(&mut self) -> EResult<ExprValue> {
        let quote = self.peek().unwrap();
        self.advance();
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(ExprError("unterminated string".into())),
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some(other) => value.push(other),
                        None => return Err(ExprError("unterminated escape".into())),
                    }
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
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
            Ok(ExprValue::Term(Term::Literal(Literal::lang(&value, &self.text[start..self.pos]))))
        } else if self.text[self.pos..].starts_with("^^") {
            self.pos += 2;
            let dt = if self.peek() == Some('<') {
                self.iri_text()?
            } else {
                self.prefixed_name_iri()?
            };
            Ok(ExprValue::Term(Term::Literal(Literal::typed(&value, &dt))))
        } else {
            Ok(ExprValue::Term(Term::Literal(Literal::plain(&value))))
        }
    }

    fn numeric_literal(&mut self) -> EResult<ExprValue> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        let mut decimal = false;
        if self.peek() == Some('.') {
            decimal = true;
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        let mut double = false;
        if matches!(self.peek(), Some('e') | Some('E')) {
            double = true;
            self.advance();
            if matches!(self.peek(), Some('-') | Some('+')) {
                self.advance();
            }
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        let text = &self.text[start..self.pos];
        let dt = if double { "double" } else if decimal { "decimal" } else { "integer" };
        Ok(ExprValue::Term(Term::Literal(Literal::typed(text, &format!("{XSD}{dt}")))))
    }

    fn iri_text(&mut self) -> EResult<String> {
        self.advance();
        let start = self.pos;
        while !matches!(self.peek(), Some('>') | None) {
            self.advance();
        }
        let text = self.text[start..self.pos].to_string();
        if self.peek() != Some('>') {
            return Err(ExprError("unterminated IRI".into()));
        }
        self.advance();
        Ok(text)
    }

    fn iri_literal(&mut self) -> EResult<ExprValue> {
        let iri = self.iri_text()?;
        Ok(ExprValue::Term(Term::iri(&iri)))
    }

    fn prefixed_name_iri(&mut self) -> EResult<String> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_' || c == '-') {
            self.advance();
        }
        let prefix = self.text[start..self.pos].to_string();
        if self.peek() != Some(':') {
            return Err(ExprError("expected ':' in prefixed name".into()));
        }
        self.advance();
        let local_start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_' || c == '-' || c == '.') {
            self.advance();
        }
        let local = &self.text[local_start..self.pos];
        match self.prologue.prefixes.get(&prefix) {
            Some(base) => Ok(format!("{base}{local}")),
            None => Err(ExprError(format!("unknown prefix '{prefix}'"))),
        }
    }

    fn ident_or_call(&mut self) -> EResult<ExprValue> {
        self.skip_ws();
        if self.try_word("true") {
            return Ok(ExprValue::bool(true));
        }
        if self.try_word("false") {
            return Ok(ExprValue::bool(false));
        }

        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.advance();
        }
        if start == self.pos {
            return Err(ExprError(format!("unexpected character at {}", self.pos)));
        }
        let name = self.text[start..self.pos].to_string();
        self.skip_ws();

        if self.peek() == Some(':') {
            // prefixed-name term, e.g. `ex:Person`, or an xsd:type(...) cast.
            self.advance();
            let local_start = self.pos;
            while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_' || c == '-' || c == '.') {
                self.advance();
            }
            let local = self.text[local_start..self.pos].to_string();
            self.skip_ws();
            if self.peek() == Some('(') {
                return self.call(&format!("{name}:{local}"));
            }
            let base = self
                .prologue
                .prefixes
                .get(&name)
                .ok_or_else(|| ExprError(format!("unknown prefix '{name}'")))?;
            return Ok(ExprValue::Term(Term::iri(&format!("{base}{local}"))));
        }

        if self.peek() == Some('(') {
            return self.call(&name);
        }

        Err(ExprError(format!("unknown identifier '{name}'")))
    }

    fn call_args(&mut self) -> EResult<Vec<ExprValue>> {
        self.advance(); // '('
        let mut args = Vec::new();
        self.skip_ws();
        if self.peek() == Some(')') {
            self.advance();
            return Ok(args);
        }
        loop {
            self.skip_ws();
            if self.try_word("DISTINCT") {
                self.skip_ws();
            }
            args.push(self.or_expr()?);
            self.skip_ws();
            if self.peek() == Some(',') {
                self.advance();
                continue;
            }
            break;
        }
        self.skip_ws();
        if self.peek() != Some(')') {
            return Err(ExprError("expected ')' closing call".into()));
        }
        self.advance();
        Ok(args)
    }

    fn call(&mut self, name: &str) -> EResult<ExprValue> {
        let upper = name.to_ascii_uppercase();
        if upper.starts_with("XSD:") {
            let args = self.call_args()?;
            let arg = args.first().and_then(ExprValue::as_term);
            let cast = match upper.as_str() {
                "XSD:INTEGER" => arg.and_then(value::cast_integer),
                "XSD:DECIMAL" => arg.and_then(value::cast_decimal),
                "XSD:DOUBLE" => arg.and_then(value::cast_double),
                "XSD:BOOLEAN" => arg.and_then(value::cast_boolean),
                "XSD:STRING" => arg.and_then(value::cast_string),
                "XSD:DATETIME" => arg.and_then(value::cast_datetime),
                _ => None,
            };
            return Ok(cast.map(ExprValue::Term).unwrap_or(ExprValue::Unbound));
        }

        match upper.as_str() {
            "BOUND" => {
                self.advance();
                self.skip_ws();
                if self.peek() != Some('?') && self.peek() != Some('$') {
                    return Err(ExprError("BOUND requires a variable".into()));
                }
                self.advance();
                let start = self.pos;
                while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
                    self.advance();
                }
                let var = VarId::from_name(&self.text[start..self.pos]);
                self.skip_ws();
                if self.peek() != Some(')') {
                    return Err(ExprError("expected ')' after BOUND argument".into()));
                }
                self.advance();
                Ok(ExprValue::bool(self.row.is_bound(var)))
            }
            "IF" => {
                let args = self.call_args()?;
                let cond = args.first().and_then(ExprValue::ebv).unwrap_or(false);
                Ok(if cond { args.get(1).cloned() } else { args.get(2).cloned() }.unwrap_or(ExprValue::Unbound))
            }
            "COALESCE" => {
                let args = self.call_args()?;
                Ok(args.into_iter().find(|v| v.as_term().is_some()).unwrap_or(ExprValue::Unbound))
            }
            "REGEX" => {
                let args = self.call_args()?;
                let text = args.first().and_then(ExprValue::as_term).and_then(lexical_text);
                let pattern = args.get(1).and_then(ExprValue::as_term).and_then(lexical_text);
                let flags = args.get(2).and_then(ExprValue::as_term).and_then(lexical_text).unwrap_or_default();
                match (text, pattern) {
                    (Some(t), Some(p)) => Ok(ExprValue::bool(value::regex_match(&t, &p, &flags))),
                    _ => Ok(ExprValue::Unbound),
                }
            }
            "CONTAINS" => self.string_predicate(|h, n| h.contains(n.as_str())),
            "STRSTARTS" => self.string_predicate(|h, n| h.starts_with(n.as_str())),
            "STRENDS" => self.string_predicate(|h, n| h.ends_with(n.as_str())),
            "STR" => {
                let args = self.call_args()?;
                Ok(args.first().and_then(ExprValue::as_term).map(value::str_func).map(ExprValue::Term).unwrap_or(ExprValue::Unbound))
            }
            "LANG" => {
                let args = self.call_args()?;
                Ok(args.first().and_then(ExprValue::as_term).map(value::lang_func).map(ExprValue::Term).unwrap_or(ExprValue::Unbound))
            }
            "DATATYPE" => {
                let args = self.call_args()?;
                Ok(args
                    .first()
                    .and_then(ExprValue::as_term)
                    .and_then(value::datatype_func)
                    .map(ExprValue::Term)
                    .unwrap_or(ExprValue::Unbound))
            }
            "ISIRI" | "ISURI" => {
                let args = self.call_args()?;
                Ok(ExprValue::bool(args.first().and_then(ExprValue::as_term).is_some_and(value::is_iri)))
            }
            "ISBLANK" => {
                let args = self.call_args()?;
                Ok(ExprValue::bool(args.first().and_then(ExprValue::as_term).is_some_and(value::is_blank)))
            }
            "ISLITERAL" => {
                let args = self.call_args()?;
                Ok(ExprValue::bool(args.first().and_then(ExprValue::as_term).is_some_and(value::is_literal)))
            }
            _ => Err(ExprError(format!("unknown function '{name}'"))),
        }
    }

    fn string_predicate(&mut self, f: impl Fn(&str, &String) -> bool) -> EResult<ExprValue> {
        let args = self.call_args()?;
        let haystack = args.first().and_then(ExprValue::as_term).and_then(lexical_text);
        let needle = args.get(1).and_then(ExprValue::as_term).and_then(lexical_text);
        match (haystack, needle) {
            (Some(h), Some(n)) => Ok(ExprValue::bool(f(&h, &n))),
            _ => Ok(ExprValue::Unbound),
        }
    }
}

fn lexical_text(term: &Term) -> Option<String> {
    match term {
        Term::Literal(lit) => Some(lit.lexical.to_string()),
        Term::Iri(iri) => Some(iri.to_string()),
        Term::BlankNode(_) => None,
    }
}

fn terms_equal_loose(a: &ExprValue, b: &ExprValue) -> bool {
    match (a.as_term(), b.as_term()) {
        (Some(ta), Some(tb)) => {
            if ta.is_numeric_literal_pair(tb) {
                value::compare_terms(ta, tb) == Some(std::cmp::Ordering::Equal)
            } else {
                value::terms_equal(ta, tb)
            }
        }
        (None, None) => true,
        _ => false,
    }
}

trait NumericPair {
    fn is_numeric_literal_pair(&self, other: &Term) -> bool;
}

impl NumericPair for Term {
    fn is_numeric_literal_pair(&self, other: &Term) -> bool {
        matches!((self, other), (Term::Literal(a), Term::Literal(b)) if a.is_numeric() && b.is_numeric())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> BindingRow {
        let mut row = BindingRow::new();
        row.bind(VarId::from_name("a"), Term::Literal(Literal::typed("150", &format!("{XSD}integer"))));
        row
    }

    #[test]
    fn numeric_comparison() {
        let prologue = Prologue::default();
        let value = eval("?a > 100", &row(), &prologue).unwrap();
        assert_eq!(value.ebv(), Some(true));
    }

    #[test]
    fn logical_and_or() {
        let prologue = Prologue::default();
        let value = eval("?a > 100 && ?a < 200", &row(), &prologue).unwrap();
        assert_eq!(value.ebv(), Some(true));
    }

    #[test]
    fn bound_function() {
        let prologue = Prologue::default();
        let value = eval("BOUND(?a)", &row(), &prologue).unwrap();
        assert_eq!(value.ebv(), Some(true));
        let value = eval("BOUND(?missing)", &row(), &prologue).unwrap();
        assert_eq!(value.ebv(), Some(false));
    }

    #[test]
    fn numeric_equality_ignores_lexical_form() {
        let prologue = Prologue::default();
        let mut r = BindingRow::new();
        r.bind(VarId::from_name("x"), Term::Literal(Literal::typed("1.0", &format!("{XSD}double"))));
        let value = eval("?x = 1", &r, &prologue).unwrap();
        assert_eq!(value.ebv(), Some(true));
    }

    #[test]
    fn in_matches_any_list_member() {
        let prologue = Prologue::default();
        let value = eval("?a IN (1, 2, 150)", &row(), &prologue).unwrap();
        assert_eq!(value.ebv(), Some(true));
    }

    #[test]
    fn in_is_false_when_no_list_member_matches() {
        let prologue = Prologue::default();
        let value = eval("?a IN (1, 2, 3)", &row(), &prologue).unwrap();
        assert_eq!(value.ebv(), Some(false));
    }

    #[test]
    fn not_in_negates_membership() {
        let prologue = Prologue::default();
        let value = eval("?a NOT IN (1, 2, 3)", &row(), &prologue).unwrap();
        assert_eq!(value.ebv(), Some(true));
        let value = eval("?a NOT IN (150)", &row(), &prologue).unwrap();
        assert_eq!(value.ebv(), Some(false));
    }

    #[test]
    fn in_is_unbound_when_an_unbound_operand_leaves_no_determinate_match() {
        let prologue = Prologue::default();
        let value = eval("?missing IN (1, 2)", &row(), &prologue).unwrap();
        assert!(value.ebv().is_none());
    }
}
