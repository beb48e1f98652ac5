//! RDF value semantics: XSD-aware numeric promotion, the term comparator,
//! arithmetic, casts, and the built-in function library used by `FILTER`
//! and projection expressions.

use fukurow_core::model::{is_numeric_datatype, Literal, Term, TermKind, XSD};
use std::cmp::Ordering;

pub fn xsd(name: &str) -> String {
    format!("{XSD}{name}")
}

/// XPath numeric type lattice: integer promotes to decimal, to float, to
/// double. Arithmetic between two operands yields the higher rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NumericRank {
    Integer,
    Decimal,
    Float,
    Double,
}

pub fn numeric_rank(datatype: &str) -> Option<NumericRank> {
    if !is_numeric_datatype(datatype) {
        return None;
    }
    let local = datatype.rsplit('#').next().unwrap_or(datatype);
    Some(match local {
        "decimal" => NumericRank::Decimal,
        "float" => NumericRank::Float,
        "double" => NumericRank::Double,
        _ => NumericRank::Integer,
    })
}

pub fn numeric_value(lit: &Literal) -> Option<f64> {
    let _ = lit.datatype.as_deref()?;
    lit.lexical.trim().parse::<f64>().ok()
}

fn format_numeric(value: f64, rank: NumericRank) -> Literal {
    let lexical = match rank {
        NumericRank::Integer => format!("{}", value as i64),
        NumericRank::Decimal => {
            if value.fract() == 0.0 {
                format!("{value:.1}")
            } else {
                format!("{value}")
            }
        }
        NumericRank::Float | NumericRank::Double => format!("{value}"),
    };
    let datatype = match rank {
        NumericRank::Integer => xsd("integer"),
        NumericRank::Decimal => xsd("decimal"),
        NumericRank::Float => xsd("float"),
        NumericRank::Double => xsd("double"),
    };
    Literal::typed(&lexical, &datatype)
}

/// Comparator rule 1: both numeric literals promote to a common rank and
/// compare numerically (`1` = `1.0` = `1.0E0`).
/// Rule 2: plain/language literals compare lexically when language tags
/// match; mismatched tags are incomparable.
/// Rule 3: IRIs compare byte-wise.
/// Rule 4 (cross-kind, used only for `ORDER BY` determinism): unbound <
/// blank < IRI < literal.
pub fn compare_terms(a: &Term, b: &Term) -> Option<Ordering> {
    match (a, b) {
        (Term::Literal(la), Term::Literal(lb)) if la.is_numeric() && lb.is_numeric() => {
            let va = numeric_value(la)?;
            let vb = numeric_value(lb)?;
            va.partial_cmp(&vb)
        }
        (Term::Literal(la), Term::Literal(lb))
            if la.datatype.is_none() && lb.datatype.is_none() =>
        {
            if la.language == lb.language {
                Some(la.lexical.as_ref().cmp(lb.lexical.as_ref()))
            } else {
                None
            }
        }
        (Term::Iri(ia), Term::Iri(ib)) => Some(ia.as_ref().as_bytes().cmp(ib.as_ref().as_bytes())),
        _ => None,
    }
}

/// Total cross-kind ordering used by `ORDER BY` so ties (including
/// incomparable same-kind pairs) still produce a deterministic order.
pub fn order_by_cmp(a: Option<&Term>, b: Option<&Term>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(ta), Some(tb)) => compare_terms(ta, tb).unwrap_or_else(|| {
            term_kind_rank(ta.kind()).cmp(&term_kind_rank(tb.kind()))
        }),
    }
}

fn term_kind_rank(kind: TermKind) -> u8 {
    match kind {
        TermKind::Unbound => 0,
        TermKind::Blank => 1,
        TermKind::Iri => 2,
        TermKind::PlainLiteral | TermKind::LangLiteral | TermKind::TypedLiteral => 3,
    }
}

/// SPARQL term equality (used by join compatibility and `DISTINCT`):
/// structural equality on `Term`'s own `PartialEq`, which already compares
/// datatype/language alongside lexical form.
pub fn terms_equal(a: &Term, b: &Term) -> bool {
    a == b
}

#[derive(Debug, Clone, Copy)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Binary arithmetic promotes per the numeric lattice; `/` between two
/// integers yields `xsd:decimal` rather than truncating.
pub fn arith(op: ArithOp, a: &Term, b: &Term) -> Option<Term> {
    let (la, lb) = match (a, b) {
        (Term::Literal(la), Term::Literal(lb)) if la.is_numeric() && lb.is_numeric() => (la, lb),
        _ => return None,
    };
    let ra = numeric_rank(la.datatype.as_deref()?)?;
    let rb = numeric_rank(lb.datatype.as_deref()?)?;
    let mut rank = ra.max(rb);
    let va = numeric_value(la)?;
    let vb = numeric_value(lb)?;
    let result = match op {
        ArithOp::Add => va + vb,
        ArithOp::Sub => va - vb,
        ArithOp::Mul => va * vb,
        ArithOp::Div => {
            if vb == 0.0 {
                return None;
            }
            if rank == NumericRank::Integer {
                rank = NumericRank::Decimal;
            }
            va / vb
        }
    };
    Some(Term::Literal(format_numeric(result, rank)))
}

pub fn cast_integer(term: &Term) -> Option<Term> {
    let text = lexical_of(term)?;
    let value: f64 = text.trim().parse().ok()?;
    Some(Term::Literal(Literal::typed(&format!("{}", value as i64), &xsd("integer"))))
}

pub fn cast_decimal(term: &Term) -> Option<Term> {
    let text = lexical_of(term)?;
    let value: f64 = text.trim().parse().ok()?;
    Some(Term::Literal(format_numeric(value, NumericRank::Decimal)))
}

pub fn cast_double(term: &Term) -> Option<Term> {
    let text = lexical_of(term)?;
    let value: f64 = text.trim().parse().ok()?;
    Some(Term::Literal(format_numeric(value, NumericRank::Double)))
}

pub fn cast_boolean(term: &Term) -> Option<Term> {
    let text = lexical_of(term)?;
    let value = match text.trim() {
        "true" | "1" => true,
        "false" | "0" => false,
        _ => return None,
    };
    Some(Term::Literal(Literal::typed(if value { "true" } else { "false" }, &xsd("boolean"))))
}

pub fn cast_string(term: &Term) -> Option<Term> {
    Some(Term::Literal(Literal::plain(&lexical_of(term)?)))
}

pub fn cast_datetime(term: &Term) -> Option<Term> {
    let text = lexical_of(term)?;
    Some(Term::Literal(Literal::typed(&text, &xsd("dateTime"))))
}

fn lexical_of(term: &Term) -> Option<String> {
    match term {
        Term::Literal(lit) => Some(lit.lexical.to_string()),
        Term::Iri(iri) => Some(iri.to_string()),
        Term::BlankNode(_) => None,
    }
}

/// Effective boolean value: booleans by identity, numerics by non-zero,
/// strings by non-empty; unbound/uncoercible values are `None` (treated as
/// false inside a `FILTER`, propagated as error elsewhere).
pub fn effective_boolean_value(term: &Term) -> Option<bool> {
    match term {
        Term::Literal(lit) if lit.datatype.as_deref() == Some(xsd("boolean").as_str()) => {
            match lit.lexical.as_ref() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            }
        }
        Term::Literal(lit) if lit.is_numeric() => numeric_value(lit).map(|v| v != 0.0),
        Term::Literal(lit) if lit.datatype.is_none() => Some(!lit.lexical.is_empty()),
        _ => None,
    }
}

pub fn regex_match(text: &str, pattern: &str, flags: &str) -> bool {
    let mut builder = regex::RegexBuilder::new(pattern);
    builder.case_insensitive(flags.contains('i'));
    builder.dot_matches_new_line(flags.contains('s'));
    builder.multi_line(flags.contains('m'));
    match builder.build() {
        Ok(re) => re.is_match(text),
        Err(_) => false,
    }
}

pub fn str_func(term: &Term) -> Term {
    Term::Literal(Literal::plain(&lexical_of(term).unwrap_or_default()))
}

pub fn lang_func(term: &Term) -> Term {
    match term {
        Term::Literal(lit) => Term::Literal(Literal::plain(lit.language.as_deref().unwrap_or(""))),
        _ => Term::Literal(Literal::plain("")),
    }
}

pub fn datatype_func(term: &Term) -> Option<Term> {
    match term {
        Term::Literal(lit) => Some(Term::iri(lit.datatype.as_deref().unwrap_or(&xsd("string")))),
        _ => None,
    }
}

pub fn is_iri(term: &Term) -> bool {
    matches!(term, Term::Iri(_))
}

pub fn is_blank(term: &Term) -> bool {
    matches!(term, Term::BlankNode(_))
}

pub fn is_literal(term: &Term) -> bool {
    matches!(term, Term::Literal(_))
}
