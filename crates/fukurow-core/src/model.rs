//! RDF term and temporal quad data model.

use lazy_static::lazy_static;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};

lazy_static! {
    static ref STRING_POOL: RwLock<HashSet<Arc<str>>> = RwLock::new(HashSet::new());
}

/// Interns a string so repeated lexical forms (IRIs, datatypes, language
/// tags) share one allocation across the store.
pub fn intern(s: &str) -> Arc<str> {
    if let Some(existing) = STRING_POOL.read().unwrap().get(s) {
        return Arc::clone(existing);
    }
    let mut pool = STRING_POOL.write().unwrap();
    if let Some(existing) = pool.get(s) {
        return Arc::clone(existing);
    }
    let arc: Arc<str> = Arc::from(s);
    pool.insert(Arc::clone(&arc));
    arc
}

/// FNV-1a over the `?name` spelling (including the leading `?`), used as
/// the stable binding key for a SPARQL variable.
pub fn fnv1a_32(s: &str) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for b in s.as_bytes() {
        hash ^= u32::from(*b);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

/// Stable 32-bit identity for a SPARQL variable, derived from its `?name`
/// spelling via FNV-1a. Two variables with the same spelling always
/// collide on the same id within and across queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

impl VarId {
    pub fn from_name(name: &str) -> Self {
        VarId(fnv1a_32(&format!("?{name}")))
    }
}

/// The kind of an RDF term, used for cross-kind ORDER BY determinism
/// (unbound < blank < IRI < literal) and for `isIRI`/`isBlank`/`isLiteral`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TermKind {
    Unbound,
    Blank,
    Iri,
    PlainLiteral,
    LangLiteral,
    TypedLiteral,
}

/// An RDF literal: lexical form preserved verbatim, plus an optional
/// datatype IRI or language tag (mutually exclusive).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal {
    pub lexical: Arc<str>,
    pub datatype: Option<Arc<str>>,
    pub language: Option<Arc<str>>,
}

impl Literal {
    pub fn plain(lexical: &str) -> Self {
        Literal { lexical: intern(lexical), datatype: None, language: None }
    }

    pub fn lang(lexical: &str, language: &str) -> Self {
        Literal { lexical: intern(lexical), datatype: None, language: Some(intern(language)) }
    }

    pub fn typed(lexical: &str, datatype: &str) -> Self {
        Literal { lexical: intern(lexical), datatype: Some(intern(datatype)), language: None }
    }

    pub fn kind(&self) -> TermKind {
        if self.language.is_some() {
            TermKind::LangLiteral
        } else if self.datatype.is_some() {
            TermKind::TypedLiteral
        } else {
            TermKind::PlainLiteral
        }
    }

    /// True for any of the XSD numeric datatypes promoted under the XPath
    /// numeric type lattice (integer/decimal/float/double and the
    /// integer-derived types).
    pub fn is_numeric(&self) -> bool {
        self.datatype.as_deref().is_some_and(is_numeric_datatype)
    }
}

pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

pub fn is_numeric_datatype(dt: &str) -> bool {
    matches!(
        dt,
        "http://www.w3.org/2001/XMLSchema#integer"
            | "http://www.w3.org/2001/XMLSchema#decimal"
            | "http://www.w3.org/2001/XMLSchema#float"
            | "http://www.w3.org/2001/XMLSchema#double"
            | "http://www.w3.org/2001/XMLSchema#int"
            | "http://www.w3.org/2001/XMLSchema#long"
            | "http://www.w3.org/2001/XMLSchema#short"
            | "http://www.w3.org/2001/XMLSchema#byte"
            | "http://www.w3.org/2001/XMLSchema#nonNegativeInteger"
            | "http://www.w3.org/2001/XMLSchema#nonPositiveInteger"
            | "http://www.w3.org/2001/XMLSchema#negativeInteger"
            | "http://www.w3.org/2001/XMLSchema#positiveInteger"
            | "http://www.w3.org/2001/XMLSchema#unsignedLong"
            | "http://www.w3.org/2001/XMLSchema#unsignedInt"
            | "http://www.w3.org/2001/XMLSchema#unsignedShort"
            | "http://www.w3.org/2001/XMLSchema#unsignedByte"
    )
}

/// An RDF term: IRI, blank node, or literal. Bound variables resolve to
/// one of these; an unbound variable is simply absent from a binding row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Iri(Arc<str>),
    BlankNode(Arc<str>),
    Literal(Literal),
}

impl Term {
    pub fn iri(s: &str) -> Self {
        Term::Iri(intern(s))
    }

    pub fn blank(label: &str) -> Self {
        Term::BlankNode(intern(label))
    }

    pub fn kind(&self) -> TermKind {
        match self {
            Term::Iri(_) => TermKind::Iri,
            Term::BlankNode(_) => TermKind::Blank,
            Term::Literal(lit) => lit.kind(),
        }
    }

    /// `GetString`: `<iri>` for IRIs, `_:label` for blank nodes, and the
    /// full quoted lexical form (with `@lang`/`^^<dt>` decoration) for
    /// literals — exactly as SPARQL result serializations render terms.
    pub fn display_string(&self) -> String {
        match self {
            Term::Iri(iri) => format!("<{iri}>"),
            Term::BlankNode(label) => format!("_:{label}"),
            Term::Literal(lit) => {
                let mut out = format!("\"{}\"", lit.lexical);
                if let Some(lang) = &lit.language {
                    out.push('@');
                    out.push_str(lang);
                } else if let Some(dt) = &lit.datatype {
                    out.push_str("^^<");
                    out.push_str(dt);
                    out.push('>');
                }
                out
            }
        }
    }

    pub fn as_numeric_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(lit) if lit.is_numeric() => Some(lit),
            _ => None,
        }
    }
}

/// Validity interval sentinel meaning "current" (`valid_to = +infinity`).
pub const VALID_FOREVER: i64 = i64::MAX;

/// A subject/predicate/object triple plus an optional named graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Quad {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
    pub graph: Option<Term>,
}

impl Quad {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Quad { subject, predicate, object, graph: None }
    }
}

/// A quad as physically stored: the quad itself plus its validity
/// interval `[valid_from, valid_to)` in logical time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredQuad {
    pub quad: Quad,
    pub valid_from: i64,
    pub valid_to: i64,
}

impl StoredQuad {
    pub fn is_current(&self) -> bool {
        self.valid_to == VALID_FOREVER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_reuses_allocation() {
        let a = intern("http://example.org/s");
        let b = intern("http://example.org/s");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn var_id_stable_across_calls() {
        assert_eq!(VarId::from_name("s"), VarId::from_name("s"));
        assert_ne!(VarId::from_name("s"), VarId::from_name("o"));
    }

    #[test]
    fn term_display_string_roundtrips_decoration() {
        let iri = Term::iri("http://example.org/Alice");
        assert_eq!(iri.display_string(), "<http://example.org/Alice>");

        let lang = Term::Literal(Literal::lang("hello", "en"));
        assert_eq!(lang.display_string(), "\"hello\"@en");

        let typed = Term::Literal(Literal::typed("30", &format!("{XSD}integer")));
        assert_eq!(typed.display_string(), "\"30\"^^<http://www.w3.org/2001/XMLSchema#integer>");
    }

    #[test]
    fn numeric_datatype_detection() {
        let lit = Literal::typed("1.0", &format!("{XSD}double"));
        assert!(lit.is_numeric());
        let lit = Literal::plain("hi");
        assert!(!lit.is_numeric());
    }
}
