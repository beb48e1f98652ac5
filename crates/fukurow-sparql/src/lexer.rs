//! A lightweight keyword pre-pass.
//!
//! SPARQL keywords (`SELECT`, `FILTER`, `OPTIONAL`, ...) are
//! case-insensitive; variable names, prefixes, and local names are not.
//! The hand-rolled recursive-descent parser in [`crate::parser`] reads
//! words off the source directly rather than through a token stream (spans
//! need to track whole sub-expressions, not individual tokens), but it
//! asks this pre-pass to classify any bare word it reads so a keyword
//! never gets mistaken for, say, a prefix named `select`.

use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Keyword {
    #[token("select", ignore(case))]
    Select,
    #[token("construct", ignore(case))]
    Construct,
    #[token("describe", ignore(case))]
    Describe,
    #[token("ask", ignore(case))]
    Ask,
    #[token("where", ignore(case))]
    Where,
    #[token("prefix", ignore(case))]
    Prefix,
    #[token("base", ignore(case))]
    Base,
    #[token("distinct", ignore(case))]
    Distinct,
    #[token("reduced", ignore(case))]
    Reduced,
    #[token("optional", ignore(case))]
    Optional,
    #[token("minus", ignore(case))]
    Minus,
    #[token("union", ignore(case))]
    Union,
    #[token("filter", ignore(case))]
    Filter,
    #[token("exists", ignore(case))]
    Exists,
    #[token("not", ignore(case))]
    Not,
    #[token("group", ignore(case))]
    Group,
    #[token("by", ignore(case))]
    By,
    #[token("having", ignore(case))]
    Having,
    #[token("order", ignore(case))]
    Order,
    #[token("asc", ignore(case))]
    Asc,
    #[token("desc", ignore(case))]
    Desc,
    #[token("limit", ignore(case))]
    Limit,
    #[token("offset", ignore(case))]
    Offset,
    #[token("as", ignore(case))]
    As,
    #[token("separator", ignore(case))]
    Separator,
    #[token("a")]
    RdfTypeShorthand,
    #[token("true", ignore(case))]
    True,
    #[token("false", ignore(case))]
    False,
}

/// Classifies `word` as a reserved keyword, or `None` if it should be read
/// as an ordinary identifier (prefix, local name, function name).
pub fn classify(word: &str) -> Option<Keyword> {
    let mut lexer = Keyword::lexer(word);
    match (lexer.next(), lexer.next()) {
        (Some(Ok(kw)), None) if lexer.slice().len() == word.len() => Some(kw),
        _ => None,
    }
}

/// Whether `word` is one of the reserved words that can never be used as a
/// bare prefix or local name without escaping.
pub fn is_reserved(word: &str) -> bool {
    classify(word).is_some() && !word.eq_ignore_ascii_case("a")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(classify("SELECT"), Some(Keyword::Select));
        assert_eq!(classify("Select"), Some(Keyword::Select));
        assert_eq!(classify("select"), Some(Keyword::Select));
    }

    #[test]
    fn rdf_type_shorthand_is_case_sensitive() {
        assert_eq!(classify("a"), Some(Keyword::RdfTypeShorthand));
        assert_eq!(classify("A"), None);
    }

    #[test]
    fn non_keywords_are_unclassified() {
        assert_eq!(classify("ex"), None);
        assert_eq!(classify("knows"), None);
    }
}
