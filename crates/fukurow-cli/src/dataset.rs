//! A minimal "subject predicate object ." line format for `fukurow-cli run
//! --data`. This is a callback-style consumer, not a full Turtle/N-Triples
//! parser: it recognizes IRI refs, blank nodes and plain/typed/language
//! literals, one triple per line, and nothing else (no comments, no `@base`,
//! no multi-line literals).

use fukurow_core::model::{Literal, Term};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("line {line}: expected 3 terms followed by '.', found {found}")]
    WrongArity { line: usize, found: usize },
    #[error("line {line}: unterminated quoted literal")]
    UnterminatedLiteral { line: usize },
    #[error("line {line}: unrecognized term {text:?}")]
    UnrecognizedTerm { line: usize, text: String },
}

/// Parses one data file's worth of `subject predicate object .` lines into
/// quads, skipping blank lines.
pub fn parse(source: &str) -> Result<Vec<(Term, Term, Term)>, DatasetError> {
    let mut quads = Vec::new();
    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        let tokens = tokenize(line, line_no)?;
        let trailing_dot = tokens.last().map(|t| t == ".").unwrap_or(false);
        let terms = if trailing_dot { &tokens[..tokens.len() - 1] } else { &tokens[..] };
        if terms.len() != 3 {
            return Err(DatasetError::WrongArity { line: line_no, found: terms.len() });
        }
        let s = parse_term(&terms[0], line_no)?;
        let p = parse_term(&terms[1], line_no)?;
        let o = parse_term(&terms[2], line_no)?;
        quads.push((s, p, o));
    }
    Ok(quads)
}

fn tokenize(line: &str, line_no: usize) -> Result<Vec<String>, DatasetError> {
    let mut tokens = Vec::new();
    let mut chars = line.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        if c.is_whitespace() {
            continue;
        }
        if c == '"' {
            let mut end = None;
            let mut escaped = false;
            for (i, ch) in chars.by_ref() {
                if escaped {
                    escaped = false;
                    continue;
                }
                if ch == '\\' {
                    escaped = true;
                    continue;
                }
                if ch == '"' {
                    end = Some(i);
                    break;
                }
            }
            let quote_end = end.ok_or(DatasetError::UnterminatedLiteral { line: line_no })?;
            let mut literal_end = quote_end + 1;
            while let Some(&(i, ch)) = chars.peek() {
                if ch.is_whitespace() {
                    break;
                }
                literal_end = i + ch.len_utf8();
                chars.next();
            }
            tokens.push(line[start..literal_end].to_string());
        } else {
            let mut end = start + c.len_utf8();
            while let Some(&(i, ch)) = chars.peek() {
                if ch.is_whitespace() {
                    break;
                }
                end = i + ch.len_utf8();
                chars.next();
            }
            tokens.push(line[start..end].to_string());
        }
    }
    Ok(tokens)
}

fn parse_term(text: &str, line_no: usize) -> Result<Term, DatasetError> {
    if let Some(iri) = text.strip_prefix('<').and_then(|rest| rest.strip_suffix('>')) {
        return Ok(Term::iri(iri));
    }
    if let Some(label) = text.strip_prefix("_:") {
        return Ok(Term::blank(label));
    }
    if text.starts_with('"') {
        return parse_literal(text, line_no).map(Term::Literal);
    }
    Err(DatasetError::UnrecognizedTerm { line: line_no, text: text.to_string() })
}

fn parse_literal(text: &str, line_no: usize) -> Result<Literal, DatasetError> {
    let rest = &text[1..];
    let close = find_unescaped_quote(rest).ok_or(DatasetError::UnterminatedLiteral { line: line_no })?;
    let lexical = unescape(&rest[..close]);
    let tail = &rest[close + 1..];
    if let Some(lang) = tail.strip_prefix('@') {
        return Ok(Literal::lang(&lexical, lang));
    }
    if let Some(dt) = tail.strip_prefix("^^<").and_then(|r| r.strip_suffix('>')) {
        return Ok(Literal::typed(&lexical, dt));
    }
    Ok(Literal::plain(&lexical))
}

fn find_unescaped_quote(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
            continue;
        }
        if c == '"' {
            return Some(i);
        }
    }
    None
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}
