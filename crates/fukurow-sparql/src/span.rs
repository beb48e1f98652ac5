//! Byte-range references into a query's source text.
//!
//! The parser records spans instead of copying substrings so that
//! evaluators needing a lexical form (`REGEX`, `GROUP_CONCAT`, compound
//! `EXISTS` substitution) can read straight from the one owned copy of the
//! source text held for the plan's lifetime.

/// A `(start, length)` byte range into a query's source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub length: usize,
}

impl Span {
    pub fn new(start: usize, length: usize) -> Self {
        Span { start, length }
    }

    pub fn end(&self) -> usize {
        self.start + self.length
    }

    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end()]
    }

    pub fn is_in_bounds(&self, source_len: usize) -> bool {
        self.start <= self.end() && self.end() <= source_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_extracts_the_byte_range() {
        let src = "SELECT ?s WHERE { ?s ex:name ?n }";
        let span = Span::new(7, 2);
        assert_eq!(span.text(src), "?s");
    }
}
