use std::ops::Range;

use crate::text::is_identifier_char;

/// Finds a fully-qualified name as a whole reference.
///
/// A match must not continue an identifier on either side, and must not be
/// the tail of a longer dotted name (`x.scout.Foo`). A spread (`...scout.Foo`)
/// is still a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencePattern {
    fqn: String,
}

impl ReferencePattern {
    pub fn new(fqn: impl Into<String>) -> Self {
        Self { fqn: fqn.into() }
    }

    pub fn fqn(&self) -> &str {
        &self.fqn
    }

    /// Non-overlapping matches, left to right.
    pub fn find_all(&self, text: &str) -> Vec<Range<usize>> {
        let mut out = Vec::new();
        if self.fqn.is_empty() {
            return out;
        }
        let mut pos = 0usize;
        while let Some(rel) = text[pos..].find(&self.fqn) {
            let start = pos + rel;
            let end = start + self.fqn.len();
            if self.is_boundary(text, start, end) {
                out.push(start..end);
                pos = end;
            } else {
                pos = start + text[start..].chars().next().map(char::len_utf8).unwrap_or(1);
            }
            if pos >= text.len() {
                break;
            }
        }
        out
    }

    pub fn is_match(&self, text: &str) -> bool {
        !self.find_all(text).is_empty()
    }

    fn is_boundary(&self, text: &str, start: usize, end: usize) -> bool {
        let before = &text[..start];
        let leading_ok = match before.chars().next_back() {
            None => true,
            Some('.') => before.ends_with("..."),
            Some(c) => !is_identifier_char(c),
        };
        let trailing_ok = text[end..]
            .chars()
            .next()
            .map(|c| !is_identifier_char(c))
            .unwrap_or(true);
        leading_ok && trailing_ok
    }

    /// Replaces every match. Returns the new text and the match offsets in the old text.
    pub fn replace_all(&self, text: &str, replacement: &str) -> (String, Vec<Range<usize>>) {
        let matches = self.find_all(text);
        if matches.is_empty() {
            return (text.to_string(), matches);
        }
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0usize;
        for m in &matches {
            out.push_str(&text[cursor..m.start]);
            out.push_str(replacement);
            cursor = m.end;
        }
        out.push_str(&text[cursor..]);
        (out, matches)
    }
}
