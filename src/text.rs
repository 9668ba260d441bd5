use anyhow::{anyhow, Result};

/// Greppable tag carried by every marker the migration leaves behind.
pub const TODO_TAG: &str = "TODO MIG:";

pub fn detect_line_delimiter(text: &str) -> &'static str {
    match text.find('\n') {
        Some(idx) if idx > 0 && text.as_bytes()[idx - 1] == b'\r' => "\r\n",
        Some(_) => "\n",
        None if text.contains('\r') => "\r",
        None => "\n",
    }
}

pub fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

pub fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => chars.all(is_identifier_char),
        _ => false,
    }
}

/// Whole-line marker, terminated by `nl`.
pub fn todo_line(message: &str, nl: &str) -> String {
    format!("// {TODO_TAG} {message}{nl}")
}

/// Marker placed directly in front of a construct on the same line.
pub fn todo_inline(message: &str) -> String {
    format!("/* {TODO_TAG} {message} */ ")
}

pub fn upper_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// One line of a text with its byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// Content without the line delimiter.
    pub text: &'a str,
    pub start: usize,
    /// End of the content, before the delimiter.
    pub end: usize,
    /// Start of the following line (after the delimiter).
    pub next: usize,
}

pub fn lines_with_offsets(text: &str) -> Vec<Line<'_>> {
    let mut out = Vec::new();
    let mut start = 0usize;
    while start < text.len() {
        let (end, next) = match text[start..].find('\n') {
            Some(rel) => {
                let nl = start + rel;
                let end = if nl > start && text.as_bytes()[nl - 1] == b'\r' {
                    nl - 1
                } else {
                    nl
                };
                (end, nl + 1)
            }
            None => (text.len(), text.len()),
        };
        out.push(Line {
            text: &text[start..end],
            start,
            end,
            next,
        });
        start = next;
    }
    out
}

/// Prefixes every non-blank line of `block` with `prefix`.
pub fn indent(block: &str, prefix: &str) -> String {
    let mut out = String::with_capacity(block.len() + prefix.len() * 8);
    for line in block.split_inclusive('\n') {
        if !line.trim().is_empty() {
            out.push_str(prefix);
        }
        out.push_str(line);
    }
    out
}

/// Removes up to `width` leading spaces.
pub fn outdent(line: &str, width: usize) -> &str {
    let spaces = line.bytes().take(width).take_while(|b| *b == b' ').count();
    &line[spaces..]
}

pub fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start();
    &line[..line.len() - trimmed.len()]
}

/// A replacement of the byte range `start..end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

impl TextEdit {
    pub fn replace(start: usize, end: usize, replacement: impl Into<String>) -> Self {
        Self {
            start,
            end,
            replacement: replacement.into(),
        }
    }

    pub fn delete(start: usize, end: usize) -> Self {
        Self::replace(start, end, String::new())
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::replace(at, at, text)
    }
}

/// Applies all edits against the original offsets of `source`.
///
/// Edits must not overlap; insertions at the same offset keep their given order.
pub fn apply_edits(source: &str, mut edits: Vec<TextEdit>) -> Result<String> {
    edits.sort_by_key(|e| (e.start, e.end));
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0usize;
    for edit in &edits {
        if edit.start < cursor || edit.end < edit.start || edit.end > source.len() {
            return Err(anyhow!(
                "Overlapping or out of range edit {}..{} (cursor {cursor}, len {})",
                edit.start,
                edit.end,
                source.len()
            ));
        }
        if !source.is_char_boundary(edit.start) || !source.is_char_boundary(edit.end) {
            return Err(anyhow!("Edit {}..{} splits a character", edit.start, edit.end));
        }
        out.push_str(&source[cursor..edit.start]);
        out.push_str(&edit.replacement);
        cursor = edit.end;
    }
    out.push_str(&source[cursor..]);
    Ok(out)
}
