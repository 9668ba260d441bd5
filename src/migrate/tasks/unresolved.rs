use anyhow::Result;
use camino::Utf8Path;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::Task;
use crate::migrate::filters::{is_js_file, is_module_file};
use crate::text::{lines_with_offsets, TODO_TAG};
use crate::workspace::Context;

static DOTTED_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\w$]+(?:\.[\w$]+)+").unwrap());

/// Leaves one file level marker listing the namespace references no
/// resolution pass could rewrite.
pub struct FlagUnresolvedReferences;

/// Blanks string literal contents and drops a trailing line comment.
fn code_only(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                    out.push(c);
                    continue;
                }
                out.push(' ');
            }
            None => {
                if c == '/' && chars.peek() == Some(&'/') {
                    break;
                }
                if matches!(c, '\'' | '"' | '`') {
                    quote = Some(c);
                }
                out.push(c);
            }
        }
    }
    out
}

fn is_comment_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*')
}

impl FlagUnresolvedReferences {
    /// `ns.X` prefixes of references that neither the project nor a library defines.
    fn unresolved(source: &str, namespace: &str, ctx: &Context<'_>) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for line in lines_with_offsets(source) {
            if line.text.contains(TODO_TAG) || is_comment_line(line.text) {
                continue;
            }
            let code = code_only(line.text);
            for m in DOTTED_NAME.find_iter(&code) {
                let before = &code[..m.start()];
                if before.ends_with('.') && !before.ends_with("...") {
                    continue;
                }
                let segments: Vec<&str> = m.as_str().split('.').collect();
                if segments[0] != namespace {
                    continue;
                }
                let known = (2..=segments.len()).any(|n| {
                    let prefix = segments[..n].join(".");
                    ctx.api().contains(&prefix) || ctx.libraries().lookup(&prefix).is_some()
                });
                let name = segments[..2].join(".");
                if !known && !out.contains(&name) {
                    out.push(name);
                }
            }
        }
        out
    }
}

impl Task for FlagUnresolvedReferences {
    fn name(&self) -> &'static str {
        "FlagUnresolvedReferences"
    }

    fn order(&self) -> u32 {
        5900
    }

    fn accept(&self, path: &Utf8Path, _ctx: &Context<'_>) -> bool {
        is_js_file(path) && !is_module_file(path)
    }

    fn process(&self, path: &Utf8Path, ctx: &mut Context<'_>) -> Result<()> {
        let source = ctx.source(path)?;
        let namespace = ctx.config().namespace.clone();
        let unresolved = Self::unresolved(&source, &namespace, ctx);
        if unresolved.is_empty() {
            return Ok(());
        }
        let message = format!("unresolved references: {}", unresolved.join(", "));
        if ctx.add_file_todo(path, &message)? {
            debug!(path = %path, references = unresolved.len(), "Flagged unresolved references");
        }
        Ok(())
    }
}
