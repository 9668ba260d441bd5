use std::collections::HashSet;

use anyhow::Result;
use camino::Utf8Path;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::Task;
use crate::error::MigrationError;
use crate::extract::{JsUtility, JsUtilityMember, UtilityStyle};
use crate::migrate::filters::is_utility_file;
use crate::resolve::ReferencePattern;
use crate::text::{apply_edits, lines_with_offsets, outdent, TextEdit};
use crate::workspace::Context;

static BLOCK_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^  ([\w$]+)\s*:\s*function\s*\(([^)]*)\)\s*\{(.*?),?\s*$").unwrap()
});
static BLOCK_VARIABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^  ([\w$]+)\s*:\s*(.*?),?\s*$").unwrap());
static BLOCK_MEMBER_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"^  [\]})]").unwrap());
static PART_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[\w$]+\.)+([\w$]+)\s*=\s*function\s*\(([^)]*)\)\s*\{(.*)$").unwrap()
});
static PART_VARIABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[\w$]+\.)+([\w$]+)\s*=\s*(.*)$").unwrap());
static THIS_MEMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bthis\.([\w$]+)\b").unwrap());

/// Turns a utility into a module: every member becomes a top level function or
/// variable, public members are exported by name and collected in a default
/// export object.
pub struct UtilitiesToModules;

impl Task for UtilitiesToModules {
    fn name(&self) -> &'static str {
        "UtilitiesToModules"
    }

    fn order(&self) -> u32 {
        400
    }

    fn accept(&self, path: &Utf8Path, _ctx: &Context<'_>) -> bool {
        is_utility_file(path)
    }

    fn process(&self, path: &Utf8Path, ctx: &mut Context<'_>) -> Result<()> {
        let result = Self::convert(path, ctx);
        if result.is_err() {
            ctx.mark_unconverted(path);
        }
        result
    }
}

impl UtilitiesToModules {
    fn convert(path: &Utf8Path, ctx: &mut Context<'_>) -> Result<()> {
        let js_file = ctx.current_js_file(path)?.clone();
        let utility = match js_file.utilities.as_slice() {
            [] => return Ok(()),
            [utility] => utility,
            more => {
                return Err(MigrationError::veto(format!(
                    "Expected one utility per file, found {}",
                    more.len()
                ))
                .into())
            }
        };
        if !utility.parse_errors.is_empty() {
            return Err(MigrationError::veto(format!(
                "Utility {} could not be parsed: {}",
                utility.fqn,
                utility.parse_errors.join("; ")
            ))
            .into());
        }
        let nl = ctx.ensure_working_copy(path)?.line_delimiter();
        let source = ctx.source(path)?;

        let edits = match utility.style {
            UtilityStyle::Block => block_edits(utility, &source, nl)?,
            UtilityStyle::Part => part_edits(utility, &source)?,
        };
        let mut migrated = apply_edits(&source, edits)?;
        for member in &utility.members {
            let pattern = ReferencePattern::new(member.fqn.as_str());
            migrated = pattern.replace_all(&migrated, &member.name).0;
        }

        let mut text = migrated.trim_end_matches(|c| c == '\n' || c == '\r').to_string();
        text.push_str(nl);
        let exported: Vec<&str> = utility.exported_members().map(|m| m.name.as_str()).collect();
        if !exported.is_empty() {
            text.push_str(nl);
            text.push_str("export default {");
            text.push_str(nl);
            let entries: Vec<String> = exported.iter().map(|name| format!("  {name}")).collect();
            text.push_str(&entries.join(&format!(",{nl}")));
            text.push_str(nl);
            text.push_str("};");
            text.push_str(nl);
        }
        ctx.set_source(path, text)?;
        tracing::debug!(
            path = %path,
            utility = %utility.fqn,
            members = utility.members.len(),
            "Converted utility to module"
        );
        Ok(())
    }
}

fn declaration(member: &JsUtilityMember, keyword: &str) -> String {
    if member.is_exported() {
        format!("export {keyword}")
    } else {
        keyword.to_string()
    }
}

fn variable_keyword(member: &JsUtilityMember) -> &'static str {
    if member.constant {
        "const"
    } else {
        "let"
    }
}

fn opens_value(value: &str) -> bool {
    value.ends_with(|c| matches!(c, '{' | '[' | '('))
}

/// `ns.util = { ... };` rewritten as one block: the wrapper lines go, member
/// lines become declarations, everything else moves two columns left.
fn block_edits(utility: &JsUtility, source: &str, nl: &str) -> Result<Vec<TextEdit>> {
    let Some(span) = utility.span else {
        return Ok(Vec::new());
    };
    let names: HashSet<&str> = utility.members.iter().map(|m| m.name.as_str()).collect();
    let lines: Vec<_> = lines_with_offsets(source)
        .into_iter()
        .filter(|l| l.start >= span.start && l.end <= span.end)
        .collect();
    let (Some(first), Some(last)) = (lines.first(), lines.last()) else {
        return Ok(Vec::new());
    };
    if lines.len() < 2 {
        return Ok(Vec::new());
    }

    let mut out = String::new();
    let mut open_member: Option<&JsUtilityMember> = None;
    for line in &lines[1..lines.len() - 1] {
        let member = utility.members.iter().find(|m| m.tag.start == line.start);
        let converted = if let Some(member) = member {
            open_member = Some(member);
            if member.function {
                let caps = BLOCK_FUNCTION.captures(line.text).ok_or_else(|| {
                    MigrationError::veto(format!("Cannot convert utility function '{}'", member.fqn))
                })?;
                format!(
                    "{} {}({}) {{{}",
                    declaration(member, "function"),
                    member.name,
                    caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default(),
                    caps.get(3).map(|m| m.as_str()).unwrap_or_default()
                )
            } else {
                let value = BLOCK_VARIABLE
                    .captures(line.text)
                    .and_then(|caps| caps.get(2))
                    .map(|m| m.as_str())
                    .unwrap_or_default();
                let terminator = if opens_value(value) { "" } else { ";" };
                format!(
                    "{} {} = {value}{terminator}",
                    declaration(member, variable_keyword(member)),
                    member.name
                )
            }
        } else if BLOCK_MEMBER_END.is_match(line.text) {
            let closing = line.text.trim().trim_end_matches(',');
            match open_member.take() {
                Some(m) if !m.function && !closing.ends_with(';') => format!("{closing};"),
                _ => closing.to_string(),
            }
        } else {
            outdent(line.text, 2).to_string()
        };
        let converted = THIS_MEMBER.replace_all(&converted, |caps: &Captures<'_>| {
            let name = &caps[1];
            if names.contains(name) {
                name.to_string()
            } else {
                caps[0].to_string()
            }
        });
        out.push_str(&converted);
        out.push_str(nl);
    }

    Ok(vec![TextEdit::replace(first.start, last.next, out)])
}

/// `ns.util.x = ...;` statements: the declaration line goes, member headers
/// become declarations and function closers lose their semicolon.
fn part_edits(utility: &JsUtility, source: &str) -> Result<Vec<TextEdit>> {
    let mut edits = Vec::new();
    if let Some(declaration_span) = utility.declaration {
        edits.push(TextEdit::delete(declaration_span.start, declaration_span.end));
    }
    for member in &utility.members {
        let tag = member.tag.slice(source);
        let converted = if member.function {
            let caps = PART_FUNCTION.captures(tag).ok_or_else(|| {
                MigrationError::veto(format!("Cannot convert utility function '{}'", member.fqn))
            })?;
            let rest = caps.get(3).map(|m| m.as_str()).unwrap_or_default();
            format!(
                "{} {}({}) {{{}",
                declaration(member, "function"),
                member.name,
                caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default(),
                rest.trim_end().trim_end_matches(';')
            )
        } else {
            let value = PART_VARIABLE
                .captures(tag)
                .and_then(|caps| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            format!(
                "{} {} = {value}",
                declaration(member, variable_keyword(member)),
                member.name
            )
        };
        edits.push(TextEdit::replace(member.tag.start, member.tag.end, converted));

        if let (true, Some(end_tag)) = (member.function, member.end_tag) {
            let closing = end_tag.slice(source);
            edits.push(TextEdit::replace(
                end_tag.start,
                end_tag.end,
                closing.trim_end().trim_end_matches(';'),
            ));
        }
    }
    Ok(edits)
}
