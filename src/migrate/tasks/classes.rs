use anyhow::Result;
use camino::Utf8Path;
use regex::Regex;

use super::{AppListenerToSingleton, Task};
use crate::error::MigrationError;
use crate::extract::{JsClass, JsFunction};
use crate::migrate::filters::is_class_file;
use crate::text::{apply_edits, indent, TextEdit};
use crate::workspace::Context;

/// Turns constructor functions with their prototype and static functions into
/// ES6 classes.
pub struct ClassesToEs6;

impl Task for ClassesToEs6 {
    fn name(&self) -> &'static str {
        "ClassesToEs6"
    }

    fn order(&self) -> u32 {
        300
    }

    fn accept(&self, path: &Utf8Path, _ctx: &Context<'_>) -> bool {
        is_class_file(path)
    }

    fn process(&self, path: &Utf8Path, ctx: &mut Context<'_>) -> Result<()> {
        let js_file = ctx.current_js_file(path)?.clone();
        if js_file.classes.is_empty() {
            return Ok(());
        }
        let nl = ctx.ensure_working_copy(path)?.line_delimiter();
        let source = ctx.source(path)?;

        let mut edits = Vec::new();
        for class in &js_file.classes {
            if let Err(err) = class_edits(class, &source, nl, &mut edits) {
                ctx.mark_unconverted(path);
                return Err(err);
            }
        }
        let migrated = apply_edits(&source, edits)?;
        let trimmed = migrated.trim_end_matches(|c| c == '\n' || c == '\r');
        ctx.set_source(path, format!("{trimmed}{nl}"))?;
        tracing::debug!(path = %path, classes = js_file.classes.len(), "Converted classes");

        AppListenerToSingleton.process(path, ctx)
    }
}

fn class_edits(class: &JsClass, source: &str, nl: &str, edits: &mut Vec<TextEdit>) -> Result<()> {
    let ctor = class.constructor.as_ref().ok_or_else(|| {
        MigrationError::veto(format!("Class {} has no constructor", class.fqn))
    })?;
    if let Some(early) = class
        .functions
        .iter()
        .find(|f| !f.is_memory_only() && f.region_start() < ctor.span.start)
    {
        return Err(MigrationError::veto(format!(
            "Function '{}' is declared before the constructor of {}",
            early.name, class.fqn
        ))
        .into());
    }
    if let Some(broken) = class.all_functions().find(|f| !f.parse_errors.is_empty()) {
        return Err(MigrationError::veto(format!(
            "Function '{}' of {} could not be parsed: {}",
            broken.name,
            class.fqn,
            broken.parse_errors.join("; ")
        ))
        .into());
    }

    let parents = ParentCalls::new(&class.fqn)?;
    let mut text = String::new();
    if let Some(comment) = ctor.comment {
        text.push_str(comment.slice(source));
    }
    text.push_str(if class.default_export {
        "export default class "
    } else {
        "export class "
    });
    text.push_str(&class.name);
    if let Some(super_call) = &class.super_call {
        text.push_str(" extends ");
        text.push_str(&super_call.superclass);
    }
    text.push_str(" {");
    text.push_str(nl);

    let mut body = parents.rewrite(ctor.body.slice(source));
    if class.super_call.is_some() && !body.contains("super(") {
        body.insert_str(0, &format!("  super();{nl}"));
    }
    push_method(&mut text, "constructor", &ctor.args, &body, nl);

    for function in class.functions.iter().filter(|f| !f.is_memory_only()) {
        text.push_str(nl);
        if let Some(comment) = function.comment {
            text.push_str(&indent(comment.slice(source), "  "));
        }
        let name = if function.is_static() {
            format!("static {}", function.name)
        } else {
            function.name.clone()
        };
        let body = parents.rewrite(function.body.slice(source));
        push_method(&mut text, &name, &function.args, &body, nl);
        edits.push(TextEdit::delete(function.region_start(), region_end(source, function)));
    }
    for function in class.functions.iter().filter(|f| f.is_memory_only()) {
        text.push_str(nl);
        let body = function
            .memory_body
            .as_deref()
            .map(|b| format!("  {b}{nl}"))
            .unwrap_or_default();
        push_method(&mut text, &format!("static {}", function.name), &function.args, &body, nl);
    }
    text.push('}');

    edits.push(TextEdit::replace(ctor.region_start(), ctor.span.end, text));
    if let Some(super_call) = &class.super_call {
        edits.push(TextEdit::delete(super_call.span.start, super_call.span.end));
    }
    Ok(())
}

fn push_method(text: &mut String, name: &str, args: &str, body: &str, nl: &str) {
    text.push_str(&format!("  {name}({args}) {{{nl}"));
    text.push_str(&indent(body, "  "));
    text.push_str(&format!("  }}{nl}"));
}

/// End of the function's last line, one following blank line included.
fn region_end(source: &str, function: &JsFunction) -> usize {
    let after = after_line(source, function.span.end);
    let rest = &source[after..];
    match rest.find('\n') {
        Some(idx) if rest[..idx].trim().is_empty() => after + idx + 1,
        _ => after,
    }
}

fn after_line(source: &str, offset: usize) -> usize {
    match source[offset..].find('\n') {
        Some(idx) => offset + idx + 1,
        None => source.len(),
    }
}

/// `X.parent` calls of one class, rewritten to `super`.
struct ParentCalls {
    method_apply: Regex,
    method_call: Regex,
    ctor_apply: Regex,
    ctor_call: Regex,
}

impl ParentCalls {
    fn new(fqn: &str) -> Result<Self> {
        let fqn = regex::escape(fqn);
        Ok(Self {
            method_apply: Regex::new(&format!(
                r"{fqn}\.parent\.prototype\.([\w$]+)\.apply\(\s*this\s*,\s*arguments\s*\)"
            ))?,
            method_call: Regex::new(&format!(
                r"{fqn}\.parent\.prototype\.([\w$]+)\.call\(\s*this\s*(?:,\s*)?"
            ))?,
            ctor_apply: Regex::new(&format!(
                r"{fqn}\.parent\.apply\(\s*this\s*,\s*arguments\s*\)"
            ))?,
            ctor_call: Regex::new(&format!(r"{fqn}\.parent\.call\(\s*this\s*(?:,\s*)?"))?,
        })
    }

    fn rewrite(&self, body: &str) -> String {
        let out = self.method_apply.replace_all(body, "super.${1}(...arguments)");
        let out = self.method_call.replace_all(&out, "super.${1}(");
        let out = self.ctor_apply.replace_all(&out, "super(...arguments)");
        let out = self.ctor_call.replace_all(&out, "super(");
        out.into_owned()
    }
}
