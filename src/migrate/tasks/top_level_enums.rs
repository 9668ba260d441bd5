use anyhow::Result;
use camino::Utf8Path;
use once_cell::sync::Lazy;
use regex::Regex;

use super::Task;
use crate::error::MigrationError;
use crate::migrate::filters::is_class_file;
use crate::text::{apply_edits, TextEdit};
use crate::workspace::Context;

static ENUM_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w$]+\.([\w$]+)\s*=").unwrap());

/// `ns.Status = { ... };` becomes `const Status = { ... };` with a default
/// export, or `export const` when the file holds more than one such block or a class.
pub struct TopLevelEnumsToConst;

impl Task for TopLevelEnumsToConst {
    fn name(&self) -> &'static str {
        "TopLevelEnumsToConst"
    }

    fn order(&self) -> u32 {
        500
    }

    fn accept(&self, path: &Utf8Path, _ctx: &Context<'_>) -> bool {
        is_class_file(path)
    }

    fn process(&self, path: &Utf8Path, ctx: &mut Context<'_>) -> Result<()> {
        let result = Self::convert(path, ctx);
        if result.is_err() {
            ctx.mark_unconverted(path);
        }
        result
    }
}

impl TopLevelEnumsToConst {
    fn convert(path: &Utf8Path, ctx: &mut Context<'_>) -> Result<()> {
        let js_file = ctx.current_js_file(path)?.clone();
        if js_file.top_level_enums.is_empty() {
            return Ok(());
        }
        if let Some(broken) = js_file
            .top_level_enums
            .iter()
            .find(|e| !e.parse_errors.is_empty())
        {
            return Err(MigrationError::veto(format!(
                "{} could not be parsed: {}",
                broken.fqn,
                broken.parse_errors.join("; ")
            ))
            .into());
        }
        let nl = ctx.ensure_working_copy(path)?.line_delimiter();
        let source = ctx.source(path)?;

        let mut edits = Vec::new();
        let mut default_export = None;
        for tle in &js_file.top_level_enums {
            let header = tle.span.slice(&source);
            let Some(m) = ENUM_HEADER.find(header) else {
                continue;
            };
            // The index was built before classes were rewritten, so it still
            // knows whether this block is the file's only export.
            let is_default = ctx
                .api()
                .lookup(&tle.fqn)
                .is_some_and(|e| e.is_default_export());
            let declaration = if is_default {
                default_export = Some(tle.name.clone());
                format!("const {} =", tle.name)
            } else {
                format!("export const {} =", tle.name)
            };
            edits.push(TextEdit::replace(
                tle.span.start,
                tle.span.start + m.end(),
                declaration,
            ));
        }

        let migrated = apply_edits(&source, edits)?;
        let mut text = migrated.trim_end_matches(|c| c == '\n' || c == '\r').to_string();
        text.push_str(nl);
        if let Some(name) = default_export {
            text.push_str(&format!("{nl}export default {name};{nl}"));
        }
        ctx.set_source(path, text)?;
        tracing::debug!(
            path = %path,
            enums = js_file.top_level_enums.len(),
            "Converted top level enums"
        );
        Ok(())
    }
}
