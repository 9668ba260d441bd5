use anyhow::Result;
use camino::Utf8Path;
use once_cell::sync::Lazy;
use regex::Regex;

use super::Task;
use crate::error::MigrationError;
use crate::migrate::filters::is_class_file;
use crate::resolve::ReferencePattern;
use crate::text::{apply_edits, TextEdit};
use crate::workspace::Context;

static LISTENER_FUNCTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"function\s*\(\s*\)\s*\{").unwrap());

/// Replaces the namespace singleton assigned by an app listener with a module
/// level `instance` variable. The class exposes it through `static get()`.
///
/// Runs as part of [`super::ClassesToEs6`], after the class body was rewritten.
pub struct AppListenerToSingleton;

impl AppListenerToSingleton {
    /// Singleton aliases declared by the owners of `path`.
    fn aliases(path: &Utf8Path, ctx: &Context<'_>) -> Vec<String> {
        let api = ctx.api();
        api.elements_in_file(path)
            .into_iter()
            .flat_map(|owner| owner.children.iter().filter_map(|id| api.get(*id)))
            .flat_map(|child| child.singleton_refs())
            .map(str::to_string)
            .collect()
    }
}

impl Task for AppListenerToSingleton {
    fn name(&self) -> &'static str {
        "AppListenerToSingleton"
    }

    fn order(&self) -> u32 {
        310
    }

    fn accept(&self, path: &Utf8Path, _ctx: &Context<'_>) -> bool {
        is_class_file(path)
    }

    fn process(&self, path: &Utf8Path, ctx: &mut Context<'_>) -> Result<()> {
        let aliases = Self::aliases(path, ctx);
        if aliases.is_empty() {
            return Ok(());
        }
        let js_file = ctx.current_js_file(path)?.clone();
        let nl = ctx.ensure_working_copy(path)?.line_delimiter();
        let source = ctx.source(path)?;

        let mut edits = Vec::new();
        for listener in &js_file.app_listeners {
            let Some(instance) = listener.instance_fqn.as_deref() else {
                continue;
            };
            if !aliases.iter().any(|a| a == instance) {
                continue;
            }
            if !listener.parse_errors.is_empty() {
                return Err(MigrationError::veto(format!(
                    "App listener '{}' could not be parsed: {}",
                    listener.event,
                    listener.parse_errors.join("; ")
                ))
                .into());
            }
            edits.push(TextEdit::insert(
                listener.span.start,
                format!("let instance = null;{nl}{nl}"),
            ));
            let header = listener.header.slice(&source);
            edits.push(TextEdit::replace(
                listener.header.start,
                listener.header.end,
                LISTENER_FUNCTION.replace(header, "() => {").into_owned(),
            ));
            let body_start = listener.header.end;
            let body = &source[body_start..listener.span.end];
            for m in ReferencePattern::new(instance).find_all(body) {
                edits.push(TextEdit::replace(
                    body_start + m.start,
                    body_start + m.end,
                    "instance",
                ));
            }
        }
        if edits.is_empty() {
            return Ok(());
        }
        let migrated = apply_edits(&source, edits)?;
        ctx.set_source(path, migrated)?;
        tracing::debug!(path = %path, "Moved app listener singleton into module scope");
        Ok(())
    }
}
