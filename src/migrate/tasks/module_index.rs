use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::Task;
use crate::collections::SeenPendingCollection;
use crate::error::MigrationError;
use crate::extract::leading_comment_span;
use crate::migrate::filters::{is_module_file, INDEX_FILE_NAME};
use crate::path::{module_specifier, normalize_lexically};
use crate::workspace::Context;

static INCLUDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"__include\(\s*["']([^"']+)["']\s*\)"#).unwrap());

/// Replaces a `*-module.js` include list with an `index.js` that re-exports
/// every included file. Nested module files are followed and deleted too.
pub struct ModulesToIndex;

/// Source-relative paths a module file includes, in order.
fn includes(module: &Utf8Path, source: &str) -> Result<Vec<Utf8PathBuf>> {
    let dir = module.parent().unwrap_or_else(|| Utf8Path::new(""));
    let mut out = Vec::new();
    for caps in INCLUDE.captures_iter(source) {
        let raw = &caps[1];
        let resolved = normalize_lexically(&dir.join(raw)).map_err(|err| {
            MigrationError::veto(format!("Cannot resolve include '{raw}' of {module}: {err}"))
        })?;
        out.push(resolved);
    }
    Ok(out)
}

impl ModulesToIndex {
    /// Module files reachable from `start` through includes, `start` included.
    fn reachable_modules(
        start: &Utf8Path,
        ctx: &mut Context<'_>,
    ) -> Result<SeenPendingCollection<Utf8PathBuf>> {
        let mut queue = SeenPendingCollection::default();
        queue.add(start.to_path_buf());
        while let Some(module) = queue.next_pending() {
            if !ctx.paths().contains(&module) {
                continue;
            }
            let source = ctx.source(&module)?;
            for include in includes(&module, &source).unwrap_or_default() {
                if is_module_file(&include) {
                    queue.add(include);
                }
            }
        }
        Ok(queue)
    }

    /// The module file whose index covers `path`, when that is not `path`
    /// itself. A module included from outside its include cycle belongs to
    /// that includer. Inside a cycle the smallest path is the root.
    fn handled_by(path: &Utf8Path, ctx: &mut Context<'_>) -> Result<Option<Utf8PathBuf>> {
        let reachable = Self::reachable_modules(path, ctx)?;
        let mut modules: Vec<Utf8PathBuf> = ctx
            .paths()
            .iter()
            .filter(|p| is_module_file(p) && p.as_path() != path && !ctx.is_deleted(p))
            .cloned()
            .collect();
        modules.sort();

        let own = path.to_path_buf();
        let mut cycle_root = None;
        for module in modules {
            if reachable.has_seen(&module) {
                if cycle_root.is_none()
                    && module.as_path() < path
                    && Self::reachable_modules(&module, ctx)?.has_seen(&own)
                {
                    cycle_root = Some(module);
                }
                continue;
            }
            let source = ctx.source(&module)?;
            let included = includes(&module, &source).unwrap_or_default();
            if included.contains(&own) {
                return Ok(Some(module));
            }
        }
        Ok(cycle_root)
    }
}

impl Task for ModulesToIndex {
    fn name(&self) -> &'static str {
        "ModulesToIndex"
    }

    fn order(&self) -> u32 {
        600
    }

    fn accept(&self, path: &Utf8Path, ctx: &Context<'_>) -> bool {
        ctx.config().use_index_js && is_module_file(path)
    }

    fn process(&self, path: &Utf8Path, ctx: &mut Context<'_>) -> Result<()> {
        if let Some(parent) = Self::handled_by(path, ctx)? {
            debug!(path = %path, parent = %parent, "Module handled by another module");
            return Ok(());
        }
        let nl = ctx.ensure_working_copy(path)?.line_delimiter();
        let source = ctx.source(path)?;

        let mut queue = SeenPendingCollection::default();
        queue.add(path.to_path_buf());
        let mut nested = Vec::new();
        let mut members: Vec<Utf8PathBuf> = Vec::new();
        while let Some(module) = queue.next_pending() {
            if module.as_path() != path {
                nested.push(module.clone());
            }
            let text = ctx.source(&module)?;
            for include in includes(&module, &text)? {
                if !ctx.paths().contains(&include) {
                    return Err(MigrationError::veto(format!(
                        "{module} includes {include}, which does not exist"
                    ))
                    .into());
                }
                if is_module_file(&include) {
                    queue.add(include);
                } else if !members.contains(&include) {
                    members.push(include);
                }
            }
        }

        let module_target = ctx.target_path_of(path);
        let index = module_target
            .parent()
            .map(|dir| dir.join(INDEX_FILE_NAME))
            .unwrap_or_else(|| Utf8PathBuf::from(INDEX_FILE_NAME));
        let existing = ctx
            .target_in_use(&index, path)
            .or_else(|| ctx.paths().contains(&index).then(|| index.clone()));
        if let Some(existing) = existing {
            return Err(MigrationError::TargetCollision {
                origin: path.to_path_buf(),
                target: index,
                existing,
            }
            .into());
        }

        let mut statements = Vec::new();
        for member in &members {
            let specifier = module_specifier(&index, &ctx.target_path_of(member));
            let owners = ctx.api().elements_in_file(member);
            if owners.is_empty() || ctx.is_unconverted(member) {
                statements.push(format!("import '{specifier}';"));
                continue;
            }
            let (defaults, named): (Vec<_>, Vec<_>) =
                owners.into_iter().partition(|owner| owner.is_default_export());
            for owner in defaults {
                statements.push(format!("export {{default as {}}} from '{specifier}';", owner.name));
            }
            if !named.is_empty() {
                let names: Vec<&str> = named.iter().map(|owner| owner.name.as_str()).collect();
                statements.push(format!("export {{{}}} from '{specifier}';", names.join(", ")));
            }
        }

        let mut content = leading_comment_span(&source)
            .map(|span| span.slice(&source).to_string())
            .unwrap_or_default();
        content.push_str(&statements.join(nl));
        content.push_str(nl);

        ctx.create_working_copy(&index, nl)?.set_source(content);
        for module in &nested {
            ctx.mark_deleted(module)?;
        }
        ctx.mark_deleted(path)?;
        debug!(
            path = %path,
            index = %index,
            files = members.len(),
            nested = nested.len(),
            "Generated index"
        );
        Ok(())
    }
}
