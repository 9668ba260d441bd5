use anyhow::Result;
use camino::Utf8Path;
use tracing::debug;

use super::Task;
use crate::api::ElementKind;
use crate::migrate::filters::{is_js_file, is_module_file};
use crate::resolve::{collect_targets, resolve_references, TargetSelection};
use crate::workspace::Context;

/// Rewrites fully-qualified references of one element family to local names
/// and requests the imports they need.
///
/// One instance per family. Members are resolved before the classes owning
/// them since a class fqn is a prefix of its members' fqns.
pub struct ResolveReferences {
    name: &'static str,
    order: u32,
    selection: TargetSelection,
}

impl ResolveReferences {
    pub fn static_functions() -> Self {
        Self {
            name: "ResolveStaticFunctionReferences",
            order: 5000,
            selection: TargetSelection::Kinds(&[ElementKind::StaticFunction]),
        }
    }

    pub fn constants() -> Self {
        Self {
            name: "ResolveConstantReferences",
            order: 5010,
            selection: TargetSelection::Kinds(&[ElementKind::Constant]),
        }
    }

    pub fn enums() -> Self {
        Self {
            name: "ResolveEnumReferences",
            order: 5020,
            selection: TargetSelection::Kinds(&[ElementKind::Enum]),
        }
    }

    pub fn top_level_enums() -> Self {
        Self {
            name: "ResolveTopLevelEnumReferences",
            order: 5030,
            selection: TargetSelection::Kinds(&[ElementKind::TopLevelEnum]),
        }
    }

    pub fn utilities() -> Self {
        Self {
            name: "ResolveUtilityReferences",
            order: 5040,
            selection: TargetSelection::Kinds(&[
                ElementKind::UtilityFunction,
                ElementKind::UtilityVariable,
                ElementKind::Utility,
            ]),
        }
    }

    pub fn singletons() -> Self {
        Self {
            name: "ResolveSingletonReferences",
            order: 5045,
            selection: TargetSelection::Singletons,
        }
    }

    pub fn classes() -> Self {
        Self {
            name: "ResolveClassReferences",
            order: 5050,
            selection: TargetSelection::Kinds(&[ElementKind::Class]),
        }
    }
}

impl Task for ResolveReferences {
    fn name(&self) -> &'static str {
        self.name
    }

    fn order(&self) -> u32 {
        self.order
    }

    fn accept(&self, path: &Utf8Path, _ctx: &Context<'_>) -> bool {
        is_js_file(path) && !is_module_file(path)
    }

    fn process(&self, path: &Utf8Path, ctx: &mut Context<'_>) -> Result<()> {
        let source = ctx.source(path)?;
        let targets = collect_targets(ctx, path, &source, self.selection);
        if targets.is_empty() {
            return Ok(());
        }
        let resolution = resolve_references(path, &source, &targets);
        ctx.set_source(path, resolution.source)?;
        for import in &resolution.imports {
            ctx.request_import(path, import)?;
        }
        let stats = ctx.stats_mut();
        stats.references_rewritten += resolution.rewrites;
        stats.todo_markers += resolution.markers;
        if resolution.rewrites > 0 || resolution.markers > 0 {
            debug!(
                task = self.name,
                path = %path,
                rewrites = resolution.rewrites,
                markers = resolution.markers,
                imports = resolution.imports.len(),
                "Resolved references"
            );
        }
        Ok(())
    }
}
