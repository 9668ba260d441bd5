//! Rewrites fully-qualified references to local names and collects the
//! imports the rewritten text needs.

pub mod pattern;

use std::collections::HashSet;

use camino::Utf8Path;
use tracing::debug;

use crate::api::{Api, ElementKind, NamedElement};
use crate::extract::{AliasedMember, ImportRequest};
use crate::path::module_specifier;
use crate::text::{todo_inline, upper_first};
use crate::workspace::Context;
pub use pattern::ReferencePattern;

/// One fqn to look for, and what to do with each match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTarget {
    pub fqn: String,
    pub replacement: String,
    /// Requested once when at least one match was rewritten.
    pub import: Option<ImportRequest>,
    /// Matches are not rewritten but marked with this message instead.
    pub todo: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub source: String,
    pub imports: Vec<ImportRequest>,
    pub rewrites: usize,
    pub markers: usize,
}

/// Applies `targets` in order to `source`.
///
/// Rewriting a reference produces text the same pattern no longer matches,
/// and markers are not inserted twice, so a second pass changes nothing.
pub fn resolve_references(path: &Utf8Path, source: &str, targets: &[ReferenceTarget]) -> Resolution {
    let mut resolution = Resolution {
        source: source.to_string(),
        ..Resolution::default()
    };
    for target in targets {
        let pattern = ReferencePattern::new(target.fqn.as_str());
        if let Some(message) = &target.todo {
            let marker = todo_inline(message);
            let matches = pattern.find_all(&resolution.source);
            let mut out = String::with_capacity(resolution.source.len());
            let mut cursor = 0usize;
            for m in matches {
                if resolution.source[..m.start].ends_with(&marker) {
                    continue;
                }
                out.push_str(&resolution.source[cursor..m.start]);
                out.push_str(&marker);
                cursor = m.start;
                resolution.markers += 1;
                debug!(path = %path, fqn = %target.fqn, offset = m.start, "Marked reference for manual migration");
            }
            out.push_str(&resolution.source[cursor..]);
            resolution.source = out;
            continue;
        }

        let (rewritten, matches) = pattern.replace_all(&resolution.source, &target.replacement);
        if matches.is_empty() {
            continue;
        }
        if target.replacement != target.fqn {
            for m in &matches {
                debug!(
                    path = %path,
                    from = %target.fqn,
                    to = %target.replacement,
                    offset = m.start,
                    "Rewrote reference"
                );
            }
            resolution.rewrites += matches.len();
        }
        resolution.source = rewritten;
        if let Some(import) = &target.import {
            resolution.imports.push(import.clone());
        }
    }
    resolution
}

/// Which elements a resolution pass handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSelection {
    Kinds(&'static [ElementKind]),
    /// Singleton aliases of static functions.
    Singletons,
}

/// Builds the targets of one pass for the file `rel`, longest fqn first.
///
/// Project elements win over library elements with the same fqn.
pub fn collect_targets(
    ctx: &Context<'_>,
    rel: &Utf8Path,
    source: &str,
    selection: TargetSelection,
) -> Vec<ReferenceTarget> {
    let api = ctx.api();
    let local_names = local_names(api, rel);
    let mut targets = Vec::new();

    let kinds: &[ElementKind] = match selection {
        TargetSelection::Kinds(kinds) => kinds,
        TargetSelection::Singletons => &[ElementKind::StaticFunction],
    };

    for kind in kinds {
        for element in api.elements_of_kind(*kind, |_| false) {
            push_targets(ctx, api, None, element, rel, source, selection, &local_names, &mut targets);
        }
        for library in ctx.libraries().iter() {
            for element in library.elements_of_kind(*kind, |e| api.contains(&e.fqn)) {
                push_targets(
                    ctx,
                    library,
                    Some(library.name()),
                    element,
                    rel,
                    source,
                    selection,
                    &local_names,
                    &mut targets,
                );
            }
        }
    }

    let mut seen = HashSet::new();
    targets.retain(|t| seen.insert(t.fqn.clone()));
    targets.sort_by(|a, b| b.fqn.len().cmp(&a.fqn.len()).then_with(|| a.fqn.cmp(&b.fqn)));
    targets
}

#[allow(clippy::too_many_arguments)]
fn push_targets(
    ctx: &Context<'_>,
    api: &Api,
    library: Option<&str>,
    element: &NamedElement,
    rel: &Utf8Path,
    source: &str,
    selection: TargetSelection,
    local_names: &HashSet<String>,
    out: &mut Vec<ReferenceTarget>,
) {
    let aliases: Vec<&str> = match selection {
        TargetSelection::Kinds(_) => vec![element.fqn.as_str()],
        TargetSelection::Singletons => element.singleton_refs(),
    };
    let aliases: Vec<&str> = aliases.into_iter().filter(|a| source.contains(*a)).collect();
    if aliases.is_empty() {
        return;
    }
    // Root utilities are never resolved by their bare name.
    if element.kind == ElementKind::Utility && !element.fqn.contains('.') {
        return;
    }
    let Some(owner) = api.owner(element) else {
        return;
    };
    let Some(suffix) = element.fqn.strip_prefix(owner.fqn.as_str()) else {
        return;
    };
    let call = if selection == TargetSelection::Singletons {
        "()"
    } else {
        ""
    };

    let mut todo = element
        .has_parse_errors()
        .then(|| format!("'{}' could not be parsed, migrate this reference by hand", element.fqn));

    let (replacement, import) = match library {
        Some(module) => {
            let binding = binding_name(owner, local_names);
            let member = AliasedMember::aliased(owner.name.as_str(), binding.as_str());
            (
                format!("{binding}{suffix}{call}"),
                Some(ImportRequest::named_member(module, member)),
            )
        }
        None => {
            let Some(owner_file) = owner.source_file.as_deref() else {
                return;
            };
            if owner_file == rel {
                if ctx.is_unconverted(rel) {
                    return;
                }
                let replacement = if owner.kind == ElementKind::Utility && element.id != owner.id {
                    format!("{}{call}", element.name)
                } else {
                    format!("{}{suffix}{call}", owner.name)
                };
                (replacement, None)
            } else if ctx.is_unconverted(owner_file) {
                todo = Some(
                    "declared in a file that was not migrated, migrate this reference by hand"
                        .to_string(),
                );
                (element.fqn.clone(), None)
            } else {
                let from = ctx.target_path_of(rel);
                let to = ctx.target_path_of(owner_file);
                let specifier = module_specifier(&from, &to);
                let binding = binding_name(owner, local_names);
                let request = if owner.is_default_export() {
                    ImportRequest::default_member(specifier, AliasedMember::new(binding.as_str()))
                } else {
                    ImportRequest::named_member(
                        specifier,
                        AliasedMember::aliased(owner.name.as_str(), binding.as_str()),
                    )
                };
                (format!("{binding}{suffix}{call}"), Some(request))
            }
        }
    };

    for alias in aliases {
        out.push(ReferenceTarget {
            fqn: alias.to_string(),
            replacement: replacement.clone(),
            import: import.clone(),
            todo: todo.clone(),
        });
    }
}

/// Names the file `rel` defines itself.
fn local_names(api: &Api, rel: &Utf8Path) -> HashSet<String> {
    let mut names = HashSet::new();
    for owner in api.elements_in_file(rel) {
        names.insert(owner.name.clone());
        if owner.kind == ElementKind::Utility {
            for child in owner.children.iter().filter_map(|id| api.get(*id)) {
                names.insert(child.name.clone());
            }
        }
    }
    names
}

/// Local name of an imported owner: its own name unless the file already uses it.
fn binding_name(owner: &NamedElement, local_names: &HashSet<String>) -> String {
    if !local_names.contains(&owner.name) {
        return owner.name.clone();
    }
    let namespace = owner.fqn.split('.').next().unwrap_or_default();
    format!("{}{}", upper_first(namespace), owner.name)
}
