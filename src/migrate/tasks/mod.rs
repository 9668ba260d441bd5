//! Rewrite tasks, applied in ascending order.

pub mod app_listener;
pub mod classes;
pub mod module_index;
pub mod references;
pub mod relocate;
pub mod top_level_enums;
pub mod unresolved;
pub mod utilities;
pub mod write_imports;

use anyhow::Result;
use camino::Utf8Path;

use crate::workspace::Context;
pub use app_listener::AppListenerToSingleton;
pub use classes::ClassesToEs6;
pub use module_index::ModulesToIndex;
pub use references::ResolveReferences;
pub use relocate::RelocateJsFiles;
pub use top_level_enums::TopLevelEnumsToConst;
pub use unresolved::FlagUnresolvedReferences;
pub use utilities::UtilitiesToModules;
pub use write_imports::WriteImports;

/// One rewrite step. Tasks keep no state between files; everything they need
/// is derived from the [`Context`] on each call.
pub trait Task {
    fn name(&self) -> &'static str;

    /// Lower runs first.
    fn order(&self) -> u32;

    fn accept(&self, path: &Utf8Path, ctx: &Context<'_>) -> bool;

    fn process(&self, path: &Utf8Path, ctx: &mut Context<'_>) -> Result<()>;
}

/// The statically declared task list, sorted by order.
pub fn default_tasks() -> Vec<Box<dyn Task>> {
    let mut tasks: Vec<Box<dyn Task>> = vec![
        Box::new(RelocateJsFiles),
        Box::new(ClassesToEs6),
        Box::new(UtilitiesToModules),
        Box::new(TopLevelEnumsToConst),
        Box::new(ModulesToIndex),
        Box::new(ResolveReferences::static_functions()),
        Box::new(ResolveReferences::constants()),
        Box::new(ResolveReferences::enums()),
        Box::new(ResolveReferences::top_level_enums()),
        Box::new(ResolveReferences::utilities()),
        Box::new(ResolveReferences::singletons()),
        Box::new(ResolveReferences::classes()),
        Box::new(FlagUnresolvedReferences),
        Box::new(WriteImports),
    ];
    tasks.sort_by_key(|t| t.order());
    tasks
}
