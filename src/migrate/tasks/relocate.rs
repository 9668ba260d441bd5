use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};

use super::Task;
use crate::migrate::filters::{is_in_main_js, is_js_file, MAIN_JS_FOLDER};
use crate::workspace::Context;

/// Moves `src/main/js/<folder>/x.js` and `src/main/js/x.js` to `src/x.js`.
pub struct RelocateJsFiles;

impl RelocateJsFiles {
    pub fn target_for(path: &Utf8Path, js_folder: &Utf8Path) -> Option<Utf8PathBuf> {
        let rest = path
            .strip_prefix(js_folder)
            .or_else(|_| path.strip_prefix(MAIN_JS_FOLDER))
            .ok()?;
        Some(Utf8Path::new("src").join(rest))
    }
}

impl Task for RelocateJsFiles {
    fn name(&self) -> &'static str {
        "RelocateJsFiles"
    }

    fn order(&self) -> u32 {
        100
    }

    fn accept(&self, path: &Utf8Path, ctx: &Context<'_>) -> bool {
        ctx.config().remove_js_folder && is_js_file(path) && is_in_main_js(path)
    }

    fn process(&self, path: &Utf8Path, ctx: &mut Context<'_>) -> Result<()> {
        let Some(target) = Self::target_for(path, &ctx.config().js_folder()) else {
            return Ok(());
        };
        ctx.relocate(path, &target)
    }
}
