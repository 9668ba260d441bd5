//! Path predicates tasks compose their `accept` from.

use camino::Utf8Path;

use crate::path::file_name;

pub const MAIN_JS_FOLDER: &str = "src/main/js";
pub const MODULE_FILE_SUFFIX: &str = "-module.js";
pub const INDEX_FILE_NAME: &str = "index.js";

pub fn is_js_file(path: &Utf8Path) -> bool {
    path.extension() == Some("js")
}

/// `*-module.js` include lists.
pub fn is_module_file(path: &Utf8Path) -> bool {
    is_js_file(path) && file_name(path).ends_with(MODULE_FILE_SUFFIX)
}

pub fn is_index_file(path: &Utf8Path) -> bool {
    file_name(path) == INDEX_FILE_NAME
}

fn first_char(path: &Utf8Path) -> Option<char> {
    file_name(path).chars().next()
}

/// A JS file named after a class: `FormField.js`.
pub fn is_class_file(path: &Utf8Path) -> bool {
    is_js_file(path)
        && !is_module_file(path)
        && first_char(path).is_some_and(|c| c.is_ascii_uppercase())
}

/// A JS file named after a utility: `strings.js`.
pub fn is_utility_file(path: &Utf8Path) -> bool {
    is_js_file(path)
        && !is_module_file(path)
        && !is_index_file(path)
        && first_char(path).is_some_and(|c| c.is_ascii_lowercase())
}

pub fn is_in_main_js(path: &Utf8Path) -> bool {
    path.starts_with(MAIN_JS_FOLDER)
}
