//! Path handling for migration runs.
//!
//! Every file of a run is identified by its path relative to the source
//! module root. This module provides:
//! - UTF-8 typed paths via camino (Utf8Path, Utf8PathBuf)
//! - Lexical normalization of `.`/`..` segments
//! - ES6 module specifiers between two relative target paths

pub use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum PathError {
    /// A relative path climbs above its root via `..`.
    Escapes { path: Utf8PathBuf },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::Escapes { path } => {
                write!(f, "Path '{}' escapes its root directory", path)
            }
        }
    }
}

impl std::error::Error for PathError {}

/// Resolves `.` and `..` segments without touching the file system.
///
/// Fails when a relative path climbs above its first segment.
pub fn normalize_lexically(path: &Utf8Path) -> Result<Utf8PathBuf, PathError> {
    let mut out: Vec<Utf8Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => match out.last() {
                Some(Utf8Component::Normal(_)) => {
                    out.pop();
                }
                Some(Utf8Component::RootDir) | Some(Utf8Component::Prefix(_)) => {}
                _ => {
                    return Err(PathError::Escapes {
                        path: path.to_path_buf(),
                    })
                }
            },
            other => out.push(other),
        }
    }
    Ok(out.iter().map(|c| c.as_str()).collect())
}

/// The ES6 module specifier that imports `to` from a module located at `from`.
///
/// Both paths are relative to the same root. The `.js` extension is dropped
/// and the result always starts with `./` or `../`.
///
/// # Example
///
/// ```
/// use scout_es6_migration::path::{module_specifier, Utf8Path};
///
/// let spec = module_specifier(
///     Utf8Path::new("src/form/fields/StringField.js"),
///     Utf8Path::new("src/form/FormField.js"),
/// );
/// assert_eq!(spec, "../FormField");
/// ```
pub fn module_specifier(from: &Utf8Path, to: &Utf8Path) -> String {
    let from_dir: Vec<&str> = from
        .parent()
        .map(|p| p.iter().filter(|s| *s != ".").collect())
        .unwrap_or_default();
    let to_parts: Vec<&str> = to.iter().filter(|s| *s != ".").collect();

    let common = from_dir
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let ups = from_dir.len() - common;

    let mut spec = if ups == 0 {
        String::from("./")
    } else {
        "../".repeat(ups)
    };
    spec.push_str(&to_parts[common..].join("/"));
    match spec.strip_suffix(".js") {
        Some(stripped) => stripped.to_string(),
        None => spec,
    }
}

/// File name without directories, or an empty string.
pub fn file_name(path: &Utf8Path) -> &str {
    path.file_name().unwrap_or("")
}

/// File name without the `.js` extension.
pub fn js_stem(path: &Utf8Path) -> &str {
    let name = file_name(path);
    name.strip_suffix(".js").unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("src/main/js/./scout/Foo.js", "src/main/js/scout/Foo.js"; "current dir segment")]
    #[test_case("src/main/js/scout/../jswidgets/Bar.js", "src/main/js/jswidgets/Bar.js"; "parent segment")]
    #[test_case("/abs/../x.js", "/x.js"; "absolute parent")]
    fn test_normalize_lexically(input: &str, expected: &str) {
        assert_eq!(normalize_lexically(Utf8Path::new(input)).unwrap().as_str(), expected);
    }

    #[test]
    fn test_normalize_lexically_rejects_escape() {
        let err = normalize_lexically(Utf8Path::new("../outside.js")).unwrap_err();
        assert!(matches!(err, PathError::Escapes { .. }));
    }

    #[test_case("src/Foo.js", "src/Bar.js", "./Bar"; "same directory")]
    #[test_case("src/Foo.js", "src/form/FormField.js", "./form/FormField"; "child directory")]
    #[test_case("src/form/fields/StringField.js", "src/util/strings.js", "../../util/strings"; "two levels up")]
    #[test_case("index.js", "form/FormField.js", "./form/FormField"; "root file")]
    #[test_case("src/a.js", "src/b.mjs", "./b.mjs"; "non js extension is kept")]
    fn test_module_specifier(from: &str, to: &str, expected: &str) {
        assert_eq!(module_specifier(Utf8Path::new(from), Utf8Path::new(to)), expected);
    }

    #[test]
    fn test_stems() {
        assert_eq!(js_stem(Utf8Path::new("src/scout-module.js")), "scout-module");
        assert_eq!(file_name(Utf8Path::new("src/Foo.js")), "Foo.js");
    }
}
