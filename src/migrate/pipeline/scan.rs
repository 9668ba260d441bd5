use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Files below `root`, relative to it and sorted. Unreadable directories are skipped.
pub fn scan_files(root: &Utf8Path, exclude_patterns: &[String]) -> Result<Vec<Utf8PathBuf>> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(dir = %dir, error = %err, "Failed to read dir");
                continue;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    tracing::warn!(dir = %dir, error = %err, "Failed to read dir entry");
                    continue;
                }
            };
            let path = match Utf8PathBuf::from_path_buf(entry.path()) {
                Ok(p) => p,
                Err(path) => {
                    tracing::warn!(path = %path.display(), "Skipping non UTF-8 path");
                    continue;
                }
            };
            let file_type = match entry.file_type() {
                Ok(ft) => ft,
                Err(_) => continue,
            };
            let Ok(rel) = path.strip_prefix(root) else {
                continue;
            };

            if file_type.is_dir() {
                if should_skip_dir(&path, exclude_patterns) {
                    continue;
                }
                stack.push(path);
                continue;
            }

            if file_type.is_file() && !is_excluded(rel, exclude_patterns) {
                out.push(rel.to_path_buf());
            }
        }
    }
    out.sort();
    Ok(out)
}

pub fn should_skip_dir(path: &Utf8Path, exclude_patterns: &[String]) -> bool {
    let Some(name) = path.file_name() else {
        return false;
    };
    exclude_patterns.iter().any(|p| p == name)
}

/// A pattern matches a path segment by name, or any part of the path when it
/// contains a `/`.
pub fn is_excluded(rel: &Utf8Path, exclude_patterns: &[String]) -> bool {
    let s = rel.as_str().replace('\\', "/");
    exclude_patterns.iter().any(|pattern| {
        let pat = pattern.replace('\\', "/");
        if pat.contains('/') {
            s.contains(pat.as_str())
        } else {
            rel.iter().any(|segment| segment == pat)
        }
    })
}
