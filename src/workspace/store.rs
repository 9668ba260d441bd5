use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Read;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};

use crate::migrate::pipeline::scan::{is_excluded, scan_files};

/// File access used by a migration run. Paths are absolute.
pub trait FileStore {
    fn read_to_string(&self, path: &Utf8Path) -> Result<String>;
    fn write(&mut self, path: &Utf8Path, contents: &str) -> Result<()>;
    fn remove(&mut self, path: &Utf8Path) -> Result<()>;
    fn exists(&self, path: &Utf8Path) -> bool;
    /// Files below `root` as sorted paths relative to `root`.
    fn list_files(&self, root: &Utf8Path, exclude_patterns: &[String]) -> Result<Vec<Utf8PathBuf>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DiskStore;

impl FileStore for DiskStore {
    fn read_to_string(&self, path: &Utf8Path) -> Result<String> {
        let mut file = File::open(path).with_context(|| format!("Failed to open {path}"))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .with_context(|| format!("Failed to read {path}"))?;
        Ok(contents)
    }

    fn write(&mut self, path: &Utf8Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("Failed to create dir: {parent}"))?;
        }
        fs::write(path, contents).with_context(|| format!("Failed to write {path}"))
    }

    fn remove(&mut self, path: &Utf8Path) -> Result<()> {
        fs::remove_file(path).with_context(|| format!("Failed to remove {path}"))
    }

    fn exists(&self, path: &Utf8Path) -> bool {
        path.is_file()
    }

    fn list_files(&self, root: &Utf8Path, exclude_patterns: &[String]) -> Result<Vec<Utf8PathBuf>> {
        scan_files(root, exclude_patterns)
    }
}

/// In-memory store, keyed by absolute path.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: BTreeMap<Utf8PathBuf, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<Utf8PathBuf>, contents: impl Into<String>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }

    pub fn get(&self, path: &Utf8Path) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn paths(&self) -> impl Iterator<Item = &Utf8Path> {
        self.files.keys().map(Utf8PathBuf::as_path)
    }
}

impl FileStore for MemoryStore {
    fn read_to_string(&self, path: &Utf8Path) -> Result<String> {
        self.files
            .get(path)
            .cloned()
            .with_context(|| format!("Failed to open {path}"))
    }

    fn write(&mut self, path: &Utf8Path, contents: &str) -> Result<()> {
        self.files.insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn remove(&mut self, path: &Utf8Path) -> Result<()> {
        self.files
            .remove(path)
            .map(|_| ())
            .with_context(|| format!("Failed to remove {path}"))
    }

    fn exists(&self, path: &Utf8Path) -> bool {
        self.files.contains_key(path)
    }

    fn list_files(&self, root: &Utf8Path, exclude_patterns: &[String]) -> Result<Vec<Utf8PathBuf>> {
        Ok(self
            .files
            .keys()
            .filter_map(|p| p.strip_prefix(root).ok())
            .filter(|rel| !is_excluded(rel, exclude_patterns))
            .map(Utf8Path::to_path_buf)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn memory_store_lists_relative_paths_without_excluded_dirs() {
        let store = MemoryStore::new()
            .with_file("/m/src/main/js/scout/Foo.js", "a")
            .with_file("/m/node_modules/x/index.js", "b")
            .with_file("/other/Bar.js", "c");
        let files = store.list_files(Utf8Path::new("/m"), &["node_modules".to_string()]).unwrap();
        assert_eq!(files, vec![Utf8PathBuf::from("src/main/js/scout/Foo.js")]);
    }

    #[test]
    fn disk_store_round_trip_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let mut store = DiskStore;
        let path = root.join("src/a/b.js");
        store.write(&path, "x").unwrap();
        assert!(store.exists(&path));
        assert_eq!(store.read_to_string(&path).unwrap(), "x");
        assert_eq!(store.list_files(root, &[]).unwrap(), vec![Utf8PathBuf::from("src/a/b.js")]);
        store.remove(&path).unwrap();
        assert!(!store.exists(&path));
        assert!(store.read_to_string(&path).is_err());
    }
}
