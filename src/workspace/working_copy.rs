use camino::{Utf8Path, Utf8PathBuf};

use crate::text::detect_line_delimiter;

/// The in-memory, mutable state of one file during a run.
#[derive(Debug, Clone)]
pub struct WorkingCopy {
    path: Utf8PathBuf,
    initial_source: String,
    source: String,
    line_delimiter: &'static str,
    relative_target_path: Option<Utf8PathBuf>,
    deleted: bool,
    generated: bool,
    revision: u64,
}

impl WorkingCopy {
    pub fn new(path: impl Into<Utf8PathBuf>, source: String) -> Self {
        Self {
            path: path.into(),
            line_delimiter: detect_line_delimiter(&source),
            initial_source: source.clone(),
            source,
            relative_target_path: None,
            deleted: false,
            generated: false,
            revision: 0,
        }
    }

    /// A file that does not exist in the source tree.
    pub fn generated(path: impl Into<Utf8PathBuf>, line_delimiter: &'static str) -> Self {
        Self {
            path: path.into(),
            initial_source: String::new(),
            source: String::new(),
            line_delimiter,
            relative_target_path: None,
            deleted: false,
            generated: true,
            revision: 0,
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn initial_source(&self) -> &str {
        &self.initial_source
    }

    pub fn line_delimiter(&self) -> &'static str {
        self.line_delimiter
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replaces the current text. Returns whether it changed.
    pub fn set_source(&mut self, source: impl Into<String>) -> bool {
        let source = source.into();
        if source == self.source {
            return false;
        }
        self.source = source;
        self.revision += 1;
        true
    }

    pub fn is_changed(&self) -> bool {
        self.generated || self.source != self.initial_source
    }

    pub fn relative_target_path(&self) -> Option<&Utf8Path> {
        self.relative_target_path.as_deref()
    }

    pub fn set_relative_target_path(&mut self, path: impl Into<Utf8PathBuf>) {
        let path = path.into();
        self.relative_target_path = if path == self.path { None } else { Some(path) };
    }

    /// Where the file ends up, relative to the target root.
    pub fn target_path(&self) -> &Utf8Path {
        self.relative_target_path.as_deref().unwrap_or(&self.path)
    }

    pub fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn is_generated(&self) -> bool {
        self.generated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_only_moves_on_real_changes() {
        let mut wc = WorkingCopy::new("src/Foo.js", "a\r\nb\r\n".to_string());
        assert_eq!(wc.line_delimiter(), "\r\n");
        assert!(!wc.set_source("a\r\nb\r\n"));
        assert_eq!(wc.revision(), 0);
        assert!(!wc.is_changed());

        assert!(wc.set_source("b\r\n"));
        assert_eq!(wc.revision(), 1);
        assert!(wc.is_changed());
        assert_eq!(wc.initial_source(), "a\r\nb\r\n");
    }

    #[test]
    fn target_path_defaults_to_origin() {
        let mut wc = WorkingCopy::new("src/main/js/scout/Foo.js", String::new());
        assert_eq!(wc.target_path().as_str(), "src/main/js/scout/Foo.js");
        wc.set_relative_target_path("src/Foo.js");
        assert_eq!(wc.target_path().as_str(), "src/Foo.js");
        wc.set_relative_target_path("src/main/js/scout/Foo.js");
        assert!(wc.relative_target_path().is_none());
    }

    #[test]
    fn generated_copies_count_as_changed() {
        let wc = WorkingCopy::generated("src/index.js", "\n");
        assert!(wc.is_generated());
        assert!(wc.is_changed());
        assert!(!wc.is_deleted());
    }
}
