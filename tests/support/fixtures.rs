//! rstest fixtures for integration tests
//!
//! # Usage
//!
//! ```rust
//! use crate::support::fixtures::*;
//!
//! #[rstest]
//! fn my_test(module_dir: ModuleDir) {
//!     module_dir.write("src/main/js/scout/Foo.js", "scout.Foo = function() {\n};\n");
//! }
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use rstest::*;
use scout_es6_migration::config::Config;
use tempfile::TempDir;

/// A temporary module root. The directory is removed when the fixture drops.
pub struct ModuleDir {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl ModuleDir {
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn write(&self, rel: &str, contents: &str) {
        super::helpers::write_file(&self.root.join(rel), contents);
    }

    pub fn read(&self, rel: &str) -> String {
        super::helpers::read_file(&self.root.join(rel))
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.root.join(rel).is_file()
    }

    /// In-place configuration with the default namespace.
    pub fn config(&self) -> Config {
        Config::new(self.root.clone())
    }
}

#[fixture]
pub fn module_dir() -> ModuleDir {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dunce::canonicalize(dir.path()).unwrap()).unwrap();
    ModuleDir { _dir: dir, root }
}
