//! Test helper functions for integration tests
//!
//! Procedural helpers, not rstest fixtures. For a temporary module root use
//! the `module_dir` fixture from fixtures.rs.

use std::sync::Arc;

use anyhow::Result;
use camino::Utf8Path;
use scout_es6_migration::config::Config;
use scout_es6_migration::migrate::{MigrationPipeline, MigrationRunStats};
use scout_es6_migration::workspace::DiskStore;

pub fn write_file(path: &Utf8Path, contents: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

pub fn read_file(path: &Utf8Path) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|err| panic!("cannot read {path}: {err}"))
}

/// Runs the default task list against the disk.
pub fn migrate(config: Config) -> Result<MigrationRunStats> {
    MigrationPipeline::new(Arc::new(config)).run(&mut DiskStore)
}
