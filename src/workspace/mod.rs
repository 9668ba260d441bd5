//! Shared state of a migration run.
//!
//! The [`Context`] owns one [`WorkingCopy`] per touched path, the cached
//! source models built from them, and the read-only symbol indices. Nothing
//! reaches the file store before [`Context::flush`].

pub mod store;
pub mod working_copy;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use anyhow::{anyhow, Context as _, Result};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

use crate::api::library::Libraries;
use crate::api::Api;
use crate::config::Config;
use crate::error::MigrationError;
use crate::extract::{leading_comment_span, parse_js_file, ImportRequest, JsFile};
use crate::migrate::filters;
use crate::migrate::pipeline::stats::MigrationRunStats;
use crate::text::todo_line;
pub use store::{DiskStore, FileStore, MemoryStore};
pub use working_copy::WorkingCopy;

pub struct Context<'s> {
    config: Arc<Config>,
    store: &'s mut dyn FileStore,
    paths: Vec<Utf8PathBuf>,
    working_copies: BTreeMap<Utf8PathBuf, WorkingCopy>,
    js_files: HashMap<Utf8PathBuf, JsFile>,
    /// Files whose declarations were left in legacy form by a veto.
    unconverted: HashSet<Utf8PathBuf>,
    api: Api,
    libraries: Libraries,
    stats: MigrationRunStats,
}

impl<'s> Context<'s> {
    pub fn new(config: Arc<Config>, store: &'s mut dyn FileStore) -> Self {
        let api = Api::new(config.persist_library_name.clone().unwrap_or_default());
        Self {
            config,
            store,
            paths: Vec::new(),
            working_copies: BTreeMap::new(),
            js_files: HashMap::new(),
            unconverted: HashSet::new(),
            api,
            libraries: Libraries::empty(),
            stats: MigrationRunStats::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Lists the source tree. Paths are relative to the source root.
    pub fn discover(&mut self) -> Result<&[Utf8PathBuf]> {
        let paths = self
            .store
            .list_files(&self.config.source_dir, &self.config.exclude_patterns)
            .with_context(|| format!("Failed to list {}", self.config.source_dir))?;
        self.stats.files_scanned = paths.len();
        info!(files = paths.len(), root = %self.config.source_dir, "Discovered files");
        self.paths = paths;
        Ok(&self.paths)
    }

    pub fn paths(&self) -> &[Utf8PathBuf] {
        &self.paths
    }

    /// Discovered paths followed by generated ones.
    pub fn all_paths(&self) -> Vec<Utf8PathBuf> {
        let mut all = self.paths.clone();
        all.extend(
            self.working_copies
                .values()
                .filter(|wc| wc.is_generated())
                .map(|wc| wc.path().to_path_buf()),
        );
        all
    }

    pub fn api(&self) -> &Api {
        &self.api
    }

    pub fn libraries(&self) -> &Libraries {
        &self.libraries
    }

    pub fn set_libraries(&mut self, libraries: Libraries) {
        self.stats.library_elements = libraries.element_count();
        self.libraries = libraries;
    }

    pub fn stats(&self) -> &MigrationRunStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut MigrationRunStats {
        &mut self.stats
    }

    pub fn into_stats(self) -> MigrationRunStats {
        self.stats
    }

    /// The working copy of `rel`, read from the store on first access.
    pub fn ensure_working_copy(&mut self, rel: &Utf8Path) -> Result<&mut WorkingCopy> {
        if !self.working_copies.contains_key(rel) {
            let source = self
                .store
                .read_to_string(&self.config.source_path(rel))
                .with_context(|| format!("Failed to load working copy of {rel}"))?;
            self.working_copies
                .insert(rel.to_path_buf(), WorkingCopy::new(rel, source));
        }
        self.working_copies
            .get_mut(rel)
            .ok_or_else(|| anyhow!("No working copy for {rel}"))
    }

    pub fn working_copy(&self, rel: &Utf8Path) -> Option<&WorkingCopy> {
        self.working_copies.get(rel)
    }

    /// Registers a file that does not exist in the source tree.
    pub fn create_working_copy(
        &mut self,
        rel: &Utf8Path,
        line_delimiter: &'static str,
    ) -> Result<&mut WorkingCopy> {
        if self.working_copies.contains_key(rel) || self.paths.iter().any(|p| p == rel) {
            return Err(anyhow!("Working copy for {rel} already exists"));
        }
        self.working_copies.insert(
            rel.to_path_buf(),
            WorkingCopy::generated(rel, line_delimiter),
        );
        self.stats.files_generated += 1;
        self.working_copies
            .get_mut(rel)
            .ok_or_else(|| anyhow!("No working copy for {rel}"))
    }

    /// Current text of `rel`.
    pub fn source(&mut self, rel: &Utf8Path) -> Result<String> {
        Ok(self.ensure_working_copy(rel)?.source().to_string())
    }

    /// Replaces the text of `rel`. Returns whether it changed.
    pub fn set_source(&mut self, rel: &Utf8Path, source: impl Into<String>) -> Result<bool> {
        Ok(self.ensure_working_copy(rel)?.set_source(source))
    }

    pub fn is_deleted(&self, rel: &Utf8Path) -> bool {
        self.working_copies
            .get(rel)
            .map(WorkingCopy::is_deleted)
            .unwrap_or(false)
    }

    pub fn mark_deleted(&mut self, rel: &Utf8Path) -> Result<()> {
        self.ensure_working_copy(rel)?.mark_deleted();
        debug!(path = %rel, "Marked deleted");
        Ok(())
    }

    pub fn mark_unconverted(&mut self, rel: &Utf8Path) {
        if self.unconverted.insert(rel.to_path_buf()) {
            debug!(path = %rel, "Declarations left for manual migration");
        }
    }

    /// Whether a veto kept the declarations of `rel` in legacy form. Such a
    /// file neither rewrites its own references nor exports anything.
    pub fn is_unconverted(&self, rel: &Utf8Path) -> bool {
        self.unconverted.contains(rel)
    }

    /// Where `rel` is written, relative to the target root.
    pub fn target_path_of(&self, rel: &Utf8Path) -> Utf8PathBuf {
        self.working_copies
            .get(rel)
            .map(|wc| wc.target_path().to_path_buf())
            .unwrap_or_else(|| rel.to_path_buf())
    }

    /// Origin of a live file, other than `except`, that is written to `target`.
    pub fn target_in_use(&self, target: &Utf8Path, except: &Utf8Path) -> Option<Utf8PathBuf> {
        let from_copies = self
            .working_copies
            .values()
            .filter(|wc| wc.path() != except && !wc.is_deleted())
            .find(|wc| wc.target_path() == target)
            .map(|wc| wc.path().to_path_buf());
        from_copies.or_else(|| {
            self.paths
                .iter()
                .filter(|p| p.as_path() != except && !self.working_copies.contains_key(p.as_path()))
                .find(|p| p.as_path() == target)
                .cloned()
        })
    }

    /// Moves the output location of `rel`. Taking over a live file's target is fatal.
    pub fn relocate(&mut self, rel: &Utf8Path, target: &Utf8Path) -> Result<()> {
        if let Some(existing) = self.target_in_use(target, rel) {
            return Err(MigrationError::TargetCollision {
                origin: rel.to_path_buf(),
                target: target.to_path_buf(),
                existing,
            }
            .into());
        }
        self.ensure_working_copy(rel)?.set_relative_target_path(target);
        debug!(path = %rel, target = %target, "Relocated");
        Ok(())
    }

    fn parse_current(&mut self, rel: &Utf8Path) -> Result<JsFile> {
        let wc = self.ensure_working_copy(rel)?;
        Ok(parse_js_file(rel, wc.source(), wc.revision()))
    }

    /// The cached model of `rel`, built on first request. May lag behind the text.
    pub fn ensure_js_file(&mut self, rel: &Utf8Path) -> Result<&JsFile> {
        if !self.js_files.contains_key(rel) {
            let js_file = self.parse_current(rel)?;
            self.js_files.insert(rel.to_path_buf(), js_file);
        }
        self.js_files
            .get(rel)
            .ok_or_else(|| anyhow!("No source model for {rel}"))
    }

    /// Rebuilds the model of `rel` from its current text, keeping requested imports.
    pub fn rebuild_js_file(&mut self, rel: &Utf8Path) -> Result<&JsFile> {
        let mut js_file = self.parse_current(rel)?;
        if let Some(previous) = self.js_files.get(rel) {
            js_file.merge_imports(previous.imports.clone())?;
        }
        self.js_files.insert(rel.to_path_buf(), js_file);
        self.js_files
            .get(rel)
            .ok_or_else(|| anyhow!("No source model for {rel}"))
    }

    /// The model of `rel` matching its current text.
    pub fn current_js_file(&mut self, rel: &Utf8Path) -> Result<&JsFile> {
        let revision = self.ensure_working_copy(rel)?.revision();
        let fresh = self
            .js_files
            .get(rel)
            .map(|f| f.revision == revision)
            .unwrap_or(false);
        if fresh {
            return self.ensure_js_file(rel);
        }
        self.rebuild_js_file(rel)
    }

    /// Adds `request` to the import accumulator of `rel`.
    pub fn request_import(&mut self, rel: &Utf8Path, request: &ImportRequest) -> Result<()> {
        self.ensure_js_file(rel)?;
        let js_file = self
            .js_files
            .get_mut(rel)
            .ok_or_else(|| anyhow!("No source model for {rel}"))?;
        js_file.request_import(request)?;
        Ok(())
    }

    /// Indexes every JS file of the source tree.
    pub fn build_api(&mut self) -> Result<()> {
        let js_paths: Vec<Utf8PathBuf> = self
            .paths
            .iter()
            .filter(|p| filters::is_js_file(p))
            .cloned()
            .collect();
        for rel in &js_paths {
            self.ensure_js_file(rel)?;
        }
        let name = self.config.persist_library_name.clone().unwrap_or_default();
        let api = Api::from_js_files(
            &name,
            js_paths.iter().filter_map(|rel| self.js_files.get(rel)),
        );
        self.stats.js_files_indexed = js_paths.len();
        self.stats.elements_indexed = api.len();
        info!(
            files = js_paths.len(),
            elements = api.len(),
            "Indexed project elements"
        );
        self.api = api;
        Ok(())
    }

    /// Puts a file level TODO line after the copyright comment of `rel`.
    /// Returns false when the same marker is already present.
    pub fn add_file_todo(&mut self, rel: &Utf8Path, message: &str) -> Result<bool> {
        let wc = self.ensure_working_copy(rel)?;
        let nl = wc.line_delimiter();
        let marker = todo_line(message, nl);
        if wc.source().contains(marker.trim_end()) {
            return Ok(false);
        }
        let at = leading_comment_span(wc.source()).map(|s| s.end).unwrap_or(0);
        let mut source = wc.source().to_string();
        if at > 0 && !source[..at].ends_with('\n') {
            source.insert_str(at, nl);
            source.insert_str(at + nl.len(), &marker);
        } else {
            source.insert_str(at, &marker);
        }
        wc.set_source(source);
        self.stats.todo_markers += 1;
        Ok(true)
    }

    /// Writes the run's result to the store.
    ///
    /// In place: changed files are rewritten, relocated files move, deleted
    /// files are removed. Into a separate target: every live file is written
    /// at its target path, untouched files are copied.
    pub fn flush(&mut self) -> Result<()> {
        let in_place = self.config.in_place();
        for (rel, wc) in &self.working_copies {
            if wc.is_deleted() {
                if !wc.is_generated() {
                    if in_place {
                        let source = self.config.source_path(rel);
                        if self.store.exists(&source) {
                            self.store.remove(&source)?;
                        }
                    }
                    self.stats.files_deleted += 1;
                }
                continue;
            }
            let target = wc.target_path();
            let relocated = target != rel.as_path();
            if in_place && !wc.is_changed() && !relocated {
                continue;
            }
            self.store
                .write(&self.config.target_path(target), wc.source())?;
            self.stats.files_written += 1;
            if relocated && !wc.is_generated() {
                self.stats.files_relocated += 1;
                if in_place {
                    self.store.remove(&self.config.source_path(rel))?;
                }
            }
        }
        if !in_place {
            for rel in &self.paths {
                if self.working_copies.contains_key(rel) {
                    continue;
                }
                let source = self.store.read_to_string(&self.config.source_path(rel))?;
                self.store.write(&self.config.target_path(rel), &source)?;
                self.stats.files_written += 1;
            }
        }
        info!(
            written = self.stats.files_written,
            relocated = self.stats.files_relocated,
            deleted = self.stats.files_deleted,
            "Flushed working copies"
        );
        Ok(())
    }
}
