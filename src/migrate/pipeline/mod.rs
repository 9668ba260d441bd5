pub mod scan;
pub mod stats;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context as _, Result};
use tracing::{error, info, warn};

use crate::api::library::{write_library, Libraries};
use crate::config::Config;
use crate::error::is_recoverable;
use crate::migrate::tasks::{default_tasks, Task};
use crate::workspace::{Context, FileStore};

use self::stats::MigrationRunStats;

/// Runs the ordered task list over a source tree.
///
/// Every task sees every live path before the next task starts. A vetoed
/// file keeps its text and gets a marker; any other error aborts the run
/// before anything is flushed.
pub struct MigrationPipeline {
    config: Arc<Config>,
    tasks: Vec<Box<dyn Task>>,
}

impl MigrationPipeline {
    pub fn new(config: Arc<Config>) -> Self {
        Self::with_tasks(config, default_tasks())
    }

    pub fn with_tasks(config: Arc<Config>, mut tasks: Vec<Box<dyn Task>>) -> Self {
        tasks.sort_by_key(|t| t.order());
        Self { config, tasks }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn run(&self, store: &mut dyn FileStore) -> Result<MigrationRunStats> {
        let started_at = Instant::now();
        let mut ctx = Context::new(self.config.clone(), store);
        ctx.discover()?;

        if let Some(base) = &self.config.api_base {
            let libraries = Libraries::load(base, self.config.persist_library_file.as_deref())?;
            ctx.set_libraries(libraries);
        }
        ctx.build_api()?;

        self.run_tasks(&mut ctx)?;

        if self.config.dry_run {
            info!("Dry run, nothing written");
        } else {
            ctx.flush()?;
            if let (Some(base), Some(file)) =
                (&self.config.api_base, &self.config.persist_library_file)
            {
                write_library(ctx.api(), &base.join(file))?;
            }
        }

        let stats = ctx.into_stats();
        info!(
            duration_ms = started_at.elapsed().as_millis() as u64,
            files = stats.files_scanned,
            rewritten = stats.references_rewritten,
            imports = stats.imports_written,
            failures = stats.task_failures,
            todos = stats.todo_markers,
            "Migration finished"
        );
        Ok(stats)
    }

    fn run_tasks(&self, ctx: &mut Context<'_>) -> Result<()> {
        for task in &self.tasks {
            let name = task.name();
            for path in ctx.all_paths() {
                if ctx.is_deleted(&path) {
                    continue;
                }
                let generated = ctx.working_copy(&path).is_some_and(|wc| wc.is_generated());
                if !generated && !self.config.is_included(&path) {
                    continue;
                }
                if !task.accept(&path, ctx) {
                    continue;
                }
                ctx.stats_mut().task_runs += 1;
                let Err(err) = task.process(&path, ctx) else {
                    continue;
                };
                if is_recoverable(&err) {
                    warn!(task = name, path = %path, error = %err, "Task vetoed file");
                    ctx.stats_mut().task_failures += 1;
                    ctx.add_file_todo(&path, &format!("{name}: {err}"))?;
                } else {
                    error!(task = name, path = %path, error = %err, "Task failed");
                    return Err(err).with_context(|| format!("{name} failed on {path}"));
                }
            }
        }
        Ok(())
    }
}
