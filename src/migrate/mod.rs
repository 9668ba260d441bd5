//! The migration run: path filters, the task list and the pipeline driving it.

pub mod filters;
pub mod pipeline;
pub mod tasks;

pub use pipeline::stats::MigrationRunStats;
pub use pipeline::MigrationPipeline;
pub use tasks::{default_tasks, Task};
