#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct MigrationRunStats {
    pub files_scanned: usize,
    pub js_files_indexed: usize,
    pub elements_indexed: usize,
    pub library_elements: usize,
    pub task_runs: usize,
    pub task_failures: usize,
    pub references_rewritten: usize,
    pub imports_written: usize,
    pub todo_markers: usize,
    pub files_written: usize,
    pub files_relocated: usize,
    pub files_deleted: usize,
    pub files_generated: usize,
}
