use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What the engine does after a unit fails to render or write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failed unit and return its error.
    #[default]
    Abort,
    /// Attempt every unit, then fail with the collected report.
    Continue,
}

/// Options for the generation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Directory rendered filenames are resolved against.
    pub output_dir: PathBuf,
    /// Tree copied verbatim into `output_dir` after all units.
    pub static_dir: Option<PathBuf>,
    /// Command and arguments run after every written file.
    pub post_run: Vec<String>,
    pub on_error: FailurePolicy,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            static_dir: None,
            post_run: Vec::new(),
            on_error: FailurePolicy::Abort,
        }
    }
}

/// One output file: a filename template and a contents template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Template source rendered into the output path.
    pub filename: String,
    /// Label for the contents template, usually its path on disk.
    pub name: String,
    /// Template source rendered into the file contents.
    pub contents: String,
}

/// Targets rendered once per schema, per table and per enum.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateSet {
    pub schema: Vec<Target>,
    pub table: Vec<Target>,
    pub enums: Vec<Target>,
}

impl TemplateSet {
    pub fn is_empty(&self) -> bool {
        self.schema.is_empty() && self.table.is_empty() && self.enums.is_empty()
    }
}

/// Step at which a unit failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Filename,
    Contents,
    Write,
    Static,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFailure {
    pub unit: String,
    pub stage: Stage,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum PostRunStatus {
    NotConfigured,
    Succeeded,
    Failed(String),
}

/// A file written by a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub unit: String,
    pub path: PathBuf,
    pub bytes: u64,
    pub post_run: PostRunStatus,
}

/// Report for a generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub files: Vec<FileReport>,
    pub static_files: Vec<PathBuf>,
    pub failures: Vec<UnitFailure>,
    pub duration_ms: u64,
}

impl GenerationReport {
    pub fn post_run_failures(&self) -> usize {
        self.files
            .iter()
            .filter(|file| matches!(file.post_run, PostRunStatus::Failed(_)))
            .count()
    }
}
