use std::path::PathBuf;

use thiserror::Error;

use crate::model::GenerationReport;

/// Errors emitted by the generation engine.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("template {name} does not compile: {source}")]
    Template {
        name: String,
        #[source]
        source: minijinja::Error,
    },
    #[error("{unit}: filename template failed: {source}")]
    Filename {
        unit: String,
        #[source]
        source: minijinja::Error,
    },
    #[error("{unit}: contents of {} failed to render: {source}", .path.display())]
    Contents {
        unit: String,
        path: PathBuf,
        #[source]
        source: minijinja::Error,
    },
    #[error("writing {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("copying static file {}: {source}", .path.display())]
    Static {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("post-run command for {}: {message}", .path.display())]
    PostRun { path: PathBuf, message: String },
    #[error("generation failed: {} unit(s) failed", .0.failures.len())]
    Failed(GenerationReport),
}
