//! Template rendering and file generation for relgen.
//!
//! This crate projects a built [`relgen_core::Database`] into template
//! contexts, renders the configured filename and contents templates for
//! every schema, table and enum, and commits each output file atomically.

pub mod assets;
pub mod context;
pub mod engine;
pub mod errors;
pub mod model;
pub mod output;
pub mod post_run;
pub mod templates;

pub use context::{DatabaseView, TemplateData};
pub use engine::GenerationEngine;
pub use errors::GenerationError;
pub use model::{
    FailurePolicy, FileReport, GenerateOptions, GenerationReport, PostRunStatus, Stage, Target,
    TemplateSet, UnitFailure,
};
pub use templates::TemplateNames;
