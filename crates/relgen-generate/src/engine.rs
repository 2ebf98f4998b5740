use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use minijinja::{Environment, ErrorKind, Value};
use tracing::{debug, error, info, warn};

use relgen_core::{ConfigData, Database};

use crate::assets::copy_static_files;
use crate::context::TemplateData;
use crate::errors::GenerationError;
use crate::model::{
    FailurePolicy, FileReport, GenerateOptions, GenerationReport, PostRunStatus, Stage, Target,
    TemplateSet, UnitFailure,
};
use crate::output::write_bytes_atomic;
use crate::post_run;
use crate::templates::{add_template, environment};

/// Names under which a target's two templates are registered.
#[derive(Debug, Clone)]
struct CompiledTarget {
    filename: String,
    contents: String,
}

/// Renders every schema, table and enum unit and writes the results.
pub struct GenerationEngine {
    options: GenerateOptions,
    env: Environment<'static>,
    schema_targets: Vec<CompiledTarget>,
    table_targets: Vec<CompiledTarget>,
    enum_targets: Vec<CompiledTarget>,
}

impl GenerationEngine {
    /// Compile all templates up front; a syntax error fails before any output.
    pub fn new(options: GenerateOptions, templates: TemplateSet) -> Result<Self, GenerationError> {
        let mut env = environment();
        let mut sources: BTreeMap<String, String> = BTreeMap::new();

        let schema_targets = compile(&mut env, &mut sources, "schema", templates.schema)?;
        let table_targets = compile(&mut env, &mut sources, "table", templates.table)?;
        let enum_targets = compile(&mut env, &mut sources, "enum", templates.enums)?;

        Ok(Self {
            options,
            env,
            schema_targets,
            table_targets,
            enum_targets,
        })
    }

    /// Render all units of `db` in model order, then copy static files.
    pub fn run(
        &self,
        db: &Database,
        config: &ConfigData,
        params: &serde_json::Value,
    ) -> Result<GenerationReport, GenerationError> {
        let start = Instant::now();
        let data = TemplateData::new(db, config, params);
        let mut report = GenerationReport::default();

        info!(
            event = "generation_started",
            output_dir = %self.options.output_dir.display(),
            schemas = data.schemas.len(),
            on_error = ?self.options.on_error,
            "generation started"
        );

        for schema in &data.schemas {
            let ctx = data.schema_context(&schema.value);
            let unit = format!("schema {}", schema.label);
            for target in &self.schema_targets {
                self.run_unit(&unit, target, &ctx, &mut report)?;
            }

            for (label, table) in &schema.tables {
                let ctx = data.table_context(&schema.value, table);
                let unit = format!("table {label}");
                for target in &self.table_targets {
                    self.run_unit(&unit, target, &ctx, &mut report)?;
                }
            }

            for (label, item) in &schema.enums {
                let ctx = data.enum_context(&schema.value, item);
                let unit = format!("enum {label}");
                for target in &self.enum_targets {
                    self.run_unit(&unit, target, &ctx, &mut report)?;
                }
            }
        }

        if let Some(static_dir) = &self.options.static_dir {
            self.copy_static(static_dir, &mut report)?;
        }

        report.duration_ms = start.elapsed().as_millis() as u64;

        if !report.failures.is_empty() {
            error!(
                event = "generation_failed",
                failures = report.failures.len(),
                files = report.files.len(),
                "generation failed"
            );
            return Err(GenerationError::Failed(report));
        }

        info!(
            event = "generation_completed",
            files = report.files.len(),
            static_files = report.static_files.len(),
            post_run_failures = report.post_run_failures(),
            duration_ms = report.duration_ms,
            "generation completed"
        );
        Ok(report)
    }

    fn run_unit(
        &self,
        unit: &str,
        target: &CompiledTarget,
        ctx: &Value,
        report: &mut GenerationReport,
    ) -> Result<(), GenerationError> {
        match self.render_and_write(unit, target, ctx) {
            Ok(file) => {
                report.files.push(self.post_run(file));
                Ok(())
            }
            Err(err) => self.fail(unit, stage_of(&err), err, report),
        }
    }

    fn render_and_write(
        &self,
        unit: &str,
        target: &CompiledTarget,
        ctx: &Value,
    ) -> Result<FileReport, GenerationError> {
        let filename = self
            .env
            .get_template(&target.filename)
            .and_then(|template| template.render(ctx))
            .map_err(|source| GenerationError::Filename {
                unit: unit.to_string(),
                source,
            })?;
        let filename = filename.trim();
        if filename.is_empty() {
            return Err(GenerationError::Filename {
                unit: unit.to_string(),
                source: minijinja::Error::new(
                    ErrorKind::InvalidOperation,
                    format!("template {} rendered an empty filename", target.filename),
                ),
            });
        }

        let path = self.options.output_dir.join(filename);
        let contents = self
            .env
            .get_template(&target.contents)
            .and_then(|template| template.render(ctx))
            .map_err(|source| GenerationError::Contents {
                unit: unit.to_string(),
                path: path.clone(),
                source,
            })?;

        write_bytes_atomic(&path, contents.as_bytes()).map_err(|source| {
            GenerationError::Write {
                path: path.clone(),
                source,
            }
        })?;
        debug!(
            event = "file_written",
            unit,
            path = %path.display(),
            bytes = contents.len()
        );

        Ok(FileReport {
            unit: unit.to_string(),
            path,
            bytes: contents.len() as u64,
            post_run: PostRunStatus::NotConfigured,
        })
    }

    fn post_run(&self, mut file: FileReport) -> FileReport {
        if self.options.post_run.is_empty() {
            return file;
        }
        file.post_run = match post_run::run(&self.options.post_run, &file.path) {
            Ok(()) => PostRunStatus::Succeeded,
            Err(err) => {
                warn!(
                    event = "post_run_failed",
                    path = %file.path.display(),
                    error = %err,
                    "post-run command failed"
                );
                PostRunStatus::Failed(err.to_string())
            }
        };
        file
    }

    fn copy_static(&self, dir: &Path, report: &mut GenerationReport) -> Result<(), GenerationError> {
        let outcome = copy_static_files(dir, &self.options.output_dir);
        debug!(
            event = "static_copied",
            files = outcome.copied.len(),
            source = %dir.display()
        );
        report.static_files.extend(outcome.copied);

        match outcome.failed {
            Some((path, source)) => self.fail(
                "static files",
                Stage::Static,
                GenerationError::Static { path, source },
                report,
            ),
            None => Ok(()),
        }
    }

    fn fail(
        &self,
        unit: &str,
        stage: Stage,
        err: GenerationError,
        report: &mut GenerationReport,
    ) -> Result<(), GenerationError> {
        error!(event = "unit_failed", unit, stage = ?stage, error = %err, "unit failed");
        match self.options.on_error {
            FailurePolicy::Abort => Err(err),
            FailurePolicy::Continue => {
                report.failures.push(UnitFailure {
                    unit: unit.to_string(),
                    stage,
                    message: err.to_string(),
                });
                Ok(())
            }
        }
    }
}

fn compile(
    env: &mut Environment<'static>,
    sources: &mut BTreeMap<String, String>,
    kind: &str,
    targets: Vec<Target>,
) -> Result<Vec<CompiledTarget>, GenerationError> {
    targets
        .into_iter()
        .enumerate()
        .map(|(index, target)| {
            let filename = format!("{kind}_paths[{index}] {}", target.filename);
            add_template(env, filename.clone(), target.filename)?;

            let contents = unique_name(sources, target.name, &target.contents);
            if !sources.contains_key(&contents) {
                add_template(env, contents.clone(), target.contents.clone())?;
                sources.insert(contents.clone(), target.contents);
            }
            Ok(CompiledTarget { filename, contents })
        })
        .collect()
}

/// A template name that is either unused or already bound to `source`.
fn unique_name(sources: &BTreeMap<String, String>, name: String, source: &str) -> String {
    let mut candidate = name.clone();
    let mut suffix = 2;
    while let Some(existing) = sources.get(&candidate) {
        if existing == source {
            break;
        }
        candidate = format!("{name}#{suffix}");
        suffix += 1;
    }
    candidate
}

fn stage_of(err: &GenerationError) -> Stage {
    match err {
        GenerationError::Filename { .. } => Stage::Filename,
        GenerationError::Contents { .. } => Stage::Contents,
        GenerationError::Static { .. } => Stage::Static,
        _ => Stage::Write,
    }
}
