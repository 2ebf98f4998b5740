mod config;
mod init;
mod logging;
mod preview;

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use relgen_core::{BuildReport, Database, Error as CoreError, IdentityNames, NameConverter};
use relgen_generate::{GenerationEngine, GenerationError, GenerationReport, TemplateNames};
use relgen_introspect::{Adapter, connect, parse};
use thiserror::Error;
use tracing::info;

use config::{Config, ConfigError, DEFAULT_CONFIG_NAME};
use init::{InitError, init_project};
use logging::{LogFormat, init_logging};
use preview::{PreviewError, PreviewFormat, write_preview};

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Core(#[from] CoreError),
    #[error("{0}")]
    Generation(#[from] GenerationError),
    #[error("{0}")]
    Preview(#[from] PreviewError),
    #[error("{0}")]
    Init(#[from] InitError),
    #[error("logging setup failed: {0}")]
    Logging(String),
}

impl CliError {
    /// 2 for problems with the configuration or templates, 1 for run failures.
    fn exit_code(&self) -> u8 {
        match self {
            CliError::Config(_) | CliError::Init(_) | CliError::Logging(_) => 2,
            CliError::Core(CoreError::InvalidConfig(_) | CoreError::Unsupported(_)) => 2,
            CliError::Generation(GenerationError::Template { .. }) => 2,
            _ => 1,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "relgen", version, about = "Generate code from a relational schema")]
struct Cli {
    #[command(subcommand)]
    command: Command,
    /// Path to the configuration file.
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_NAME)]
    config: PathBuf,
    /// Log builder and generation details to stderr.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Introspect the database and render every configured template.
    Gen,
    /// Introspect the database and print the resulting model.
    Preview {
        #[arg(short, long, value_enum, default_value_t = PreviewFormat::Tabular)]
        format: PreviewFormat,
    },
    /// Write a starter relgen.toml and templates.
    Init {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("relgen: {err}");
            if let CliError::Generation(GenerationError::Failed(report)) = &err {
                for failure in &report.failures {
                    eprintln!("  {} ({:?}): {}", failure.unit, failure.stage, failure.message);
                }
            }
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    init_logging(cli.verbose, cli.log_format).map_err(CliError::Logging)?;

    match cli.command {
        Command::Gen => run_gen(&cli.config).await,
        Command::Preview { format } => run_preview(&cli.config, format).await,
        Command::Init { dir } => {
            for path in init_project(&dir)? {
                println!("created {}", path.display());
            }
            Ok(())
        }
    }
}

async fn run_gen(config_path: &Path) -> Result<(), CliError> {
    let config = config::load(config_path)?;
    if config.templates.is_empty() && config.options.static_dir.is_none() {
        return Err(ConfigError::Invalid(
            "nothing to generate: set schema_paths, table_paths, enum_paths or static_dir"
                .to_string(),
        )
        .into());
    }

    let templates = config.templates.clone();
    let engine = GenerationEngine::new(config.options.clone(), templates)?;
    let (db, build) = introspect(&config).await?;
    log_build(&build);

    let report = engine.run(&db, &config.data, &config.params)?;
    print_summary(&report);
    Ok(())
}

async fn run_preview(config_path: &Path, format: PreviewFormat) -> Result<(), CliError> {
    let config = config::load(config_path)?;
    let (db, build) = introspect(&config).await?;
    log_build(&build);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_preview(&mut out, &db, format)?;
    Ok(())
}

async fn introspect(config: &Config) -> Result<(Database, BuildReport), CliError> {
    let template_names = match &config.name_conversion {
        Some(source) => Some(TemplateNames::new(source)?),
        None => None,
    };
    let names: &dyn NameConverter = match &template_names {
        Some(names) => names,
        None => &IdentityNames,
    };
    let filter = config.data.table_filter()?;
    let types = config.data.type_mapping();

    let adapter = connect(config.engine, &config.data.conn_str).await?;
    let parsed = parse(adapter.as_ref(), &config.data.schemas, &filter, names, &types).await;
    adapter.close().await;
    Ok(parsed?)
}

fn log_build(build: &BuildReport) {
    info!(
        event = "model_built",
        filtered_rows = build.filtered_rows,
        filtered_links = build.filtered_links,
        inconsistencies = build.inconsistencies.len(),
        "model built"
    );
}

fn print_summary(report: &GenerationReport) {
    let post_run_failures = report.post_run_failures();
    println!(
        "generated {} file(s), copied {} static file(s) in {} ms",
        report.files.len(),
        report.static_files.len(),
        report.duration_ms
    );
    if post_run_failures > 0 {
        println!("{post_run_failures} post-run command(s) failed; see the log for details");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_exit_with_two() {
        let err = CliError::from(ConfigError::Invalid("bad".to_string()));
        assert_eq!(err.exit_code(), 2);
        let err = CliError::from(CoreError::Unsupported("db".to_string()));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn run_errors_exit_with_one() {
        let err = CliError::from(CoreError::Connect("refused".to_string()));
        assert_eq!(err.exit_code(), 1);
        let err = CliError::from(GenerationError::Failed(GenerationReport::default()));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn parses_subcommands_and_global_flags() {
        let cli = Cli::try_parse_from(["relgen", "preview", "-f", "json", "-c", "x.toml", "-v"])
            .expect("parse");
        assert!(matches!(
            cli.command,
            Command::Preview {
                format: PreviewFormat::Json
            }
        ));
        assert_eq!(cli.config, PathBuf::from("x.toml"));
        assert!(cli.verbose);

        let cli = Cli::try_parse_from(["relgen", "gen"]).expect("parse");
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_NAME));
        assert_eq!(cli.log_format, LogFormat::Text);
    }
}
