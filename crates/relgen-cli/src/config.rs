//! `relgen.toml` loading.
//!
//! Relative paths in the file resolve against the file's directory, so a
//! project can be generated from any working directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use relgen_core::{ConfigData, expand_env};
use relgen_generate::{FailurePolicy, GenerateOptions, Target, TemplateSet};
use relgen_introspect::Engine;

pub const DEFAULT_CONFIG_NAME: &str = "relgen.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error(transparent)]
    Core(#[from] relgen_core::Error),
}

/// The file as written by the user.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub conn_str: String,
    #[serde(default)]
    pub db_type: Option<String>,
    pub schemas: Vec<String>,
    /// `schema.table`, or a bare table name that applies to every schema.
    #[serde(default)]
    pub include_tables: Vec<String>,
    #[serde(default)]
    pub exclude_tables: Vec<String>,
    #[serde(default)]
    pub name_conversion: Option<String>,
    #[serde(default)]
    pub post_run: Vec<String>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
    #[serde(default)]
    pub on_error: FailurePolicy,
    /// Filename template → contents template path.
    #[serde(default)]
    pub schema_paths: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub table_paths: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub enum_paths: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub type_map: BTreeMap<String, String>,
    #[serde(default)]
    pub nullable_type_map: BTreeMap<String, String>,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// A resolved run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub data: ConfigData,
    pub engine: Engine,
    pub name_conversion: Option<String>,
    pub templates: TemplateSet,
    pub options: GenerateOptions,
    pub params: serde_json::Value,
}

pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file: ConfigFile = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    resolve(file, base_dir, |name| std::env::var(name).ok())
}

/// Validate `file` and resolve its paths against `base_dir`.
pub fn resolve<F>(file: ConfigFile, base_dir: &Path, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let conn_str = expand_env(&file.conn_str, lookup);
    let engine = match &file.db_type {
        Some(name) => name.parse()?,
        None => Engine::detect(&conn_str)?,
    };

    let data = ConfigData {
        conn_str,
        include_tables: table_map(&file.include_tables, &file.schemas, "include_tables")?,
        exclude_tables: table_map(&file.exclude_tables, &file.schemas, "exclude_tables")?,
        schemas: file.schemas,
        post_run: file.post_run.clone(),
        type_map: file.type_map,
        nullable_type_map: file.nullable_type_map,
    };
    data.validate()?;

    let templates = TemplateSet {
        schema: targets(base_dir, file.schema_paths)?,
        table: targets(base_dir, file.table_paths)?,
        enums: targets(base_dir, file.enum_paths)?,
    };
    let options = GenerateOptions {
        output_dir: base_dir.join(file.output_dir),
        static_dir: file.static_dir.map(|dir| base_dir.join(dir)),
        post_run: file.post_run,
        on_error: file.on_error,
    };

    Ok(Config {
        data,
        engine,
        name_conversion: file.name_conversion.filter(|source| !source.trim().is_empty()),
        templates,
        options,
        params: serde_json::Value::Object(file.params),
    })
}

/// Group `schema.table` entries by schema; bare names apply to every schema.
fn table_map(
    entries: &[String],
    schemas: &[String],
    field: &str,
) -> Result<BTreeMap<String, Vec<String>>, ConfigError> {
    let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for entry in entries {
        match entry.split_once('.') {
            Some((schema, table)) => {
                if schema.is_empty() || table.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "{field} entry {entry:?} must be schema.table or a table name"
                    )));
                }
                if !schemas.iter().any(|known| known == schema) {
                    return Err(ConfigError::Invalid(format!(
                        "{field} entry {entry:?} names schema {schema:?} which is not in schemas"
                    )));
                }
                map.entry(schema.to_string())
                    .or_default()
                    .push(table.to_string());
            }
            None => {
                for schema in schemas {
                    map.entry(schema.clone()).or_default().push(entry.clone());
                }
            }
        }
    }
    Ok(map)
}

fn targets(base_dir: &Path, paths: BTreeMap<String, PathBuf>) -> Result<Vec<Target>, ConfigError> {
    paths
        .into_iter()
        .map(|(filename, template)| {
            let path = base_dir.join(&template);
            let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            Ok(Target {
                filename,
                name: template.display().to_string(),
                contents,
            })
        })
        .collect()
}
