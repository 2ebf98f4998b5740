//! Template environment shared by every render.
//!
//! Undefined attributes are errors, so a typo in a template fails the unit
//! instead of rendering an empty string.

use heck::{ToKebabCase, ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use minijinja::value::{Value, ValueKind};
use minijinja::{Environment, Error, ErrorKind, UndefinedBehavior, context};

use relgen_core::NameConverter;

use crate::errors::GenerationError;

const NAME_CONVERSION: &str = "name_conversion";

/// A fresh environment with relgen's filters and strict undefined handling.
pub fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_keep_trailing_newline(true);
    register_filters(&mut env);
    env
}

pub fn register_filters(env: &mut Environment<'_>) {
    env.add_filter("names", names);
    env.add_filter("db_names", db_names);
    env.add_filter("sprintf", sprintf);
    env.add_filter("pascal", |value: String| value.to_upper_camel_case());
    env.add_filter("camel", |value: String| value.to_lower_camel_case());
    env.add_filter("snake", |value: String| value.to_snake_case());
    env.add_filter("kebab", |value: String| value.to_kebab_case());
    env.add_filter("shouty_snake", |value: String| value.to_shouty_snake_case());
}

/// Compile `source` into `env` under `name`.
pub(crate) fn add_template(
    env: &mut Environment<'static>,
    name: String,
    source: String,
) -> Result<(), GenerationError> {
    env.add_template_owned(name.clone(), source)
        .map_err(|source| GenerationError::Template { name, source })
}

fn names(items: Value) -> Result<Vec<Value>, Error> {
    collect_attr(&items, "name")
}

fn db_names(items: Value) -> Result<Vec<Value>, Error> {
    collect_attr(&items, "db_name")
}

fn collect_attr(items: &Value, attr: &str) -> Result<Vec<Value>, Error> {
    items
        .try_iter()?
        .map(|item| {
            let value = item.get_attr(attr)?;
            if value.is_undefined() {
                return Err(Error::new(
                    ErrorKind::InvalidOperation,
                    format!("item has no attribute {attr:?}"),
                ));
            }
            Ok(value)
        })
        .collect()
}

/// Formats every item of a list with a `printf`-style pattern.
///
/// Each `%s` is replaced by the item and `%%` by a literal percent sign, so
/// `cols | db_names | sprintf('%s = ?')` yields one string per column.
fn sprintf(items: Value, format: String) -> Result<Vec<String>, Error> {
    if !matches!(items.kind(), ValueKind::Seq | ValueKind::Iterable) {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("sprintf expects a list, got {}", items.kind()),
        ));
    }
    items
        .try_iter()?
        .map(|item| format_item(&format, &item.to_string()))
        .collect()
}

fn format_item(format: &str, item: &str) -> Result<String, Error> {
    let mut out = String::with_capacity(format.len() + item.len());
    let mut chars = format.chars();
    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some('s') => out.push_str(item),
            other => {
                return Err(Error::new(
                    ErrorKind::InvalidOperation,
                    format!("unsupported verb %{} in {format:?}", other.unwrap_or(' ')),
                ));
            }
        }
    }
    Ok(out)
}

/// Derives display names by rendering a template with `value` bound to the
/// database name.
pub struct TemplateNames {
    env: Environment<'static>,
}

impl TemplateNames {
    pub fn new(source: &str) -> Result<Self, GenerationError> {
        let mut env = environment();
        add_template(&mut env, NAME_CONVERSION.to_string(), source.to_string())?;
        Ok(Self { env })
    }
}

impl NameConverter for TemplateNames {
    fn convert(&self, db_name: &str) -> relgen_core::Result<String> {
        self.env
            .get_template(NAME_CONVERSION)
            .and_then(|template| template.render(context! { value => db_name }))
            .map(|name| name.trim().to_string())
            .map_err(|err| {
                relgen_core::Error::InvalidConfig(format!(
                    "name_conversion failed for {db_name:?}: {err}"
                ))
            })
    }
}
