use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::filter::TableFilter;

/// The portion of the run configuration that is visible to templates.
///
/// Templates see `conn_str` as configured; only logs mask it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigData {
    /// Connection string with environment variables already expanded.
    pub conn_str: String,
    /// Schemas to introspect, in output order.
    pub schemas: Vec<String>,
    /// Schema → tables allow list. Exclusive with `exclude_tables`.
    pub include_tables: BTreeMap<String, Vec<String>>,
    /// Schema → tables deny list. Exclusive with `include_tables`.
    pub exclude_tables: BTreeMap<String, Vec<String>>,
    /// Command with arguments run after each generated file.
    pub post_run: Vec<String>,
    /// Database type → template type for non-nullable columns.
    pub type_map: BTreeMap<String, String>,
    /// Database type → template type for nullable columns.
    pub nullable_type_map: BTreeMap<String, String>,
}

impl ConfigData {
    pub fn validate(&self) -> Result<()> {
        if self.conn_str.trim().is_empty() {
            return Err(Error::InvalidConfig("conn_str is required".to_string()));
        }
        if self.schemas.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one schema is required".to_string(),
            ));
        }
        let mut seen = Vec::with_capacity(self.schemas.len());
        for schema in &self.schemas {
            if seen.contains(&schema) {
                return Err(Error::InvalidConfig(format!(
                    "schema listed twice: {schema}"
                )));
            }
            seen.push(schema);
        }
        self.table_filter().map(|_| ())
    }

    pub fn table_filter(&self) -> Result<TableFilter> {
        TableFilter::new(&self.include_tables, &self.exclude_tables)
    }

    pub fn type_mapping(&self) -> TypeMapping {
        TypeMapping {
            plain: self.type_map.clone(),
            nullable: self.nullable_type_map.clone(),
        }
    }
}

/// Lookup tables converting database types into template types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeMapping {
    pub plain: BTreeMap<String, String>,
    pub nullable: BTreeMap<String, String>,
}

impl TypeMapping {
    pub const fn empty() -> Self {
        Self {
            plain: BTreeMap::new(),
            nullable: BTreeMap::new(),
        }
    }

    /// Nullable columns consult only the nullable map; unmapped types keep
    /// their database spelling.
    pub fn resolve(&self, db_type: &str, nullable: bool) -> String {
        let table = if nullable { &self.nullable } else { &self.plain };
        table
            .get(db_type)
            .cloned()
            .unwrap_or_else(|| db_type.to_string())
    }
}
