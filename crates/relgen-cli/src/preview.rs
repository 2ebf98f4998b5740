use std::io::{self, Write};

use clap::ValueEnum;

use relgen_core::Database;
use relgen_generate::DatabaseView;
use relgen_generate::context::ColumnView;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum PreviewFormat {
    #[default]
    Tabular,
    Json,
}

/// Print the model the way templates will see it.
pub fn write_preview<W: Write>(
    out: &mut W,
    db: &Database,
    format: PreviewFormat,
) -> Result<(), PreviewError> {
    let view = DatabaseView::new(db);
    match format {
        PreviewFormat::Json => {
            let json = serde_json::to_string_pretty(&view)?;
            writeln!(out, "{json}")?;
        }
        PreviewFormat::Tabular => write_tabular(out, &view)?,
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("write: {0}")]
    Io(#[from] io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

fn write_tabular<W: Write>(out: &mut W, view: &DatabaseView<'_>) -> io::Result<()> {
    for schema in &view.schemas {
        writeln!(out, "schema {}{}", schema.name, alias(schema.name, schema.db_name))?;
        for table in &schema.tables {
            writeln!(out, "  table {}{}", table.name, alias(table.name, table.db_name))?;
            let width = table
                .columns
                .iter()
                .map(|column| column.db_name.len())
                .max()
                .unwrap_or(0);
            for column in &table.columns {
                writeln!(out, "    {:width$}  {}", column.db_name, describe(column))?;
            }
            for index in &table.indexes {
                let columns: Vec<&str> = index.columns.iter().map(|c| c.db_name).collect();
                writeln!(out, "    index {} ({})", index.name, columns.join(", "))?;
            }
        }
        for item in &schema.enums {
            let values: Vec<String> = item
                .values
                .iter()
                .map(|value| format!("{}={}", value.db_name, value.value))
                .collect();
            writeln!(out, "  enum {} [{}]", item.db_name, values.join(", "))?;
        }
    }
    Ok(())
}

fn alias(name: &str, db_name: &str) -> String {
    if name == db_name {
        String::new()
    } else {
        format!(" ({db_name})")
    }
}

fn describe(column: &ColumnView<'_>) -> String {
    let mut parts = vec![column.db_type.to_string()];
    if column.is_array {
        parts[0].push_str("[]");
    }
    if column.type_name != column.db_type {
        parts.push(format!("-> {}", column.type_name));
    }
    if column.is_primary_key {
        parts.push("pk".to_string());
    }
    if let Some(fk) = &column.foreign_key {
        parts.push(format!(
            "fk {}.{}.{}",
            fk.foreign_schema, fk.foreign_table, fk.foreign_column_db_name
        ));
    }
    if !column.nullable {
        parts.push("not null".to_string());
    }
    if column.has_default {
        parts.push("default".to_string());
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use relgen_core::{
        ModelBuilder, RawCatalog, RawColumn, RawEnum, RawEnumValue, RawForeignKey,
        RawPrimaryKey, RawTable, TableFilter, TypeMapping,
    };

    fn column(table: &str, name: &str, db_type: &str, nullable: bool) -> RawColumn {
        RawColumn {
            schema: "public".to_string(),
            table: table.to_string(),
            name: name.to_string(),
            db_type: db_type.to_string(),
            is_array: false,
            user_defined: false,
            length: 0,
            nullable,
            has_default: false,
        }
    }

    fn model() -> Database {
        let catalog = RawCatalog {
            tables: vec![
                RawTable {
                    schema: "public".to_string(),
                    name: "users".to_string(),
                },
                RawTable {
                    schema: "public".to_string(),
                    name: "orders".to_string(),
                },
            ],
            columns: vec![
                column("users", "id", "int4", false),
                column("orders", "id", "int4", false),
                column("orders", "user_id", "int4", true),
            ],
            primary_keys: vec![RawPrimaryKey {
                schema: "public".to_string(),
                table: "users".to_string(),
                column: "id".to_string(),
                name: "users_pkey".to_string(),
            }],
            foreign_keys: vec![RawForeignKey {
                schema: "public".to_string(),
                table: "orders".to_string(),
                column: "user_id".to_string(),
                name: "orders_user_id_fkey".to_string(),
                unique_position: 1,
                foreign_schema: "public".to_string(),
                foreign_table: "users".to_string(),
                foreign_column: "id".to_string(),
            }],
            enums: vec![RawEnum {
                schema: "public".to_string(),
                table: None,
                name: "mood".to_string(),
                values: vec![
                    RawEnumValue {
                        label: "happy".to_string(),
                        value: 1,
                    },
                    RawEnumValue {
                        label: "sad".to_string(),
                        value: 2,
                    },
                ],
            }],
            ..RawCatalog::default()
        };
        let types = TypeMapping {
            plain: BTreeMap::from([("int4".to_string(), "i32".to_string())]),
            nullable: BTreeMap::new(),
        };
        let schemas = vec!["public".to_string()];
        let (db, _) = ModelBuilder::new(&schemas, &TableFilter::All)
            .with_types(&types)
            .build(catalog)
            .expect("build model");
        db
    }

    #[test]
    fn tabular_lists_tables_columns_and_enums() {
        let mut out = Vec::new();
        write_preview(&mut out, &model(), PreviewFormat::Tabular).expect("preview");
        let text = String::from_utf8(out).expect("utf8");

        assert!(text.starts_with("schema public\n  table users\n"));
        assert!(text.contains("    id  int4 -> i32 pk not null\n"));
        assert!(text.contains("user_id  int4 fk public.users.id\n"));
        assert!(text.contains("  enum mood [happy=1, sad=2]\n"));
    }

    #[test]
    fn json_uses_template_keys() {
        let mut out = Vec::new();
        write_preview(&mut out, &model(), PreviewFormat::Json).expect("preview");
        let json: serde_json::Value = serde_json::from_slice(&out).expect("json");

        let users = &json["schemas"][0]["tables"][0];
        assert_eq!(users["db_name"], "users");
        assert_eq!(users["columns"][0]["type"], "i32");
        assert_eq!(users["columns"][0]["db_type"], "int4");
        assert_eq!(json["schemas"][0]["enums"][0]["values"][1]["value"], 2);
    }
}
