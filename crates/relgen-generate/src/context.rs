//! Serializable projections of the model handed to templates.
//!
//! Views borrow from the [`Database`] and flatten id references into the
//! data a template needs, so no view refers back to its parent.

use std::collections::BTreeMap;

use minijinja::Value;
use serde::Serialize;

use relgen_core::{
    Column, ConfigData, Database, Enum, ForeignColumn, ForeignTable, Index, Schema, Table,
    redact_connection_string,
};

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseView<'a> {
    pub schemas: Vec<SchemaView<'a>>,
}

impl<'a> DatabaseView<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            schemas: db
                .schemas()
                .iter()
                .map(|schema| SchemaView::new(db, schema))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SchemaView<'a> {
    pub name: &'a str,
    pub db_name: &'a str,
    pub tables: Vec<TableView<'a>>,
    pub enums: Vec<EnumView<'a>>,
}

impl<'a> SchemaView<'a> {
    fn new(db: &'a Database, schema: &'a Schema) -> Self {
        Self {
            name: &schema.name,
            db_name: &schema.db_name,
            tables: db
                .tables_of(&schema.tables)
                .map(|table| TableView::new(db, schema, table))
                .collect(),
            enums: db
                .enums_of(&schema.enums)
                .map(|item| EnumView::new(db, schema, item))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TableView<'a> {
    pub name: &'a str,
    pub db_name: &'a str,
    pub schema: &'a str,
    pub columns: Vec<ColumnView<'a>>,
    pub columns_by_name: BTreeMap<&'a str, ColumnView<'a>>,
    pub primary_keys: Vec<ColumnView<'a>>,
    pub has_primary_key: bool,
    pub has_foreign_keys: bool,
    pub has_foreign_key_references: bool,
    /// Constraints declared on this table.
    pub foreign_keys: Vec<ForeignKeyView<'a>>,
    /// Constraints of other tables pointing at this one.
    pub foreign_key_references: Vec<ForeignKeyView<'a>>,
    pub indexes: Vec<IndexView<'a>>,
    pub enums: Vec<EnumView<'a>>,
}

impl<'a> TableView<'a> {
    fn new(db: &'a Database, schema: &'a Schema, table: &'a Table) -> Self {
        let columns: Vec<_> = db
            .columns_of(&table.columns)
            .map(|column| ColumnView::new(db, column))
            .collect();
        let columns_by_name = columns
            .iter()
            .map(|column| (column.db_name, column.clone()))
            .collect();

        Self {
            name: &table.name,
            db_name: &table.db_name,
            schema: &schema.db_name,
            columns_by_name,
            columns,
            primary_keys: db
                .columns_of(&table.primary_keys)
                .map(|column| ColumnView::new(db, column))
                .collect(),
            has_primary_key: table.has_primary_key(),
            has_foreign_keys: table.has_foreign_keys(),
            has_foreign_key_references: table.has_foreign_key_references(),
            foreign_keys: table
                .foreign_keys
                .iter()
                .filter_map(|name| table.foreign_tables_by_foreign_key.get(name))
                .map(|link| ForeignKeyView::new(db, link))
                .collect(),
            foreign_key_references: table
                .foreign_key_references
                .iter()
                .filter_map(|name| table.foreign_tables_by_foreign_key_reference.get(name))
                .flatten()
                .map(|link| ForeignKeyView::new(db, link))
                .collect(),
            indexes: table
                .indexes
                .iter()
                .map(|index| IndexView::new(db, index))
                .collect(),
            enums: db
                .enums_of(&table.enums)
                .map(|item| EnumView::new(db, schema, item))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnView<'a> {
    pub name: &'a str,
    pub db_name: &'a str,
    pub table: &'a str,
    #[serde(rename = "type")]
    pub type_name: &'a str,
    pub db_type: &'a str,
    pub is_array: bool,
    pub length: u32,
    pub user_defined: bool,
    pub nullable: bool,
    pub has_default: bool,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
    pub is_foreign_key_reference: bool,
    pub foreign_key: Option<ForeignColumnView<'a>>,
    pub foreign_key_references: &'a [String],
    /// Constraint name → the columns that reference this one through it.
    pub foreign_columns_by_foreign_key_reference: BTreeMap<&'a str, Vec<ForeignColumnView<'a>>>,
}

impl<'a> ColumnView<'a> {
    fn new(db: &'a Database, column: &'a Column) -> Self {
        Self {
            name: &column.name,
            db_name: &column.db_name,
            table: &db.table(column.table).db_name,
            type_name: &column.type_name,
            db_type: &column.db_type,
            is_array: column.is_array,
            length: column.length,
            user_defined: column.user_defined,
            nullable: column.nullable,
            has_default: column.has_default,
            is_primary_key: column.is_primary_key,
            is_foreign_key: column.is_foreign_key,
            is_foreign_key_reference: column.is_foreign_key_reference,
            foreign_key: column
                .foreign_column
                .map(|id| ForeignColumnView::new(db, db.foreign_column(id))),
            foreign_key_references: &column.foreign_key_references,
            foreign_columns_by_foreign_key_reference: column
                .foreign_columns_by_foreign_key_reference
                .iter()
                .map(|(name, ids)| {
                    let pairs = ids
                        .iter()
                        .map(|id| ForeignColumnView::new(db, db.foreign_column(*id)))
                        .collect();
                    (name.as_str(), pairs)
                })
                .collect(),
        }
    }
}

/// One column pair of a foreign key, named on both sides.
#[derive(Debug, Clone, Serialize)]
pub struct ForeignColumnView<'a> {
    pub name: &'a str,
    /// Database name of the referencing table.
    pub table: &'a str,
    pub column: &'a str,
    pub column_db_name: &'a str,
    pub foreign_column: &'a str,
    pub foreign_column_db_name: &'a str,
    pub foreign_table: &'a str,
    pub foreign_schema: &'a str,
    pub position: i32,
}

impl<'a> ForeignColumnView<'a> {
    fn new(db: &'a Database, pair: &'a ForeignColumn) -> Self {
        let column = db.column(pair.column);
        let referenced = db.column(pair.foreign_column);
        let foreign_table = db.table(referenced.table);
        Self {
            name: &pair.name,
            table: &db.table(column.table).db_name,
            column: &column.name,
            column_db_name: &pair.column_name,
            foreign_column: &referenced.name,
            foreign_column_db_name: &pair.foreign_column_name,
            foreign_table: &foreign_table.db_name,
            foreign_schema: &db.schema(foreign_table.schema).db_name,
            position: pair.unique_constraint_position,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ForeignKeyView<'a> {
    pub name: &'a str,
    pub schema: &'a str,
    pub table: &'a str,
    pub table_name: &'a str,
    pub foreign_schema: &'a str,
    pub foreign_table: &'a str,
    pub foreign_table_name: &'a str,
    pub columns: Vec<ForeignColumnView<'a>>,
}

impl<'a> ForeignKeyView<'a> {
    fn new(db: &'a Database, link: &'a ForeignTable) -> Self {
        let table = db.table(link.table);
        let foreign_table = db.table(link.foreign_table);
        Self {
            name: &link.name,
            schema: &db.schema(table.schema).db_name,
            table: &table.name,
            table_name: &link.table_name,
            foreign_schema: &db.schema(foreign_table.schema).db_name,
            foreign_table: &foreign_table.name,
            foreign_table_name: &link.foreign_table_name,
            columns: table
                .foreign_columns_by_foreign_key
                .get(&link.name)
                .map(|ids| {
                    ids.iter()
                        .map(|id| ForeignColumnView::new(db, db.foreign_column(*id)))
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexView<'a> {
    pub name: &'a str,
    pub columns: Vec<ColumnView<'a>>,
}

impl<'a> IndexView<'a> {
    fn new(db: &'a Database, index: &'a Index) -> Self {
        Self {
            name: &index.name,
            columns: db
                .columns_of(&index.columns)
                .map(|column| ColumnView::new(db, column))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnumView<'a> {
    pub name: &'a str,
    pub db_name: &'a str,
    pub schema: &'a str,
    pub table: Option<&'a str>,
    pub values: Vec<EnumValueView<'a>>,
}

impl<'a> EnumView<'a> {
    fn new(db: &'a Database, schema: &'a Schema, item: &'a Enum) -> Self {
        Self {
            name: &item.name,
            db_name: &item.db_name,
            schema: &schema.db_name,
            table: item.table.map(|id| db.table(id).db_name.as_str()),
            values: item
                .values
                .iter()
                .map(|value| EnumValueView {
                    name: &value.name,
                    db_name: &value.db_name,
                    value: value.value,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnumValueView<'a> {
    pub name: &'a str,
    pub db_name: &'a str,
    pub value: i32,
}

/// Values for one schema and the tables and enums inside it.
#[derive(Debug, Clone)]
pub struct SchemaData {
    pub label: String,
    pub value: Value,
    pub tables: Vec<(String, Value)>,
    pub enums: Vec<(String, Value)>,
}

/// Everything templates can see, converted once per run.
///
/// minijinja values are reference counted, so the per-unit contexts share
/// the database tree instead of copying it.
#[derive(Debug, Clone)]
pub struct TemplateData {
    pub db: Value,
    pub config: Value,
    pub params: Value,
    pub schemas: Vec<SchemaData>,
}

#[derive(Serialize)]
struct DatabaseContext<'a> {
    schemas: &'a [Value],
    schemas_by_name: BTreeMap<&'a str, Value>,
}

/// `config` as templates see it: the configuration unchanged plus a masked
/// connection string for output that must not carry the password.
#[derive(Serialize)]
struct ConfigContext<'a> {
    #[serde(flatten)]
    data: &'a ConfigData,
    conn_str_redacted: String,
}

#[derive(Serialize)]
struct UnitContext<'a> {
    db: &'a Value,
    config: &'a Value,
    params: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    table: Option<&'a Value>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    enumeration: Option<&'a Value>,
}

impl TemplateData {
    /// Project `db` together with `config` and the opaque `params`.
    pub fn new(db: &Database, config: &ConfigData, params: &serde_json::Value) -> Self {
        let view = DatabaseView::new(db);

        let schemas: Vec<SchemaData> = view
            .schemas
            .iter()
            .map(|schema| SchemaData {
                label: schema.db_name.to_string(),
                value: Value::from_serialize(schema),
                tables: schema
                    .tables
                    .iter()
                    .map(|table| {
                        (
                            format!("{}.{}", schema.db_name, table.db_name),
                            Value::from_serialize(table),
                        )
                    })
                    .collect(),
                enums: schema
                    .enums
                    .iter()
                    .map(|item| {
                        (
                            format!("{}.{}", schema.db_name, item.db_name),
                            Value::from_serialize(item),
                        )
                    })
                    .collect(),
            })
            .collect();

        let schema_values: Vec<Value> = schemas.iter().map(|schema| schema.value.clone()).collect();
        let db_value = Value::from_serialize(DatabaseContext {
            schemas: &schema_values,
            schemas_by_name: schemas
                .iter()
                .map(|schema| (schema.label.as_str(), schema.value.clone()))
                .collect(),
        });

        Self {
            db: db_value,
            config: Value::from_serialize(ConfigContext {
                data: config,
                conn_str_redacted: redact_connection_string(&config.conn_str),
            }),
            params: Value::from_serialize(params),
            schemas,
        }
    }

    pub fn schema_context(&self, schema: &Value) -> Value {
        self.unit(Some(schema), None, None)
    }

    pub fn table_context(&self, schema: &Value, table: &Value) -> Value {
        self.unit(Some(schema), Some(table), None)
    }

    pub fn enum_context(&self, schema: &Value, item: &Value) -> Value {
        self.unit(Some(schema), None, Some(item))
    }

    fn unit(&self, schema: Option<&Value>, table: Option<&Value>, item: Option<&Value>) -> Value {
        Value::from_serialize(UnitContext {
            db: &self.db,
            config: &self.config,
            params: &self.params,
            schema,
            table,
            enumeration: item,
        })
    }
}
