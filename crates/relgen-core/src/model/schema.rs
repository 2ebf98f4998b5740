use std::collections::BTreeMap;

use super::{
    ColumnId, EnumId, ForeignColumnId, ForeignTable, Index, Named, SchemaId, TableId,
};

/// A database namespace.
#[derive(Debug, Clone)]
pub struct Schema {
    pub id: SchemaId,
    pub name: String,
    pub db_name: String,
    /// Tables in introspection order.
    pub tables: Vec<TableId>,
    /// Enums in introspection order, including table-scoped ones.
    pub enums: Vec<EnumId>,
    /// Database table name → table.
    pub tables_by_name: BTreeMap<String, TableId>,
}

/// A table-like object inside one schema.
#[derive(Debug, Clone)]
pub struct Table {
    pub id: TableId,
    pub schema: SchemaId,
    pub name: String,
    pub db_name: String,
    /// Columns in ordinal order.
    pub columns: Vec<ColumnId>,
    /// Database column name → column.
    pub columns_by_name: BTreeMap<String, ColumnId>,
    /// Primary key columns in constraint order.
    pub primary_keys: Vec<ColumnId>,
    /// Names of foreign keys declared on this table.
    pub foreign_keys: Vec<String>,
    /// Names of foreign keys in other tables that reference this one.
    pub foreign_key_references: Vec<String>,
    /// Foreign key name → participating columns, in constraint order.
    pub foreign_columns_by_foreign_key: BTreeMap<String, Vec<ForeignColumnId>>,
    /// Foreign key name → referenced table.
    pub foreign_tables_by_foreign_key: BTreeMap<String, ForeignTable>,
    /// Foreign key name → referencing tables. Constraint names are only
    /// unique per table, so several tables can share one.
    pub foreign_tables_by_foreign_key_reference: BTreeMap<String, Vec<ForeignTable>>,
    pub indexes: Vec<Index>,
    /// Enums scoped to this table (MySQL column enums).
    pub enums: Vec<EnumId>,
}

impl Table {
    pub(crate) fn new(id: TableId, schema: SchemaId, name: String, db_name: String) -> Self {
        Self {
            id,
            schema,
            name,
            db_name,
            columns: Vec::new(),
            columns_by_name: BTreeMap::new(),
            primary_keys: Vec::new(),
            foreign_keys: Vec::new(),
            foreign_key_references: Vec::new(),
            foreign_columns_by_foreign_key: BTreeMap::new(),
            foreign_tables_by_foreign_key: BTreeMap::new(),
            foreign_tables_by_foreign_key_reference: BTreeMap::new(),
            indexes: Vec::new(),
            enums: Vec::new(),
        }
    }

    pub fn has_primary_key(&self) -> bool {
        !self.primary_keys.is_empty()
    }

    pub fn has_foreign_keys(&self) -> bool {
        !self.foreign_columns_by_foreign_key.is_empty()
    }

    pub fn has_foreign_key_references(&self) -> bool {
        !self.foreign_key_references.is_empty()
    }
}

/// A column of a table.
#[derive(Debug, Clone)]
pub struct Column {
    pub id: ColumnId,
    pub table: TableId,
    pub name: String,
    pub db_name: String,
    /// Type after applying the configured type maps.
    pub type_name: String,
    /// Normalized database type.
    pub db_type: String,
    pub is_array: bool,
    /// Declared length, zero when the type has none.
    pub length: u32,
    pub user_defined: bool,
    pub nullable: bool,
    pub has_default: bool,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
    pub is_foreign_key_reference: bool,
    /// First foreign key this column participates in.
    pub foreign_column: Option<ForeignColumnId>,
    /// Names of foreign keys referencing this column.
    pub foreign_key_references: Vec<String>,
    /// Foreign key name → the referencing column records, one per
    /// referencing table.
    pub foreign_columns_by_foreign_key_reference: BTreeMap<String, Vec<ForeignColumnId>>,
}

impl Named for Schema {
    fn name(&self) -> &str {
        &self.name
    }

    fn db_name(&self) -> &str {
        &self.db_name
    }
}

impl Named for Table {
    fn name(&self) -> &str {
        &self.name
    }

    fn db_name(&self) -> &str {
        &self.db_name
    }
}

impl Named for Column {
    fn name(&self) -> &str {
        &self.name
    }

    fn db_name(&self) -> &str {
        &self.db_name
    }
}
