//! Flat catalog rows as returned by adapters.
//!
//! Each collection mirrors one introspection query. Rows are denormalized:
//! they name their owning schema and table instead of pointing at them, and
//! the collections are queried independently of each other.

use serde::{Deserialize, Serialize};

use crate::filter::TableFilter;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    pub schema: String,
    pub name: String,
}

/// Column row with the backend type already normalized by the adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawColumn {
    pub schema: String,
    pub table: String,
    pub name: String,
    /// Normalized type name (element type for arrays).
    pub db_type: String,
    pub is_array: bool,
    pub user_defined: bool,
    /// Declared length, zero when the type carries none.
    pub length: u32,
    pub nullable: bool,
    pub has_default: bool,
}

/// One column of a primary key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPrimaryKey {
    pub schema: String,
    pub table: String,
    pub column: String,
    pub name: String,
}

/// One column pair of a foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawForeignKey {
    pub schema: String,
    pub table: String,
    pub column: String,
    pub name: String,
    /// Ordinal position within the referenced unique constraint.
    pub unique_position: i32,
    pub foreign_schema: String,
    pub foreign_table: String,
    pub foreign_column: String,
}

/// Index definition. Rows sharing schema, table and name are merged in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawIndex {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEnum {
    pub schema: String,
    /// Owning table for table-scoped encodings (MySQL column enums).
    pub table: Option<String>,
    pub name: String,
    pub values: Vec<RawEnumValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEnumValue {
    pub label: String,
    pub value: i32,
}

/// Everything an adapter read from the database in one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCatalog {
    pub tables: Vec<RawTable>,
    pub columns: Vec<RawColumn>,
    pub primary_keys: Vec<RawPrimaryKey>,
    pub foreign_keys: Vec<RawForeignKey>,
    pub indexes: Vec<RawIndex>,
    pub enums: Vec<RawEnum>,
}

impl RawCatalog {
    /// Drop every row that belongs to a table the filter rejects.
    ///
    /// Foreign keys are kept or dropped by their referencing table; links into
    /// a rejected table are resolved (and skipped) by the model builder.
    /// Returns the number of rows removed.
    pub fn retain_tables(&mut self, filter: &TableFilter) -> usize {
        let before = self.len();

        self.tables
            .retain(|row| filter.allows(&row.schema, &row.name));
        self.columns
            .retain(|row| filter.allows(&row.schema, &row.table));
        self.primary_keys
            .retain(|row| filter.allows(&row.schema, &row.table));
        self.foreign_keys
            .retain(|row| filter.allows(&row.schema, &row.table));
        self.indexes
            .retain(|row| filter.allows(&row.schema, &row.table));
        self.enums.retain(|row| match &row.table {
            Some(table) => filter.allows(&row.schema, table),
            None => true,
        });

        before - self.len()
    }

    fn len(&self) -> usize {
        self.tables.len()
            + self.columns.len()
            + self.primary_keys.len()
            + self.foreign_keys.len()
            + self.indexes.len()
            + self.enums.len()
    }
}
