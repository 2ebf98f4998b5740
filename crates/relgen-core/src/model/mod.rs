//! Normalized relational model.
//!
//! All entities live in flat arenas owned by [`Database`] and refer to each
//! other through copyable ids. Back-references (column → table, table →
//! schema, foreign column → columns) are ids too, so the graph has no
//! ownership cycles. A `Database` is only ever handed out by shared
//! reference once built, which keeps the derived flags consistent.

mod constraints;
mod schema;
mod types;

use std::collections::BTreeMap;

use serde::Serialize;

pub use constraints::{ForeignColumn, ForeignTable, Index};
pub use schema::{Column, Schema, Table};
pub use types::{Enum, EnumValue};

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        pub struct $name(pub(crate) usize);

        impl $name {
            /// Position of the entity in its arena.
            pub fn index(self) -> usize {
                self.0
            }
        }
    };
}

arena_id!(
    /// Handle to a [`Schema`] in a [`Database`].
    SchemaId
);
arena_id!(
    /// Handle to a [`Table`] in a [`Database`].
    TableId
);
arena_id!(
    /// Handle to a [`Column`] in a [`Database`].
    ColumnId
);
arena_id!(
    /// Handle to an [`Enum`] in a [`Database`].
    EnumId
);
arena_id!(
    /// Handle to a [`ForeignColumn`] in a [`Database`].
    ForeignColumnId
);

/// The whole introspected graph.
#[derive(Debug, Clone, Default)]
pub struct Database {
    pub(crate) schemas: Vec<Schema>,
    pub(crate) tables: Vec<Table>,
    pub(crate) columns: Vec<Column>,
    pub(crate) enums: Vec<Enum>,
    pub(crate) foreign_columns: Vec<ForeignColumn>,
    pub(crate) schemas_by_name: BTreeMap<String, SchemaId>,
}

impl Database {
    /// Schemas in configuration order.
    pub fn schemas(&self) -> &[Schema] {
        &self.schemas
    }

    /// Every table across all schemas, in introspection order.
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn enums(&self) -> &[Enum] {
        &self.enums
    }

    pub fn schema(&self, id: SchemaId) -> &Schema {
        &self.schemas[id.0]
    }

    pub fn table(&self, id: TableId) -> &Table {
        &self.tables[id.0]
    }

    pub fn column(&self, id: ColumnId) -> &Column {
        &self.columns[id.0]
    }

    pub fn enumeration(&self, id: EnumId) -> &Enum {
        &self.enums[id.0]
    }

    pub fn foreign_column(&self, id: ForeignColumnId) -> &ForeignColumn {
        &self.foreign_columns[id.0]
    }

    pub fn schema_by_name(&self, name: &str) -> Option<&Schema> {
        self.schemas_by_name.get(name).map(|id| self.schema(*id))
    }

    /// Look a table up by database names.
    pub fn find_table(&self, schema: &str, table: &str) -> Option<&Table> {
        self.schema_by_name(schema)?
            .tables_by_name
            .get(table)
            .map(|id| self.table(*id))
    }

    /// Look a column up by database names.
    pub fn find_column(&self, schema: &str, table: &str, column: &str) -> Option<&Column> {
        self.find_table(schema, table)?
            .columns_by_name
            .get(column)
            .map(|id| self.column(*id))
    }

    /// Resolve a list of column ids in order.
    pub fn columns_of<'a>(&'a self, ids: &'a [ColumnId]) -> impl Iterator<Item = &'a Column> + 'a {
        ids.iter().map(move |id| self.column(*id))
    }

    pub fn tables_of<'a>(&'a self, ids: &'a [TableId]) -> impl Iterator<Item = &'a Table> + 'a {
        ids.iter().map(move |id| self.table(*id))
    }

    pub fn enums_of<'a>(&'a self, ids: &'a [EnumId]) -> impl Iterator<Item = &'a Enum> + 'a {
        ids.iter().map(move |id| self.enumeration(*id))
    }
}

/// Entities that carry a converted name next to their database name.
pub trait Named {
    fn name(&self) -> &str;
    fn db_name(&self) -> &str;
}

/// Ordered converted names of a collection.
pub fn names<'a, T, I>(items: I) -> Vec<String>
where
    T: Named + 'a,
    I: IntoIterator<Item = &'a T>,
{
    items
        .into_iter()
        .map(|item| item.name().to_string())
        .collect()
}

/// Ordered database names of a collection.
pub fn db_names<'a, T, I>(items: I) -> Vec<String>
where
    T: Named + 'a,
    I: IntoIterator<Item = &'a T>,
{
    items
        .into_iter()
        .map(|item| item.db_name().to_string())
        .collect()
}
