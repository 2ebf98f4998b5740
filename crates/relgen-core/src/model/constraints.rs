use super::{ColumnId, TableId};

/// One column pair of a foreign key constraint.
#[derive(Debug, Clone)]
pub struct ForeignColumn {
    /// Constraint name in the database.
    pub name: String,
    pub column_name: String,
    pub foreign_column_name: String,
    /// Position within the referenced unique constraint (1-based).
    pub unique_constraint_position: i32,
    /// The referencing column.
    pub column: ColumnId,
    /// The referenced column.
    pub foreign_column: ColumnId,
}

/// Table-level view of a foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignTable {
    pub name: String,
    pub table_name: String,
    pub foreign_table_name: String,
    /// The referencing table.
    pub table: TableId,
    /// The referenced table.
    pub foreign_table: TableId,
}

/// A named index over columns of one table, in definition order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    pub name: String,
    pub columns: Vec<ColumnId>,
}
