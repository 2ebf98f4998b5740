use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::model::Database;

/// Validate internal consistency of a built model.
///
/// This checks:
/// - duplicate schemas/tables/columns
/// - primary key flags agree with table primary key lists
/// - foreign key flags agree with the foreign column records
/// - foreign column records point into the tables their constraint names
/// - no foreign key lists a column twice
/// - every foreign key is linked back from the table it references
pub fn validate_model(db: &Database) -> Result<()> {
    let mut schema_names = BTreeSet::new();
    for schema in db.schemas() {
        if !schema_names.insert(schema.db_name.as_str()) {
            return Err(Error::InvalidSchema(format!(
                "duplicate schema name: {}",
                schema.db_name
            )));
        }

        let mut table_names = BTreeSet::new();
        for table in db.tables_of(&schema.tables) {
            if !table_names.insert(table.db_name.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate table name: {}.{}",
                    schema.db_name, table.db_name
                )));
            }

            let mut column_names = BTreeSet::new();
            for column in db.columns_of(&table.columns) {
                if !column_names.insert(column.db_name.as_str()) {
                    return Err(Error::InvalidSchema(format!(
                        "duplicate column name: {}.{}.{}",
                        schema.db_name, table.db_name, column.db_name
                    )));
                }
                if column.table != table.id {
                    return Err(Error::InvalidSchema(format!(
                        "column {}.{}.{} points at another table",
                        schema.db_name, table.db_name, column.db_name
                    )));
                }
                if column.is_primary_key != table.primary_keys.contains(&column.id) {
                    return Err(Error::InvalidSchema(format!(
                        "primary key flag out of sync: {}.{}.{}",
                        schema.db_name, table.db_name, column.db_name
                    )));
                }
                if column.is_foreign_key != column.foreign_column.is_some() {
                    return Err(Error::InvalidSchema(format!(
                        "foreign key flag out of sync: {}.{}.{}",
                        schema.db_name, table.db_name, column.db_name
                    )));
                }
                if column.is_foreign_key_reference != !column.foreign_key_references.is_empty() {
                    return Err(Error::InvalidSchema(format!(
                        "foreign key reference flag out of sync: {}.{}.{}",
                        schema.db_name, table.db_name, column.db_name
                    )));
                }
            }
        }
    }

    for table in db.tables() {
        for (name, link) in &table.foreign_tables_by_foreign_key {
            let members = table
                .foreign_columns_by_foreign_key
                .get(name)
                .ok_or_else(|| {
                    Error::InvalidSchema(format!(
                        "foreign key {name} on {} has no columns",
                        table.db_name
                    ))
                })?;

            let mut member_columns = BTreeSet::new();
            for id in members {
                let foreign_column = db.foreign_column(*id);
                if !member_columns.insert(foreign_column.column) {
                    return Err(Error::InvalidSchema(format!(
                        "foreign key {name} on {} lists column {} twice",
                        table.db_name, foreign_column.column_name
                    )));
                }
                let column = db.column(foreign_column.column);
                let referenced = db.column(foreign_column.foreign_column);
                if column.table != link.table || referenced.table != link.foreign_table {
                    return Err(Error::InvalidSchema(format!(
                        "foreign key {name} on {} spans unrelated tables",
                        table.db_name
                    )));
                }
                if !column.is_foreign_key || !referenced.is_foreign_key_reference {
                    return Err(Error::InvalidSchema(format!(
                        "foreign key {name} on {} has unflagged columns",
                        table.db_name
                    )));
                }
            }

            let foreign_table = db.table(link.foreign_table);
            let linked_back = foreign_table
                .foreign_tables_by_foreign_key_reference
                .get(name)
                .is_some_and(|links| links.contains(link));
            if !foreign_table.foreign_key_references.contains(name) || !linked_back {
                return Err(Error::InvalidSchema(format!(
                    "foreign key {name} on {} is missing from {}",
                    table.db_name, foreign_table.db_name
                )));
            }
        }

        for (name, links) in &table.foreign_tables_by_foreign_key_reference {
            for link in links {
                let referencing = db.table(link.table);
                if link.foreign_table != table.id
                    || referencing.foreign_tables_by_foreign_key.get(name) != Some(link)
                {
                    return Err(Error::InvalidSchema(format!(
                        "reference {name} on {} has no matching foreign key on {}",
                        table.db_name, referencing.db_name
                    )));
                }
            }
        }
    }

    Ok(())
}
