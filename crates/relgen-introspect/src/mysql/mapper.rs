use relgen_core::{
    RawColumn, RawEnum, RawEnumValue, RawForeignKey, RawIndex, RawPrimaryKey, RawTable,
    TableFilter,
};

use super::queries::{ColumnRow, ForeignKeyRow, IndexColumnRow, PrimaryKeyRow, TableRow};

/// Column name used for functional index key parts; it never resolves.
const EXPRESSION_KEY: &str = "<expression>";

pub fn map_tables(raw: Vec<TableRow>, filter: &TableFilter) -> Vec<RawTable> {
    raw.into_iter()
        .filter(|row| filter.allows(&row.schema_name, &row.table_name))
        .map(|row| RawTable {
            schema: row.schema_name,
            name: row.table_name,
        })
        .collect()
}

/// Map column rows, lifting every `enum(...)` column into a table-scoped enum.
pub fn map_columns(raw: Vec<ColumnRow>, filter: &TableFilter) -> (Vec<RawColumn>, Vec<RawEnum>) {
    let mut columns = Vec::with_capacity(raw.len());
    let mut enums = Vec::new();

    for row in raw {
        if !filter.allows(&row.schema_name, &row.table_name) {
            continue;
        }

        let labels = if row.data_type.eq_ignore_ascii_case("enum") {
            parse_enum_labels(&row.column_type)
        } else {
            None
        };
        let (db_type, user_defined) = match labels {
            Some(labels) => {
                let name = format!("{}_{}", row.table_name, row.column_name);
                enums.push(RawEnum {
                    schema: row.schema_name.clone(),
                    table: Some(row.table_name.clone()),
                    name: name.clone(),
                    values: labels
                        .into_iter()
                        .zip(1..)
                        .map(|(label, value)| RawEnumValue { label, value })
                        .collect(),
                });
                (name, true)
            }
            None => (row.data_type.to_ascii_lowercase(), false),
        };

        columns.push(RawColumn {
            schema: row.schema_name,
            table: row.table_name,
            name: row.column_name,
            db_type,
            is_array: false,
            user_defined,
            length: row
                .character_maximum_length
                .and_then(|len| u32::try_from(len).ok())
                .unwrap_or(0),
            nullable: row.is_nullable == "YES",
            has_default: row.column_default.is_some(),
        });
    }

    (columns, enums)
}

/// Parse the labels of a `enum('a','b')` column type.
///
/// Quotes inside labels are escaped either by doubling (`''`) or with a
/// backslash. Returns `None` when `column_type` is not an enum definition.
pub fn parse_enum_labels(column_type: &str) -> Option<Vec<String>> {
    let body = column_type
        .trim()
        .strip_prefix("enum(")
        .or_else(|| column_type.trim().strip_prefix("ENUM("))?
        .strip_suffix(')')?;

    let mut labels = Vec::new();
    let mut chars = body.chars().peekable();
    loop {
        match chars.next() {
            None => break,
            Some('\'') => {}
            Some(',') | Some(' ') => continue,
            Some(_) => return None,
        }

        let mut label = String::new();
        loop {
            match chars.next()? {
                '\\' => label.push(chars.next()?),
                '\'' if chars.peek() == Some(&'\'') => {
                    chars.next();
                    label.push('\'');
                }
                '\'' => break,
                other => label.push(other),
            }
        }
        labels.push(label);
    }
    Some(labels)
}

pub fn map_primary_keys(raw: Vec<PrimaryKeyRow>, filter: &TableFilter) -> Vec<RawPrimaryKey> {
    raw.into_iter()
        .filter(|row| filter.allows(&row.schema_name, &row.table_name))
        .map(|row| RawPrimaryKey {
            schema: row.schema_name,
            table: row.table_name,
            column: row.column_name,
            name: row.constraint_name,
        })
        .collect()
}

pub fn map_foreign_keys(raw: Vec<ForeignKeyRow>, filter: &TableFilter) -> Vec<RawForeignKey> {
    raw.into_iter()
        .filter(|row| filter.allows(&row.schema_name, &row.table_name))
        .map(|row| RawForeignKey {
            schema: row.schema_name,
            table: row.table_name,
            column: row.column_name,
            name: row.constraint_name,
            unique_position: i32::try_from(row.unique_position).unwrap_or(0),
            foreign_schema: row.foreign_schema_name,
            foreign_table: row.foreign_table_name,
            foreign_column: row.foreign_column_name,
        })
        .collect()
}

/// One single-column index row per key part; the model builder merges rows
/// sharing table and index name.
pub fn map_indexes(raw: Vec<IndexColumnRow>, filter: &TableFilter) -> Vec<RawIndex> {
    raw.into_iter()
        .filter(|row| filter.allows(&row.schema_name, &row.table_name))
        .map(|row| RawIndex {
            schema: row.schema_name,
            table: row.table_name,
            name: row.index_name,
            columns: vec![
                row.column_name
                    .unwrap_or_else(|| EXPRESSION_KEY.to_string()),
            ],
        })
        .collect()
}
