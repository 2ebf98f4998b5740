use relgen_core::{
    RawColumn, RawEnum, RawEnumValue, RawForeignKey, RawIndex, RawPrimaryKey, RawTable,
    TableFilter,
};

use super::queries::{ColumnRow, EnumValueRow, ForeignKeyRow, IndexRow, PrimaryKeyRow, TableRow};

pub fn map_tables(raw: Vec<TableRow>, filter: &TableFilter) -> Vec<RawTable> {
    raw.into_iter()
        .filter(|row| filter.allows(&row.schema_name, &row.table_name))
        .map(|row| RawTable {
            schema: row.schema_name,
            name: row.table_name,
        })
        .collect()
}

pub fn map_columns(raw: Vec<ColumnRow>, filter: &TableFilter) -> Vec<RawColumn> {
    raw.into_iter()
        .filter(|row| filter.allows(&row.schema_name, &row.table_name))
        .map(|row| {
            let (db_type, is_array, user_defined) = normalize_type(&row.data_type, &row.udt_name);
            RawColumn {
                schema: row.schema_name,
                table: row.table_name,
                name: row.column_name,
                db_type,
                is_array,
                user_defined,
                length: row
                    .character_maximum_length
                    .and_then(|len| u32::try_from(len).ok())
                    .unwrap_or(0),
                nullable: row.is_nullable == "YES",
                has_default: row
                    .column_default
                    .as_deref()
                    .is_some_and(|value| !value.is_empty()),
            }
        })
        .collect()
}

/// Map `information_schema` type columns to `(type, is_array, user_defined)`.
///
/// Array udt names carry a leading underscore (`_int4`); user-defined types
/// (enums, domains, composites) are only named by `udt_name`.
fn normalize_type(data_type: &str, udt_name: &str) -> (String, bool, bool) {
    match data_type {
        "ARRAY" => (
            udt_name.strip_prefix('_').unwrap_or(udt_name).to_string(),
            true,
            false,
        ),
        "USER-DEFINED" => (udt_name.to_string(), false, true),
        _ => (data_type.to_string(), false, false),
    }
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
            unique_position: row.unique_position,
            foreign_schema: row.foreign_schema_name,
            foreign_table: row.foreign_table_name,
            foreign_column: row.foreign_column_name,
        })
        .collect()
}

pub fn map_indexes(raw: Vec<IndexRow>, filter: &TableFilter) -> Vec<RawIndex> {
    raw.into_iter()
        .filter(|row| filter.allows(&row.schema_name, &row.table_name))
        .map(|row| RawIndex {
            schema: row.schema_name,
            table: row.table_name,
            name: row.index_name,
            columns: row.column_names.iter().map(|name| unquote(name)).collect(),
        })
        .collect()
}

/// Undo identifier quoting applied by `pg_get_indexdef`.
fn unquote(name: &str) -> String {
    match name
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
    {
        Some(inner) => inner.replace("\"\"", "\""),
        None => name.to_string(),
    }
}

/// Group label rows (sorted by schema, enum and sort order) into enums.
pub fn map_enums(raw: Vec<EnumValueRow>) -> Vec<RawEnum> {
    let mut enums: Vec<RawEnum> = Vec::new();
    for row in raw {
        let value = RawEnumValue {
            label: row.label,
            value: row.value,
        };
        match enums.last_mut() {
            Some(last) if last.schema == row.schema_name && last.name == row.enum_name => {
                last.values.push(value);
            }
            _ => enums.push(RawEnum {
                schema: row.schema_name,
                table: None,
                name: row.enum_name,
                values: vec![value],
            }),
        }
    }
    enums
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::*;

    fn column(data_type: &str, udt_name: &str) -> ColumnRow {
        ColumnRow {
            schema_name: "public".to_string(),
            table_name: "users".to_string(),
            column_name: "c".to_string(),
            data_type: data_type.to_string(),
            udt_name: udt_name.to_string(),
            is_nullable: "NO".to_string(),
            column_default: None,
            character_maximum_length: None,
        }
    }

    #[test]
    fn array_and_user_defined_types_are_normalized() {
        let mut text = column("character varying", "varchar");
        text.is_nullable = "YES".to_string();
        text.character_maximum_length = Some(64);
        text.column_default = Some("''::character varying".to_string());
        let mut empty_default = column("integer", "int4");
        empty_default.column_default = Some(String::new());

        let cols = map_columns(
            vec![
                column("ARRAY", "_int4"),
                column("USER-DEFINED", "mood"),
                text,
                empty_default,
            ],
            &TableFilter::All,
        );

        assert_eq!(cols[0].db_type, "int4");
        assert!(cols[0].is_array);
        assert_eq!(cols[1].db_type, "mood");
        assert!(cols[1].user_defined);
        assert_eq!(cols[2].db_type, "character varying");
        assert_eq!(cols[2].length, 64);
        assert!(cols[2].nullable);
        assert!(cols[2].has_default);
        assert!(!cols[3].has_default);
    }

    #[test]
    fn rows_of_excluded_tables_are_dropped() {
        let filter =
            TableFilter::Exclude(BTreeMap::from([("public".to_string(), BTreeSet::from(["users".to_string()]))]));
        assert!(map_columns(vec![column("text", "text")], &filter).is_empty());
    }

    #[test]
    fn enum_rows_are_grouped_in_order() {
        let row = |schema: &str, name: &str, label: &str, value: i32| EnumValueRow {
            schema_name: schema.to_string(),
            enum_name: name.to_string(),
            label: label.to_string(),
            value,
        };
        let enums = map_enums(vec![
            row("public", "mood", "sad", 1),
            row("public", "mood", "ok", 2),
            row("public", "size", "small", 1),
            row("sales", "mood", "glad", 1),
        ]);

        assert_eq!(enums.len(), 3);
        assert_eq!(
            enums[0].values.iter().map(|v| v.label.as_str()).collect::<Vec<_>>(),
            vec!["sad", "ok"]
        );
        assert_eq!(enums[2].schema, "sales");
    }

    #[test]
    fn quoted_index_columns_are_unquoted() {
        assert_eq!(unquote("\"Display Name\""), "Display Name");
        assert_eq!(unquote("email"), "email");
        assert_eq!(unquote("lower((email)::text)"), "lower((email)::text)");
    }
}
