//! Folds flat catalog rows into the relational model.
//!
//! Catalog queries are issued independently against a live database, so rows
//! can disagree with each other when DDL runs concurrently. Rows that point
//! at something the model does not hold are logged, recorded in the
//! [`BuildReport`] and skipped; they never abort the build.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::{RawCatalog, RawColumn, RawEnum, RawForeignKey, RawIndex, RawPrimaryKey, RawTable};
use crate::config::TypeMapping;
use crate::error::{Error, Result};
use crate::filter::TableFilter;
use crate::model::{
    Column, ColumnId, Database, Enum, EnumId, EnumValue, ForeignColumn, ForeignColumnId,
    ForeignTable, Index, Schema, SchemaId, Table, TableId,
};
use crate::naming::{IdentityNames, NameConverter};

static IDENTITY_NAMES: IdentityNames = IdentityNames;
static NO_TYPE_MAPPING: TypeMapping = TypeMapping::empty();

/// Category of a skipped catalog row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InconsistencyKind {
    UnknownSchema,
    UnknownTable,
    UnknownColumn,
    DuplicateTable,
    DuplicateColumn,
    DuplicateEnum,
    DuplicateForeignKey,
    InvalidIndex,
}

/// A catalog row that contradicted the model built so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inconsistency {
    pub kind: InconsistencyKind,
    pub message: String,
}

/// What the builder skipped while folding the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Rows dropped because their table is filtered out.
    pub filtered_rows: usize,
    /// Foreign keys dropped because they reference a filtered-out table.
    pub filtered_links: usize,
    pub inconsistencies: Vec<Inconsistency>,
}

impl BuildReport {
    pub fn count(&self, kind: InconsistencyKind) -> usize {
        self.inconsistencies
            .iter()
            .filter(|item| item.kind == kind)
            .count()
    }

    fn record(&mut self, kind: InconsistencyKind, message: String) {
        info!(event = "row_skipped", kind = ?kind, "should be impossible: {message}");
        self.inconsistencies.push(Inconsistency { kind, message });
    }
}

type Lookup<T> = std::result::Result<T, InconsistencyKind>;

/// Builds a [`Database`] from a [`RawCatalog`].
pub struct ModelBuilder<'a> {
    schemas: &'a [String],
    filter: &'a TableFilter,
    names: &'a dyn NameConverter,
    types: &'a TypeMapping,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(schemas: &'a [String], filter: &'a TableFilter) -> Self {
        Self {
            schemas,
            filter,
            names: &IDENTITY_NAMES,
            types: &NO_TYPE_MAPPING,
        }
    }

    /// Use `names` to derive display names from database names.
    pub fn with_names(mut self, names: &'a dyn NameConverter) -> Self {
        self.names = names;
        self
    }

    pub fn with_types(mut self, types: &'a TypeMapping) -> Self {
        self.types = types;
        self
    }

    /// Run every pass over `catalog`.
    ///
    /// Tables are seeded first and columns attached next; keys, enums and
    /// indexes resolve against the lookups those two passes populate.
    pub fn build(&self, mut catalog: RawCatalog) -> Result<(Database, BuildReport)> {
        let mut report = BuildReport {
            filtered_rows: catalog.retain_tables(self.filter),
            ..BuildReport::default()
        };
        if report.filtered_rows > 0 {
            debug!(
                event = "rows_filtered",
                rows = report.filtered_rows,
                "skipping rows of filtered-out tables"
            );
        }

        let mut db = self.seed_schemas()?;
        self.seed_tables(&mut db, &catalog.tables, &mut report)?;
        self.attach_columns(&mut db, &catalog.columns, &mut report)?;
        mark_primary_keys(&mut db, &catalog.primary_keys, &mut report);
        self.link_foreign_keys(&mut db, &catalog.foreign_keys, &mut report);
        self.attach_enums(&mut db, &catalog.enums, &mut report)?;
        attach_indexes(&mut db, &catalog.indexes, &mut report);

        info!(
            event = "model_built",
            schemas = db.schemas.len(),
            tables = db.tables.len(),
            columns = db.columns.len(),
            enums = db.enums.len(),
            inconsistencies = report.inconsistencies.len(),
            "relational model built"
        );

        Ok((db, report))
    }

    fn seed_schemas(&self) -> Result<Database> {
        let mut db = Database::default();
        for schema in self.schemas {
            if db.schemas_by_name.contains_key(schema) {
                return Err(Error::InvalidConfig(format!(
                    "schema listed twice: {schema}"
                )));
            }
            let id = SchemaId(db.schemas.len());
            db.schemas.push(Schema {
                id,
                name: self.names.convert(schema)?,
                db_name: schema.clone(),
                tables: Vec::new(),
                enums: Vec::new(),
                tables_by_name: BTreeMap::new(),
            });
            db.schemas_by_name.insert(schema.clone(), id);
        }
        Ok(db)
    }

    fn seed_tables(
        &self,
        db: &mut Database,
        rows: &[RawTable],
        report: &mut BuildReport,
    ) -> Result<()> {
        for row in rows {
            let Some(&schema_id) = db.schemas_by_name.get(&row.schema) else {
                report.record(
                    InconsistencyKind::UnknownSchema,
                    format!("table {:?} references unknown schema {:?}", row.name, row.schema),
                );
                continue;
            };
            if db.schemas[schema_id.0].tables_by_name.contains_key(&row.name) {
                report.record(
                    InconsistencyKind::DuplicateTable,
                    format!("table {}.{} reported twice", row.schema, row.name),
                );
                continue;
            }

            let id = TableId(db.tables.len());
            let name = self.names.convert(&row.name)?;
            db.tables
                .push(Table::new(id, schema_id, name, row.name.clone()));
            let schema = &mut db.schemas[schema_id.0];
            schema.tables.push(id);
            schema.tables_by_name.insert(row.name.clone(), id);
        }
        Ok(())
    }

    fn attach_columns(
        &self,
        db: &mut Database,
        rows: &[RawColumn],
        report: &mut BuildReport,
    ) -> Result<()> {
        for row in rows {
            let table_id = match resolve_table(db, &row.schema, &row.table) {
                Ok(id) => id,
                Err(kind) => {
                    report.record(
                        kind,
                        format!(
                            "column {:?} references {}",
                            row.name,
                            missing(kind, &row.schema, &row.table, None)
                        ),
                    );
                    continue;
                }
            };
            if db.tables[table_id.0].columns_by_name.contains_key(&row.name) {
                report.record(
                    InconsistencyKind::DuplicateColumn,
                    format!("column {}.{}.{} reported twice", row.schema, row.table, row.name),
                );
                continue;
            }

            let id = ColumnId(db.columns.len());
            db.columns.push(Column {
                id,
                table: table_id,
                name: self.names.convert(&row.name)?,
                db_name: row.name.clone(),
                type_name: self.types.resolve(&row.db_type, row.nullable),
                db_type: row.db_type.clone(),
                is_array: row.is_array,
                length: row.length,
                user_defined: row.user_defined,
                nullable: row.nullable,
                has_default: row.has_default,
                is_primary_key: false,
                is_foreign_key: false,
                is_foreign_key_reference: false,
                foreign_column: None,
                foreign_key_references: Vec::new(),
                foreign_columns_by_foreign_key_reference: BTreeMap::new(),
            });
            let table = &mut db.tables[table_id.0];
            table.columns.push(id);
            table.columns_by_name.insert(row.name.clone(), id);
        }
        Ok(())
    }

    fn link_foreign_keys(&self, db: &mut Database, rows: &[RawForeignKey], report: &mut BuildReport) {
        let mut seen: BTreeSet<(TableId, String, ColumnId)> = BTreeSet::new();

        for row in rows {
            let (table_id, column_id) =
                match resolve_column(db, &row.schema, &row.table, &row.column) {
                    Ok(ids) => ids,
                    Err(kind) => {
                        report.record(
                            kind,
                            format!(
                                "constraint {:?} references {}",
                                row.name,
                                missing(kind, &row.schema, &row.table, Some(&row.column))
                            ),
                        );
                        continue;
                    }
                };
            if !seen.insert((table_id, row.name.clone(), column_id)) {
                report.record(
                    InconsistencyKind::DuplicateForeignKey,
                    format!(
                        "constraint {:?} lists {}.{}.{} twice",
                        row.name, row.schema, row.table, row.column
                    ),
                );
                continue;
            }

            if !self.filter.allows(&row.foreign_schema, &row.foreign_table) {
                report.filtered_links += 1;
                debug!(
                    event = "link_filtered",
                    constraint = %row.name,
                    "skipping foreign key to filtered-out table {}.{}",
                    row.foreign_schema,
                    row.foreign_table
                );
                continue;
            }

            let (foreign_table_id, foreign_column_id) = match resolve_column(
                db,
                &row.foreign_schema,
                &row.foreign_table,
                &row.foreign_column,
            ) {
                Ok(ids) => ids,
                Err(kind) => {
                    report.record(
                        kind,
                        format!(
                            "constraint {:?} targets {}",
                            row.name,
                            missing(
                                kind,
                                &row.foreign_schema,
                                &row.foreign_table,
                                Some(&row.foreign_column)
                            )
                        ),
                    );
                    continue;
                }
            };

            let fc_id = ForeignColumnId(db.foreign_columns.len());
            db.foreign_columns.push(ForeignColumn {
                name: row.name.clone(),
                column_name: row.column.clone(),
                foreign_column_name: row.foreign_column.clone(),
                unique_constraint_position: row.unique_position,
                column: column_id,
                foreign_column: foreign_column_id,
            });

            let link = ForeignTable {
                name: row.name.clone(),
                table_name: db.tables[table_id.0].db_name.clone(),
                foreign_table_name: db.tables[foreign_table_id.0].db_name.clone(),
                table: table_id,
                foreign_table: foreign_table_id,
            };

            let column = &mut db.columns[column_id.0];
            column.is_foreign_key = true;
            column.foreign_column.get_or_insert(fc_id);

            let table = &mut db.tables[table_id.0];
            push_unique(&mut table.foreign_keys, &row.name);
            table
                .foreign_columns_by_foreign_key
                .entry(row.name.clone())
                .or_default()
                .push(fc_id);
            table
                .foreign_tables_by_foreign_key
                .entry(row.name.clone())
                .or_insert_with(|| link.clone());

            let foreign_table = &mut db.tables[foreign_table_id.0];
            push_unique(&mut foreign_table.foreign_key_references, &row.name);
            let links = foreign_table
                .foreign_tables_by_foreign_key_reference
                .entry(row.name.clone())
                .or_default();
            if !links.iter().any(|existing| existing.table == table_id) {
                links.push(link);
            }

            let referenced = &mut db.columns[foreign_column_id.0];
            referenced.is_foreign_key_reference = true;
            push_unique(&mut referenced.foreign_key_references, &row.name);
            referenced
                .foreign_columns_by_foreign_key_reference
                .entry(row.name.clone())
                .or_default()
                .push(fc_id);
        }
    }

    fn attach_enums(
        &self,
        db: &mut Database,
        rows: &[RawEnum],
        report: &mut BuildReport,
    ) -> Result<()> {
        let mut seen: BTreeSet<(SchemaId, String)> = BTreeSet::new();

        for row in rows {
            let Some(&schema_id) = db.schemas_by_name.get(&row.schema) else {
                report.record(
                    InconsistencyKind::UnknownSchema,
                    format!("enum {:?} references unknown schema {:?}", row.name, row.schema),
                );
                continue;
            };
            let table_id = match &row.table {
                Some(table) => match resolve_table(db, &row.schema, table) {
                    Ok(id) => Some(id),
                    Err(kind) => {
                        report.record(
                            kind,
                            format!(
                                "enum {:?} references {}",
                                row.name,
                                missing(kind, &row.schema, table, None)
                            ),
                        );
                        continue;
                    }
                },
                None => None,
            };
            if !seen.insert((schema_id, row.name.clone())) {
                report.record(
                    InconsistencyKind::DuplicateEnum,
                    format!("enum {}.{} reported twice", row.schema, row.name),
                );
                continue;
            }

            let values = row
                .values
                .iter()
                .map(|value| {
                    Ok(EnumValue {
                        name: self.names.convert(&value.label)?,
                        db_name: value.label.clone(),
                        value: value.value,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let id = EnumId(db.enums.len());
            db.enums.push(Enum {
                id,
                schema: schema_id,
                table: table_id,
                name: self.names.convert(&row.name)?,
                db_name: row.name.clone(),
                values,
            });
            db.schemas[schema_id.0].enums.push(id);
            if let Some(table_id) = table_id {
                db.tables[table_id.0].enums.push(id);
            }
        }
        Ok(())
    }
}

fn mark_primary_keys(db: &mut Database, rows: &[RawPrimaryKey], report: &mut BuildReport) {
    for row in rows {
        let (table_id, column_id) = match resolve_column(db, &row.schema, &row.table, &row.column)
        {
            Ok(ids) => ids,
            Err(kind) => {
                report.record(
                    kind,
                    format!(
                        "constraint {:?} references {}",
                        row.name,
                        missing(kind, &row.schema, &row.table, Some(&row.column))
                    ),
                );
                continue;
            }
        };

        let column = &mut db.columns[column_id.0];
        if column.is_primary_key {
            continue;
        }
        column.is_primary_key = true;
        db.tables[table_id.0].primary_keys.push(column_id);
    }
}

/// Merge index rows per table and name, then resolve their columns.
///
/// An index with any column that does not resolve, or that lists a column
/// twice, is dropped as a whole.
fn attach_indexes(db: &mut Database, rows: &[RawIndex], report: &mut BuildReport) {
    let mut order: Vec<(TableId, String)> = Vec::new();
    let mut merged: BTreeMap<(TableId, String), Vec<String>> = BTreeMap::new();

    for row in rows {
        let table_id = match resolve_table(db, &row.schema, &row.table) {
            Ok(id) => id,
            Err(kind) => {
                report.record(
                    kind,
                    format!(
                        "index {:?} references {}",
                        row.name,
                        missing(kind, &row.schema, &row.table, None)
                    ),
                );
                continue;
            }
        };

        let key = (table_id, row.name.clone());
        match merged.get_mut(&key) {
            Some(columns) => columns.extend(row.columns.iter().cloned()),
            None => {
                order.push(key.clone());
                merged.insert(key, row.columns.clone());
            }
        }
    }

    for key in order {
        let Some(columns) = merged.remove(&key) else {
            continue;
        };
        let (table_id, name) = key;
        let table = &db.tables[table_id.0];
        match resolve_index_columns(table, &columns) {
            Ok(ids) => db.tables[table_id.0]
                .indexes
                .push(Index { name, columns: ids }),
            Err(reason) => {
                let schema = &db.schemas[table.schema.0].db_name;
                let message = format!(
                    "index {name:?} on {schema}.{} dropped: {reason}",
                    table.db_name
                );
                report.record(InconsistencyKind::InvalidIndex, message);
            }
        }
    }
}

fn resolve_index_columns(table: &Table, columns: &[String]) -> std::result::Result<Vec<ColumnId>, String> {
    if columns.is_empty() {
        return Err("no columns".to_string());
    }
    let mut ids = Vec::with_capacity(columns.len());
    for column in columns {
        let Some(&id) = table.columns_by_name.get(column) else {
            return Err(format!("unknown column {column:?}"));
        };
        if ids.contains(&id) {
            return Err(format!("column {column:?} listed twice"));
        }
        ids.push(id);
    }
    Ok(ids)
}

fn resolve_table(db: &Database, schema: &str, table: &str) -> Lookup<TableId> {
    let schema_id = db
        .schemas_by_name
        .get(schema)
        .ok_or(InconsistencyKind::UnknownSchema)?;
    db.schemas[schema_id.0]
        .tables_by_name
        .get(table)
        .copied()
        .ok_or(InconsistencyKind::UnknownTable)
}

fn resolve_column(
    db: &Database,
    schema: &str,
    table: &str,
    column: &str,
) -> Lookup<(TableId, ColumnId)> {
    let table_id = resolve_table(db, schema, table)?;
    db.tables[table_id.0]
        .columns_by_name
        .get(column)
        .map(|id| (table_id, *id))
        .ok_or(InconsistencyKind::UnknownColumn)
}

fn missing(kind: InconsistencyKind, schema: &str, table: &str, column: Option<&str>) -> String {
    match kind {
        InconsistencyKind::UnknownSchema => format!("unknown schema {schema:?}"),
        InconsistencyKind::UnknownTable => format!("unknown table {table:?} in schema {schema:?}"),
        _ => format!(
            "unknown column {:?} in table {schema}.{table}",
            column.unwrap_or_default()
        ),
    }
}

fn push_unique(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|existing| existing == name) {
        names.push(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RawEnumValue;

    fn table(schema: &str, name: &str) -> RawTable {
        RawTable {
            schema: schema.to_string(),
            name: name.to_string(),
        }
    }

    fn column(schema: &str, table: &str, name: &str, db_type: &str, nullable: bool) -> RawColumn {
        RawColumn {
            schema: schema.to_string(),
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

    fn schemas() -> Vec<String> {
        vec!["public".to_string()]
    }

    #[test]
    fn columns_keep_query_order_and_mapped_types() {
        let catalog = RawCatalog {
            tables: vec![table("public", "users")],
            columns: vec![
                column("public", "users", "id", "int4", false),
                column("public", "users", "nickname", "text", true),
                column("public", "users", "age", "int4", true),
            ],
            ..RawCatalog::default()
        };
        let mut types = TypeMapping::empty();
        types.plain.insert("int4".to_string(), "i32".to_string());
        types
            .nullable
            .insert("int4".to_string(), "Option<i32>".to_string());

        let schemas = schemas();
        let filter = TableFilter::All;
        let (db, report) = ModelBuilder::new(&schemas, &filter)
            .with_types(&types)
            .build(catalog)
            .unwrap();

        assert!(report.inconsistencies.is_empty());
        let users = db.find_table("public", "users").unwrap();
        let cols: Vec<_> = db.columns_of(&users.columns).collect();
        assert_eq!(
            cols.iter().map(|c| c.db_name.as_str()).collect::<Vec<_>>(),
            vec!["id", "nickname", "age"]
        );
        assert_eq!(cols[0].type_name, "i32");
        assert_eq!(cols[1].type_name, "text");
        assert_eq!(cols[2].type_name, "Option<i32>");
        assert_eq!(cols[2].db_type, "int4");
    }

    #[test]
    fn column_for_unknown_table_is_skipped() {
        let catalog = RawCatalog {
            tables: vec![table("public", "users"), table("audit", "events")],
            columns: vec![
                column("public", "users", "id", "int4", false),
                column("public", "ghost", "id", "int4", false),
                column("public", "users", "id", "int4", false),
            ],
            ..RawCatalog::default()
        };
        let schemas = schemas();
        let filter = TableFilter::All;
        let (db, report) = ModelBuilder::new(&schemas, &filter).build(catalog).unwrap();

        assert_eq!(db.tables().len(), 1);
        assert_eq!(db.find_table("public", "users").unwrap().columns.len(), 1);
        assert_eq!(report.count(InconsistencyKind::UnknownSchema), 1);
        assert_eq!(report.count(InconsistencyKind::UnknownTable), 1);
        assert_eq!(report.count(InconsistencyKind::DuplicateColumn), 1);
    }

    #[test]
    fn enums_attach_to_schema_and_table() {
        let catalog = RawCatalog {
            tables: vec![table("public", "orders")],
            columns: vec![column("public", "orders", "state", "orders_state", false)],
            enums: vec![
                RawEnum {
                    schema: "public".to_string(),
                    table: None,
                    name: "mood".to_string(),
                    values: vec![
                        RawEnumValue {
                            label: "sad".to_string(),
                            value: 1,
                        },
                        RawEnumValue {
                            label: "happy".to_string(),
                            value: 2,
                        },
                    ],
                },
                RawEnum {
                    schema: "public".to_string(),
                    table: Some("orders".to_string()),
                    name: "orders_state".to_string(),
                    values: vec![RawEnumValue {
                        label: "open".to_string(),
                        value: 1,
                    }],
                },
                RawEnum {
                    schema: "public".to_string(),
                    table: Some("missing".to_string()),
                    name: "missing_state".to_string(),
                    values: Vec::new(),
                },
            ],
            ..RawCatalog::default()
        };
        let schemas = schemas();
        let filter = TableFilter::All;
        let (db, report) = ModelBuilder::new(&schemas, &filter).build(catalog).unwrap();

        let public = db.schema_by_name("public").unwrap();
        let enums: Vec<_> = db.enums_of(&public.enums).collect();
        assert_eq!(enums.len(), 2);
        assert_eq!(enums[0].db_name, "mood");
        assert_eq!(
            enums[0]
                .values
                .iter()
                .map(|v| (v.db_name.as_str(), v.value))
                .collect::<Vec<_>>(),
            vec![("sad", 1), ("happy", 2)]
        );
        let orders = db.find_table("public", "orders").unwrap();
        assert_eq!(orders.enums, vec![enums[1].id]);
        assert_eq!(enums[1].table, Some(orders.id));
        assert_eq!(report.count(InconsistencyKind::UnknownTable), 1);
    }

    #[test]
    fn index_rows_with_same_name_are_merged() {
        let catalog = RawCatalog {
            tables: vec![table("public", "users")],
            columns: vec![
                column("public", "users", "last", "text", false),
                column("public", "users", "first", "text", false),
            ],
            indexes: vec![
                RawIndex {
                    schema: "public".to_string(),
                    table: "users".to_string(),
                    name: "users_name_idx".to_string(),
                    columns: vec!["first".to_string()],
                },
                RawIndex {
                    schema: "public".to_string(),
                    table: "users".to_string(),
                    name: "users_name_idx".to_string(),
                    columns: vec!["last".to_string()],
                },
            ],
            ..RawCatalog::default()
        };
        let schemas = schemas();
        let filter = TableFilter::All;
        let (db, _) = ModelBuilder::new(&schemas, &filter).build(catalog).unwrap();

        let users = db.find_table("public", "users").unwrap();
        assert_eq!(users.indexes.len(), 1);
        let names: Vec<_> = db
            .columns_of(&users.indexes[0].columns)
            .map(|c| c.db_name.as_str())
            .collect();
        assert_eq!(names, vec!["first", "last"]);
    }

    #[test]
    fn duplicate_schema_is_rejected() {
        let schemas = vec!["public".to_string(), "public".to_string()];
        let filter = TableFilter::All;
        let err = ModelBuilder::new(&schemas, &filter)
            .build(RawCatalog::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
