use sqlx::MySqlPool;
use sqlx::mysql::MySqlRow;

use relgen_core::{Error, Result};

fn db_error(err: sqlx::Error) -> Error {
    Error::Db(err.to_string())
}

/// `?, ?, ?` for an `in (...)` list of `count` schemas.
fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

async fn fetch_in_schemas<T>(pool: &MySqlPool, template: &str, schemas: &[String]) -> Result<Vec<T>>
where
    T: for<'r> sqlx::FromRow<'r, MySqlRow> + Send + Unpin,
{
    let sql = template.replace("{schemas}", &placeholders(schemas.len()));
    let mut query = sqlx::query_as::<_, T>(&sql);
    for schema in schemas {
        query = query.bind(schema);
    }
    query.fetch_all(pool).await.map_err(db_error)
}

#[derive(Debug, sqlx::FromRow)]
pub struct TableRow {
    pub schema_name: String,
    pub table_name: String,
}

pub async fn list_tables(pool: &MySqlPool, schemas: &[String]) -> Result<Vec<TableRow>> {
    fetch_in_schemas(
        pool,
        r#"
        select
          cast(table_schema as char) as schema_name,
          cast(table_name as char) as table_name
        from information_schema.tables
        where table_schema in ({schemas})
        order by table_schema, table_name
        "#,
        schemas,
    )
    .await
}

#[derive(Debug, sqlx::FromRow)]
pub struct ColumnRow {
    pub schema_name: String,
    pub table_name: String,
    pub column_name: String,
    pub data_type: String,
    pub column_type: String,
    pub is_nullable: String,
    pub column_default: Option<String>,
    pub character_maximum_length: Option<i64>,
}

pub async fn list_columns(pool: &MySqlPool, schemas: &[String]) -> Result<Vec<ColumnRow>> {
    fetch_in_schemas(
        pool,
        r#"
        select
          cast(table_schema as char) as schema_name,
          cast(table_name as char) as table_name,
          cast(column_name as char) as column_name,
          cast(data_type as char) as data_type,
          cast(column_type as char) as column_type,
          cast(is_nullable as char) as is_nullable,
          cast(column_default as char) as column_default,
          cast(character_maximum_length as signed) as character_maximum_length
        from information_schema.columns
        where table_schema in ({schemas})
        order by table_schema, table_name, ordinal_position
        "#,
        schemas,
    )
    .await
}

#[derive(Debug, sqlx::FromRow)]
pub struct PrimaryKeyRow {
    pub schema_name: String,
    pub table_name: String,
    pub column_name: String,
    pub constraint_name: String,
}

pub async fn list_primary_keys(pool: &MySqlPool, schemas: &[String]) -> Result<Vec<PrimaryKeyRow>> {
    fetch_in_schemas(
        pool,
        r#"
        select
          cast(table_schema as char) as schema_name,
          cast(table_name as char) as table_name,
          cast(column_name as char) as column_name,
          cast(constraint_name as char) as constraint_name
        from information_schema.key_column_usage
        where constraint_name = 'PRIMARY'
          and table_schema in ({schemas})
        order by table_schema, table_name, ordinal_position
        "#,
        schemas,
    )
    .await
}

#[derive(Debug, sqlx::FromRow)]
pub struct ForeignKeyRow {
    pub schema_name: String,
    pub table_name: String,
    pub column_name: String,
    pub constraint_name: String,
    pub unique_position: i64,
    pub foreign_schema_name: String,
    pub foreign_table_name: String,
    pub foreign_column_name: String,
}

pub async fn list_foreign_keys(pool: &MySqlPool, schemas: &[String]) -> Result<Vec<ForeignKeyRow>> {
    fetch_in_schemas(
        pool,
        r#"
        select
          cast(table_schema as char) as schema_name,
          cast(table_name as char) as table_name,
          cast(column_name as char) as column_name,
          cast(constraint_name as char) as constraint_name,
          cast(coalesce(position_in_unique_constraint, 0) as signed) as unique_position,
          cast(referenced_table_schema as char) as foreign_schema_name,
          cast(referenced_table_name as char) as foreign_table_name,
          cast(referenced_column_name as char) as foreign_column_name
        from information_schema.key_column_usage
        where referenced_table_name is not null
          and table_schema in ({schemas})
        order by table_schema, table_name, constraint_name, ordinal_position
        "#,
        schemas,
    )
    .await
}

/// One row per indexed column. Functional key parts have no column name.
#[derive(Debug, sqlx::FromRow)]
pub struct IndexColumnRow {
    pub schema_name: String,
    pub table_name: String,
    pub index_name: String,
    pub column_name: Option<String>,
}

pub async fn list_index_columns(
    pool: &MySqlPool,
    schemas: &[String],
) -> Result<Vec<IndexColumnRow>> {
    fetch_in_schemas(
        pool,
        r#"
        select
          cast(table_schema as char) as schema_name,
          cast(table_name as char) as table_name,
          cast(index_name as char) as index_name,
          cast(column_name as char) as column_name
        from information_schema.statistics
        where table_schema in ({schemas})
        order by table_schema, table_name, index_name, seq_in_index
        "#,
        schemas,
    )
    .await
}
