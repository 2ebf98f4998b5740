use sqlx::PgPool;

use relgen_core::{Error, Result};

fn db_error(err: sqlx::Error) -> Error {
    Error::Db(err.to_string())
}

#[derive(Debug, sqlx::FromRow)]
pub struct TableRow {
    pub schema_name: String,
    pub table_name: String,
}

pub async fn list_tables(pool: &PgPool, schemas: &[String]) -> Result<Vec<TableRow>> {
    sqlx::query_as::<_, TableRow>(
        r#"
        select
          table_schema::text as schema_name,
          table_name::text as table_name
        from information_schema.tables
        where table_schema = any($1)
        order by table_schema, table_name
        "#,
    )
    .bind(schemas)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

#[derive(Debug, sqlx::FromRow)]
pub struct ColumnRow {
    pub schema_name: String,
    pub table_name: String,
    pub column_name: String,
    pub data_type: String,
    pub udt_name: String,
    pub is_nullable: String,
    pub column_default: Option<String>,
    pub character_maximum_length: Option<i32>,
}

pub async fn list_columns(pool: &PgPool, schemas: &[String]) -> Result<Vec<ColumnRow>> {
    sqlx::query_as::<_, ColumnRow>(
        r#"
        select
          table_schema::text as schema_name,
          table_name::text as table_name,
          column_name::text as column_name,
          data_type::text as data_type,
          udt_name::text as udt_name,
          is_nullable::text as is_nullable,
          column_default::text as column_default,
          character_maximum_length::int4 as character_maximum_length
        from information_schema.columns
        where table_schema = any($1)
        order by table_schema, table_name, ordinal_position
        "#,
    )
    .bind(schemas)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

#[derive(Debug, sqlx::FromRow)]
pub struct PrimaryKeyRow {
    pub schema_name: String,
    pub table_name: String,
    pub column_name: String,
    pub constraint_name: String,
}

pub async fn list_primary_keys(pool: &PgPool, schemas: &[String]) -> Result<Vec<PrimaryKeyRow>> {
    sqlx::query_as::<_, PrimaryKeyRow>(
        r#"
        select
          k.table_schema::text as schema_name,
          k.table_name::text as table_name,
          k.column_name::text as column_name,
          k.constraint_name::text as constraint_name
        from information_schema.key_column_usage k
        join information_schema.table_constraints c
          on k.table_schema = c.table_schema
         and k.table_name = c.table_name
         and k.constraint_name = c.constraint_name
        where c.constraint_type = 'PRIMARY KEY'
          and k.table_schema = any($1)
        order by k.table_schema, k.table_name, k.ordinal_position
        "#,
    )
    .bind(schemas)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

#[derive(Debug, sqlx::FromRow)]
pub struct ForeignKeyRow {
    pub schema_name: String,
    pub table_name: String,
    pub column_name: String,
    pub constraint_name: String,
    pub unique_position: i32,
    pub foreign_schema_name: String,
    pub foreign_table_name: String,
    pub foreign_column_name: String,
}

/// One row per column pair of every foreign key declared in `schemas`.
///
/// Read from `pg_constraint` by owning relation, since constraint names are
/// only unique per table. `unique_position` is the pair's 1-based position
/// in the constraint.
pub async fn list_foreign_keys(pool: &PgPool, schemas: &[String]) -> Result<Vec<ForeignKeyRow>> {
    sqlx::query_as::<_, ForeignKeyRow>(
        r#"
        select
          src_nsp.nspname::text as schema_name,
          src_rel.relname::text as table_name,
          src_att.attname::text as column_name,
          con.conname::text as constraint_name,
          k.ordinality::int4 as unique_position,
          ref_nsp.nspname::text as foreign_schema_name,
          ref_rel.relname::text as foreign_table_name,
          ref_att.attname::text as foreign_column_name
        from pg_constraint con
        join pg_class src_rel on src_rel.oid = con.conrelid
        join pg_namespace src_nsp on src_nsp.oid = src_rel.relnamespace
        join pg_class ref_rel on ref_rel.oid = con.confrelid
        join pg_namespace ref_nsp on ref_nsp.oid = ref_rel.relnamespace
        join unnest(con.conkey, con.confkey) with ordinality as k(attnum, ref_attnum, ordinality) on true
        join pg_attribute src_att on src_att.attrelid = con.conrelid and src_att.attnum = k.attnum
        join pg_attribute ref_att on ref_att.attrelid = con.confrelid and ref_att.attnum = k.ref_attnum
        where con.contype = 'f'
          and src_nsp.nspname = any($1)
        order by src_nsp.nspname, src_rel.relname, con.conname, k.ordinality
        "#,
    )
    .bind(schemas)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

#[derive(Debug, sqlx::FromRow)]
pub struct IndexRow {
    pub schema_name: String,
    pub table_name: String,
    pub index_name: String,
    pub column_names: Vec<String>,
}

/// One row per index; key columns come back as `pg_get_indexdef` renders
/// them, so expression keys show up as expressions.
pub async fn list_indexes(pool: &PgPool, schemas: &[String]) -> Result<Vec<IndexRow>> {
    sqlx::query_as::<_, IndexRow>(
        r#"
        select
          n.nspname::text as schema_name,
          t.relname::text as table_name,
          c.relname::text as index_name,
          array(
            select pg_get_indexdef(i.indexrelid, k + 1, true)
            from generate_subscripts(i.indkey, 1) as k
            order by k
          )::text[] as column_names
        from pg_index i
        join pg_class c on c.oid = i.indexrelid
        join pg_class t on t.oid = i.indrelid
        join pg_namespace n on n.oid = t.relnamespace
        where n.nspname = any($1)
        order by n.nspname, t.relname, c.relname
        "#,
    )
    .bind(schemas)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

#[derive(Debug, sqlx::FromRow)]
pub struct EnumValueRow {
    pub schema_name: String,
    pub enum_name: String,
    pub label: String,
    pub value: i32,
}

/// Enum labels with their 1-based rank in sort order.
pub async fn list_enum_values(pool: &PgPool, schemas: &[String]) -> Result<Vec<EnumValueRow>> {
    sqlx::query_as::<_, EnumValueRow>(
        r#"
        select
          n.nspname::text as schema_name,
          t.typname::text as enum_name,
          e.enumlabel::text as label,
          (row_number() over (partition by t.oid order by e.enumsortorder))::int4 as value
        from pg_type t
        join pg_namespace n on n.oid = t.typnamespace
        join pg_enum e on e.enumtypid = t.oid
        where n.nspname = any($1)
        order by n.nspname, t.typname, e.enumsortorder
        "#,
    )
    .bind(schemas)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}
