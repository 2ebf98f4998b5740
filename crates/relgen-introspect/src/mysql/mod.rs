use std::time::Duration;

use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use tracing::debug;

use relgen_core::{Error, RawCatalog, Result, TableFilter};

use crate::adapter::Adapter;

mod mapper;
mod queries;

/// Adapter for MySQL and MariaDB databases.
///
/// MySQL has no named enum types; every `enum(...)` column becomes an enum
/// scoped to its table and named `{table}_{column}`.
#[derive(Debug, Clone)]
pub struct MysqlAdapter {
    pool: MySqlPool,
}

impl MysqlAdapter {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await
            .map_err(|err| Error::Connect(err.to_string()))?;
        Ok(Self::new(pool))
    }
}

#[async_trait::async_trait]
impl Adapter for MysqlAdapter {
    fn engine(&self) -> &'static str {
        "mysql"
    }

    async fn fetch_catalog(&self, schemas: &[String], filter: &TableFilter) -> Result<RawCatalog> {
        fetch_catalog(&self.pool, schemas, filter).await
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

pub async fn fetch_catalog(
    pool: &MySqlPool,
    schemas: &[String],
    filter: &TableFilter,
) -> Result<RawCatalog> {
    if schemas.is_empty() {
        return Ok(RawCatalog::default());
    }

    let tables = mapper::map_tables(queries::list_tables(pool, schemas).await?, filter);
    let (columns, enums) = mapper::map_columns(queries::list_columns(pool, schemas).await?, filter);
    debug!(
        event = "columns_fetched",
        tables = tables.len(),
        columns = columns.len(),
        enums = enums.len()
    );

    let primary_keys =
        mapper::map_primary_keys(queries::list_primary_keys(pool, schemas).await?, filter);
    let foreign_keys =
        mapper::map_foreign_keys(queries::list_foreign_keys(pool, schemas).await?, filter);
    let indexes = mapper::map_indexes(queries::list_index_columns(pool, schemas).await?, filter);
    debug!(
        event = "keys_fetched",
        primary_keys = primary_keys.len(),
        foreign_keys = foreign_keys.len(),
        indexes = indexes.len()
    );

    Ok(RawCatalog {
        tables,
        columns,
        primary_keys,
        foreign_keys,
        indexes,
        enums,
    })
}
