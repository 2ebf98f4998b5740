use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::debug;

use relgen_core::{Error, RawCatalog, Result, TableFilter};

use crate::adapter::Adapter;

mod mapper;
mod queries;

/// Adapter for PostgreSQL databases.
#[derive(Debug, Clone)]
pub struct PostgresAdapter {
    pool: PgPool,
}

impl PostgresAdapter {
    /// Create a new adapter using a pre-configured pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with a single-connection pool; queries run one after another.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await
            .map_err(|err| Error::Connect(err.to_string()))?;
        Ok(Self::new(pool))
    }
}

#[async_trait::async_trait]
impl Adapter for PostgresAdapter {
    fn engine(&self) -> &'static str {
        "postgres"
    }

    async fn fetch_catalog(&self, schemas: &[String], filter: &TableFilter) -> Result<RawCatalog> {
        fetch_catalog(&self.pool, schemas, filter).await
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Read the catalog of `schemas` from a Postgres database.
pub async fn fetch_catalog(
    pool: &PgPool,
    schemas: &[String],
    filter: &TableFilter,
) -> Result<RawCatalog> {
    let tables = mapper::map_tables(queries::list_tables(pool, schemas).await?, filter);
    debug!(event = "tables_fetched", count = tables.len());

    let columns = mapper::map_columns(queries::list_columns(pool, schemas).await?, filter);
    debug!(event = "columns_fetched", count = columns.len());

    let primary_keys =
        mapper::map_primary_keys(queries::list_primary_keys(pool, schemas).await?, filter);
    let foreign_keys =
        mapper::map_foreign_keys(queries::list_foreign_keys(pool, schemas).await?, filter);
    debug!(
        event = "keys_fetched",
        primary_keys = primary_keys.len(),
        foreign_keys = foreign_keys.len()
    );

    let enums = mapper::map_enums(queries::list_enum_values(pool, schemas).await?);
    debug!(event = "enums_fetched", count = enums.len());

    let indexes = mapper::map_indexes(queries::list_indexes(pool, schemas).await?, filter);
    debug!(event = "indexes_fetched", count = indexes.len());

    Ok(RawCatalog {
        tables,
        columns,
        primary_keys,
        foreign_keys,
        indexes,
        enums,
    })
}
