use async_trait::async_trait;
use tracing::info;

use relgen_core::{
    BuildReport, Database, ModelBuilder, NameConverter, RawCatalog, Result, TableFilter,
    TypeMapping, validate_model,
};

/// Trait implemented by database adapters that can read catalog rows.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Returns the engine identifier (e.g. `postgres`).
    fn engine(&self) -> &'static str;

    /// Read tables, columns, keys, indexes and enums of `schemas`.
    ///
    /// Rows belonging to tables rejected by `filter` are not returned.
    async fn fetch_catalog(&self, schemas: &[String], filter: &TableFilter) -> Result<RawCatalog>;

    /// Release the underlying connection.
    async fn close(&self);
}

/// Fetch the catalog through `adapter` and fold it into a validated model.
pub async fn parse(
    adapter: &dyn Adapter,
    schemas: &[String],
    filter: &TableFilter,
    names: &dyn NameConverter,
    types: &TypeMapping,
) -> Result<(Database, BuildReport)> {
    let catalog = adapter.fetch_catalog(schemas, filter).await?;
    info!(
        event = "catalog_fetched",
        engine = adapter.engine(),
        tables = catalog.tables.len(),
        columns = catalog.columns.len(),
        primary_keys = catalog.primary_keys.len(),
        foreign_keys = catalog.foreign_keys.len(),
        indexes = catalog.indexes.len(),
        enums = catalog.enums.len(),
        "catalog fetched"
    );

    let (db, report) = ModelBuilder::new(schemas, filter)
        .with_names(names)
        .with_types(types)
        .build(catalog)?;
    validate_model(&db)?;
    Ok((db, report))
}
