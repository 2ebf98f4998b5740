//! Database introspection adapters.

pub mod adapter;
pub mod mysql;
pub mod options;
pub mod postgres;

pub use adapter::{Adapter, parse};
pub use mysql::MysqlAdapter;
pub use options::{Engine, connect};
pub use postgres::PostgresAdapter;

pub use relgen_core::{BuildReport, Database, RawCatalog};
