//! Core contracts and model types for relgen.
//!
//! This crate defines the raw catalog rows produced by adapters, the
//! normalized relational model they are folded into, and the run
//! configuration shared with the template layer.

pub mod build;
pub mod catalog;
pub mod config;
pub mod env;
pub mod error;
pub mod filter;
pub mod model;
pub mod naming;
pub mod redaction;
pub mod validation;

pub use build::{BuildReport, Inconsistency, InconsistencyKind, ModelBuilder};
pub use catalog::{
    RawCatalog, RawColumn, RawEnum, RawEnumValue, RawForeignKey, RawIndex, RawPrimaryKey,
    RawTable,
};
pub use config::{ConfigData, TypeMapping};
pub use env::expand_env;
pub use error::{Error, Result};
pub use filter::TableFilter;
pub use model::{
    Column, ColumnId, Database, Enum, EnumId, EnumValue, ForeignColumn, ForeignColumnId,
    ForeignTable, Index, Named, Schema, SchemaId, Table, TableId, db_names, names,
};
pub use naming::{IdentityNames, NameConverter};
pub use redaction::redact_connection_string;
pub use validation::validate_model;
