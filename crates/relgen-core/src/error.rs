use thiserror::Error;

/// Core error type shared across relgen crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The database could not be reached or refused the credentials.
    #[error("connection error: {0}")]
    Connect(String),
    /// A catalog query or row decode failed.
    #[error("database error: {0}")]
    Db(String),
    /// The run configuration is contradictory or incomplete.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The built model violates internal invariants.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    /// A requested backend or feature is not supported.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Convenience alias for results returned by relgen crates.
pub type Result<T> = std::result::Result<T, Error>;
