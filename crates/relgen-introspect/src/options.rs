use std::fmt;
use std::str::FromStr;

use tracing::info;

use relgen_core::{Error, Result, redact_connection_string};

use crate::adapter::Adapter;
use crate::mysql::MysqlAdapter;
use crate::postgres::PostgresAdapter;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Postgres,
    Mysql,
}

impl Engine {
    /// Infer the engine from a connection URL scheme.
    pub fn detect(conn_str: &str) -> Result<Self> {
        let scheme = conn_str
            .split_once("://")
            .map(|(scheme, _)| scheme)
            .ok_or_else(|| {
                Error::InvalidConfig(
                    "cannot detect db_type from conn_str; set db_type explicitly".to_string(),
                )
            })?;
        scheme.parse()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Engine::Postgres => "postgres",
            Engine::Mysql => "mysql",
        }
    }
}

impl FromStr for Engine {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Engine::Postgres),
            "mysql" | "mariadb" => Ok(Engine::Mysql),
            other => Err(Error::Unsupported(format!("database type {other:?}"))),
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Open an adapter for `engine`.
pub async fn connect(engine: Engine, conn_str: &str) -> Result<Box<dyn Adapter>> {
    info!(
        event = "connecting",
        engine = %engine,
        conn_str = %redact_connection_string(conn_str),
        "connecting to database"
    );
    match engine {
        Engine::Postgres => Ok(Box::new(PostgresAdapter::connect(conn_str).await?)),
        Engine::Mysql => Ok(Box::new(MysqlAdapter::connect(conn_str).await?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_engine_from_scheme() {
        assert_eq!(
            Engine::detect("postgres://u:p@localhost/app").unwrap(),
            Engine::Postgres
        );
        assert_eq!(
            Engine::detect("postgresql://localhost/app").unwrap(),
            Engine::Postgres
        );
        assert_eq!(
            Engine::detect("mysql://root@localhost/app").unwrap(),
            Engine::Mysql
        );
    }

    #[test]
    fn unknown_schemes_are_rejected() {
        assert!(matches!(
            Engine::detect("sqlite://app.db"),
            Err(Error::Unsupported(_))
        ));
        assert!(matches!(
            Engine::detect("host=localhost dbname=app"),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn parses_explicit_names() {
        assert_eq!("PG".parse::<Engine>().unwrap(), Engine::Postgres);
        assert_eq!("mariadb".parse::<Engine>().unwrap(), Engine::Mysql);
        assert_eq!(Engine::Mysql.to_string(), "mysql");
    }
}
