//! Database dialect implementations.
//!
//! Each dialect knows how to spell the ledger table statements for its
//! database. Migration and function scripts are user-written SQL and are sent
//! to the database untouched.

mod postgres;
mod sqlite;

pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use url::Url;

use crate::error::{MigrateError, Result};

/// Trait for database-specific ledger SQL.
pub trait LedgerDialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Returns the bind placeholder for the 1-based parameter `index`.
    fn placeholder(&self, index: usize) -> String;

    /// Returns the column definition of the surrogate key.
    fn surrogate_key_definition(&self) -> &'static str;

    /// Quote an identifier, keeping a schema qualifier as a separate part.
    fn quote_identifier(&self, name: &str) -> String {
        name.split('.')
            .map(|part| format!("\"{}\"", part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Generates `CREATE TABLE IF NOT EXISTS` for the ledger table.
    fn create_table_sql(&self, table: &str) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (id {}, \"timestamp\" NUMERIC NOT NULL, description VARCHAR(500))",
            self.quote_identifier(table),
            self.surrogate_key_definition()
        )
    }

    /// Generates the applied-check, binding the timestamp.
    fn count_sql(&self, table: &str) -> String {
        format!(
            "SELECT COUNT(*) FROM {} WHERE \"timestamp\" = {}",
            self.quote_identifier(table),
            self.placeholder(1)
        )
    }

    /// Generates the ledger insert, binding timestamp then description.
    fn insert_sql(&self, table: &str) -> String {
        format!(
            "INSERT INTO {} (\"timestamp\", description) VALUES ({}, {})",
            self.quote_identifier(table),
            self.placeholder(1),
            self.placeholder(2)
        )
    }

    /// Generates the ledger delete, binding the timestamp.
    fn delete_sql(&self, table: &str) -> String {
        format!(
            "DELETE FROM {} WHERE \"timestamp\" = {}",
            self.quote_identifier(table),
            self.placeholder(1)
        )
    }

    /// Generates a listing of every ledger entry ordered by timestamp.
    fn select_all_sql(&self, table: &str) -> String {
        format!(
            "SELECT CAST(\"timestamp\" AS BIGINT), description FROM {} ORDER BY \"timestamp\"",
            self.quote_identifier(table)
        )
    }
}

/// Picks the dialect matching a connection URL's scheme.
///
/// # Errors
///
/// Returns [`MigrateError::Config`] when `url` does not parse or its scheme
/// is not `postgres`, `postgresql` or `sqlite`.
pub fn dialect_for_url(url: &str) -> Result<Box<dyn LedgerDialect>> {
    let parsed = Url::parse(url)
        .map_err(|e| MigrateError::Config(format!("invalid database URL: {}", e)))?;
    match parsed.scheme() {
        "postgres" | "postgresql" => Ok(Box::new(PostgresDialect::new())),
        "sqlite" => Ok(Box::new(SqliteDialect::new())),
        _ => Err(MigrateError::Config(format!(
            "unsupported database URL scheme '{}'",
            parsed.scheme()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_for_url() {
        assert_eq!(
            dialect_for_url("postgres://u:p@localhost/db").unwrap().name(),
            "postgres"
        );
        assert_eq!(
            dialect_for_url("postgresql://localhost/db").unwrap().name(),
            "postgres"
        );
        assert_eq!(dialect_for_url("sqlite::memory:").unwrap().name(), "sqlite");
        assert_eq!(
            dialect_for_url("sqlite:///tmp/ledger.db?mode=rwc").unwrap().name(),
            "sqlite"
        );
        assert!(matches!(
            dialect_for_url("mysql://localhost/db"),
            Err(MigrateError::Config(_))
        ));
    }

    #[test]
    fn test_dialect_for_unparseable_url() {
        assert!(matches!(
            dialect_for_url("localhost/db"),
            Err(MigrateError::Config(_))
        ));
    }

    #[test]
    fn test_quote_schema_qualified() {
        let dialect = PostgresDialect::new();
        assert_eq!(
            dialect.quote_identifier("audit.changelog"),
            "\"audit\".\"changelog\""
        );
    }
}
