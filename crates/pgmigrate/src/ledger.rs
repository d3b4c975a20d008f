//! Migration ledger.
//!
//! This module manages the changelog table that records which migrations
//! have been applied. A row exists for a timestamp exactly when that
//! migration is applied.
//!
//! Every operation takes the connection to run on, so the executor can hand
//! in an open transaction and keep a script and its ledger write together.

use sqlx::AnyConnection;

use crate::dialect::LedgerDialect;
use crate::error::{MigrateError, Result};

/// Width of the `description` column.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// A record of an applied migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Timestamp of the applied migration.
    pub timestamp: i64,
    /// Description recorded when it was applied.
    pub description: String,
}

/// Manages the changelog table.
pub struct Ledger {
    table: String,
    dialect: Box<dyn LedgerDialect>,
}

impl Ledger {
    /// Creates a ledger over `table`, spelled in `dialect`.
    ///
    /// The table name is interpolated into SQL and must already be validated
    /// (see [`crate::config::validate_table_name`]).
    pub fn new(table: impl Into<String>, dialect: Box<dyn LedgerDialect>) -> Self {
        Self {
            table: table.into(),
            dialect,
        }
    }

    /// Returns the changelog table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the dialect.
    #[must_use]
    pub fn dialect(&self) -> &dyn LedgerDialect {
        self.dialect.as_ref()
    }

    /// Ensures the changelog table exists.
    pub async fn ensure_table(&self, conn: &mut AnyConnection) -> Result<()> {
        let sql = self.dialect.create_table_sql(&self.table);
        sqlx::query(&sql)
            .execute(&mut *conn)
            .await
            .map_err(MigrateError::Persistence)?;
        Ok(())
    }

    /// Checks if the migration with `timestamp` has been applied.
    pub async fn is_applied(&self, conn: &mut AnyConnection, timestamp: i64) -> Result<bool> {
        let sql = self.dialect.count_sql(&self.table);
        let (count,): (i64,) = sqlx::query_as(&sql)
            .bind(timestamp)
            .fetch_one(&mut *conn)
            .await
            .map_err(MigrateError::Persistence)?;

        Ok(count > 0)
    }

    /// Records a migration as applied.
    pub async fn record_applied(
        &self,
        conn: &mut AnyConnection,
        timestamp: i64,
        description: &str,
    ) -> Result<()> {
        let sql = self.dialect.insert_sql(&self.table);
        let description: String = description.chars().take(MAX_DESCRIPTION_LEN).collect();
        sqlx::query(&sql)
            .bind(timestamp)
            .bind(description)
            .execute(&mut *conn)
            .await
            .map_err(MigrateError::Persistence)?;
        Ok(())
    }

    /// Removes the record of a migration (for revert).
    pub async fn record_reverted(&self, conn: &mut AnyConnection, timestamp: i64) -> Result<()> {
        let sql = self.dialect.delete_sql(&self.table);
        sqlx::query(&sql)
            .bind(timestamp)
            .execute(&mut *conn)
            .await
            .map_err(MigrateError::Persistence)?;
        Ok(())
    }

    /// Gets all ledger entries, ordered by timestamp.
    pub async fn applied(&self, conn: &mut AnyConnection) -> Result<Vec<LedgerEntry>> {
        let sql = self.dialect.select_all_sql(&self.table);
        let rows: Vec<(i64, Option<String>)> = sqlx::query_as(&sql)
            .fetch_all(&mut *conn)
            .await
            .map_err(MigrateError::Persistence)?;

        Ok(rows
            .into_iter()
            .map(|(timestamp, description)| LedgerEntry {
                timestamp,
                description: description.unwrap_or_default(),
            })
            .collect())
    }
}
