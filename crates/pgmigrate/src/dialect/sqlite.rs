//! SQLite dialect for the ledger table.
//!
//! Used for local runs against a file database and for the in-memory test
//! suite.

use super::LedgerDialect;

/// SQLite ledger dialect.
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl LedgerDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn surrogate_key_definition(&self) -> &'static str {
        "INTEGER PRIMARY KEY AUTOINCREMENT"
    }
}
