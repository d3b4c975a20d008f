//! Timestamp-ordered SQL migrations for PostgreSQL.
//!
//! `pgmigrate` keeps a changelog table recording which migration scripts have
//! been applied, applies pending ones in timestamp order and reverts applied
//! ones newest first.
//!
//! # Architecture
//!
//! - **Store** - Reads `scripts/<timestamp>_<words>.sql` files and splits them
//!   into do/undo sections
//! - **Ledger** - The changelog table: one row per applied migration
//! - **Executor** - Computes applied/pending status and runs `up`, `down`,
//!   `status` and function scripts
//! - **Dialect** - Database-specific ledger SQL (PostgreSQL, SQLite)
//! - **Scaffold** - `init`, `new` and `function` file generation
//!
//! # Script format
//!
//! ```sql
//! -- add users table --
//! -- @DO sql script --
//! CREATE TABLE users (id SERIAL PRIMARY KEY, name TEXT NOT NULL);
//!
//! -- @UNDO sql script --
//! DROP TABLE users;
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use pgmigrate::prelude::*;
//!
//! let config = Config::from_project(".", None)?;
//! let mut executor = MigrationExecutor::connect(&config, ScriptStore::new(".")).await?;
//! executor.up(0).await?;
//! executor.close().await?;
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! pgmigrate init ./db
//! pgmigrate new add users table
//! pgmigrate up        # apply everything pending
//! pgmigrate up 2      # apply the next two
//! pgmigrate down 1    # revert the latest
//! pgmigrate status
//! ```

pub mod config;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod ledger;
pub mod migration;
pub mod scaffold;
pub mod store;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::dialect::{LedgerDialect, PostgresDialect, SqliteDialect};
    pub use crate::error::{MigrateError, Result};
    pub use crate::executor::MigrationExecutor;
    pub use crate::ledger::{Ledger, LedgerEntry};
    pub use crate::migration::{FunctionScript, Migration, MigrationState, MigrationStatus};
    pub use crate::store::ScriptStore;
}
