//! Migration executor.
//!
//! This module decides which migrations to apply or revert and runs them
//! against the database, keeping the ledger in step.

use sqlx::AnyConnection;
use sqlx::Connection;
use tracing::{debug, info, warn};

use crate::config::{validate_table_name, Config};
use crate::dialect::dialect_for_url;
use crate::error::{MigrateError, Result};
use crate::ledger::Ledger;
use crate::migration::{FunctionScript, Migration, MigrationStatus};
use crate::store::ScriptStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

/// Executes migrations against a database.
///
/// Owns the single connection used for the whole run; call
/// [`MigrationExecutor::close`] when done.
pub struct MigrationExecutor {
    conn: AnyConnection,
    store: ScriptStore,
    ledger: Ledger,
    dry_run: bool,
    transactional: bool,
}

impl MigrationExecutor {
    /// Creates a new migration executor.
    pub fn new(conn: AnyConnection, store: ScriptStore, ledger: Ledger) -> Self {
        Self {
            conn,
            store,
            ledger,
            dry_run: false,
            transactional: true,
        }
    }

    /// Opens the connection described by `config` and builds an executor on it.
    pub async fn connect(config: &Config, store: ScriptStore) -> Result<Self> {
        validate_table_name(&config.migration_table_name)?;
        let url = config.connection_url()?;
        let dialect = dialect_for_url(&url)?;
        info!(
            dialect = dialect.name(),
            table = %config.migration_table_name,
            "Connecting to database"
        );

        sqlx::any::install_default_drivers();
        let conn = AnyConnection::connect(&url)
            .await
            .map_err(MigrateError::Connection)?;

        let ledger = Ledger::new(config.migration_table_name.clone(), dialect);
        Ok(Self::new(conn, store, ledger).transactional(config.transactional))
    }

    /// Enables dry-run mode (SQL is printed but not executed).
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Runs each migration and its ledger write in one transaction.
    #[must_use]
    pub fn transactional(mut self, enabled: bool) -> Self {
        self.transactional = enabled;
        self
    }

    /// Returns the ledger.
    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Returns the script store.
    #[must_use]
    pub fn store(&self) -> &ScriptStore {
        &self.store
    }

    /// Ensures the changelog table exists.
    pub async fn init(&mut self) -> Result<()> {
        self.ledger.ensure_table(&mut self.conn).await
    }

    /// Sets `is_applied` on every migration from the ledger.
    pub async fn compute_status(
        &mut self,
        mut migrations: Vec<Migration>,
    ) -> Result<Vec<Migration>> {
        for migration in &mut migrations {
            migration.is_applied = self
                .ledger
                .is_applied(&mut self.conn, migration.timestamp)
                .await?;
        }
        Ok(migrations)
    }

    /// Reads all migrations ascending by timestamp, with their status.
    pub async fn load(&mut self) -> Result<Vec<Migration>> {
        let migrations = self.store.list()?;
        self.compute_status(migrations).await
    }

    /// Applies pending migrations in ascending order.
    ///
    /// `limit == 0` applies every pending migration, otherwise at most
    /// `limit` of them. Returns the migrations applied.
    pub async fn up(&mut self, limit: usize) -> Result<Vec<Migration>> {
        self.init().await?;

        let mut applied = Vec::new();
        for mut migration in self.load().await? {
            if migration.is_applied {
                continue;
            }
            if limit > 0 && applied.len() >= limit {
                break;
            }

            self.apply(&migration).await?;
            migration.is_applied = !self.dry_run;
            applied.push(migration);
        }

        if applied.is_empty() {
            info!("No pending migrations");
        } else {
            info!(count = applied.len(), "Applied migrations");
        }
        Ok(applied)
    }

    /// Reverts applied migrations in descending order.
    ///
    /// Reverts at most `limit` migrations; `limit == 0` reverts nothing.
    /// Returns the migrations reverted.
    pub async fn down(&mut self, limit: usize) -> Result<Vec<Migration>> {
        self.init().await?;

        let mut reverted = Vec::new();
        if limit == 0 {
            info!("No revert count given, nothing to revert");
            return Ok(reverted);
        }

        for mut migration in self.load().await?.into_iter().rev() {
            if !migration.is_applied {
                continue;
            }
            if reverted.len() >= limit {
                break;
            }

            self.revert(&migration).await?;
            migration.is_applied = self.dry_run;
            reverted.push(migration);
        }

        if reverted.is_empty() {
            info!("No applied migrations to revert");
        } else {
            info!(count = reverted.len(), "Reverted migrations");
        }
        Ok(reverted)
    }

    /// Reports every migration as applied or pending, ascending.
    pub async fn status(&mut self) -> Result<Vec<MigrationStatus>> {
        self.init().await?;
        let migrations = self.load().await?;

        for entry in self.ledger.applied(&mut self.conn).await? {
            if !migrations.iter().any(|m| m.timestamp == entry.timestamp) {
                warn!(
                    timestamp = entry.timestamp,
                    description = %entry.description,
                    "Ledger entry has no script file"
                );
            }
        }

        Ok(migrations.iter().map(MigrationStatus::from).collect())
    }

    /// Runs every function script, latest timestamp first.
    ///
    /// Function scripts are not recorded in the ledger.
    pub async fn run_functions(&mut self) -> Result<Vec<FunctionScript>> {
        let mut functions = self.store.functions()?;
        functions.reverse();

        for function in &functions {
            info!(
                timestamp = function.timestamp,
                description = %function.description,
                "Running function script"
            );
            if self.dry_run {
                print_script(function.timestamp, &function.description, &function.script);
                continue;
            }
            execute_script(
                &mut self.conn,
                function.timestamp,
                &function.description,
                &function.script,
            )
            .await?;
        }

        Ok(functions)
    }

    /// Applies a single migration: runs its do-script, then records it.
    pub async fn apply(&mut self, migration: &Migration) -> Result<()> {
        info!(
            timestamp = migration.timestamp,
            description = %migration.description,
            "Applying migration"
        );
        self.run(migration, Direction::Up).await?;
        info!(timestamp = migration.timestamp, "Migration applied successfully");
        Ok(())
    }

    /// Reverts a single migration: runs its undo-script, then removes its record.
    pub async fn revert(&mut self, migration: &Migration) -> Result<()> {
        info!(
            timestamp = migration.timestamp,
            description = %migration.description,
            "Reverting migration"
        );
        self.run(migration, Direction::Down).await?;
        info!(timestamp = migration.timestamp, "Migration reverted successfully");
        Ok(())
    }

    /// Closes the connection.
    pub async fn close(self) -> Result<()> {
        self.conn.close().await.map_err(MigrateError::Connection)
    }

    async fn run(&mut self, migration: &Migration, direction: Direction) -> Result<()> {
        let script = match direction {
            Direction::Up => &migration.do_script,
            Direction::Down => &migration.undo_script,
        };

        if self.dry_run {
            print_script(migration.timestamp, &migration.description, script);
            return Ok(());
        }

        if self.transactional {
            let mut tx = self.conn.begin().await.map_err(MigrateError::Connection)?;
            execute_script(&mut tx, migration.timestamp, &migration.description, script).await?;
            record(&self.ledger, &mut tx, migration, direction).await?;
            tx.commit().await.map_err(MigrateError::Persistence)?;
        } else {
            execute_script(
                &mut self.conn,
                migration.timestamp,
                &migration.description,
                script,
            )
            .await?;
            record(&self.ledger, &mut self.conn, migration, direction).await?;
        }
        Ok(())
    }
}

async fn record(
    ledger: &Ledger,
    conn: &mut AnyConnection,
    migration: &Migration,
    direction: Direction,
) -> Result<()> {
    match direction {
        Direction::Up => {
            ledger
                .record_applied(conn, migration.timestamp, &migration.description)
                .await
        }
        Direction::Down => ledger.record_reverted(conn, migration.timestamp).await,
    }
}

/// Sends `script` as one batch over the simple query protocol, so it may
/// hold several statements.
async fn execute_script(
    conn: &mut AnyConnection,
    timestamp: i64,
    description: &str,
    script: &str,
) -> Result<()> {
    if is_blank(script) {
        debug!(timestamp, "Script has no statements, skipping");
        return Ok(());
    }

    debug!(timestamp, sql = %script, "Executing SQL");
    sqlx::raw_sql(script)
        .execute(&mut *conn)
        .await
        .map_err(|source| MigrateError::Execution {
            timestamp,
            description: description.to_string(),
            source,
        })?;
    Ok(())
}

/// True when every line is empty or a `--` comment.
fn is_blank(script: &str) -> bool {
    script.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with("--")
    })
}

fn print_script(timestamp: i64, description: &str, script: &str) {
    println!("-- {} {}", timestamp, description);
    println!("{}", script.trim_end());
}
