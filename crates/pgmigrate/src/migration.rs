//! Migration and function script records.

use std::fmt;

/// A migration read from a script file.
///
/// Identity is the timestamp. `is_applied` is not stored in the file; it is
/// filled in from the ledger on every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    /// Human-readable description, reconstructed from the file name.
    pub description: String,
    /// Unique timestamp taken from the file name.
    pub timestamp: i64,
    /// SQL run when applying, including the `-- @DO` marker line.
    pub do_script: String,
    /// SQL run when reverting, including the `-- @UNDO` marker line.
    pub undo_script: String,
    /// Whether the ledger holds an entry for this timestamp.
    pub is_applied: bool,
}

impl Migration {
    /// Creates a migration that has not been checked against the ledger yet.
    #[must_use]
    pub fn new(
        timestamp: i64,
        description: impl Into<String>,
        do_script: impl Into<String>,
        undo_script: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            timestamp,
            do_script: do_script.into(),
            undo_script: undo_script.into(),
            is_applied: false,
        }
    }

    /// Returns the status label for this migration.
    #[must_use]
    pub fn state(&self) -> MigrationState {
        if self.is_applied {
            MigrationState::Applied
        } else {
            MigrationState::Pending
        }
    }
}

/// A re-runnable script kept under `scripts/functions/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionScript {
    /// Human-readable description, reconstructed from the file name.
    pub description: String,
    /// Timestamp taken from the file name.
    pub timestamp: i64,
    /// Whole file body.
    pub script: String,
}

/// Where a migration stands relative to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    Applied,
    Pending,
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => f.write_str("Applied"),
            Self::Pending => f.write_str("Pending"),
        }
    }
}

/// One row of the `status` report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub timestamp: i64,
    pub description: String,
    pub state: MigrationState,
}

impl From<&Migration> for MigrationStatus {
    fn from(migration: &Migration) -> Self {
        Self {
            timestamp: migration.timestamp,
            description: migration.description.clone(),
            state: migration.state(),
        }
    }
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.timestamp, self.description, self.state)
    }
}
