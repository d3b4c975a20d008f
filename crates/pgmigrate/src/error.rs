//! Error types for the migration runner.

use std::path::PathBuf;

/// Errors that can occur while loading, applying or reverting migrations.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Missing, malformed or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem access failed.
    #[error("IO error at '{path}': {source}")]
    Io {
        /// Path that was being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A script file name does not encode a timestamp.
    #[error("Invalid script file name '{filename}': {reason}")]
    InvalidFilename {
        /// The offending file name.
        filename: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The database could not be reached.
    #[error("Connection error: {0}")]
    Connection(#[source] sqlx::Error),

    /// A migration or function script failed to execute.
    #[error("Script {timestamp} '{description}' failed: {source}")]
    Execution {
        /// Timestamp of the failing script.
        timestamp: i64,
        /// Description of the failing script.
        description: String,
        /// Underlying database error.
        #[source]
        source: sqlx::Error,
    },

    /// Reading or writing the ledger table failed.
    #[error("Ledger error: {0}")]
    Persistence(#[source] sqlx::Error),

    /// The path handed to `init` is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The path handed to `init` already has content.
    #[error("Directory is not empty: {0}")]
    DirectoryNotEmpty(PathBuf),

    /// A script file with the same name already exists.
    #[error("Script file already exists: {0}")]
    ScriptExists(PathBuf),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MigrateError {
    /// Wraps an IO error with the path it occurred on.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
