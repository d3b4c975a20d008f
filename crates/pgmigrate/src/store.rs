//! Script discovery and parsing.
//!
//! Migrations live in `<root>/scripts/` as `<timestamp>_<words>.sql` files,
//! each split into a do-section and an undo-section by marker lines:
//!
//! ```sql
//! -- @DO sql script --
//! CREATE TABLE users (id SERIAL PRIMARY KEY);
//! -- @UNDO sql script --
//! DROP TABLE users;
//! ```
//!
//! Function scripts live in `<root>/scripts/functions/` and are run whole.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::error::{MigrateError, Result};
use crate::migration::{FunctionScript, Migration};

/// Directory holding migration scripts, relative to the project root.
pub const SCRIPTS_DIR: &str = "scripts";

/// Directory holding function scripts, relative to the scripts directory.
pub const FUNCTIONS_DIR: &str = "functions";

/// Marker switching the parser to the do-section.
pub const DO_MARKER: &str = "-- @DO";

/// Marker switching the parser to the undo-section.
pub const UNDO_MARKER: &str = "-- @UNDO";

fn timestamp_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("[0-9]+").expect("Invalid timestamp regex"))
}

fn word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("[a-zA-Z]+").expect("Invalid word regex"))
}

/// Reads migration and function scripts from a project directory.
#[derive(Debug, Clone)]
pub struct ScriptStore {
    scripts_dir: PathBuf,
    functions_dir: PathBuf,
}

impl ScriptStore {
    /// Creates a store rooted at the project directory.
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        let scripts_dir = root.as_ref().join(SCRIPTS_DIR);
        let functions_dir = scripts_dir.join(FUNCTIONS_DIR);
        Self {
            scripts_dir,
            functions_dir,
        }
    }

    /// Returns the migration scripts directory.
    #[must_use]
    pub fn scripts_dir(&self) -> &Path {
        &self.scripts_dir
    }

    /// Returns the function scripts directory.
    #[must_use]
    pub fn functions_dir(&self) -> &Path {
        &self.functions_dir
    }

    /// Reads every migration script, sorted ascending by timestamp.
    ///
    /// Subdirectories are skipped. `is_applied` is left `false` on every
    /// returned migration.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Io`] if the directory or a file cannot be read
    /// and [`MigrateError::InvalidFilename`] if a file name has no timestamp.
    pub fn list(&self) -> Result<Vec<Migration>> {
        let mut migrations = Vec::new();
        for (filename, content) in read_scripts(&self.scripts_dir)? {
            let (timestamp, description) = parse_filename(&filename)?;
            let (do_script, undo_script) = parse_script(&content);
            debug!(timestamp, description = %description, "Read migration script");
            migrations.push(Migration::new(
                timestamp,
                description,
                do_script,
                undo_script,
            ));
        }

        migrations.sort_by_key(|m| m.timestamp);
        Ok(migrations)
    }

    /// Reads every function script, sorted ascending by timestamp.
    ///
    /// # Errors
    ///
    /// Same as [`ScriptStore::list`].
    pub fn functions(&self) -> Result<Vec<FunctionScript>> {
        let mut functions = Vec::new();
        for (filename, script) in read_scripts(&self.functions_dir)? {
            let (timestamp, description) = parse_filename(&filename)?;
            functions.push(FunctionScript {
                description,
                timestamp,
                script,
            });
        }

        functions.sort_by_key(|f| f.timestamp);
        Ok(functions)
    }
}

/// Reads `(file name, content)` for every regular file in `dir`, ordered by
/// file name so repeated listings agree even when timestamps collide.
fn read_scripts(dir: &Path) -> Result<Vec<(String, String)>> {
    let entries = fs::read_dir(dir).map_err(|e| MigrateError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| MigrateError::io(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| MigrateError::io(&path, e))?;
        if file_type.is_dir() {
            continue;
        }

        let filename = entry.file_name().to_string_lossy().into_owned();
        let content = fs::read_to_string(&path).map_err(|e| MigrateError::io(&path, e))?;
        files.push((filename, content));
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

/// Extracts the timestamp and description from a script file name.
///
/// The timestamp is the first run of digits. The description is every run
/// of ASCII letters in the file stem, joined by single spaces, so
/// `1700000000_add_users_table.sql` gives `"add users table"`.
///
/// # Errors
///
/// Returns [`MigrateError::InvalidFilename`] when the name has no digits or
/// the digits overflow an `i64`.
pub fn parse_filename(filename: &str) -> Result<(i64, String)> {
    let digits = timestamp_regex()
        .find(filename)
        .ok_or_else(|| MigrateError::InvalidFilename {
            filename: filename.to_string(),
            reason: "no timestamp found".to_string(),
        })?;

    let timestamp =
        digits
            .as_str()
            .parse::<i64>()
            .map_err(|e| MigrateError::InvalidFilename {
                filename: filename.to_string(),
                reason: format!("timestamp '{}' is not a valid integer: {}", digits.as_str(), e),
            })?;

    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    let description = word_regex()
        .find_iter(stem)
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    Ok((timestamp, description))
}

/// Splits a migration body into its do-script and undo-script.
///
/// Content before the first marker belongs to the do-script. Marker lines
/// are kept in the section they open, and every line is newline-terminated.
#[must_use]
pub fn parse_script(content: &str) -> (String, String) {
    let mut do_script = String::new();
    let mut undo_script = String::new();
    let mut doing = true;

    for line in content.lines() {
        if line.contains(DO_MARKER) {
            doing = true;
        }
        if line.contains(UNDO_MARKER) {
            doing = false;
        }

        let target = if doing {
            &mut do_script
        } else {
            &mut undo_script
        };
        target.push_str(line);
        target.push('\n');
    }

    (do_script, undo_script)
}
