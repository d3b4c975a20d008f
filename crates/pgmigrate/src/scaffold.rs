//! Project scaffolding: `init`, `new` and `function`.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::{Config, CONFIG_FILE};
use crate::error::{MigrateError, Result};
use crate::store::{FUNCTIONS_DIR, SCRIPTS_DIR};

/// Creates `pgmigrate.json`, `scripts/` and `scripts/functions/` in an
/// existing, empty directory. Returns the absolute project path.
pub fn init_project(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let root = fs::canonicalize(path).map_err(|e| MigrateError::io(path, e))?;
    info!(path = %root.display(), "Initializing migrations");

    let metadata = fs::metadata(&root).map_err(|e| MigrateError::io(&root, e))?;
    if !metadata.is_dir() {
        return Err(MigrateError::NotADirectory(root));
    }

    let mut entries = fs::read_dir(&root).map_err(|e| MigrateError::io(&root, e))?;
    if entries.next().is_some() {
        return Err(MigrateError::DirectoryNotEmpty(root));
    }

    Config::default().save(root.join(CONFIG_FILE))?;

    let functions_dir = root.join(SCRIPTS_DIR).join(FUNCTIONS_DIR);
    fs::create_dir_all(&functions_dir).map_err(|e| MigrateError::io(&functions_dir, e))?;

    Ok(root)
}

/// Writes a new migration script from the template. Returns its path.
pub fn new_migration(
    root: impl AsRef<Path>,
    description: &str,
    timestamp: i64,
) -> Result<PathBuf> {
    let dir = root.as_ref().join(SCRIPTS_DIR);
    let path = dir.join(script_filename(timestamp, description)?);
    write_new(&path, &migration_template(description))?;
    info!(path = %path.display(), "Created migration");
    Ok(path)
}

/// Writes a new function script from the template. Returns its path.
pub fn new_function(
    root: impl AsRef<Path>,
    description: &str,
    timestamp: i64,
) -> Result<PathBuf> {
    let dir = root.as_ref().join(SCRIPTS_DIR).join(FUNCTIONS_DIR);
    let path = dir.join(script_filename(timestamp, description)?);
    write_new(&path, &function_template(description))?;
    info!(path = %path.display(), "Created function script");
    Ok(path)
}

/// Builds `<timestamp>_<words_joined_by_underscore>.sql`.
pub fn script_filename(timestamp: i64, description: &str) -> Result<String> {
    let slug = description.split_whitespace().collect::<Vec<_>>().join("_");
    if slug.is_empty() {
        return Err(MigrateError::InvalidFilename {
            filename: format!("{}_.sql", timestamp),
            reason: "description is empty".to_string(),
        });
    }
    Ok(format!("{}_{}.sql", timestamp, slug))
}

const MIGRATION_TEMPLATE: &str = "-- {description} --
-- @DO sql script --


-- @UNDO sql script --


";

const FUNCTION_TEMPLATE: &str = "-- {description} --
drop function function_name;
create or replace function function_name returns return_type
language plpgsql
as $$
    declare
        -- declarations
    begin

    end;
$$;
";

fn migration_template(description: &str) -> String {
    MIGRATION_TEMPLATE.replace("{description}", description.trim())
}

fn function_template(description: &str) -> String {
    FUNCTION_TEMPLATE.replace("{description}", description.trim())
}

fn write_new(path: &Path, content: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| {
            if e.kind() == ErrorKind::AlreadyExists {
                MigrateError::ScriptExists(path.to_path_buf())
            } else {
                MigrateError::io(path, e)
            }
        })?;
    file.write_all(content.as_bytes())
        .map_err(|e| MigrateError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{parse_script, ScriptStore};
    use tempfile::TempDir;

    #[test]
    fn test_init_project() {
        let dir = TempDir::new().unwrap();

        let root = init_project(dir.path()).unwrap();
        assert!(root.join(CONFIG_FILE).is_file());
        assert!(root.join(SCRIPTS_DIR).join(FUNCTIONS_DIR).is_dir());

        let config: Config =
            serde_json::from_str(&fs::read_to_string(root.join(CONFIG_FILE)).unwrap()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_init_rejects_non_empty_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("README"), "").unwrap();

        assert!(matches!(
            init_project(dir.path()),
            Err(MigrateError::DirectoryNotEmpty(_))
        ));
    }

    #[test]
    fn test_init_rejects_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file");
        fs::write(&file, "").unwrap();

        assert!(matches!(
            init_project(&file),
            Err(MigrateError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_init_rejects_missing_path() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            init_project(dir.path().join("missing")),
            Err(MigrateError::Io { .. })
        ));
    }

    #[test]
    fn test_script_filename() {
        assert_eq!(
            script_filename(1_700_000_000, " add  users table ").unwrap(),
            "1700000000_add_users_table.sql"
        );
        assert!(script_filename(1, "   ").is_err());
    }

    #[test]
    fn test_new_migration_round_trips_through_store() {
        let dir = TempDir::new().unwrap();
        init_project(dir.path()).unwrap();

        let path = new_migration(dir.path(), "add users table", 1_700_000_000).unwrap();
        assert!(path.ends_with("scripts/1700000000_add_users_table.sql"));

        let migrations = ScriptStore::new(dir.path()).list().unwrap();
        assert_eq!(migrations.len(), 1);
        assert_eq!(migrations[0].timestamp, 1_700_000_000);
        assert_eq!(migrations[0].description, "add users table");

        let (do_script, undo_script) = parse_script(&fs::read_to_string(&path).unwrap());
        assert!(do_script.contains("-- @DO sql script --"));
        assert!(undo_script.starts_with("-- @UNDO sql script --"));
    }

    #[test]
    fn test_new_migration_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        init_project(dir.path()).unwrap();

        new_migration(dir.path(), "add users", 1).unwrap();
        assert!(matches!(
            new_migration(dir.path(), "add users", 1),
            Err(MigrateError::ScriptExists(_))
        ));
    }

    #[test]
    fn test_new_function() {
        let dir = TempDir::new().unwrap();
        init_project(dir.path()).unwrap();

        new_function(dir.path(), "refresh totals", 5).unwrap();

        let functions = ScriptStore::new(dir.path()).functions().unwrap();
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].description, "refresh totals");
        assert!(functions[0].script.contains("language plpgsql"));
    }
}
