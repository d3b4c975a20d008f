//! Project configuration stored in `pgmigrate.json`.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{MigrateError, Result};

/// Name of the configuration file in the project directory.
pub const CONFIG_FILE: &str = "pgmigrate.json";

/// Default changelog table name.
pub const DEFAULT_TABLE_NAME: &str = "changelog";

/// Default PostgreSQL port.
pub const DEFAULT_PORT: u16 = 5432;

fn default_host() -> String {
    "localhost".to_string()
}

fn default_table_name() -> String {
    DEFAULT_TABLE_NAME.to_string()
}

const fn default_true() -> bool {
    true
}

/// Connection and ledger settings for a migration project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Database host.
    #[serde(default = "default_host", alias = "databaseHost")]
    pub db_host: String,

    /// Database port, 5432 when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_port: Option<u16>,

    /// Database name.
    #[serde(default, alias = "databaseName")]
    pub db_name: String,

    /// Login role.
    #[serde(default, alias = "databaseUser")]
    pub db_username: String,

    /// Login password.
    #[serde(default, alias = "databasePassword")]
    pub db_password: String,

    /// Changelog table, optionally schema-qualified.
    #[serde(default = "default_table_name")]
    pub migration_table_name: String,

    /// libpq `sslmode`, `disable` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_mode: Option<String>,

    /// Wrap each migration and its ledger write in one transaction.
    #[serde(default = "default_true")]
    pub transactional: bool,

    /// Full connection URL; takes precedence over the discrete fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_host: default_host(),
            db_port: None,
            db_name: String::new(),
            db_username: String::new(),
            db_password: String::new(),
            migration_table_name: default_table_name(),
            ssl_mode: None,
            transactional: true,
            database_url: None,
        }
    }
}

impl Config {
    /// Loads the configuration of the project at `root`, applies a
    /// `database_url` override, then validates the result.
    pub fn from_project(root: impl AsRef<Path>, database_url: Option<String>) -> Result<Self> {
        let mut config = Self::load(root.as_ref().join(CONFIG_FILE))?;
        if database_url.is_some() {
            config.database_url = database_url;
        }
        config.validate()?;
        Ok(config)
    }

    /// Reads a configuration file without validating it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                MigrateError::Config(format!("config file not found: {}", path.display()))
            } else {
                MigrateError::io(path, e)
            }
        })?;

        serde_json::from_str(&content).map_err(|e| {
            MigrateError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Writes the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| MigrateError::io(path, e))
    }

    /// Checks the settings a run depends on.
    pub fn validate(&self) -> Result<()> {
        validate_table_name(&self.migration_table_name)?;
        if self.database_url.is_none() && self.db_name.is_empty() {
            return Err(MigrateError::Config(
                "dbName is required when databaseUrl is not set".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the connection URL for this configuration.
    ///
    /// `database_url` is returned as is; otherwise a `postgres://` URL is
    /// built from the discrete fields with credentials percent-encoded.
    pub fn connection_url(&self) -> Result<String> {
        if let Some(url) = &self.database_url {
            return Ok(url.clone());
        }

        let mut url = Url::parse("postgres://localhost")
            .map_err(|e| MigrateError::Config(format!("invalid connection URL: {}", e)))?;
        url.set_host(Some(&self.db_host)).map_err(|e| {
            MigrateError::Config(format!("invalid dbHost '{}': {}", self.db_host, e))
        })?;
        url.set_port(Some(self.db_port.unwrap_or(DEFAULT_PORT)))
            .map_err(|()| MigrateError::Config("dbPort cannot be set on this URL".to_string()))?;
        if !self.db_username.is_empty() {
            url.set_username(&self.db_username).map_err(|()| {
                MigrateError::Config("dbUsername cannot be set on this URL".to_string())
            })?;
            if !self.db_password.is_empty() {
                url.set_password(Some(&self.db_password)).map_err(|()| {
                    MigrateError::Config("dbPassword cannot be set on this URL".to_string())
                })?;
            }
        }
        url.set_path(&format!("/{}", self.db_name));
        url.query_pairs_mut()
            .append_pair("sslmode", self.ssl_mode.as_deref().unwrap_or("disable"));

        Ok(url.into())
    }
}

/// Checks that `name` is a plain SQL identifier, optionally qualified by a
/// schema (`schema.table`).
pub fn validate_table_name(name: &str) -> Result<()> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
            .expect("Invalid table name regex")
    });

    if re.is_match(name) {
        Ok(())
    } else {
        Err(MigrateError::Config(format!(
            "invalid migrationTableName '{}'",
            name
        )))
    }
}
