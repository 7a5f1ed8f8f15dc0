//! Database configuration
//!
//! Supports loading the database location from (in order of priority):
//! 1. JSON file in the Postbox config directory (`database.json`)
//! 2. Runtime environment variables (`POSTBOX_DATA_DIR`, `POSTBOX_SCHEMA`)
//! 3. Built-in defaults (platform data directory, schema `postbox`)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::StoreError;

/// Config filename in the Postbox config directory
const DATABASE_FILE: &str = "database.json";

/// Schema name used when none is configured
pub const DEFAULT_SCHEMA: &str = "postbox";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

fn default_busy_timeout() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Where the mail database lives and how connections to it behave
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Directory holding the database file
    pub data_dir: PathBuf,
    /// Schema name; the database file is `<data_dir>/<schema>.sqlite3`
    pub schema: String,
    /// How long a connection waits on a locked database before failing
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

impl DatabaseConfig {
    pub fn new(data_dir: impl Into<PathBuf>, schema: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            schema: schema.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }

    /// Load configuration using the following priority:
    /// 1. ~/.config/postbox/database.json
    /// 2. Runtime environment variables
    /// 3. Defaults
    pub fn load() -> Result<Self> {
        if config::config_exists(DATABASE_FILE) {
            return config::load_json(DATABASE_FILE);
        }

        if let Some(cfg) = Self::from_env() {
            return Ok(cfg);
        }

        Self::default_location()
    }

    /// Load configuration from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        config::load_json_file(path)
    }

    /// Parse configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse database config JSON")
    }

    /// Load configuration from `POSTBOX_DATA_DIR` and, optionally, `POSTBOX_SCHEMA`
    pub fn from_env() -> Option<Self> {
        let data_dir = std::env::var_os("POSTBOX_DATA_DIR")?;
        let schema =
            std::env::var("POSTBOX_SCHEMA").unwrap_or_else(|_| DEFAULT_SCHEMA.to_string());
        Some(Self::new(data_dir, schema))
    }

    /// Configuration pointing at the platform data directory
    pub fn default_location() -> Result<Self> {
        let dir = config::data_dir().context("Could not determine data directory")?;
        Ok(Self::new(dir, DEFAULT_SCHEMA))
    }

    /// Persist this configuration to ~/.config/postbox/database.json
    pub fn save(&self) -> Result<()> {
        config::save_json(DATABASE_FILE, self)
    }

    /// Persist this configuration to a specific JSON file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        config::save_json_file(path, self)
    }

    /// Get the default config file path (~/.config/postbox/database.json)
    pub fn default_config_path() -> Option<PathBuf> {
        config::config_path(DATABASE_FILE)
    }

    /// Check that every field is present and well-formed
    pub fn validate(&self) -> std::result::Result<(), StoreError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(StoreError::InvalidConfig("data directory is empty".into()));
        }

        let schema = self.schema.trim();
        if schema.is_empty() {
            return Err(StoreError::InvalidConfig("schema name is empty".into()));
        }
        if schema != self.schema
            || !schema
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(StoreError::InvalidConfig(format!(
                "schema name '{}' may only contain letters, digits, '_' and '-'",
                self.schema
            )));
        }

        if self.busy_timeout_ms == 0 {
            return Err(StoreError::InvalidConfig(
                "busy timeout must be positive".into(),
            ));
        }

        Ok(())
    }

    /// Path of the SQLite database file
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.sqlite3", self.schema))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_json() {
        let json = r#"{
            "data_dir": "/var/lib/postbox",
            "schema": "work_mail"
        }"#;

        let cfg = DatabaseConfig::from_json(json).unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("/var/lib/postbox"));
        assert_eq!(cfg.schema, "work_mail");
        assert_eq!(cfg.busy_timeout_ms, DEFAULT_BUSY_TIMEOUT_MS);
        assert_eq!(
            cfg.database_path(),
            PathBuf::from("/var/lib/postbox/work_mail.sqlite3")
        );
    }

    #[test]
    fn test_missing_schema_is_a_parse_error() {
        let json = r#"{ "data_dir": "/tmp" }"#;
        assert!(DatabaseConfig::from_json(json).is_err());
    }

    #[test]
    fn test_validate_accepts_well_formed() {
        assert!(DatabaseConfig::new("/tmp", "postbox").validate().is_ok());
        assert!(DatabaseConfig::new("/tmp", "mail-2024_a").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        let invalid = |cfg: DatabaseConfig| {
            matches!(cfg.validate(), Err(StoreError::InvalidConfig(_)))
        };

        assert!(invalid(DatabaseConfig::new("", "postbox")));
        assert!(invalid(DatabaseConfig::new("/tmp", "")));
        assert!(invalid(DatabaseConfig::new("/tmp", "  ")));
        assert!(invalid(DatabaseConfig::new("/tmp", " postbox")));
        assert!(invalid(DatabaseConfig::new("/tmp", "../escape")));

        let mut cfg = DatabaseConfig::new("/tmp", "postbox");
        cfg.busy_timeout_ms = 0;
        assert!(invalid(cfg));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(DATABASE_FILE);

        let mut cfg = DatabaseConfig::new(dir.path().join("data"), "archive");
        cfg.busy_timeout_ms = 250;
        cfg.save_to(&path).unwrap();

        assert_eq!(DatabaseConfig::from_file(&path).unwrap(), cfg);
    }

    #[test]
    fn test_default_config_path() {
        if let Some(path) = DatabaseConfig::default_config_path() {
            assert!(path.ends_with("postbox/database.json"));
        }
    }
}
