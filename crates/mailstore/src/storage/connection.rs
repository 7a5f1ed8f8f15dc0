//! Connection acquisition
//!
//! There is no pool: every operation opens its own connection and drops it
//! when done, on success and error paths alike.

use log::{debug, info};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::schema::migrations;
use crate::config::DatabaseConfig;
use crate::error::Result;

/// Capability to open a configured database connection
///
/// Catalogs and stores hold this instead of a connection so that each call
/// gets a fresh, fully configured connection.
pub trait ConnectionFactory: Send + Sync {
    /// Open a new connection with foreign keys enforced
    fn connect(&self) -> Result<Connection>;
}

/// Opens SQLite connections for a validated [`DatabaseConfig`]
pub struct ConnectionProvider {
    path: PathBuf,
    busy_timeout: Duration,
}

impl ConnectionProvider {
    /// Validate `config`, create the data directory, and bring the schema up to date
    pub fn new(config: &DatabaseConfig) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.data_dir)?;

        let provider = Self {
            path: config.database_path(),
            busy_timeout: Duration::from_millis(config.busy_timeout_ms),
        };
        provider.bootstrap()?;
        Ok(provider)
    }

    /// Path of the database file this provider opens
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn bootstrap(&self) -> Result<()> {
        let mut conn = self.connect()?;

        // WAL persists in the database file, so it only needs setting once
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!("[STORE] journal_mode = {}", mode);

        migrations().to_latest(&mut conn)?;
        info!("[STORE] Database ready at {}", self.path.display());
        Ok(())
    }
}

impl ConnectionFactory for ConnectionProvider {
    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        // foreign_keys is per-connection and required for ON DELETE CASCADE
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;
            PRAGMA synchronous = NORMAL;
            "#,
        )?;
        Ok(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use tempfile::TempDir;

    #[test]
    fn test_bootstrap_creates_database() {
        let dir = TempDir::new().unwrap();
        let config = DatabaseConfig::new(dir.path().join("nested"), "test");

        let provider = ConnectionProvider::new(&config).unwrap();
        assert!(provider.path().exists());

        let conn = provider.connect().unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn test_bootstrap_is_repeatable() {
        let dir = TempDir::new().unwrap();
        let config = DatabaseConfig::new(dir.path(), "test");

        ConnectionProvider::new(&config).unwrap();
        let provider = ConnectionProvider::new(&config).unwrap();

        let conn = provider.connect().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM directories", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_invalid_config_never_touches_disk() {
        let dir = TempDir::new().unwrap();
        let config = DatabaseConfig::new(dir.path().join("never"), "");

        let result = ConnectionProvider::new(&config);
        assert!(matches!(result, Err(StoreError::InvalidConfig(_))));
        assert!(!dir.path().join("never").exists());
    }
}
