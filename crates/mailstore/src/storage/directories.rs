//! Directory catalog: CRUD over the directory dimension

use log::info;
use rusqlite::{Connection, TransactionBehavior, params};
use std::sync::Arc;

use super::connection::ConnectionFactory;
use super::dimension::Dimension;
use crate::error::{Result, StoreError, is_unique_violation};
use crate::models::Directory;
use crate::models::directory::normalize_name;

const DIRECTORIES: Dimension = Dimension {
    label: "directory",
    select_id: "SELECT id FROM directories WHERE name = ?",
    insert: "INSERT INTO directories (name) VALUES (?)",
};

fn require_name<'a>(name: &'a str, what: &str) -> Result<&'a str> {
    normalize_name(name).ok_or_else(|| StoreError::invalid(format!("{} is empty", what)))
}

/// Directory names mapped to ids, with get-or-create for callers that
/// file emails under names that may not exist yet
#[derive(Clone)]
pub struct DirectoryCatalog {
    connector: Arc<dyn ConnectionFactory>,
}

impl DirectoryCatalog {
    pub fn new(connector: Arc<dyn ConnectionFactory>) -> Self {
        Self { connector }
    }

    /// Create a directory, failing with `DuplicateName` if it already exists
    pub fn create(&self, name: &str) -> Result<i64> {
        let name = require_name(name, "Directory name")?;
        let conn = self.connector.connect()?;

        match conn.execute(DIRECTORIES.insert, [name]) {
            Ok(_) => {
                let id = conn.last_insert_rowid();
                info!("Created directory '{}' ({})", name, id);
                Ok(id)
            }
            Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateName(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a directory by name
    ///
    /// Returns the number of rows removed (0 when no such directory exists).
    /// A directory that still holds emails is refused with `DirectoryInUse`.
    pub fn delete(&self, name: &str) -> Result<usize> {
        let name = require_name(name, "Directory name")?;
        let mut conn = self.connector.connect()?;
        // Immediate: a deferred read cannot be upgraded once another writer commits
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(id) = DIRECTORIES.find_id(&tx, name)? else {
            return Ok(0);
        };

        let emails: i64 = tx.query_row(
            "SELECT COUNT(*) FROM emails WHERE directory = ?",
            [id],
            |row| row.get(0),
        )?;
        if emails > 0 {
            return Err(StoreError::DirectoryInUse {
                name: name.to_string(),
                emails: emails as usize,
            });
        }

        let removed = tx.execute("DELETE FROM directories WHERE id = ?", [id])?;
        tx.commit()?;

        info!("Deleted directory '{}'", name);
        Ok(removed)
    }

    /// Rename a directory in place; emails filed under it follow automatically
    ///
    /// Returns the number of rows changed (0 when `old_name` does not exist).
    pub fn rename(&self, old_name: &str, new_name: &str) -> Result<usize> {
        let old_name = require_name(old_name, "Old directory name")?;
        let new_name = require_name(new_name, "New directory name")?;
        if old_name == new_name {
            return Err(StoreError::invalid(format!(
                "Old and new directory names are both '{}'",
                old_name
            )));
        }

        let conn = self.connector.connect()?;
        match conn.execute(
            "UPDATE directories SET name = ?1 WHERE name = ?2",
            params![new_name, old_name],
        ) {
            Ok(changed) => {
                if changed > 0 {
                    info!("Renamed directory '{}' to '{}'", old_name, new_name);
                }
                Ok(changed)
            }
            Err(e) if is_unique_violation(&e) => {
                Err(StoreError::DuplicateName(new_name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// All directory names, in creation order
    pub fn list_all(&self) -> Result<Vec<String>> {
        Ok(self.list()?.into_iter().map(|d| d.name).collect())
    }

    /// All directories with their ids, in creation order
    pub fn list(&self) -> Result<Vec<Directory>> {
        let conn = self.connector.connect()?;
        let mut stmt = conn.prepare("SELECT id, name FROM directories ORDER BY id")?;

        let dirs = stmt
            .query_map([], |row| {
                Ok(Directory {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(dirs)
    }

    /// Look up a directory id by name
    pub fn find_id(&self, name: &str) -> Result<Option<i64>> {
        let name = require_name(name, "Directory name")?;
        let conn = self.connector.connect()?;
        Self::find_id_in(&conn, name)
    }

    /// Look up a directory id by name, creating the directory if needed
    pub fn find_or_create_id(&self, name: &str) -> Result<i64> {
        let name = require_name(name, "Directory name")?;
        let conn = self.connector.connect()?;
        Self::find_or_create_id_in(&conn, name)
    }

    pub(crate) fn find_id_in(conn: &Connection, name: &str) -> Result<Option<i64>> {
        DIRECTORIES.find_id(conn, name)
    }

    /// Get-or-create on a caller-owned connection or transaction
    pub(crate) fn find_or_create_id_in(conn: &Connection, name: &str) -> Result<i64> {
        let name = require_name(name, "Directory name")?;
        DIRECTORIES.find_or_create_id(conn, name)
    }
}
