//! Get-or-create over a dimension table keyed by a unique text column

use log::warn;
use rusqlite::{Connection, OptionalExtension};

use crate::error::{Result, StoreError, is_unique_violation};

/// Attempts before a key that keeps vanishing between insert and re-read is reported
const MAX_ATTEMPTS: usize = 3;

/// A small lookup table with an integer id and a unique text key
pub(crate) struct Dimension {
    pub label: &'static str,
    pub select_id: &'static str,
    pub insert: &'static str,
}

impl Dimension {
    /// Look up the id stored for `key`
    pub fn find_id(&self, conn: &Connection, key: &str) -> Result<Option<i64>> {
        Ok(conn
            .query_row(self.select_id, [key], |row| row.get(0))
            .optional()?)
    }

    /// Return the id for `key`, inserting a row when none exists
    ///
    /// A concurrent writer may insert the same key between the lookup and
    /// our insert. The resulting UNIQUE violation is not an error: the row
    /// now exists, so the lookup is simply repeated.
    pub fn find_or_create_id(&self, conn: &Connection, key: &str) -> Result<i64> {
        let mut last_err = None;

        for attempt in 1..=MAX_ATTEMPTS {
            if let Some(id) = self.find_id(conn, key)? {
                return Ok(id);
            }

            match conn.execute(self.insert, [key]) {
                Ok(_) => return Ok(conn.last_insert_rowid()),
                Err(e) if is_unique_violation(&e) => {
                    warn!(
                        "[STORE] {} '{}' created concurrently (attempt {}), re-reading",
                        self.label, key, attempt
                    );
                    last_err = Some(e);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(last_err.map_or_else(
            || StoreError::invalid(format!("{} '{}' could not be resolved", self.label, key)),
            StoreError::Sqlite,
        ))
    }
}
