//! Address catalog: append-only get-or-create over the address dimension

use rusqlite::Connection;
use std::sync::Arc;

use super::connection::ConnectionFactory;
use super::dimension::Dimension;
use crate::error::{Result, StoreError};

const ADDRESSES: Dimension = Dimension {
    label: "address",
    select_id: "SELECT id FROM addresses WHERE address = ?",
    insert: "INSERT INTO addresses (address) VALUES (?)",
};

/// Unique address strings mapped to ids
///
/// Addresses are matched exactly; syntax is the transport's concern.
#[derive(Clone)]
pub struct AddressCatalog {
    connector: Arc<dyn ConnectionFactory>,
}

impl AddressCatalog {
    pub fn new(connector: Arc<dyn ConnectionFactory>) -> Self {
        Self { connector }
    }

    pub fn find_id(&self, address: &str) -> Result<Option<i64>> {
        let conn = self.connector.connect()?;
        ADDRESSES.find_id(&conn, address)
    }

    /// Look up an address id, inserting the address if it is new
    pub fn find_or_create_id(&self, address: &str) -> Result<i64> {
        let conn = self.connector.connect()?;
        Self::find_or_create_id_in(&conn, address)
    }

    /// Number of distinct addresses ever seen
    pub fn count(&self) -> Result<usize> {
        let conn = self.connector.connect()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM addresses", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub(crate) fn find_or_create_id_in(conn: &Connection, address: &str) -> Result<i64> {
        if address.is_empty() {
            return Err(StoreError::invalid("Address is empty"));
        }
        ADDRESSES.find_or_create_id(conn, address)
    }
}
