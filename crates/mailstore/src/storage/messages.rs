//! SQLite-backed message store
//!
//! An [`Email`] is spread over four tables: the `emails` row itself, one
//! `attachments` row per attachment, and one `email_address` row per
//! envelope recipient. Directories and addresses are resolved to dimension
//! ids on the way in and joined back to strings on the way out.

use chrono::{DateTime, Utc};
use log::{debug, info};
use rusqlite::{Connection, Params, TransactionBehavior, params};
use std::sync::Arc;

use super::addresses::AddressCatalog;
use super::connection::{ConnectionFactory, ConnectionProvider};
use super::directories::DirectoryCatalog;
use super::traits::MailStore;
use crate::config::DatabaseConfig;
use crate::error::{Result, StoreError};
use crate::models::directory::normalize_name;
use crate::models::{AddressRole, Attachment, Email, EmailAddress, EmailId, Flags, MessageBody};

const SELECT_EMAIL: &str = "SELECT e.id, e.msg_number, e.rcv_date, d.name, a.address,
                                   e.message, e.sent_date, e.subject, e.flags
                            FROM emails e
                            INNER JOIN directories d ON d.id = e.directory
                            INNER JOIN addresses a ON a.id = e.from_email";

/// An `emails` row before its attachments and recipients are attached
struct EmailRow {
    id: i64,
    msg_number: i64,
    rcv_date: Option<String>,
    directory: String,
    from: String,
    message: String,
    sent_date: Option<String>,
    subject: String,
    flags: Option<i64>,
}

/// SQLite-based mail storage
///
/// Composes the directory and address catalogs to resolve foreign keys and
/// owns attachment and envelope persistence.
#[derive(Clone)]
pub struct SqliteMailStore {
    connector: Arc<dyn ConnectionFactory>,
    directories: DirectoryCatalog,
    addresses: AddressCatalog,
}

impl SqliteMailStore {
    /// Create a store over an existing connection capability
    pub fn new(connector: Arc<dyn ConnectionFactory>) -> Self {
        Self {
            directories: DirectoryCatalog::new(connector.clone()),
            addresses: AddressCatalog::new(connector.clone()),
            connector,
        }
    }

    /// Validate `config`, bootstrap the schema, and create a store over it
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        let provider = ConnectionProvider::new(config)?;
        Ok(Self::new(Arc::new(provider)))
    }

    pub fn directories(&self) -> &DirectoryCatalog {
        &self.directories
    }

    pub fn addresses(&self) -> &AddressCatalog {
        &self.addresses
    }

    /// Count emails filed under a directory (0 when the directory does not exist)
    pub fn count_in_directory(&self, directory: &str) -> Result<usize> {
        let directory = normalize_name(directory)
            .ok_or_else(|| StoreError::invalid("Directory name is empty"))?;
        let conn = self.connector.connect()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM emails e
             INNER JOIN directories d ON d.id = e.directory
             WHERE d.name = ?",
            [directory],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }

    /// Check everything `save` needs before any database work happens
    fn validate_new(email: &Email) -> Result<()> {
        if let Some(id) = email.id {
            return Err(StoreError::invalid(format!(
                "Email is already stored with id {}",
                id
            )));
        }
        if normalize_name(&email.directory).is_none() {
            return Err(StoreError::invalid("Email directory is empty"));
        }
        if email.from.email.trim().is_empty() {
            return Err(StoreError::invalid("Email sender is empty"));
        }
        for role in AddressRole::ALL {
            if email.recipients(role).iter().any(|a| a.email.trim().is_empty()) {
                return Err(StoreError::invalid(format!("Empty {} address", role)));
            }
        }
        Ok(())
    }

    /// Save attachments for an email
    fn save_attachments(conn: &Connection, email_id: i64, attachments: &[Attachment]) -> Result<()> {
        let mut stmt = conn
            .prepare("INSERT INTO attachments (binary_data, filename, email) VALUES (?, ?, ?)")?;

        for attachment in attachments {
            stmt.execute(params![attachment.data, attachment.filename, email_id])?;
        }

        Ok(())
    }

    /// Save every non-empty envelope role for an email
    fn save_recipients(conn: &Connection, email_id: i64, email: &Email) -> Result<()> {
        let mut stmt = conn.prepare(
            "INSERT INTO email_address (email_id, address_id, address_type, position)
             VALUES (?, ?, ?, ?)",
        )?;

        for role in AddressRole::ALL {
            for (i, addr) in email.recipients(role).iter().enumerate() {
                let address_id = AddressCatalog::find_or_create_id_in(conn, &addr.email)?;
                stmt.execute(params![email_id, address_id, role.code(), i as i64])?;
            }
        }

        Ok(())
    }

    /// Load attachments for an email
    fn load_attachments(conn: &Connection, email_id: i64) -> Result<Vec<Attachment>> {
        let mut stmt = conn.prepare(
            "SELECT filename, binary_data FROM attachments WHERE email = ? ORDER BY id",
        )?;

        let attachments = stmt
            .query_map([email_id], |row| {
                Ok(Attachment {
                    filename: row.get(0)?,
                    data: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(attachments)
    }

    /// Load envelope recipients into their role lists
    fn load_recipients(conn: &Connection, email: &mut Email, email_id: i64) -> Result<()> {
        let mut stmt = conn.prepare(
            "SELECT a.address, ea.address_type
             FROM email_address ea
             INNER JOIN addresses a ON a.id = ea.address_id
             WHERE ea.email_id = ?
             ORDER BY ea.address_type, ea.position",
        )?;

        let rows = stmt
            .query_map([email_id], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for (address, code) in rows {
            let role = AddressRole::from_code(code).ok_or_else(|| StoreError::Corrupt {
                column: "address_type",
                reason: format!("unknown role code {}", code),
            })?;
            email.recipients_mut(role).push(EmailAddress::new(address));
        }

        Ok(())
    }

    /// Run an email SELECT and rebuild a complete Email for every row
    fn load_emails<P: Params>(conn: &Connection, tail: &str, params: P) -> Result<Vec<Email>> {
        let sql = format!("{} {}", SELECT_EMAIL, tail);
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt
            .query_map(params, |row| {
                Ok(EmailRow {
                    id: row.get(0)?,
                    msg_number: row.get(1)?,
                    rcv_date: row.get(2)?,
                    directory: row.get(3)?,
                    from: row.get(4)?,
                    message: row.get(5)?,
                    sent_date: row.get(6)?,
                    subject: row.get(7)?,
                    flags: row.get(8)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(|row| Self::hydrate(conn, row)).collect()
    }

    fn hydrate(conn: &Connection, row: EmailRow) -> Result<Email> {
        let bodies: Vec<MessageBody> =
            serde_json::from_str(&row.message).map_err(|e| StoreError::Corrupt {
                column: "message",
                reason: e.to_string(),
            })?;

        let mut email = Email {
            id: Some(EmailId(row.id)),
            message_number: row.msg_number,
            received_date: parse_date("rcv_date", row.rcv_date)?,
            sent_date: parse_date("sent_date", row.sent_date)?,
            directory: row.directory,
            from: EmailAddress::new(row.from),
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            reply_to: Vec::new(),
            subject: row.subject,
            bodies,
            attachments: Self::load_attachments(conn, row.id)?,
            flags: row.flags.map(Flags::from_bits),
        };
        Self::load_recipients(conn, &mut email, row.id)?;

        Ok(email)
    }
}

fn parse_date(column: &'static str, value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value
        .map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| StoreError::Corrupt {
                    column,
                    reason: format!("'{}': {}", s, e),
                })
        })
        .transpose()
}

fn require_id(id: EmailId) -> Result<i64> {
    if id.get() < 1 {
        return Err(StoreError::invalid(format!("Id value is invalid: {}", id)));
    }
    Ok(id.get())
}

impl MailStore for SqliteMailStore {
    fn save(&self, email: &mut Email) -> Result<EmailId> {
        Self::validate_new(email)?;

        let message = serde_json::to_string(&email.bodies).map_err(|e| StoreError::Corrupt {
            column: "message",
            reason: e.to_string(),
        })?;

        // Immediate: take the write lock before the directory/address lookups
        // so the whole email lands atomically or not at all.
        let mut conn = self.connector.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let directory_id = DirectoryCatalog::find_or_create_id_in(&tx, &email.directory)?;
        let from_id = AddressCatalog::find_or_create_id_in(&tx, &email.from.email)?;

        tx.execute(
            "INSERT INTO emails
             (msg_number, rcv_date, directory, from_email, message, sent_date, subject, flags)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                email.message_number,
                email.received_date.map(|d| d.to_rfc3339()),
                directory_id,
                from_id,
                message,
                email.sent_date.map(|d| d.to_rfc3339()),
                email.subject,
                email.flags.map(Flags::to_bits),
            ],
        )?;
        let id = tx.last_insert_rowid();

        Self::save_attachments(&tx, id, &email.attachments)?;
        Self::save_recipients(&tx, id, email)?;

        tx.commit()?;

        if let Some(name) = normalize_name(&email.directory) {
            email.directory = name.to_string();
        }
        email.id = Some(EmailId(id));

        info!(
            "Saved email {} in '{}' ({} attachment(s))",
            id,
            email.directory,
            email.attachments.len()
        );
        Ok(EmailId(id))
    }

    fn find_by_id(&self, id: EmailId) -> Result<Option<Email>> {
        let id = require_id(id)?;
        let conn = self.connector.connect()?;
        let mut emails = Self::load_emails(&conn, "WHERE e.id = ?", [id])?;
        Ok(emails.pop())
    }

    fn find_all(&self) -> Result<Vec<Email>> {
        let conn = self.connector.connect()?;
        Self::load_emails(&conn, "ORDER BY e.id", [])
    }

    fn find_in_directory(&self, directory: &str) -> Result<Vec<Email>> {
        let directory = normalize_name(directory)
            .ok_or_else(|| StoreError::invalid("Directory name is empty"))?;
        let conn = self.connector.connect()?;

        let Some(directory_id) = DirectoryCatalog::find_id_in(&conn, directory)? else {
            debug!("Directory '{}' does not exist, no emails", directory);
            return Ok(Vec::new());
        };

        Self::load_emails(&conn, "WHERE e.directory = ? ORDER BY e.id", [directory_id])
    }

    fn find_range(&self, start: i64, count: i64) -> Result<Vec<Email>> {
        if start < 0 || count < 0 {
            return Err(StoreError::invalid(format!(
                "Invalid range: start {} count {}",
                start, count
            )));
        }
        let conn = self.connector.connect()?;
        Self::load_emails(&conn, "ORDER BY e.id LIMIT ? OFFSET ?", params![count, start])
    }

    fn update_directory(&self, email: &Email) -> Result<usize> {
        let directory = normalize_name(&email.directory)
            .ok_or_else(|| StoreError::invalid("Email directory is empty"))?;
        // An email that was never saved matches no row
        let Some(id) = email.id.map(EmailId::get).filter(|id| *id > 0) else {
            debug!("Email has no stored id, nothing to move");
            return Ok(0);
        };

        let conn = self.connector.connect()?;
        let directory_id = DirectoryCatalog::find_or_create_id_in(&conn, directory)?;
        let changed = conn.execute(
            "UPDATE emails SET directory = ? WHERE id = ?",
            params![directory_id, id],
        )?;

        if changed > 0 {
            info!("Moved email {} to '{}'", id, directory);
        }
        Ok(changed)
    }

    fn delete(&self, id: EmailId) -> Result<usize> {
        let id = require_id(id)?;
        let mut conn = self.connector.connect()?;
        let tx = conn.transaction()?;

        // Cascades only fire when foreign keys are enforced on this connection
        tx.execute("DELETE FROM email_address WHERE email_id = ?", [id])?;
        tx.execute("DELETE FROM attachments WHERE email = ?", [id])?;
        let removed = tx.execute("DELETE FROM emails WHERE id = ?", [id])?;
        tx.commit()?;

        if removed > 0 {
            info!("Deleted email {}", id);
        }
        Ok(removed)
    }

    fn count(&self) -> Result<usize> {
        let conn = self.connector.connect()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM emails", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
